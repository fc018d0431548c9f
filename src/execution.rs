//! Order state machine: placement, status polling, close, and cancel.
//!
//! Market orders get a bounded synchronous fill wait; every observed fill
//! is pushed into the position cache before control returns to the host,
//! and the external application is then polled diagnostically to confirm
//! it converges. The sign of a returned id encodes fill state: positive
//! means the fill was observed, negative means the order is still working.

use std::time::Duration;

use log::{info, warn};

use crate::bridge::Bridge;
use crate::error::{Error, Result};
use crate::order::{Order, OrderKind, OrderStatus};
use crate::position;
use crate::protocol::{self, StatusReport};
use crate::{logging, Side};

/// Outcome of a placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Positive local id when the fill was observed, negative when pending.
    pub signed_id: i32,
    pub fill_price: f64,
    pub filled: i32,
}

/// Outcome of a status query on a tracked order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeStatus {
    pub filled: i32,
    pub open_price: f64,
    pub close_price: f64,
    pub profit: f64,
}

/// Outcome of a close request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CloseOutcome {
    /// The order had no fills and was cancelled instead of opposed.
    Cancelled,
    /// The opposing order filled.
    Closed {
        close_price: f64,
        profit: f64,
        filled: i32,
    },
    /// The opposing order was accepted but its fill was not observed.
    Pending,
}

/// Stop trigger price: above the market for a buy stop, below for a sell.
pub fn stop_price_for(side: Side, current_price: f64, stop_distance: f64) -> f64 {
    match side {
        Side::Buy => current_price + stop_distance,
        Side::Sell => current_price - stop_distance,
    }
}

/// Realized profit of a round trip, signed by the entry direction.
pub fn profit_for(entry_side: Side, open_price: f64, close_price: f64, filled: i32) -> f64 {
    (close_price - open_price) * filled as f64 * entry_side.sign() as f64
}

impl Bridge {
    /// Place an order. The side comes from the sign of `signed_amount`,
    /// the kind from the stop distance / limit price combination. Market
    /// orders wait a bounded time for their fill; everything else returns
    /// pending immediately.
    pub fn place_order(
        &mut self,
        instrument: &str,
        signed_amount: i32,
        stop_distance: f64,
        limit_price: f64,
    ) -> Result<Placement> {
        self.ensure_connected()?;
        if instrument.is_empty() {
            return Err(Error::Validation("empty instrument".into()));
        }
        let side = Side::from_signed_amount(signed_amount)
            .ok_or_else(|| Error::Validation("zero order amount".into()))?;
        let quantity = signed_amount.abs();

        let kind = OrderKind::classify(stop_distance, limit_price);
        let stop_price = match kind {
            OrderKind::Stop | OrderKind::StopLimit => {
                let current = self.quote(instrument)?.host_price();
                if current <= 0.0 {
                    return Err(Error::Validation(format!(
                        "no market data for {instrument} stop price"
                    )));
                }
                stop_price_for(side, current, stop_distance)
            }
            _ => 0.0,
        };

        let command =
            protocol::format_place_order(side, instrument, quantity, kind, limit_price, stop_price);
        let response = self.transport.send_command(&command)?;
        let external_id = protocol::parse_order_ack(&response)?;

        let order = Order::new(
            external_id.clone(),
            instrument.to_string(),
            side,
            quantity,
            limit_price,
            stop_price,
            kind,
        );
        let local_id = self.registry.register(order);
        info!("Order {local_id}: {side} {quantity} {instrument} {kind}");

        if kind != OrderKind::Market {
            return Ok(Placement {
                signed_id: -local_id,
                fill_price: 0.0,
                filled: 0,
            });
        }

        match self.poll_fill(&external_id)? {
            Some(report) if report.filled > 0 => {
                let (fill_price, filled) = self.absorb_report(local_id, &report);
                info!("Order {local_id} filled: {filled} @ {fill_price:.2}");
                self.reconcile_after_fill(instrument, side.sign());
                Ok(Placement {
                    signed_id: local_id,
                    fill_price,
                    filled,
                })
            }
            Some(report) => {
                // Terminal without a fill (rejected or cancelled upstream).
                self.absorb_report(local_id, &report);
                warn!("Order {local_id} ended {:?} with no fill", report.status);
                Ok(Placement {
                    signed_id: -local_id,
                    fill_price: 0.0,
                    filled: 0,
                })
            }
            None => Ok(Placement {
                signed_id: -local_id,
                fill_price: 0.0,
                filled: 0,
            }),
        }
    }

    /// Query a tracked order's state. `Ok(None)` means the order ended
    /// cancelled or rejected: the caller reports "not available" and the
    /// order becomes eligible for retirement.
    pub fn trade_status(&mut self, signed_id: i32) -> Result<Option<TradeStatus>> {
        self.ensure_connected()?;
        let local_id = signed_id.abs();
        let Some(order) = self.registry.get(local_id) else {
            return Err(Error::Validation(format!("unknown trade id {local_id}")));
        };
        let external_id = order.external_id.clone();
        let instrument = order.instrument.clone();
        let entry_side = order.side;

        let response = self
            .transport
            .send_command(&protocol::format_order_status(&external_id))?;
        let report = protocol::parse_order_status(&response)?;
        let (open_price, filled) = self.absorb_report(local_id, &report);

        let status = self
            .registry
            .get(local_id)
            .map(|o| o.status)
            .unwrap_or(report.status);
        if matches!(status, OrderStatus::Cancelled | OrderStatus::Rejected) {
            return Ok(None);
        }

        let close_price = self.quote(&instrument).map(|q| q.last).unwrap_or(0.0);
        let profit = if open_price > 0.0 && close_price > 0.0 {
            profit_for(entry_side, open_price, close_price, filled)
        } else {
            0.0
        };

        Ok(Some(TradeStatus {
            filled,
            open_price,
            close_price,
            profit,
        }))
    }

    /// Close a trade. A still-pending order (no fills observed by a fresh
    /// status poll) is cancelled, not opposed; a filled one is flattened by
    /// an opposing order.
    pub fn close_trade(
        &mut self,
        signed_id: i32,
        amount: i32,
        limit_price: f64,
    ) -> Result<CloseOutcome> {
        self.ensure_connected()?;
        let local_id = signed_id.abs();
        let Some(order) = self.registry.get(local_id) else {
            return Err(Error::Validation(format!("unknown trade id {local_id}")));
        };
        let external_id = order.external_id.clone();
        let instrument = order.instrument.clone();
        let entry_side = order.side;

        // Never trust the cached fill count for the cancel-vs-oppose
        // decision; the fill may have landed since the last poll.
        let response = self
            .transport
            .send_command(&protocol::format_order_status(&external_id))?;
        let report = protocol::parse_order_status(&response)?;
        let (open_price, filled) = self.absorb_report(local_id, &report);

        if filled == 0 {
            let response = self
                .transport
                .send_command(&protocol::format_cancel_order(&external_id))?;
            protocol::parse_ok(&response)?;
            self.mark_cancelled(local_id);
            info!("Order {local_id} cancelled while pending");
            return Ok(CloseOutcome::Cancelled);
        }

        let close_quantity = if amount > 0 {
            amount
        } else if filled > 0 {
            filled
        } else {
            self.external_position(&instrument)
                .map(|p| p.quantity.unsigned_abs() as i32)
                .unwrap_or(0)
        };
        if close_quantity <= 0 {
            return Err(Error::Validation(format!(
                "nothing to close for trade {local_id}"
            )));
        }

        let close_side = entry_side.closing_side();
        let kind = if limit_price > 0.0 {
            OrderKind::Limit
        } else {
            OrderKind::Market
        };
        let command = protocol::format_place_order(
            close_side,
            &instrument,
            close_quantity,
            kind,
            limit_price,
            0.0,
        );
        let response = self.transport.send_command(&command)?;
        let close_external_id = protocol::parse_order_ack(&response)?;
        info!("Order {local_id} closing: {close_side} {close_quantity} {instrument} {kind}");

        if kind != OrderKind::Market {
            return Ok(CloseOutcome::Pending);
        }

        match self.poll_fill(&close_external_id)? {
            Some(report) if report.filled > 0 => {
                let close_filled = report.filled.min(close_quantity);
                let close_price = report.avg_fill_price;
                self.positions
                    .apply_fill(&instrument, close_side.sign() * close_filled as i64);
                let profit = profit_for(entry_side, open_price, close_price, close_filled);
                info!("Order {local_id} closed: {close_filled} @ {close_price:.2}");
                self.reconcile_after_fill(&instrument, close_side.sign());
                Ok(CloseOutcome::Closed {
                    close_price,
                    profit,
                    filled: close_filled,
                })
            }
            _ => {
                warn!("Close of order {local_id} accepted, fill not yet observed");
                Ok(CloseOutcome::Pending)
            }
        }
    }

    /// Cancel a tracked order outright, regardless of fill state.
    pub fn cancel_order_local(&mut self, local_id: i32) -> Result<()> {
        self.ensure_connected()?;
        let Some(order) = self.registry.get(local_id) else {
            return Err(Error::Validation(format!("unknown trade id {local_id}")));
        };
        let external_id = order.external_id.clone();
        let response = self
            .transport
            .send_command(&protocol::format_cancel_order(&external_id))?;
        protocol::parse_ok(&response)?;
        self.mark_cancelled(local_id);
        info!("Order {local_id} cancelled");
        Ok(())
    }

    /// Poll the external application for a fill. Returns the first report
    /// with fills or a terminal state, or `None` on timeout, host abort, or
    /// a transport drop mid-wait (the order stays tracked either way).
    fn poll_fill(&mut self, external_id: &str) -> Result<Option<StatusReport>> {
        let attempts = self.config.execution.fill_poll_attempts;
        let interval = Duration::from_millis(self.config.execution.fill_poll_interval_ms);
        let command = protocol::format_order_status(external_id);

        for _ in 0..attempts {
            std::thread::sleep(interval);
            if !logging::heartbeat(0) {
                info!("Fill wait aborted by host");
                return Ok(None);
            }

            let report = match self.transport.send_command(&command) {
                Ok(response) => protocol::parse_order_status(&response)?,
                Err(e) => {
                    warn!("Status poll failed: {e}");
                    return Ok(None);
                }
            };
            if report.filled > 0 || report.status.is_terminal() {
                return Ok(Some(report));
            }
        }
        Ok(None)
    }

    /// Fold a status report into the tracked order, propagate any new fill
    /// quantity into the position cache, and sweep retirement on terminal
    /// transitions. Returns (avg fill price, total filled).
    fn absorb_report(&mut self, local_id: i32, report: &StatusReport) -> (f64, i32) {
        let Some(order) = self.registry.get_mut(local_id) else {
            return (report.avg_fill_price, report.filled);
        };
        let side = order.side;
        let instrument = order.instrument.clone();
        let delta = order.apply_report(report.status, report.filled, report.avg_fill_price);
        let result = (order.avg_fill_price, order.filled);
        let terminal = order.is_terminal();

        if delta > 0 {
            self.positions
                .apply_fill(&instrument, side.sign() * delta as i64);
        }
        if terminal {
            self.registry.retire_terminal();
        }
        result
    }

    fn mark_cancelled(&mut self, local_id: i32) {
        if let Some(order) = self.registry.get_mut(local_id) {
            order.apply_report(OrderStatus::Cancelled, order.filled, 0.0);
        }
        self.registry.retire_terminal();
    }

    fn reconcile_after_fill(&mut self, instrument: &str, expected_sign: i64) {
        let expected = self.positions.query(instrument);
        let attempts = self.config.execution.reconcile_attempts;
        let interval = Duration::from_millis(self.config.execution.reconcile_interval_ms);
        position::reconcile_external(
            &mut self.transport,
            instrument,
            expected,
            expected_sign,
            attempts,
            interval,
        );
    }
}
