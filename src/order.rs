//! Order representation and lifecycle

use std::fmt;

use crate::Side;

/// Kind of order submitted to the order-management application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderKind {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrderKind {
    /// Classify an order from its stop distance and limit price.
    pub fn classify(stop_distance: f64, limit_price: f64) -> Self {
        match (stop_distance > 0.0, limit_price > 0.0) {
            (true, true) => OrderKind::StopLimit,
            (true, false) => OrderKind::Stop,
            (false, true) => OrderKind::Limit,
            (false, false) => OrderKind::Market,
        }
    }

    /// Wire token used in order commands.
    pub fn as_wire(self) -> &'static str {
        match self {
            OrderKind::Market => "MARKET",
            OrderKind::Limit => "LIMIT",
            OrderKind::Stop => "STOP",
            OrderKind::StopLimit => "STOPLIMIT",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Status of an order in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    /// Accepted by the external application, no fills yet
    #[default]
    Submitted,
    /// Some quantity filled, remainder still working
    Partial,
    /// Fully executed
    Filled,
    /// Removed by request or by the external application
    Cancelled,
    /// Refused by the external application
    Rejected,
}

impl OrderStatus {
    /// Returns true if the order is terminal (no further state changes).
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    /// Parse an order-state token from the wire. Unknown working-state
    /// tokens map to Submitted; terminal tokens map exactly.
    pub fn from_wire(token: &str) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "filled" => OrderStatus::Filled,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            "rejected" => OrderStatus::Rejected,
            "partial" | "partfilled" | "partiallyfilled" => OrderStatus::Partial,
            _ => OrderStatus::Submitted,
        }
    }
}

/// A tracked order: one submission to the order-management application.
///
/// `local_id` is the dense host-facing identifier; `external_id` is the
/// opaque identifier the external application assigned. Fill bookkeeping is
/// delta-based: [`Order::apply_report`] returns how much new quantity was
/// observed filled, so the caller can propagate it to the position cache.
#[derive(Clone, Debug)]
pub struct Order {
    pub local_id: i32,
    pub external_id: String,
    pub instrument: String,
    pub side: Side,
    pub quantity: i32,
    pub limit_price: f64,
    pub stop_price: f64,
    pub kind: OrderKind,
    pub filled: i32,
    pub avg_fill_price: f64,
    pub status: OrderStatus,
}

impl Order {
    /// Create a freshly submitted order. `local_id` is assigned by the
    /// registry at registration time.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        external_id: String,
        instrument: String,
        side: Side,
        quantity: i32,
        limit_price: f64,
        stop_price: f64,
        kind: OrderKind,
    ) -> Self {
        Self {
            local_id: 0,
            external_id,
            instrument,
            side,
            quantity,
            limit_price,
            stop_price,
            kind,
            filled: 0,
            avg_fill_price: 0.0,
            status: OrderStatus::Submitted,
        }
    }

    /// Apply a status report from the external application.
    ///
    /// Returns the newly observed filled quantity (>= 0), clamped so that
    /// `filled` never exceeds `quantity` and never decreases. Terminal
    /// states are sticky: once Filled/Cancelled/Rejected, later state
    /// tokens do not transition the order back.
    pub fn apply_report(&mut self, state: OrderStatus, filled: i32, avg_fill_price: f64) -> i32 {
        let new_filled = filled.clamp(self.filled, self.quantity);
        let delta = new_filled - self.filled;
        self.filled = new_filled;

        if avg_fill_price > 0.0 {
            self.avg_fill_price = avg_fill_price;
        }

        if !self.status.is_terminal() {
            self.status = if self.filled >= self.quantity {
                OrderStatus::Filled
            } else if state.is_terminal() {
                state
            } else if self.filled > 0 {
                OrderStatus::Partial
            } else {
                state
            };
        }

        delta
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_order(quantity: i32) -> Order {
        Order::new(
            "abc123".into(),
            "NQ".into(),
            Side::Buy,
            quantity,
            0.0,
            0.0,
            OrderKind::Market,
        )
    }

    #[test]
    fn classify_kinds() {
        assert_eq!(OrderKind::classify(0.0, 0.0), OrderKind::Market);
        assert_eq!(OrderKind::classify(0.0, 5000.0), OrderKind::Limit);
        assert_eq!(OrderKind::classify(2.0, 0.0), OrderKind::Stop);
        assert_eq!(OrderKind::classify(2.0, 5000.0), OrderKind::StopLimit);
    }

    #[test]
    fn state_tokens() {
        assert_eq!(OrderStatus::from_wire("Filled"), OrderStatus::Filled);
        assert_eq!(OrderStatus::from_wire("CANCELLED"), OrderStatus::Cancelled);
        assert_eq!(OrderStatus::from_wire("canceled"), OrderStatus::Cancelled);
        assert_eq!(OrderStatus::from_wire("Rejected"), OrderStatus::Rejected);
        assert_eq!(OrderStatus::from_wire("PartFilled"), OrderStatus::Partial);
        assert_eq!(OrderStatus::from_wire("Working"), OrderStatus::Submitted);
    }

    #[test]
    fn new_order_initial_state() {
        let order = make_order(2);
        assert_eq!(order.filled, 0);
        assert_eq!(order.status, OrderStatus::Submitted);
        assert!(!order.is_terminal());
    }

    #[test]
    fn full_fill() {
        let mut order = make_order(2);
        let delta = order.apply_report(OrderStatus::Filled, 2, 5001.25);
        assert_eq!(delta, 2);
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.avg_fill_price, 5001.25);
    }

    #[test]
    fn partial_then_full() {
        let mut order = make_order(2);
        assert_eq!(order.apply_report(OrderStatus::Submitted, 1, 5000.0), 1);
        assert_eq!(order.status, OrderStatus::Partial);
        assert_eq!(order.apply_report(OrderStatus::Filled, 2, 5000.5), 1);
        assert_eq!(order.status, OrderStatus::Filled);
    }

    #[test]
    fn fill_count_implies_filled_status() {
        // Some external states lag the fill count; the count wins.
        let mut order = make_order(1);
        order.apply_report(OrderStatus::Submitted, 1, 5000.0);
        assert_eq!(order.status, OrderStatus::Filled);
    }

    #[test]
    fn filled_never_decreases() {
        let mut order = make_order(2);
        order.apply_report(OrderStatus::Partial, 1, 5000.0);
        assert_eq!(order.apply_report(OrderStatus::Partial, 0, 0.0), 0);
        assert_eq!(order.filled, 1);
    }

    #[test]
    fn filled_clamped_to_quantity() {
        let mut order = make_order(2);
        assert_eq!(order.apply_report(OrderStatus::Filled, 5, 5000.0), 2);
        assert_eq!(order.filled, 2);
    }

    #[test]
    fn terminal_is_sticky() {
        let mut order = make_order(2);
        order.apply_report(OrderStatus::Cancelled, 1, 5000.0);
        assert_eq!(order.status, OrderStatus::Cancelled);
        order.apply_report(OrderStatus::Submitted, 1, 0.0);
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[test]
    fn rejection_with_no_fill() {
        let mut order = make_order(1);
        assert_eq!(order.apply_report(OrderStatus::Rejected, 0, 0.0), 0);
        assert_eq!(order.status, OrderStatus::Rejected);
        assert!(order.is_terminal());
    }

    #[test]
    fn zero_avg_price_keeps_prior() {
        let mut order = make_order(2);
        order.apply_report(OrderStatus::Partial, 1, 5000.0);
        order.apply_report(OrderStatus::Filled, 2, 0.0);
        assert_eq!(order.avg_fill_price, 5000.0);
    }
}
