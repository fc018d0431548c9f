//! Wire codec: request formatting and response parsing.
//!
//! Requests are colon-separated tokens on one line. Responses carry a
//! leading tag; multi-record responses (history) separate records with `|`
//! and fields with `,`. Error responses begin with `ERROR`. The codec is
//! pure: it never touches the session or any shared state.

use crate::error::{Error, Result};
use crate::order::OrderStatus;
use crate::side::Side;
use crate::OrderKind;

/// Snapshot of the four quote fields for one instrument.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceQuote {
    pub last: f64,
    pub bid: f64,
    pub ask: f64,
    pub volume: f64,
}

impl PriceQuote {
    /// The price reported to the host: ask when available, else last.
    pub fn host_price(&self) -> f64 {
        if self.ask > 0.0 {
            self.ask
        } else {
            self.last
        }
    }

    /// Ask/bid spread, when both sides are present.
    pub fn spread(&self) -> f64 {
        if self.bid > 0.0 && self.ask > 0.0 {
            self.ask - self.bid
        } else {
            0.0
        }
    }
}

/// Account values as reported by the external application.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccountReport {
    pub cash: f64,
    pub buying_power: f64,
    pub realized_pnl: f64,
    /// Absent in older peers; substituted with 0 when only 3 fields parse.
    pub unrealized_pnl: f64,
}

/// The external application's own view of a position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PositionReport {
    pub quantity: i64,
    pub avg_price: f64,
}

/// Contract spec fields optionally carried on a subscribe acknowledgement.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubscribeAck {
    pub tick_size: Option<f64>,
    pub point_value: Option<f64>,
}

/// One order status report.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub external_id: String,
    pub status: OrderStatus,
    pub filled: i32,
    pub avg_fill_price: f64,
}

/// One historical bar, fields in wire order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bar {
    pub time: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

// === Request formatting ===

pub fn format_login(account: &str) -> String {
    format!("LOGIN:{account}")
}

pub fn format_subscribe(instrument: &str) -> String {
    format!("SUBSCRIBE:{instrument}")
}

pub fn format_unsubscribe(instrument: &str) -> String {
    format!("UNSUBSCRIBE:{instrument}")
}

pub fn format_get_price(instrument: &str) -> String {
    format!("GETPRICE:{instrument}")
}

pub fn format_get_position(instrument: &str) -> String {
    format!("GETPOSITION:{instrument}")
}

pub fn format_place_order(
    side: Side,
    instrument: &str,
    quantity: i32,
    kind: OrderKind,
    limit_price: f64,
    stop_price: f64,
) -> String {
    format!(
        "PLACEORDER:{}:{instrument}:{quantity}:{}:{limit_price}:{stop_price}",
        side.as_wire(),
        kind.as_wire()
    )
}

pub fn format_order_status(external_id: &str) -> String {
    format!("GETORDERSTATUS:{external_id}")
}

pub fn format_cancel_order(external_id: &str) -> String {
    format!("CANCELORDER:{external_id}")
}

pub fn format_history(
    instrument: &str,
    t_start: f64,
    t_end: f64,
    bar_minutes: i32,
    max_bars: i32,
) -> String {
    format!("GETHISTORY:{instrument}:{t_start:.8}:{t_end:.8}:{bar_minutes}:{max_bars}")
}

// === Response parsing ===

/// True for the `ERROR`-prefixed responses the peer (or a dead transport)
/// produces.
pub fn is_error(response: &str) -> bool {
    response.starts_with("ERROR")
}

fn ensure_not_error(response: &str) -> Result<()> {
    if is_error(response) {
        let detail = response.strip_prefix("ERROR:").unwrap_or(response);
        return Err(Error::ErrorResponse(detail.to_string()));
    }
    Ok(())
}

fn tag_mismatch(expected: &'static str, response: &str) -> Error {
    Error::Protocol {
        expected,
        got: response.to_string(),
    }
}

/// Locale-independent decimal parse; unparseable fields read as zero.
fn parse_f64(field: &str) -> f64 {
    field.trim().parse().unwrap_or(0.0)
}

fn parse_i64(field: &str) -> i64 {
    field.trim().parse().unwrap_or(0)
}

/// Parse `PRICE:<last>:<bid>:<ask>:<volume>`.
pub fn parse_price(response: &str) -> Result<PriceQuote> {
    ensure_not_error(response)?;
    let parts: Vec<&str> = response.split(':').collect();
    if parts.len() < 5 || parts[0] != "PRICE" {
        return Err(tag_mismatch("PRICE", response));
    }
    Ok(PriceQuote {
        last: parse_f64(parts[1]),
        bid: parse_f64(parts[2]),
        ask: parse_f64(parts[3]),
        volume: parse_f64(parts[4]),
    })
}

/// Parse `ACCOUNT:<cash>:<buyingPower>:<realizedPnL>[:<unrealizedPnL>]`.
pub fn parse_account(response: &str) -> Result<AccountReport> {
    ensure_not_error(response)?;
    let parts: Vec<&str> = response.split(':').collect();
    if parts.len() < 4 || parts[0] != "ACCOUNT" {
        return Err(tag_mismatch("ACCOUNT", response));
    }
    Ok(AccountReport {
        cash: parse_f64(parts[1]),
        buying_power: parse_f64(parts[2]),
        realized_pnl: parse_f64(parts[3]),
        unrealized_pnl: parts.get(4).copied().map(parse_f64).unwrap_or(0.0),
    })
}

/// Parse `POSITION:<signedQty>:<avgPrice>`.
pub fn parse_position(response: &str) -> Result<PositionReport> {
    ensure_not_error(response)?;
    let parts: Vec<&str> = response.split(':').collect();
    if parts.len() < 3 || parts[0] != "POSITION" {
        return Err(tag_mismatch("POSITION", response));
    }
    Ok(PositionReport {
        quantity: parse_i64(parts[1]),
        avg_price: parse_f64(parts[2]),
    })
}

/// Parse a subscribe acknowledgement. Success is any `OK`-bearing response;
/// contract specs ride on `OK:Subscribed:<sym>:<tickSize>:<pointValue>` and
/// are kept only when positive.
pub fn parse_subscribe_ack(response: &str) -> Result<SubscribeAck> {
    ensure_not_error(response)?;
    if !response.contains("OK") {
        return Err(tag_mismatch("OK", response));
    }
    let parts: Vec<&str> = response.split(':').collect();
    let positive = |field: &&str| {
        let v = parse_f64(field);
        (v > 0.0).then_some(v)
    };
    Ok(SubscribeAck {
        tick_size: parts.get(3).and_then(positive),
        point_value: parts.get(4).and_then(positive),
    })
}

/// Parse a plain acknowledgement: any response containing `OK`.
pub fn parse_ok(response: &str) -> Result<()> {
    ensure_not_error(response)?;
    if !response.contains("OK") {
        return Err(tag_mismatch("OK", response));
    }
    Ok(())
}

/// Parse `ORDER:<externalId>` from an accepted placement.
pub fn parse_order_ack(response: &str) -> Result<String> {
    ensure_not_error(response)?;
    let parts: Vec<&str> = response.split(':').collect();
    if parts.len() < 2 || parts[0] != "ORDER" || parts[1].is_empty() {
        return Err(tag_mismatch("ORDER", response));
    }
    Ok(parts[1].to_string())
}

/// Parse `ORDERSTATUS:<externalId>:<state>:<filled>:<avgPrice>`.
pub fn parse_order_status(response: &str) -> Result<StatusReport> {
    ensure_not_error(response)?;
    let parts: Vec<&str> = response.split(':').collect();
    if parts.len() < 5 || parts[0] != "ORDERSTATUS" {
        return Err(tag_mismatch("ORDERSTATUS", response));
    }
    Ok(StatusReport {
        external_id: parts[1].to_string(),
        status: OrderStatus::from_wire(parts[2]),
        filled: parse_i64(parts[3]) as i32,
        avg_fill_price: parse_f64(parts[4]),
    })
}

/// True when the heartbeat response reports a live session.
pub fn parse_connected(response: &str) -> bool {
    response.contains("CONNECTED:1")
}

/// Parse `VERSION:<v>` from the optional version probe.
pub fn parse_version(response: &str) -> Option<&str> {
    response.strip_prefix("VERSION:").filter(|v| !v.is_empty())
}

/// Parse `HISTORY:<N>|<t,o,h,l,c,v>|…` into bars, preserving wire order.
/// Records with the wrong field count are skipped.
pub fn parse_history(response: &str) -> Result<Vec<Bar>> {
    ensure_not_error(response)?;
    let mut records = response.split('|');
    let head = records.next().unwrap_or("");
    let head_parts: Vec<&str> = head.split(':').collect();
    if head_parts.len() < 2 || head_parts[0] != "HISTORY" {
        return Err(tag_mismatch("HISTORY", response));
    }
    let declared = parse_i64(head_parts[1]);

    let mut bars = Vec::new();
    for record in records {
        if record.is_empty() {
            continue;
        }
        let fields: Vec<&str> = record.split(',').collect();
        if fields.len() != 6 {
            log::debug!("Skipping malformed bar record '{record}'");
            continue;
        }
        bars.push(Bar {
            time: parse_f64(fields[0]),
            open: parse_f64(fields[1]),
            high: parse_f64(fields[2]),
            low: parse_f64(fields[3]),
            close: parse_f64(fields[4]),
            volume: parse_f64(fields[5]),
        });
    }

    if declared != bars.len() as i64 {
        log::debug!(
            "History declared {declared} bars, parsed {}",
            bars.len()
        );
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_order_formatting() {
        let cmd = format_place_order(Side::Buy, "NQ", 2, OrderKind::Limit, 4990.5, 0.0);
        assert_eq!(cmd, "PLACEORDER:BUY:NQ:2:LIMIT:4990.5:0");
    }

    #[test]
    fn market_order_formatting() {
        let cmd = format_place_order(Side::Sell, "ES", 1, OrderKind::Market, 0.0, 0.0);
        assert_eq!(cmd, "PLACEORDER:SELL:ES:1:MARKET:0:0");
    }

    #[test]
    fn history_formatting_uses_high_precision() {
        let cmd = format_history("ES", 45000.5, 45001.0, 1, 30);
        assert_eq!(cmd, "GETHISTORY:ES:45000.50000000:45001.00000000:1:30");
    }

    #[test]
    fn price_parses() {
        let q = parse_price("PRICE:5000.25:5000.0:5000.5:1234").unwrap();
        assert_eq!(q.last, 5000.25);
        assert_eq!(q.bid, 5000.0);
        assert_eq!(q.ask, 5000.5);
        assert_eq!(q.volume, 1234.0);
    }

    #[test]
    fn host_price_prefers_ask() {
        let q = PriceQuote {
            last: 5000.0,
            ask: 5000.5,
            ..Default::default()
        };
        assert_eq!(q.host_price(), 5000.5);
        let q = PriceQuote {
            last: 5000.0,
            ..Default::default()
        };
        assert_eq!(q.host_price(), 5000.0);
    }

    #[test]
    fn spread_requires_both_sides() {
        let q = parse_price("PRICE:0:5000.0:5000.5:0").unwrap();
        assert!((q.spread() - 0.5).abs() < 1e-9);
        let q = parse_price("PRICE:5000:0:5000.5:0").unwrap();
        assert_eq!(q.spread(), 0.0);
    }

    #[test]
    fn price_tag_mismatch_is_error() {
        assert!(parse_price("QUOTE:1:2:3:4").is_err());
        assert!(parse_price("PRICE:1:2").is_err());
    }

    #[test]
    fn unparseable_numeric_field_reads_zero() {
        let q = parse_price("PRICE:abc:5000:5000.5:10").unwrap();
        assert_eq!(q.last, 0.0);
        assert_eq!(q.bid, 5000.0);
    }

    #[test]
    fn error_response_classified() {
        let err = parse_price("ERROR:Unknown instrument").unwrap_err();
        assert!(matches!(err, Error::ErrorResponse(ref m) if m == "Unknown instrument"));
    }

    #[test]
    fn account_with_four_fields() {
        let a = parse_account("ACCOUNT:10000:25000:150.5:-42.25").unwrap();
        assert_eq!(a.cash, 10000.0);
        assert_eq!(a.buying_power, 25000.0);
        assert_eq!(a.realized_pnl, 150.5);
        assert_eq!(a.unrealized_pnl, -42.25);
    }

    #[test]
    fn account_without_unrealized_defaults_zero() {
        let a = parse_account("ACCOUNT:10000:25000:150.5").unwrap();
        assert_eq!(a.unrealized_pnl, 0.0);
    }

    #[test]
    fn position_signed() {
        let p = parse_position("POSITION:-3:5001.25").unwrap();
        assert_eq!(p.quantity, -3);
        assert_eq!(p.avg_price, 5001.25);
    }

    #[test]
    fn subscribe_ack_with_specs() {
        let ack = parse_subscribe_ack("OK:Subscribed:ES:0.25:12.5").unwrap();
        assert_eq!(ack.tick_size, Some(0.25));
        assert_eq!(ack.point_value, Some(12.5));
    }

    #[test]
    fn subscribe_ack_without_specs() {
        let ack = parse_subscribe_ack("OK:Subscribed:ES").unwrap();
        assert_eq!(ack.tick_size, None);
        assert_eq!(ack.point_value, None);
    }

    #[test]
    fn subscribe_ack_rejects_nonpositive_specs() {
        let ack = parse_subscribe_ack("OK:Subscribed:ES:0:-1").unwrap();
        assert_eq!(ack.tick_size, None);
        assert_eq!(ack.point_value, None);
    }

    #[test]
    fn subscribe_error_propagates() {
        assert!(parse_subscribe_ack("ERROR:No such instrument").is_err());
    }

    #[test]
    fn order_ack() {
        let id = parse_order_ack("ORDER:fa41b14fff514c69b5749bba57471eb8").unwrap();
        assert_eq!(id, "fa41b14fff514c69b5749bba57471eb8");
        assert!(parse_order_ack("ORDER:").is_err());
        assert!(parse_order_ack("OK").is_err());
    }

    #[test]
    fn order_status_report() {
        let r = parse_order_status("ORDERSTATUS:abc:Filled:2:5001.5").unwrap();
        assert_eq!(r.external_id, "abc");
        assert_eq!(r.status, OrderStatus::Filled);
        assert_eq!(r.filled, 2);
        assert_eq!(r.avg_fill_price, 5001.5);
    }

    #[test]
    fn connected_heartbeat() {
        assert!(parse_connected("CONNECTED:1"));
        assert!(!parse_connected("CONNECTED:0"));
    }

    #[test]
    fn version_probe() {
        assert_eq!(parse_version("VERSION:1.0"), Some("1.0"));
        assert_eq!(parse_version("PONG"), None);
    }

    #[test]
    fn history_parses_records_in_order() {
        let bars =
            parse_history("HISTORY:2|45000.0,1,2,0.5,1.5,100|45000.1,1.5,2.5,1,2,200").unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].time, 45000.0);
        assert_eq!(bars[0].open, 1.0);
        assert_eq!(bars[0].high, 2.0);
        assert_eq!(bars[0].low, 0.5);
        assert_eq!(bars[0].close, 1.5);
        assert_eq!(bars[0].volume, 100.0);
        assert_eq!(bars[1].time, 45000.1);
    }

    #[test]
    fn history_skips_malformed_records() {
        let bars = parse_history("HISTORY:2|45000.0,1,2,0.5,1.5,100|bogus").unwrap();
        assert_eq!(bars.len(), 1);
    }

    #[test]
    fn history_empty() {
        assert!(parse_history("HISTORY:0").unwrap().is_empty());
        assert!(parse_history("NOTHISTORY").is_err());
    }
}
