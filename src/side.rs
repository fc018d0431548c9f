//! Order side and its wire encoding.
//!
//! The host encodes direction in the sign of the amount it passes; the wire
//! protocol carries it as a BUY/SELL token; the position cache needs it as
//! a ±1 factor. This type is the junction between the three conventions.

use std::fmt;

/// Direction of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Derive the side from a signed order amount. `None` for zero.
    pub fn from_signed_amount(amount: i32) -> Option<Self> {
        match amount {
            a if a > 0 => Some(Side::Buy),
            a if a < 0 => Some(Side::Sell),
            _ => None,
        }
    }

    /// +1 for Buy, -1 for Sell. Signs fill quantities before they reach
    /// the position cache.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }

    /// The side that flattens a position opened on this one.
    #[inline]
    pub fn closing_side(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Wire token used in order commands.
    pub fn as_wire(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_amount_sign_selects_side() {
        assert_eq!(Side::from_signed_amount(3), Some(Side::Buy));
        assert_eq!(Side::from_signed_amount(-1), Some(Side::Sell));
        assert_eq!(Side::from_signed_amount(0), None);
    }

    #[test]
    fn sign_matches_position_direction() {
        assert_eq!(Side::Buy.sign(), 1);
        assert_eq!(Side::Sell.sign(), -1);
    }

    #[test]
    fn closing_side_flattens_both_directions() {
        assert_eq!(Side::Buy.closing_side(), Side::Sell);
        assert_eq!(Side::Sell.closing_side(), Side::Buy);
        // Closing a close re-opens the original direction.
        assert_eq!(Side::Buy.closing_side().closing_side(), Side::Buy);
    }

    #[test]
    fn closing_side_negates_sign() {
        assert_eq!(Side::Buy.closing_side().sign(), -Side::Buy.sign());
        assert_eq!(Side::Sell.closing_side().sign(), -Side::Sell.sign());
    }

    #[test]
    fn wire_tokens_round_through_display() {
        assert_eq!(Side::Buy.as_wire(), "BUY");
        assert_eq!(Side::Sell.as_wire(), "SELL");
        assert_eq!(format!("{}", Side::Sell), "SELL");
    }
}
