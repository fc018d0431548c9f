//! Time-in-force: lifetime policy for a working order

use std::fmt;

/// Time-in-force determines how long an order remains active
/// and how partial fills are handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TimeInForce {
    /// Good-til-cancelled: works until filled or explicitly cancelled.
    #[default]
    GTC,

    /// Immediate-or-cancel: fill what's available immediately, cancel remainder.
    IOC,

    /// Fill-or-kill: fill entire quantity immediately or cancel entirely.
    FOK,

    /// Good for the trading day only.
    Day,
}

impl TimeInForce {
    /// Map the host's order-type code to a time-in-force.
    ///
    /// Codes outside the known set fall back to Day, matching the host's
    /// convention for the all-or-none / unknown bucket.
    pub fn from_host_code(code: i32) -> Self {
        match code {
            1 => TimeInForce::GTC,
            2 => TimeInForce::IOC,
            3 => TimeInForce::FOK,
            _ => TimeInForce::Day,
        }
    }

    /// Wire token used in order commands.
    pub fn as_wire(self) -> &'static str {
        match self {
            TimeInForce::GTC => "GTC",
            TimeInForce::IOC => "IOC",
            TimeInForce::FOK => "FOK",
            TimeInForce::Day => "DAY",
        }
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}
