//! Local position cache and diagnostic reconciliation.
//!
//! The external application updates its own position collection on its own
//! schedule (observed 250 ms to 1 s after a fill), so a round-trip query at
//! the moment the host asks would read stale data. The cache is the
//! authority for synchronous queries: every observed fill is applied to it
//! before the entry point returns. Reconciliation polls the external view
//! afterwards purely to flag divergence; it never writes the cache.

use std::time::Duration;

use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::logging;
use crate::protocol;
use crate::transport::Transport;

/// Per-instrument signed net quantity: positive long, negative short.
#[derive(Debug, Default)]
pub struct PositionBook {
    net: FxHashMap<String, i64>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a signed fill quantity to the instrument's net position.
    pub fn apply_fill(&mut self, instrument: &str, signed_quantity: i64) {
        if signed_quantity == 0 {
            return;
        }
        let entry = self.net.entry(instrument.to_string()).or_insert(0);
        *entry += signed_quantity;
        debug!("Position {instrument}: {entry} ({signed_quantity:+})");
    }

    /// Cached signed net position. Never a round-trip, never "unknown".
    pub fn query(&self, instrument: &str) -> i64 {
        self.net.get(instrument).copied().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.net.clear();
    }
}

/// Poll the external application's position for `instrument` until it moves
/// in the direction of `expected_sign` relative to the first observation,
/// or matches `expected`, or `attempts` polls elapse. Returns the last
/// observed value. Diagnostic only: the cache is left untouched, and the
/// host can abort the wait through the progress callback.
pub fn reconcile_external(
    transport: &mut Transport,
    instrument: &str,
    expected: i64,
    expected_sign: i64,
    attempts: u32,
    interval: Duration,
) -> i64 {
    let mut last = 0;
    let mut baseline = None;

    for attempt in 0..attempts {
        if attempt > 0 {
            std::thread::sleep(interval);
            if !logging::heartbeat(0) {
                debug!("Reconcile aborted by host after {attempt} polls");
                return last;
            }
        }

        let report = transport
            .send_command(&protocol::format_get_position(instrument))
            .and_then(|resp| protocol::parse_position(&resp));
        let observed = match report {
            Ok(r) => r.quantity,
            Err(e) => {
                debug!("Reconcile poll failed: {e}");
                continue;
            }
        };

        last = observed;
        if observed == expected {
            debug!("Reconcile {instrument}: external agrees at {observed}");
            return observed;
        }
        let base = *baseline.get_or_insert(observed);
        if (observed - base).signum() == expected_sign.signum() && observed != base {
            debug!("Reconcile {instrument}: external moved to {observed}");
            return observed;
        }
    }

    warn!("Reconcile {instrument}: external still at {last}, cache at {expected}");
    last
}
