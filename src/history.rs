//! Historical-bar retrieval and time-range filtering.
//!
//! One request, one multi-record response. The external application may
//! return bars outside the requested range, so the result is filtered to
//! `[t_start, t_end]` before being copied into the host's buffer.

use log::debug;

use crate::bridge::Bridge;
use crate::error::Result;
use crate::protocol::{self, Bar};

/// Keep only bars inside `[t_start, t_end]`, preserving order and stopping
/// at the first bar past the end of the range. At most `capacity` bars.
pub fn filter_range(bars: &[Bar], t_start: f64, t_end: f64, capacity: usize) -> Vec<Bar> {
    let mut selected = Vec::new();
    for bar in bars {
        if bar.time < t_start {
            continue;
        }
        if bar.time > t_end {
            break;
        }
        if selected.len() >= capacity {
            break;
        }
        selected.push(*bar);
    }
    selected
}

impl Bridge {
    /// Fetch bars for `[t_start, t_end]` at `bar_minutes` resolution into
    /// `out`. Returns the number of bars written.
    pub fn fetch_history(
        &mut self,
        instrument: &str,
        t_start: f64,
        t_end: f64,
        bar_minutes: i32,
        out: &mut [Bar],
    ) -> Result<usize> {
        self.ensure_connected()?;

        let command = protocol::format_history(
            instrument,
            t_start,
            t_end,
            bar_minutes,
            out.len() as i32,
        );
        let response = self.transport.send_command(&command)?;
        let bars = protocol::parse_history(&response)?;

        let selected = filter_range(&bars, t_start, t_end, out.len());
        debug!(
            "History {instrument}: {} bars returned, {} in range",
            bars.len(),
            selected.len()
        );

        out[..selected.len()].copy_from_slice(&selected);
        Ok(selected.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(time: f64) -> Bar {
        Bar {
            time,
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 10.0,
        }
    }

    #[test]
    fn drops_bars_before_start() {
        let bars: Vec<Bar> = (0..5).map(|i| bar(100.0 + i as f64)).collect();
        let selected = filter_range(&bars, 102.0, 200.0, 10);
        assert_eq!(selected.len(), 3);
        assert_eq!(selected[0].time, 102.0);
    }

    #[test]
    fn stops_at_first_bar_past_end() {
        let bars: Vec<Bar> = (0..5).map(|i| bar(100.0 + i as f64)).collect();
        let selected = filter_range(&bars, 0.0, 102.0, 10);
        assert_eq!(selected.len(), 3);
        assert_eq!(selected.last().unwrap().time, 102.0);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let bars = vec![bar(100.0), bar(101.0), bar(102.0)];
        let selected = filter_range(&bars, 100.0, 102.0, 10);
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn capacity_caps_output() {
        let bars: Vec<Bar> = (0..50).map(|i| bar(100.0 + i as f64)).collect();
        let selected = filter_range(&bars, 0.0, 1000.0, 7);
        assert_eq!(selected.len(), 7);
        assert_eq!(selected[6].time, 106.0);
    }

    #[test]
    fn order_preserved() {
        let bars = vec![bar(100.0), bar(100.5), bar(101.0)];
        let selected = filter_range(&bars, 100.0, 101.0, 10);
        let times: Vec<f64> = selected.iter().map(|b| b.time).collect();
        assert_eq!(times, vec![100.0, 100.5, 101.0]);
    }

    #[test]
    fn empty_input() {
        assert!(filter_range(&[], 0.0, 100.0, 10).is_empty());
    }
}
