//! Market-data adapter: subscriptions, quotes, and contract specs.

use std::time::Duration;

use log::{debug, info, warn};

use crate::bridge::Bridge;
use crate::error::Result;
use crate::protocol::{self, PriceQuote};

/// Settle time after switching the subscription inside a quote call, so the
/// first price read sees data.
const SUBSCRIBE_SETTLE: Duration = Duration::from_millis(100);

/// Per-instrument contract parameters learned at subscribe time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssetSpec {
    /// Smallest price increment. Always positive.
    pub tick_size: f64,
    /// Currency value of one tick at quantity 1. Always positive.
    pub point_value: f64,
}

impl AssetSpec {
    /// Fallback specs when the external application never reported any.
    /// The host's asset list is expected to override these.
    pub const DEFAULT: AssetSpec = AssetSpec {
        tick_size: 0.25,
        point_value: 1.25,
    };
}

/// Everything the host's asset call wants in one round of queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetSnapshot {
    pub price: f64,
    pub spread: f64,
    pub volume: f64,
    pub tick_size: f64,
    pub point_value: f64,
}

impl Bridge {
    /// Subscribe to an instrument. On success it becomes the current
    /// symbol, and any contract specs on the acknowledgement are cached.
    /// Missing or non-positive spec fields leave prior values intact.
    pub fn subscribe(&mut self, instrument: &str) -> Result<()> {
        self.ensure_connected()?;
        let response = self
            .transport
            .send_command(&protocol::format_subscribe(instrument))?;
        let ack = protocol::parse_subscribe_ack(&response)?;

        let spec = self
            .specs
            .entry(instrument.to_string())
            .or_insert(AssetSpec::DEFAULT);
        if let Some(tick_size) = ack.tick_size {
            spec.tick_size = tick_size;
        }
        if let Some(point_value) = ack.point_value {
            spec.point_value = point_value;
        }

        self.current_symbol = Some(instrument.to_string());
        info!("Subscribed to {instrument}");
        Ok(())
    }

    /// Unsubscribe. No state depends on this succeeding.
    pub fn unsubscribe(&mut self, instrument: &str) -> Result<()> {
        self.ensure_connected()?;
        let response = self
            .transport
            .send_command(&protocol::format_unsubscribe(instrument))?;
        protocol::parse_ok(&response)
    }

    /// Current quote fields for an instrument.
    pub fn quote(&mut self, instrument: &str) -> Result<PriceQuote> {
        self.ensure_connected()?;
        let response = self
            .transport
            .send_command(&protocol::format_get_price(instrument))?;
        protocol::parse_price(&response)
    }

    /// Cached contract specs, or the documented defaults when the cache is
    /// cold for this instrument.
    pub fn asset_specs(&self, instrument: &str) -> AssetSpec {
        match self.specs.get(instrument) {
            Some(spec) => *spec,
            None => {
                info!("No contract specs for {instrument}, using defaults");
                AssetSpec::DEFAULT
            }
        }
    }

    /// Full asset snapshot for the host: switches the subscription if the
    /// instrument differs from the current symbol, then reads the quote.
    pub fn asset_snapshot(&mut self, instrument: &str) -> Result<AssetSnapshot> {
        self.ensure_connected()?;

        if self.current_symbol.as_deref() != Some(instrument) {
            if let Err(e) = self.subscribe(instrument) {
                warn!("Subscribe to {instrument} failed: {e}");
            }
            std::thread::sleep(SUBSCRIBE_SETTLE);
        }

        let quote = self.quote(instrument)?;
        let spec = self.asset_specs(instrument);
        debug!(
            "{instrument}: last={} bid={} ask={} vol={}",
            quote.last, quote.bid, quote.ask, quote.volume
        );

        Ok(AssetSnapshot {
            price: quote.host_price(),
            spread: quote.spread(),
            volume: quote.volume,
            tick_size: spec.tick_size,
            point_value: spec.point_value,
        })
    }
}
