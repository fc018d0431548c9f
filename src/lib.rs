//! # nanobridge
//!
//! A broker bridge plugin: the host trading framework loads this crate as a
//! dynamic module and drives it through a fixed C-ABI entry-point set
//! ([`ffi`]); the bridge translates each call into a line-delimited
//! request/response exchange with an order-management application listening
//! on localhost TCP.
//!
//! ## Architecture
//!
//! - [`transport`] — one blocking TCP session, one command line out, one
//!   response line back
//! - [`protocol`] — request formatting and typed response parsing
//! - [`market`] — subscriptions, quotes, and cached contract specs
//! - [`registry`] — dense local order ids mapped to the peer's opaque ids,
//!   with bounded terminal history
//! - [`position`] — signed net-position cache updated synchronously on
//!   every observed fill
//! - [`execution`] — the order state machine: place, poll, close, cancel
//! - [`history`] — ranged historical-bar retrieval
//! - [`ffi`] — the C-ABI surface and the process-wide singleton
//!
//! The host calls everything from a single thread; the bridge spawns no
//! threads of its own. Market orders wait a bounded time for their fill and
//! encode the outcome in the sign of the returned id: positive means the
//! fill was observed, negative means the order is still working.
//!
//! ## Embedded use
//!
//! The core is an ordinary library underneath the C ABI:
//!
//! ```no_run
//! use nanobridge::{Bridge, Config};
//!
//! let mut bridge = Bridge::new(Config::default());
//! bridge.login("Sim101")?;
//! bridge.subscribe("ES 03-26")?;
//! let placement = bridge.place_order("ES 03-26", 1, 0.0, 0.0)?;
//! if placement.signed_id > 0 {
//!     assert_eq!(bridge.cached_position("ES 03-26"), 1);
//! }
//! # Ok::<(), nanobridge::Error>(())
//! ```

pub mod bridge;
pub mod clock;
pub mod config;
mod error;
pub mod execution;
pub mod ffi;
pub mod history;
pub mod logging;
pub mod market;
mod order;
pub mod position;
pub mod protocol;
pub mod registry;
mod side;
mod tif;
pub mod transport;

// Re-export public API
pub use bridge::Bridge;
pub use config::Config;
pub use error::{Error, Result};
pub use execution::{CloseOutcome, Placement, TradeStatus};
pub use market::{AssetSnapshot, AssetSpec};
pub use order::{Order, OrderKind, OrderStatus};
pub use position::PositionBook;
pub use protocol::{AccountReport, Bar, PositionReport, PriceQuote};
pub use registry::OrderRegistry;
pub use side::Side;
pub use tif::TimeInForce;
pub use transport::Transport;
