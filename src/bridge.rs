//! Bridge state and session management.
//!
//! One `Bridge` holds everything the module needs between entry-point
//! calls: the TCP session, the order registry, the position cache, contract
//! specs, and the session settings the host can change at runtime. The
//! host's calling thread is the only thread that ever touches it.

use std::time::Duration;

use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::clock;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::market::AssetSpec;
use crate::position::PositionBook;
use crate::protocol::{self, AccountReport, PositionReport};
use crate::registry::OrderRegistry;
use crate::transport::Transport;
use crate::{logging, TimeInForce};

pub struct Bridge {
    pub(crate) config: Config,
    pub(crate) transport: Transport,
    pub(crate) registry: OrderRegistry,
    pub(crate) positions: PositionBook,
    pub(crate) specs: FxHashMap<String, AssetSpec>,
    pub(crate) current_symbol: Option<String>,
    pub(crate) account: Option<String>,
    pub(crate) default_tif: TimeInForce,
    pub(crate) connected: bool,
}

impl Bridge {
    pub fn new(config: Config) -> Self {
        let history_cap = config.execution.order_history_cap;
        Self {
            config,
            transport: Transport::new(),
            registry: OrderRegistry::new(history_cap),
            positions: PositionBook::new(),
            specs: FxHashMap::default(),
            current_symbol: None,
            account: None,
            default_tif: TimeInForce::default(),
            connected: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connected && self.transport.is_connected()
    }

    pub(crate) fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    pub fn default_tif(&self) -> TimeInForce {
        self.default_tif
    }

    pub fn set_default_tif(&mut self, tif: TimeInForce) {
        self.default_tif = tif;
    }

    pub fn set_current_symbol(&mut self, symbol: &str) {
        self.current_symbol = Some(symbol.to_string());
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.config.connection.timeout_secs)
    }

    /// Connect (if needed) and authenticate the account session.
    pub fn login(&mut self, user: &str) -> Result<()> {
        if user.is_empty() {
            return Err(Error::Validation("empty account name".into()));
        }

        let address = self.config.address();
        self.transport.connect(&address, self.connect_timeout())?;

        let response = self.transport.send_command(&protocol::format_login(user))?;
        if response.contains("ERROR") {
            self.connected = false;
            return Err(Error::ErrorResponse(response));
        }

        self.account = Some(user.to_string());
        self.connected = true;
        info!("Connected to account {user} at {address}");

        // Best-effort protocol version probe.
        if let Ok(resp) = self.transport.send_command("VERSION") {
            if let Some(version) = protocol::parse_version(&resp) {
                debug!("Peer protocol version {version}");
            }
        }

        Ok(())
    }

    /// Tear the session down and reset trading state. Local id allocation
    /// stays monotonic across logins.
    pub fn logout(&mut self) {
        if self.transport.is_connected() {
            if let Some(symbol) = self.current_symbol.take() {
                let _ = self
                    .transport
                    .send_command(&protocol::format_unsubscribe(&symbol));
            }
            let _ = self.transport.send_command("LOGOUT");
        }
        self.transport.disconnect();
        self.registry.clear();
        self.positions.clear();
        self.specs.clear();
        self.current_symbol = None;
        self.account = None;
        self.default_tif = TimeInForce::default();
        self.connected = false;
        info!("Disconnected");
    }

    /// Alive check: ping the host's progress callback, verify the session,
    /// and return current UTC in the host's day-fraction convention.
    pub fn heartbeat_time(&mut self) -> Result<f64> {
        self.ensure_connected()?;
        logging::heartbeat(0);

        let response = self.transport.send_command("CONNECTED")?;
        if !protocol::parse_connected(&response) {
            self.connected = false;
            return Err(Error::ErrorResponse(response));
        }
        Ok(clock::now_day_fraction())
    }

    /// Fetch the account snapshot.
    pub fn account_snapshot(&mut self) -> Result<AccountReport> {
        self.ensure_connected()?;
        let response = self.transport.send_command("GETACCOUNT")?;
        protocol::parse_account(&response)
    }

    /// The external application's own view of a position (used for average
    /// entry price and as a close-quantity fallback).
    pub fn external_position(&mut self, instrument: &str) -> Result<PositionReport> {
        self.ensure_connected()?;
        let response = self
            .transport
            .send_command(&protocol::format_get_position(instrument))?;
        protocol::parse_position(&response)
    }

    /// Cached signed net position for the host's synchronous query.
    pub fn cached_position(&self, instrument: &str) -> i64 {
        self.positions.query(instrument)
    }

    /// Read access to a tracked order.
    pub fn order(&self, local_id: i32) -> Option<&crate::order::Order> {
        self.registry.get(local_id)
    }

    /// Number of orders currently tracked.
    pub fn tracked_orders(&self) -> usize {
        self.registry.len()
    }

    /// Number of tracked orders in a terminal state.
    pub fn terminal_orders(&self) -> usize {
        self.registry.terminal_count()
    }
}
