//! C-ABI entry points the host loads by name.
//!
//! This is the only module that knows about raw pointers, sentinel return
//! codes, and the process-wide singleton the dynamic-module contract
//! forces. Everything else stays ordinary owned Rust: each entry point
//! locks the singleton for the duration of the call, translates arguments,
//! and maps `Result`s onto the documented sentinels. No panic crosses the
//! boundary.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, OnceLock};

use log::error;

use crate::bridge::Bridge;
use crate::config::Config;
use crate::execution::CloseOutcome;
use crate::logging::{self, MessageFn, ProgressFn};
use crate::protocol::Bar;
use crate::TimeInForce;

/// Name reported to the host (32-byte buffer on their side).
pub const PLUGIN_NAME: &str = "NanoBridge";

/// Interface version implemented by this module.
pub const PLUGIN_VERSION: c_int = 2;

/// Sentinel for "no data available" returns.
pub const NAY: c_int = -999_999;

// Host command codes handled by BrokerCommand.
pub const GET_COMPLIANCE: c_int = 327;
pub const GET_MAXTICKS: c_int = 328;
pub const GET_MAXREQUESTS: c_int = 329;
pub const GET_POSITION: c_int = 331;
pub const GET_WAIT: c_int = 345;
pub const GET_BROKERZONE: c_int = 348;
pub const GET_AVGENTRY: c_int = 358;
pub const GET_DIAGNOSTICS: c_int = 359;
pub const SET_WAIT: c_int = 395;
pub const SET_SYMBOL: c_int = 397;
pub const SET_DIAGNOSTICS: c_int = 406;
pub const SET_ORDERTYPE: c_int = 408;
pub const DO_CANCEL: c_int = 421;

/// Historical bar record in the host's buffer layout (4-byte packing,
/// day-fraction timestamp followed by six floats).
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct HostBar {
    pub time: f64,
    pub high: f32,
    pub low: f32,
    pub open: f32,
    pub close: f32,
    pub value: f32,
    pub volume: f32,
}

impl From<Bar> for HostBar {
    fn from(bar: Bar) -> Self {
        Self {
            time: bar.time,
            high: bar.high as f32,
            low: bar.low as f32,
            open: bar.open as f32,
            close: bar.close as f32,
            value: 0.0,
            volume: bar.volume as f32,
        }
    }
}

static BRIDGE: OnceLock<Mutex<Bridge>> = OnceLock::new();

fn bridge() -> &'static Mutex<Bridge> {
    BRIDGE.get_or_init(|| {
        let config = Config::load_or_default().unwrap_or_else(|e| {
            error!("Config load failed, using defaults: {e}");
            Config::default()
        });
        Mutex::new(Bridge::new(config))
    })
}

fn with_bridge<R>(f: impl FnOnce(&mut Bridge) -> R) -> R {
    let mut guard = bridge().lock().unwrap_or_else(|e| e.into_inner());
    f(&mut guard)
}

/// Run an entry-point body, turning any panic into the failure sentinel.
fn guarded<R>(default: R, f: impl FnOnce() -> R) -> R {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        error!("Internal error in entry point");
        default
    })
}

/// # Safety
/// `ptr` must be null or a valid NUL-terminated string.
unsafe fn str_arg(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

unsafe fn write_f64(ptr: *mut f64, value: f64) {
    if !ptr.is_null() {
        unsafe { *ptr = value };
    }
}

unsafe fn write_i32(ptr: *mut c_int, value: c_int) {
    if !ptr.is_null() {
        unsafe { *ptr = value };
    }
}

/// Copy a string into a host-owned buffer of `cap` bytes, NUL-terminated.
unsafe fn write_str(ptr: *mut c_char, cap: usize, value: &str) {
    if ptr.is_null() || cap == 0 {
        return;
    }
    let bytes = value.as_bytes();
    let n = bytes.len().min(cap - 1);
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr() as *const c_char, ptr, n);
        *ptr.add(n) = 0;
    }
}

/// Module initialization: store callbacks, install the log route, report
/// name and version. Idempotent.
///
/// # Safety
/// `name` must be null or point at a writable 32-byte buffer.
#[no_mangle]
pub unsafe extern "C" fn BrokerOpen(
    name: *mut c_char,
    fp_message: Option<MessageFn>,
    fp_progress: Option<ProgressFn>,
) -> c_int {
    logging::set_callbacks(fp_message, fp_progress);
    logging::install();
    unsafe { write_str(name, 32, PLUGIN_NAME) };
    let _ = bridge();
    log::info!("{PLUGIN_NAME} initialized");
    PLUGIN_VERSION
}

/// Connect and authenticate; an empty or null user logs out instead.
///
/// # Safety
/// String arguments must be null or valid NUL-terminated strings;
/// `accounts` must be null or point at a writable 1024-byte buffer.
#[no_mangle]
pub unsafe extern "C" fn BrokerLogin(
    user: *const c_char,
    _pwd: *const c_char,
    _type: *const c_char,
    accounts: *mut c_char,
) -> c_int {
    guarded(0, || {
        let user = unsafe { str_arg(user) }.unwrap_or_default();
        if user.is_empty() {
            with_bridge(|b| b.logout());
            return 0;
        }
        match with_bridge(|b| b.login(&user)) {
            Ok(()) => {
                unsafe { write_str(accounts, 1024, &user) };
                1
            }
            Err(e) => {
                error!("Login failed: {e}");
                0
            }
        }
    })
}

/// Alive check. Returns 2 when the session is up, 0 when it is down.
///
/// # Safety
/// `time_utc` must be null or a valid `f64` pointer.
#[no_mangle]
pub unsafe extern "C" fn BrokerTime(time_utc: *mut f64) -> c_int {
    guarded(0, || match with_bridge(|b| b.heartbeat_time()) {
        Ok(now) => {
            unsafe { write_f64(time_utc, now) };
            2
        }
        Err(e) => {
            error!("Heartbeat failed: {e}");
            0
        }
    })
}

/// Subscribe to an instrument (null `price` pointer) or fetch its current
/// quote and contract specs.
///
/// # Safety
/// `asset` must be a valid NUL-terminated string; the out-pointers must be
/// null or valid `f64` pointers.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn BrokerAsset(
    asset: *const c_char,
    price: *mut f64,
    spread: *mut f64,
    volume: *mut f64,
    pip: *mut f64,
    pip_cost: *mut f64,
    lot_amount: *mut f64,
    margin: *mut f64,
    _roll_long: *mut f64,
    _roll_short: *mut f64,
    _commission: *mut f64,
) -> c_int {
    guarded(0, || {
        let Some(instrument) = (unsafe { str_arg(asset) }) else {
            return 0;
        };

        if price.is_null() {
            return match with_bridge(|b| b.subscribe(&instrument)) {
                Ok(()) => 1,
                Err(e) => {
                    error!("Subscribe to {instrument} failed: {e}");
                    0
                }
            };
        }

        match with_bridge(|b| b.asset_snapshot(&instrument)) {
            Ok(snapshot) => {
                unsafe {
                    write_f64(price, snapshot.price);
                    write_f64(spread, snapshot.spread);
                    write_f64(volume, snapshot.volume);
                    write_f64(pip, snapshot.tick_size);
                    write_f64(pip_cost, snapshot.point_value);
                    write_f64(lot_amount, 1.0);
                    write_f64(margin, 0.0);
                }
                (snapshot.price > 0.0) as c_int
            }
            Err(e) => {
                error!("Quote for {instrument} failed: {e}");
                0
            }
        }
    })
}

/// Account values: balance, unrealized P&L, available margin.
///
/// # Safety
/// Pointer arguments must be null or valid.
#[no_mangle]
pub unsafe extern "C" fn BrokerAccount(
    _account: *const c_char,
    balance: *mut f64,
    trade_val: *mut f64,
    margin_val: *mut f64,
) -> c_int {
    guarded(0, || match with_bridge(|b| b.account_snapshot()) {
        Ok(report) => {
            unsafe {
                write_f64(balance, report.cash);
                write_f64(trade_val, report.unrealized_pnl);
                write_f64(margin_val, report.buying_power);
            }
            1
        }
        Err(e) => {
            error!("Account query failed: {e}");
            0
        }
    })
}

/// Place an order. Returns the signed local id: positive when the fill was
/// observed before returning, negative while the order is still working,
/// 0 on failure.
///
/// # Safety
/// `asset` must be a valid NUL-terminated string; out-pointers null or valid.
#[no_mangle]
pub unsafe extern "C" fn BrokerBuy2(
    asset: *const c_char,
    amount: c_int,
    stop_dist: f64,
    limit: f64,
    price: *mut f64,
    fill: *mut c_int,
) -> c_int {
    guarded(0, || {
        let Some(instrument) = (unsafe { str_arg(asset) }) else {
            return 0;
        };
        match with_bridge(|b| b.place_order(&instrument, amount, stop_dist, limit)) {
            Ok(placement) => {
                if placement.filled > 0 {
                    unsafe {
                        write_f64(price, placement.fill_price);
                        write_i32(fill, placement.filled);
                    }
                }
                placement.signed_id
            }
            Err(e) => {
                error!("Order placement failed: {e}");
                0
            }
        }
    })
}

/// Query a trade. Returns the filled quantity, or NAY when the order is
/// unknown, cancelled, or rejected.
///
/// # Safety
/// Pointer arguments must be null or valid.
#[no_mangle]
pub unsafe extern "C" fn BrokerTrade(
    trade_id: c_int,
    open: *mut f64,
    close: *mut f64,
    _cost: *mut f64,
    profit: *mut f64,
) -> c_int {
    guarded(NAY, || match with_bridge(|b| b.trade_status(trade_id)) {
        Ok(Some(status)) => {
            unsafe {
                if status.open_price > 0.0 {
                    write_f64(open, status.open_price);
                }
                if status.close_price > 0.0 {
                    write_f64(close, status.close_price);
                }
                write_f64(profit, status.profit);
            }
            status.filled
        }
        Ok(None) => NAY,
        Err(e) => {
            error!("Trade query failed: {e}");
            NAY
        }
    })
}

/// Close or cancel a trade. Returns the id as passed on success, 0 on
/// failure. A still-pending order is cancelled; a filled one is opposed.
///
/// # Safety
/// Pointer arguments must be null or valid.
#[no_mangle]
pub unsafe extern "C" fn BrokerSell2(
    trade_id: c_int,
    amount: c_int,
    limit: f64,
    close: *mut f64,
    _cost: *mut f64,
    profit: *mut f64,
    fill: *mut c_int,
) -> c_int {
    guarded(0, || {
        match with_bridge(|b| b.close_trade(trade_id, amount, limit)) {
            Ok(CloseOutcome::Closed {
                close_price,
                profit: realized,
                filled,
            }) => {
                unsafe {
                    write_f64(close, close_price);
                    write_f64(profit, realized);
                    write_i32(fill, filled);
                }
                trade_id
            }
            Ok(CloseOutcome::Cancelled | CloseOutcome::Pending) => trade_id,
            Err(e) => {
                error!("Close of trade {trade_id} failed: {e}");
                0
            }
        }
    })
}

/// Extended command interface. Unknown codes return 0.
///
/// # Safety
/// For codes that take a string, `parameter` must be a valid NUL-terminated
/// string pointer.
#[no_mangle]
pub unsafe extern "C" fn BrokerCommand(command: c_int, parameter: usize) -> f64 {
    guarded(0.0, || match command {
        GET_COMPLIANCE => 2.0,
        GET_BROKERZONE => with_bridge(|b| b.config().host.broker_zone_hours as f64),
        GET_MAXTICKS => with_bridge(|b| b.config().history.max_bars_per_request as f64),
        GET_MAXREQUESTS => with_bridge(|b| b.config().host.max_requests_per_sec as f64),
        GET_WAIT => with_bridge(|b| b.config().host.poll_wait_ms as f64),
        SET_WAIT => {
            with_bridge(|b| b.config_mut().host.poll_wait_ms = parameter as u32);
            1.0
        }
        GET_POSITION => {
            let Some(symbol) = (unsafe { str_arg(parameter as *const c_char) }) else {
                return 0.0;
            };
            with_bridge(|b| {
                if b.is_connected() {
                    b.cached_position(&symbol).abs() as f64
                } else {
                    0.0
                }
            })
        }
        GET_AVGENTRY => {
            let Some(symbol) = (unsafe { str_arg(parameter as *const c_char) }) else {
                return 0.0;
            };
            with_bridge(|b| {
                b.external_position(&symbol)
                    .map(|p| p.avg_price)
                    .unwrap_or(0.0)
            })
        }
        SET_SYMBOL => {
            let Some(symbol) = (unsafe { str_arg(parameter as *const c_char) }) else {
                return 0.0;
            };
            with_bridge(|b| b.set_current_symbol(&symbol));
            1.0
        }
        SET_ORDERTYPE => {
            with_bridge(|b| b.set_default_tif(TimeInForce::from_host_code(parameter as i32)));
            1.0
        }
        SET_DIAGNOSTICS => {
            logging::set_diag_level(parameter as u8);
            1.0
        }
        GET_DIAGNOSTICS => logging::diag_level() as f64,
        DO_CANCEL => match with_bridge(|b| b.cancel_order_local(parameter as i32)) {
            Ok(()) => 1.0,
            Err(e) => {
                error!("Cancel failed: {e}");
                0.0
            }
        },
        _ => 0.0,
    })
}

/// Fetch historical bars into the host's buffer. Returns the bar count
/// written, 0 on failure.
///
/// # Safety
/// `asset` must be a valid NUL-terminated string; `ticks` must point at a
/// writable array of at least `n_ticks` records.
#[no_mangle]
pub unsafe extern "C" fn BrokerHistory2(
    asset: *const c_char,
    t_start: f64,
    t_end: f64,
    bar_minutes: c_int,
    n_ticks: c_int,
    ticks: *mut HostBar,
) -> c_int {
    guarded(0, || {
        let Some(instrument) = (unsafe { str_arg(asset) }) else {
            return 0;
        };
        if ticks.is_null() || n_ticks <= 0 {
            return 0;
        }

        let mut bars = vec![Bar::default(); n_ticks as usize];
        let count = match with_bridge(|b| {
            b.fetch_history(&instrument, t_start, t_end, bar_minutes, &mut bars)
        }) {
            Ok(count) => count,
            Err(e) => {
                error!("History for {instrument} failed: {e}");
                return 0;
            }
        };

        for (i, bar) in bars[..count].iter().enumerate() {
            unsafe { ticks.add(i).write_unaligned(HostBar::from(*bar)) };
        }
        count as c_int
    })
}
