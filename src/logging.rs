//! Log routing to the host's message callback.
//!
//! The host process owns the only visible log sink: a message callback it
//! hands over at module initialization. This module stores that callback
//! (plus the progress callback used for alive checks and user aborts) and
//! installs a [`log::Log`] implementation that forwards records to it, so
//! the rest of the crate logs through the ordinary `log` macros.
//!
//! Host rendering conventions: a leading `!` marks an alert, a leading `# `
//! keeps the message in the log window only.

use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

use log::{Level, LevelFilter, Metadata, Record};

/// Message callback supplied by the host. Returns nonzero on success.
pub type MessageFn = unsafe extern "C" fn(text: *const c_char) -> c_int;

/// Progress callback supplied by the host. A zero return requests abort.
pub type ProgressFn = unsafe extern "C" fn(progress: c_int) -> c_int;

#[derive(Clone, Copy, Default)]
struct HostCallbacks {
    message: Option<MessageFn>,
    progress: Option<ProgressFn>,
}

static CALLBACKS: Mutex<HostCallbacks> = Mutex::new(HostCallbacks {
    message: None,
    progress: None,
});

/// Diagnostic level: 0 = errors only, 1 = + info, 2 = + debug.
static DIAG_LEVEL: AtomicU8 = AtomicU8::new(0);

pub fn set_diag_level(level: u8) {
    DIAG_LEVEL.store(level.min(2), Ordering::Relaxed);
}

pub fn diag_level() -> u8 {
    DIAG_LEVEL.load(Ordering::Relaxed)
}

/// Store the host callbacks. Passing `None` clears a callback.
pub fn set_callbacks(message: Option<MessageFn>, progress: Option<ProgressFn>) {
    let mut cb = CALLBACKS.lock().unwrap_or_else(|e| e.into_inner());
    cb.message = message;
    cb.progress = progress;
}

/// Invoke the host progress callback. Returns false if the host requested
/// an abort (callback returned 0). With no callback stored, never aborts.
pub fn heartbeat(progress: i32) -> bool {
    let cb = CALLBACKS.lock().unwrap_or_else(|e| e.into_inner()).progress;
    match cb {
        Some(f) => unsafe { f(progress) != 0 },
        None => true,
    }
}

fn forward(text: &str) {
    let cb = CALLBACKS.lock().unwrap_or_else(|e| e.into_inner()).message;
    if let Some(f) = cb {
        if let Ok(c) = CString::new(text) {
            unsafe {
                f(c.as_ptr());
            }
        }
    }
}

struct HostLogger;

static HOST_LOGGER: HostLogger = HostLogger;

impl log::Log for HostLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match metadata.level() {
            Level::Error => true,
            Level::Warn | Level::Info => diag_level() >= 1,
            Level::Debug | Level::Trace => diag_level() >= 2,
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let text = match record.level() {
            Level::Error => format!("!{}", record.args()),
            _ => format!("# {}", record.args()),
        };
        forward(&text);
    }

    fn flush(&self) {}
}

/// Install the host logger. Idempotent: a second call (or a logger already
/// installed by the embedding process) is silently accepted.
pub fn install() {
    if log::set_logger(&HOST_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Trace);
    }
}
