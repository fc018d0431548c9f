#![allow(dead_code)] // each test binary uses a different subset of helpers

//! Scripted line-protocol server for integration tests.
//!
//! Plays the role of the order-management application: listens on an
//! ephemeral port, answers `PING` with `PONG` automatically, and hands
//! every other request line to a test-supplied responder. All requests are
//! recorded so tests can assert on exactly what went over the wire.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use nanobridge::Config;

pub struct ScriptedServer {
    address: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedServer {
    /// Start a server handling one connection. The responder sees every
    /// request line except `PING`.
    pub fn start<F>(mut responder: F) -> Self
    where
        F: FnMut(&str) -> String + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind scripted server");
        let address = listener.local_addr().unwrap().to_string();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);

        thread::spawn(move || {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let mut line = String::new();
            loop {
                line.clear();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    return;
                }
                let request = line.trim_end().to_string();
                log.lock().unwrap().push(request.clone());
                let response = if request == "PING" {
                    "PONG".to_string()
                } else {
                    responder(&request)
                };
                if writer
                    .write_all(format!("{response}\n").as_bytes())
                    .is_err()
                {
                    return;
                }
            }
        });

        Self { address, requests }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Responses every session needs, independent of the scenario under test.
pub fn session_defaults(request: &str) -> Option<String> {
    if request.starts_with("LOGIN:") {
        return Some("OK:LoggedIn".to_string());
    }
    match request {
        "VERSION" => Some("VERSION:1.0".to_string()),
        "CONNECTED" => Some("CONNECTED:1".to_string()),
        "LOGOUT" => Some("OK:Bye".to_string()),
        _ if request.starts_with("UNSUBSCRIBE:") => Some("OK:Unsubscribed".to_string()),
        _ => None,
    }
}

/// Config pointed at the scripted server, with millisecond poll intervals
/// so fill waits and reconciliation don't slow the suite down.
pub fn fast_config(address: &str) -> Config {
    let (host, port) = address.rsplit_once(':').expect("host:port address");
    let mut config = Config::default();
    config.connection.host = host.to_string();
    config.connection.port = port.parse().expect("numeric port");
    config.connection.timeout_secs = 5;
    config.execution.fill_poll_attempts = 5;
    config.execution.fill_poll_interval_ms = 1;
    config.execution.reconcile_attempts = 3;
    config.execution.reconcile_interval_ms = 1;
    config
}
