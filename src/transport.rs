//! Blocking TCP session to the order-management application.
//!
//! One command out, one response back, newline-terminated in both
//! directions. The transport owns no parsing; it hands response lines to
//! the protocol codec untouched. A failed send or receive marks the session
//! disconnected and every later command fails fast until the caller
//! reconnects explicitly.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::{Error, Result};

pub struct Transport {
    stream: Option<TcpStream>,
    reader: Option<BufReader<TcpStream>>,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    pub fn new() -> Self {
        Self {
            stream: None,
            reader: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Open the session and verify it with a PING/PONG handshake.
    /// Anything but an exact `PONG` abandons the connection.
    pub fn connect(&mut self, address: &str, timeout: Duration) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        info!("Connecting to {address}...");
        let stream = TcpStream::connect(address)
            .map_err(|e| Error::Transport(format!("failed to connect to {address}: {e}")))?;
        stream
            .set_read_timeout(Some(timeout))
            .and_then(|()| stream.set_write_timeout(Some(timeout)))
            .map_err(|e| Error::Transport(format!("failed to set socket timeout: {e}")))?;

        let reader_stream = stream
            .try_clone()
            .map_err(|e| Error::Transport(format!("failed to clone socket: {e}")))?;
        self.reader = Some(BufReader::new(reader_stream));
        self.stream = Some(stream);

        match self.send_command("PING") {
            Ok(ref pong) if pong == "PONG" => {
                debug!("Handshake ok");
                Ok(())
            }
            Ok(other) => {
                warn!("Handshake failed: expected PONG, got '{other}'");
                self.disconnect();
                Err(Error::Transport(format!("bad handshake response: {other}")))
            }
            Err(e) => {
                self.disconnect();
                Err(e)
            }
        }
    }

    pub fn disconnect(&mut self) {
        self.stream = None;
        self.reader = None;
    }

    /// Send one command line and read back one response line (newline
    /// stripped). On any socket failure the session is marked disconnected.
    pub fn send_command(&mut self, command: &str) -> Result<String> {
        let (Some(stream), Some(reader)) = (self.stream.as_mut(), self.reader.as_mut()) else {
            return Err(Error::NotConnected);
        };

        match exchange(stream, reader, command) {
            Ok(line) => Ok(line),
            Err(e) => {
                self.disconnect();
                Err(e)
            }
        }
    }
}

fn exchange(
    stream: &mut TcpStream,
    reader: &mut BufReader<TcpStream>,
    command: &str,
) -> Result<String> {
    stream
        .write_all(command.as_bytes())
        .and_then(|()| stream.write_all(b"\n"))
        .and_then(|()| stream.flush())
        .map_err(|e| Error::Transport(format!("send failed: {e}")))?;

    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) => Err(Error::Transport("connection closed by peer".into())),
        Ok(_) => {
            while line.ends_with('\n') || line.ends_with('\r') {
                line.pop();
            }
            Ok(line)
        }
        Err(e) => Err(Error::Transport(format!("receive failed: {e}"))),
    }
}
