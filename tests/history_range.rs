//! Historical-bar retrieval: range filtering, capacity, and ordering.

mod common;

use common::{fast_config, session_defaults, ScriptedServer};
use nanobridge::{Bar, Bridge};

/// 100 one-minute bars with whole-number day-fraction timestamps
/// 45000..45099, so range comparisons are exact.
fn hundred_bars() -> String {
    let mut response = "HISTORY:100".to_string();
    for i in 0..100 {
        let t = 45_000 + i;
        response.push_str(&format!("|{t},10,11,9,10.5,{}", 100 + i));
    }
    response
}

fn connect(server: &ScriptedServer) -> Bridge {
    let mut bridge = Bridge::new(fast_config(server.address()));
    bridge.login("Sim101").expect("login");
    bridge
}

fn history_server() -> ScriptedServer {
    ScriptedServer::start(|req| {
        if let Some(resp) = session_defaults(req) {
            return resp;
        }
        if req.starts_with("GETHISTORY:ES:") {
            return hundred_bars();
        }
        "ERROR:Unexpected".into()
    })
}

#[test]
fn range_filter_keeps_inclusive_window() {
    let server = history_server();
    let mut bridge = connect(&server);

    // Window [45040, 45060] covers 21 of the 100 returned bars.
    let mut out = vec![Bar::default(); 30];
    let count = bridge
        .fetch_history("ES", 45_040.0, 45_060.0, 1, &mut out)
        .unwrap();

    assert_eq!(count, 21);
    for bar in &out[..count] {
        assert!(bar.time >= 45_040.0 && bar.time <= 45_060.0);
    }
    // Order preserved as returned by the peer.
    for pair in out[..count].windows(2) {
        assert!(pair[0].time < pair[1].time);
    }
    assert_eq!(out[0].time, 45_040.0);
    assert_eq!(out[20].time, 45_060.0);
}

#[test]
fn capacity_caps_the_copy() {
    let server = history_server();
    let mut bridge = connect(&server);

    let mut out = vec![Bar::default(); 10];
    let count = bridge
        .fetch_history("ES", 45_040.0, 45_060.0, 1, &mut out)
        .unwrap();

    assert_eq!(count, 10);
    assert_eq!(out[9].time, 45_049.0);
}

#[test]
fn request_carries_range_and_capacity() {
    let server = history_server();
    let mut bridge = connect(&server);

    let mut out = vec![Bar::default(); 30];
    bridge
        .fetch_history("ES", 45_040.0, 45_060.0, 1, &mut out)
        .unwrap();

    assert!(server
        .requests()
        .iter()
        .any(|r| r == "GETHISTORY:ES:45040.00000000:45060.00000000:1:30"));
}

#[test]
fn fields_survive_the_round_trip() {
    let server = history_server();
    let mut bridge = connect(&server);

    let mut out = vec![Bar::default(); 5];
    let count = bridge
        .fetch_history("ES", 45_000.0, 45_004.0, 1, &mut out)
        .unwrap();

    assert_eq!(count, 5);
    assert_eq!(out[0].open, 10.0);
    assert_eq!(out[0].high, 11.0);
    assert_eq!(out[0].low, 9.0);
    assert_eq!(out[0].close, 10.5);
    assert_eq!(out[0].volume, 100.0);
    assert_eq!(out[4].volume, 104.0);
}

#[test]
fn error_response_fails_the_call() {
    let server = ScriptedServer::start(|req| {
        session_defaults(req).unwrap_or_else(|| "ERROR:Instrument not found".into())
    });
    let mut bridge = connect(&server);

    let mut out = vec![Bar::default(); 10];
    assert!(bridge
        .fetch_history("XX", 45_000.0, 45_010.0, 1, &mut out)
        .is_err());
}

#[test]
fn empty_history_writes_nothing() {
    let server = ScriptedServer::start(|req| {
        if let Some(resp) = session_defaults(req) {
            return resp;
        }
        "HISTORY:0".into()
    });
    let mut bridge = connect(&server);

    let mut out = vec![Bar::default(); 10];
    let count = bridge
        .fetch_history("ES", 45_000.0, 45_010.0, 1, &mut out)
        .unwrap();
    assert_eq!(count, 0);
}
