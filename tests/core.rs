//
// Copyright (c) 2023 ZettaScale Technology
//
// This program and the accompanying materials are made available under the
// terms of the Eclipse Public License 2.0 which is available at
// http://www.eclipse.org/legal/epl-2.0, or the Apache License, Version 2.0
// which is available at https://www.apache.org/licenses/LICENSE-2.0.
//
// SPDX-License-Identifier: EPL-2.0 OR Apache-2.0
//
// Contributors:
//   ZettaScale Zenoh Team, <zenoh@zettascale.tech>
//
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use zenoh_session_core::{
    ConsolidationMode, DataInfo, KeyExpr, QueryCallback, Reply, ReplyContext, Sample, Session,
    ALL_KINDS, DATA_INFO_TSTAMP, FLAG_FINAL,
};

fn context(query_id: u64, final_flag: bool, kind: u64) -> ReplyContext {
    ReplyContext {
        header_flags: if final_flag { FLAG_FINAL } else { 0 },
        query_id,
        replier_id: vec![0xAA],
        replier_kind: kind,
    }
}

fn ts(t: u64) -> DataInfo {
    DataInfo {
        flags: DATA_INFO_TSTAMP,
        timestamp: Some(zenoh_session_core::ReplyTimestamp::new(uhlc::NTP64(t), vec![])),
    }
}

/// Matches the teacher's `env_logger::init()` call in its own example
/// binaries (`z_pong.rs`), guarded so every test in this binary can call it
/// without tripping the "logger already set" panic.
fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        env_logger::init();
    });
}

fn new_session() -> Arc<Session> {
    init_logging();
    Session::new()
}

fn recorder() -> (QueryCallback, Arc<Mutex<Vec<Reply>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let log2 = log.clone();
    (Box::new(move |r| log2.lock().unwrap().push(r)), log)
}

fn keys_in_order(log: &[Reply]) -> Vec<String> {
    log.iter()
        .filter_map(|r| match r {
            Reply::Data(d) => Some(d.key_expr.clone()),
            Reply::Final => None,
        })
        .collect()
}

// S1 — NONE policy streaming.
#[test]
fn s1_none_policy_streams_every_partial_in_arrival_order() {
    let session = new_session();
    let (cb, log) = recorder();
    session
        .register_pending_query(7, "/**".into(), String::new(), ALL_KINDS, ConsolidationMode::None, cb)
        .unwrap();

    for key in ["/a", "/b", "/a"] {
        session.on_partial_reply(&context(7, false, 1), &KeyExpr::literal(key), b"p", &ts(1));
    }
    session.on_final_reply(&context(7, true, 1));

    let log = log.lock().unwrap();
    assert_eq!(keys_in_order(&log), vec!["/a", "/b", "/a"]);
    assert!(matches!(log[3], Reply::Final));
}

// S2 — LAZY supersession.
#[test]
fn s2_lazy_supersession_drops_the_stale_reply() {
    let session = new_session();
    let (cb, log) = recorder();
    session
        .register_pending_query(11, "/x".into(), String::new(), ALL_KINDS, ConsolidationMode::Lazy, cb)
        .unwrap();

    session.on_partial_reply(&context(11, false, 1), &KeyExpr::literal("/x"), b"t5", &ts(5));
    session.on_partial_reply(&context(11, false, 1), &KeyExpr::literal("/x"), b"t3", &ts(3));
    session.on_partial_reply(&context(11, false, 1), &KeyExpr::literal("/x"), b"t9", &ts(9));
    session.on_final_reply(&context(11, true, 1));

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 3);
    let payloads: Vec<_> = log
        .iter()
        .filter_map(|r| match r {
            Reply::Data(d) => Some(d.payload.clone()),
            Reply::Final => None,
        })
        .collect();
    assert_eq!(payloads, vec![b"t5".to_vec(), b"t9".to_vec()]);
    assert!(matches!(log[2], Reply::Final));
}

// S3 — FULL buffering.
#[test]
fn s3_full_buffers_until_final_then_drains_newest_per_key() {
    let session = new_session();
    let (cb, log) = recorder();
    session
        .register_pending_query(2, "/**".into(), String::new(), ALL_KINDS, ConsolidationMode::Full, cb)
        .unwrap();

    session.on_partial_reply(&context(2, false, 1), &KeyExpr::literal("/a"), b"P1", &ts(1));
    session.on_partial_reply(&context(2, false, 1), &KeyExpr::literal("/a"), b"P2", &ts(2));
    session.on_partial_reply(&context(2, false, 1), &KeyExpr::literal("/b"), b"P3", &ts(1));
    assert!(log.lock().unwrap().is_empty(), "FULL buffers, no callbacks before FINAL");

    session.on_final_reply(&context(2, true, 1));

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 3);
    let payloads: Vec<_> = log
        .iter()
        .filter_map(|r| match r {
            Reply::Data(d) => Some(d.payload.clone()),
            Reply::Final => None,
        })
        .collect();
    assert_eq!(payloads, vec![b"P2".to_vec(), b"P3".to_vec()]);
    assert!(matches!(log[2], Reply::Final));
}

// S4 — target-kind filter.
#[test]
fn s4_target_kind_filter_drops_non_matching_repliers_and_leaves_query_pending() {
    let session = new_session();
    let (cb, log) = recorder();
    session
        .register_pending_query(4, "/a".into(), String::new(), 0b010, ConsolidationMode::None, cb)
        .unwrap();

    session.on_partial_reply(&context(4, false, 0b001), &KeyExpr::literal("/a"), b"x", &ts(1));
    assert!(log.lock().unwrap().is_empty());
    // The query must still be pending: a later, matching reply still lands.
    session.on_partial_reply(&context(4, false, 0b010), &KeyExpr::literal("/a"), b"y", &ts(1));
    assert_eq!(log.lock().unwrap().len(), 1);
}

// S5 — equal timestamps under LAZY.
#[test]
fn s5_equal_timestamps_drop_the_second_arrival() {
    let session = new_session();
    let (cb, log) = recorder();
    session
        .register_pending_query(5, "/k".into(), String::new(), ALL_KINDS, ConsolidationMode::Lazy, cb)
        .unwrap();

    session.on_partial_reply(&context(5, false, 1), &KeyExpr::literal("/k"), b"first", &ts(7));
    session.on_partial_reply(&context(5, false, 1), &KeyExpr::literal("/k"), b"second", &ts(7));

    assert_eq!(log.lock().unwrap().len(), 1);
}

// S6 — duplicate registration.
#[test]
fn s6_duplicate_registration_is_rejected_and_the_original_survives() {
    let session = new_session();
    let (cb1, _log1) = recorder();
    let (cb2, _log2) = recorder();
    session
        .register_pending_query(1, "/a".into(), String::new(), ALL_KINDS, ConsolidationMode::None, cb1)
        .unwrap();
    let err = session
        .register_pending_query(1, "/a".into(), String::new(), ALL_KINDS, ConsolidationMode::None, cb2)
        .unwrap_err();
    assert_eq!(err, zenoh_session_core::SessionError::DuplicateQueryId { id: 1 });
}

// S7 — resource chain expansion.
#[test]
fn s7_resource_chain_expands_and_missing_id_errors() {
    let session = new_session();
    let id1 = session.declare_resource(true, KeyExpr::literal("/a"));
    let id2 = session.declare_resource(true, KeyExpr::with_id(id1, "/b"));

    let expanded = session
        .resolve_key_expr(true, &KeyExpr::with_id(id2, "/c"))
        .unwrap();
    assert_eq!(expanded, "/a/b/c");

    let err = session
        .resolve_key_expr(true, &KeyExpr::with_id(id2 + 1000, "/z"))
        .unwrap_err();
    assert_eq!(err, zenoh_session_core::SessionError::UnknownKeyExpr { id: id2 + 1000 });
}

// S8 — subscription coverage dedup.
#[test]
fn s8_covered_subscription_registration_is_rejected() {
    let session = new_session();
    let cb: zenoh_session_core::SubCallback = Arc::new(|_: &Sample| {});

    let first = session.register_subscription(true, "/a/**", cb.clone(), None);
    assert!(first.is_some());

    let second = session.register_subscription(true, "/a/b", cb, None);
    assert!(second.is_none());
}

// S9 — dropper fires on every removal path (the REDESIGN FLAG).
#[test]
fn s9_dropper_fires_on_unregister_and_on_flush() {
    let session = new_session();
    let dropped = Arc::new(AtomicUsize::new(0));
    let cb: zenoh_session_core::SubCallback = Arc::new(|_: &Sample| {});

    let d1 = dropped.clone();
    let id1 = session
        .register_subscription(true, "/a", cb.clone(), Some(Box::new(move || {
            d1.fetch_add(1, Ordering::SeqCst);
        })))
        .unwrap();

    let d2 = dropped.clone();
    session
        .register_subscription(true, "/b", cb, Some(Box::new(move || {
            d2.fetch_add(1, Ordering::SeqCst);
        })))
        .unwrap();

    session.unregister_subscription(true, id1);
    assert_eq!(dropped.load(Ordering::SeqCst), 1);

    session.flush();
    assert_eq!(dropped.load(Ordering::SeqCst), 2);
}

// S10 — abandonment leaks nothing.
#[test]
fn s10_unregister_without_final_never_calls_back() {
    let session = new_session();
    let (cb, log) = recorder();
    session
        .register_pending_query(9, "/**".into(), String::new(), ALL_KINDS, ConsolidationMode::Full, cb)
        .unwrap();

    session.on_partial_reply(&context(9, false, 1), &KeyExpr::literal("/a"), b"x", &ts(1));
    session.on_partial_reply(&context(9, false, 1), &KeyExpr::literal("/b"), b"y", &ts(1));

    session.unregister_pending_query(9);
    assert!(log.lock().unwrap().is_empty());

    // A reply arriving after abandonment finds no pending query; it's
    // logged and dropped, not delivered.
    session.on_final_reply(&context(9, true, 1));
    assert!(log.lock().unwrap().is_empty());
}

// Invariant 3 / dispatch: a published sample reaches every subscription
// whose key expression intersects it, expanded through the resource table.
#[test]
fn dispatch_sample_reaches_intersecting_subscribers_after_resource_expansion() {
    let session = new_session();
    let received = Arc::new(Mutex::new(Vec::new()));
    let received2 = received.clone();
    let cb: zenoh_session_core::SubCallback = Arc::new(move |s: &Sample| {
        received2.lock().unwrap().push(s.key_expr.clone());
    });
    session.register_subscription(true, "/a/**", cb, None);

    let base = session.declare_resource(true, KeyExpr::literal("/a"));
    session
        .dispatch_sample(&KeyExpr::with_id(base, "/b"), b"hello".to_vec(), 0, 0, None, None)
        .unwrap();

    assert_eq!(received.lock().unwrap().as_slice(), ["/a/b"]);
}

#[test]
fn dispatch_sample_with_unknown_resource_id_is_an_error() {
    let session = new_session();
    let err = session
        .dispatch_sample(&KeyExpr::with_id(999, "/x"), Vec::new(), 0, 0, None, None)
        .unwrap_err();
    assert_eq!(err, zenoh_session_core::SessionError::UnknownKeyExpr { id: 999 });
}

// dispatch_sample must name the actual broken link in the id chain, not the
// top-level id the caller passed in, matching resolve_key_expr's behavior
// for the identical underlying failure.
#[test]
fn dispatch_sample_names_the_real_broken_id_in_a_chain() {
    let session = new_session();
    let broken = session.declare_resource(true, KeyExpr::with_id(99, "/b"));
    let err = session
        .dispatch_sample(&KeyExpr::with_id(broken, "/c"), Vec::new(), 0, 0, None, None)
        .unwrap_err();
    assert_eq!(err, zenoh_session_core::SessionError::UnknownKeyExpr { id: 99 });
}
