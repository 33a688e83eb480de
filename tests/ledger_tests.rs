// Copyright (c) 2025 Papertrade contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use papertrade::{auth, db, ledger};
use rust_decimal::Decimal;
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[test]
fn settlement_lifecycle_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("papertrade.sqlite");

    let mut conn = db::open_or_init_at(&path).unwrap();
    let uid = auth::register(&conn, "alice", "pw1", "pw1").unwrap();
    assert_eq!(ledger::cash(&conn, uid).unwrap(), dec("10000"));

    ledger::buy(&mut conn, uid, "AAPL", dec("190.00"), 10).unwrap();
    drop(conn);

    let mut conn = db::open_or_init_at(&path).unwrap();
    assert_eq!(ledger::cash(&conn, uid).unwrap(), dec("8100.00"));
    assert_eq!(
        ledger::holdings(&conn, uid).unwrap(),
        vec![("AAPL".to_string(), 10)]
    );

    ledger::sell(&mut conn, uid, "AAPL", dec("200.00"), 4).unwrap();
    assert_eq!(ledger::cash(&conn, uid).unwrap(), dec("8900.00"));
    assert_eq!(
        ledger::holdings(&conn, uid).unwrap(),
        vec![("AAPL".to_string(), 6)]
    );

    let rows = ledger::history(&conn, uid).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].shares, 10);
    assert_eq!(rows[0].transaction_price, dec("1900.00"));
    assert_eq!(rows[1].shares, -4);
    assert_eq!(rows[1].transaction_price, dec("800.00"));
}

#[test]
fn ledger_isolates_users() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("papertrade.sqlite");
    let mut conn = db::open_or_init_at(&path).unwrap();

    let alice = auth::register(&conn, "alice", "pw1", "pw1").unwrap();
    let bob = auth::register(&conn, "bob", "pw2", "pw2").unwrap();

    ledger::buy(&mut conn, alice, "AAPL", dec("10"), 5).unwrap();
    assert!(ledger::holdings(&conn, bob).unwrap().is_empty());
    assert_eq!(ledger::cash(&conn, bob).unwrap(), dec("10000"));

    // Bob cannot sell Alice's shares.
    let err = ledger::sell(&mut conn, bob, "AAPL", dec("10"), 1).unwrap_err();
    assert!(matches!(err, papertrade::error::AppError::NotFound(_)));
}

#[test]
fn concurrent_deposits_never_lose_an_update() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("papertrade.sqlite");

    let conn = db::open_or_init_at(&path).unwrap();
    let uid = auth::register(&conn, "alice", "pw1", "pw1").unwrap();
    drop(conn);

    let mut handles = Vec::new();
    for _ in 0..2 {
        let path = path.clone();
        handles.push(std::thread::spawn(move || {
            let mut conn = db::open_or_init_at(&path).unwrap();
            for _ in 0..10 {
                ledger::deposit(&mut conn, uid, Decimal::from(10)).unwrap();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let conn = db::open_or_init_at(&path).unwrap();
    // 10000 starting + 2 threads x 10 deposits x $10.
    assert_eq!(ledger::cash(&conn, uid).unwrap(), dec("10200"));
}

#[test]
fn concurrent_buys_respect_the_cash_limit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("papertrade.sqlite");

    let conn = db::open_or_init_at(&path).unwrap();
    let uid = auth::register(&conn, "alice", "pw1", "pw1").unwrap();
    drop(conn);

    // 10000 cash, each buy costs 3000: at most 3 of the 6 attempts can land.
    let mut handles = Vec::new();
    for _ in 0..2 {
        let path = path.clone();
        handles.push(std::thread::spawn(move || {
            let mut conn = db::open_or_init_at(&path).unwrap();
            let mut accepted: i64 = 0;
            for _ in 0..3 {
                match ledger::buy(&mut conn, uid, "AAPL", dec("300"), 10) {
                    Ok(_) => accepted += 1,
                    Err(papertrade::error::AppError::InsufficientFunds) => {}
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
            accepted
        }));
    }
    let accepted: i64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(accepted, 3);

    let conn = db::open_or_init_at(&path).unwrap();
    assert_eq!(ledger::cash(&conn, uid).unwrap(), dec("1000.00"));
    assert_eq!(
        ledger::holdings(&conn, uid).unwrap(),
        vec![("AAPL".to_string(), 30)]
    );
}
