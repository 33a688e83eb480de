// Copyright (c) 2025 Papertrade contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Portfolio accounting over the append-only transaction ledger.
//!
//! Holdings and portfolio value are always derived by replaying the ledger;
//! nothing here is cached. Every settlement (buy, sell, deposit) runs inside
//! an immediate SQLite transaction so the read-validate-append-update
//! sequence commits or rolls back as one unit and concurrent settlements for
//! the same user serialize instead of losing updates.

use crate::error::{AppError, AppResult};
use crate::models::{HistoryRow, Holding, PortfolioView, Settlement, TradeKind};
use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Cash granted to a freshly registered user.
pub fn starting_cash() -> Decimal {
    Decimal::new(10_000, 0)
}

fn deposit_min() -> Decimal {
    Decimal::ONE
}

fn deposit_max() -> Decimal {
    Decimal::new(100_000, 0)
}

/// Canonical cent precision: truncate toward zero at two decimal places.
/// $0.999 settles as $0.99, never $1.00.
pub fn round_cents(d: Decimal) -> Decimal {
    d.trunc_with_scale(2)
}

fn read_cash(conn: &Connection, user_id: i64) -> AppResult<Decimal> {
    let raw: Option<String> = conn
        .query_row("SELECT cash FROM users WHERE id=?1", params![user_id], |r| {
            r.get(0)
        })
        .optional()?;
    let raw = raw.ok_or_else(|| AppError::NotFound(format!("No user with id {}", user_id)))?;
    let cash = Decimal::from_str_exact(&raw)
        .with_context(|| format!("Invalid stored cash '{}' for user {}", raw, user_id))?;
    Ok(cash)
}

fn write_cash(conn: &Connection, user_id: i64, cash: Decimal) -> AppResult<()> {
    conn.execute(
        "UPDATE users SET cash=?1 WHERE id=?2",
        params![cash.to_string(), user_id],
    )?;
    Ok(())
}

fn append_entry(
    conn: &Connection,
    user_id: i64,
    symbol: &str,
    shares: i64,
    price: Decimal,
    time: DateTime<Utc>,
    kind: TradeKind,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO transactions(user_id, symbol, shares, price, time, type)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user_id,
            symbol,
            shares,
            price.to_string(),
            time,
            kind.as_str()
        ],
    )?;
    Ok(())
}

/// Current cash balance, unrounded.
pub fn cash(conn: &Connection, user_id: i64) -> AppResult<Decimal> {
    read_cash(conn, user_id)
}

/// Symbols the user currently holds, with positive derived quantities.
/// Fully divested symbols (sum fell back to zero) drop out here.
pub fn holdings(conn: &Connection, user_id: i64) -> AppResult<Vec<(String, i64)>> {
    let mut stmt = conn.prepare_cached(
        "SELECT symbol, SUM(shares) AS qty FROM transactions
         WHERE user_id=?1 GROUP BY symbol HAVING SUM(shares) > 0 ORDER BY symbol",
    )?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?))
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn held_quantity(conn: &Connection, user_id: i64, symbol: &str) -> AppResult<i64> {
    let qty: i64 = conn.query_row(
        "SELECT COALESCE(SUM(shares), 0) FROM transactions WHERE user_id=?1 AND symbol=?2",
        params![user_id, symbol],
        |r| r.get(0),
    )?;
    Ok(qty)
}

/// Derive the full portfolio view: each held symbol priced with the supplied
/// quote map, values and cash cent-truncated, total = cash + sum of values.
/// Symbols missing from `prices` are valued at zero (the quote provider
/// could not resolve them right now).
pub fn portfolio(
    conn: &Connection,
    user_id: i64,
    prices: &HashMap<String, Decimal>,
) -> AppResult<PortfolioView> {
    let cash = round_cents(read_cash(conn, user_id)?);
    let mut out = Vec::new();
    let mut total = cash;
    for (symbol, quantity) in holdings(conn, user_id)? {
        let price = prices.get(&symbol).copied().unwrap_or(Decimal::ZERO);
        let price = round_cents(price);
        let value = round_cents(price * Decimal::from(quantity));
        total += value;
        out.push(Holding {
            symbol,
            quantity,
            price,
            value,
        });
    }
    Ok(PortfolioView {
        holdings: out,
        cash,
        total,
    })
}

/// Credit cash. Amounts below $1.00 or above $100,000.00 are rejected.
pub fn deposit(conn: &mut Connection, user_id: i64, amount: Decimal) -> AppResult<Settlement> {
    if amount < deposit_min() {
        return Err(AppError::Validation(
            "Deposit must be at least $1.00".into(),
        ));
    }
    if amount > deposit_max() {
        return Err(AppError::Validation(
            "Deposits are limited to $100,000.00 per transfer".into(),
        ));
    }
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let cash = read_cash(&tx, user_id)?;
    let cash_after = cash + amount;
    write_cash(&tx, user_id, cash_after)?;
    tx.commit()?;
    Ok(Settlement {
        symbol: None,
        shares: 0,
        price: Decimal::ZERO,
        amount,
        cash_after,
    })
}

/// Buy whole shares at the given execution price. Rejects non-positive share
/// counts and orders whose cent-truncated cost exceeds cash; no partial
/// fills. On success appends one positive BUY row and debits cash, as one
/// transaction.
pub fn buy(
    conn: &mut Connection,
    user_id: i64,
    symbol: &str,
    price: Decimal,
    shares: i64,
) -> AppResult<Settlement> {
    if shares < 1 {
        return Err(AppError::Validation(
            "Share count must be 1 or greater".into(),
        ));
    }
    let price = round_cents(price);
    let cost = round_cents(price * Decimal::from(shares));

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let cash = read_cash(&tx, user_id)?;
    if cost > cash {
        return Err(AppError::InsufficientFunds);
    }
    append_entry(&tx, user_id, symbol, shares, price, Utc::now(), TradeKind::Buy)?;
    let cash_after = cash - cost;
    write_cash(&tx, user_id, cash_after)?;
    tx.commit()?;

    Ok(Settlement {
        symbol: Some(symbol.to_string()),
        shares,
        price,
        amount: cost,
        cash_after,
    })
}

/// Sell whole shares at the given execution price. Validation is purely
/// against the derived holding: the symbol must be owned and the request must
/// not exceed the held quantity. Cash plays no part in accepting a sell. On
/// success appends one negative SELL row and credits the proceeds, as one
/// transaction.
pub fn sell(
    conn: &mut Connection,
    user_id: i64,
    symbol: &str,
    price: Decimal,
    shares: i64,
) -> AppResult<Settlement> {
    if shares < 1 {
        return Err(AppError::Validation(
            "Share count must be 1 or greater".into(),
        ));
    }
    let price = round_cents(price);
    let proceeds = round_cents(price * Decimal::from(shares));

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let cash = read_cash(&tx, user_id)?;
    let held = held_quantity(&tx, user_id, symbol)?;
    if held <= 0 {
        return Err(AppError::NotFound(format!("Stock {} not owned", symbol)));
    }
    if shares > held {
        return Err(AppError::InsufficientShares);
    }
    append_entry(
        &tx,
        user_id,
        symbol,
        -shares,
        price,
        Utc::now(),
        TradeKind::Sell,
    )?;
    let cash_after = cash + proceeds;
    write_cash(&tx, user_id, cash_after)?;
    tx.commit()?;

    Ok(Settlement {
        symbol: Some(symbol.to_string()),
        shares: -shares,
        price,
        amount: proceeds,
        cash_after,
    })
}

/// All of the user's ledger rows in execution order, each annotated with
/// `abs(shares) * price` cent-truncated.
pub fn history(conn: &Connection, user_id: i64) -> AppResult<Vec<HistoryRow>> {
    // Existence check so an unknown id is an error, not an empty history.
    read_cash(conn, user_id)?;

    let mut stmt = conn.prepare_cached(
        "SELECT symbol, shares, price, time, type FROM transactions
         WHERE user_id=?1 ORDER BY time, id",
    )?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, DateTime<Utc>>(3)?,
            r.get::<_, String>(4)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (symbol, shares, price_s, time, kind_s) = row?;
        let price = Decimal::from_str_exact(&price_s)
            .with_context(|| format!("Invalid stored price '{}' for {}", price_s, symbol))?;
        let kind = TradeKind::parse(&kind_s)
            .ok_or_else(|| anyhow!("Unknown transaction type '{}' for {}", kind_s, symbol))?;
        let transaction_price = round_cents(price * Decimal::from(shares.abs()));
        out.push(HistoryRow {
            symbol,
            shares,
            price,
            time,
            kind,
            transaction_price,
        });
    }
    Ok(out)
}
