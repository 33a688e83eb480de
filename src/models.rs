// Copyright (c) 2025 Papertrade contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a ledger entry. BUY rows carry positive share counts,
/// SELL rows negative ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeKind {
    Buy,
    Sell,
}

impl TradeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeKind::Buy => "BUY",
            TradeKind::Sell => "SELL",
        }
    }

    pub fn parse(s: &str) -> Option<TradeKind> {
        match s {
            "BUY" => Some(TradeKind::Buy),
            "SELL" => Some(TradeKind::Sell),
            _ => None,
        }
    }
}

/// A user's current position in one symbol, derived from the ledger and
/// priced with a live quote. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub quantity: i64,
    pub price: Decimal,
    pub value: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioView {
    pub holdings: Vec<Holding>,
    pub cash: Decimal,
    pub total: Decimal,
}

/// Ledger row annotated for the history view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRow {
    pub symbol: String,
    pub shares: i64,
    pub price: Decimal,
    pub time: DateTime<Utc>,
    pub kind: TradeKind,
    pub transaction_price: Decimal,
}

/// Result of one accepted settlement (buy, sell, or deposit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub symbol: Option<String>,
    pub shares: i64,
    pub price: Decimal,
    pub amount: Decimal,
    pub cash_after: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
}
