// Copyright (c) 2025 Papertrade contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::round_cents;
use crate::models::Quote;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;

static SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z.\-]{0,9}$").expect("static symbol regex"));

const QUOTE_URL: &str = "https://query1.finance.yahoo.com/v7/finance/quote";

#[derive(Debug, Deserialize)]
struct YahooResponse {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteResponse,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    result: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    symbol: Option<String>,
    #[serde(rename = "shortName")]
    short_name: Option<String>,
    #[serde(rename = "longName")]
    long_name: Option<String>,
}

/// Look up the current quote for a ticker. Any failure along the way
/// (malformed symbol, network error, non-2xx, missing price) collapses to
/// `None`: the caller treats every one of those as "unknown symbol".
pub async fn lookup(client: &reqwest::Client, symbol: &str) -> Option<Quote> {
    let symbol = symbol.trim().to_uppercase();
    if !SYMBOL_RE.is_match(&symbol) {
        return None;
    }

    let url = format!("{}?symbols={}", QUOTE_URL, symbol);
    let resp = match client.get(&url).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!("Quote request for {} failed: {}", symbol, e);
            return None;
        }
    };
    let resp = match resp.error_for_status() {
        Ok(r) => r,
        Err(e) => {
            warn!("Quote provider rejected {}: {}", symbol, e);
            return None;
        }
    };
    let yr: YahooResponse = match resp.json().await {
        Ok(v) => v,
        Err(e) => {
            warn!("Unparseable quote response for {}: {}", symbol, e);
            return None;
        }
    };

    let q = yr.quote_response.result.into_iter().next()?;
    let price = Decimal::from_f64_retain(q.regular_market_price?)?;
    let symbol = q.symbol.unwrap_or(symbol);
    let name = q.short_name.or(q.long_name).unwrap_or_else(|| symbol.clone());
    Some(Quote {
        symbol,
        name,
        price: round_cents(price),
    })
}
