// Copyright (c) 2025 Papertrade contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{AppError, AppResult};
use rust_decimal::Decimal;

const UA: &str = concat!("papertrade/", env!("CARGO_PKG_VERSION"));

pub fn http_client() -> anyhow::Result<reqwest::Client> {
    let c = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .user_agent(UA)
        .build()?;
    Ok(c)
}

/// Parse a currency amount from a form field.
pub fn parse_amount(s: &str) -> AppResult<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .map_err(|_| AppError::Validation(format!("Invalid amount '{}'", s.trim())))
}

/// Parse a whole-share count from a form field. Fractional or non-numeric
/// input is a validation error; the 1-or-greater rule is enforced at
/// settlement.
pub fn parse_shares(s: &str) -> AppResult<i64> {
    s.trim()
        .parse::<i64>()
        .map_err(|_| AppError::Validation(format!("Invalid share count '{}'", s.trim())))
}
