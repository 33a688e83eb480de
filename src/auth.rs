// Copyright (c) 2025 Papertrade contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Credentials and sessions. Passwords are stored as PBKDF2-HMAC-SHA256
//! (random salt, encoded `pbkdf2-sha256$iterations$salt$dk`); session tokens
//! are `uid.exp.sig` with an HMAC-SHA256 signature over the first two fields.

use crate::error::{AppError, AppResult};
use crate::ledger;
use anyhow::anyhow;
use base64::prelude::{Engine as _, BASE64_STANDARD, BASE64_URL_SAFE_NO_PAD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::warn;
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const PBKDF2_SCHEME: &str = "pbkdf2-sha256";
const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;

/// Session lifetime: 24 hours.
pub const SESSION_TTL_SECS: i64 = 86_400;

fn pbkdf2_sha256(password: &[u8], salt: &[u8], iterations: u32) -> AppResult<[u8; 32]> {
    // Single-block PBKDF2: the derived key length equals the hash length.
    let mut mac = HmacSha256::new_from_slice(password)
        .map_err(|e| anyhow!("invalid HMAC key: {}", e))?;
    mac.update(salt);
    mac.update(&1u32.to_be_bytes());
    let mut u = mac.finalize().into_bytes();

    let mut dk = [0u8; 32];
    dk.copy_from_slice(&u);
    for _ in 1..iterations {
        let mut mac = HmacSha256::new_from_slice(password)
            .map_err(|e| anyhow!("invalid HMAC key: {}", e))?;
        mac.update(&u);
        u = mac.finalize().into_bytes();
        for (d, b) in dk.iter_mut().zip(u.iter()) {
            *d ^= b;
        }
    }
    Ok(dk)
}

fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill(&mut salt);
    let dk = pbkdf2_sha256(password.as_bytes(), &salt, PBKDF2_ITERATIONS)?;
    Ok(format!(
        "{}${}${}${}",
        PBKDF2_SCHEME,
        PBKDF2_ITERATIONS,
        BASE64_STANDARD.encode(salt),
        BASE64_STANDARD.encode(dk)
    ))
}

pub fn verify_password(password: &str, stored: &str) -> AppResult<bool> {
    let parts: Vec<&str> = stored.split('$').collect();
    let [scheme, iters, salt_b64, dk_b64] = parts.as_slice() else {
        return Err(anyhow!("malformed password hash").into());
    };
    if *scheme != PBKDF2_SCHEME {
        return Err(anyhow!("unsupported hash scheme '{}'", scheme).into());
    }
    let iterations: u32 = iters
        .parse()
        .map_err(|_| anyhow!("invalid iteration count '{}'", iters))?;
    let salt = BASE64_STANDARD
        .decode(*salt_b64)
        .map_err(|e| anyhow!("invalid salt encoding: {}", e))?;
    let expected = BASE64_STANDARD
        .decode(*dk_b64)
        .map_err(|e| anyhow!("invalid digest encoding: {}", e))?;
    let dk = pbkdf2_sha256(password.as_bytes(), &salt, iterations)?;
    Ok(ct_eq(&dk, &expected))
}

/// Create a user with the starting cash balance and return the new id.
pub fn register(
    conn: &Connection,
    username: &str,
    password: &str,
    confirmation: &str,
) -> AppResult<i64> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("Must provide username".into()));
    }
    if password.is_empty() {
        return Err(AppError::Validation("Must provide password".into()));
    }
    if confirmation.is_empty() {
        return Err(AppError::Validation("Must confirm password".into()));
    }
    if password != confirmation {
        return Err(AppError::Validation("Passwords must match".into()));
    }

    let taken: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE username=?1",
            params![username],
            |r| r.get(0),
        )
        .optional()?;
    if taken.is_some() {
        return Err(AppError::Auth("Username already taken".into()));
    }

    let hash = hash_password(password)?;
    let res = conn.execute(
        "INSERT INTO users(username, hash, cash) VALUES (?1, ?2, ?3)",
        params![username, hash, ledger::starting_cash().to_string()],
    );
    match res {
        Ok(_) => Ok(conn.last_insert_rowid()),
        // Unique constraint is the backstop for two racing registrations.
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(AppError::Auth("Username already taken".into()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Check credentials and return the user id.
pub fn login(conn: &Connection, username: &str, password: &str) -> AppResult<i64> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("Must provide username".into()));
    }
    if password.is_empty() {
        return Err(AppError::Validation("Must provide password".into()));
    }

    let row: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, hash FROM users WHERE username=?1",
            params![username],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    match row {
        Some((id, hash)) if verify_password(password, &hash)? => Ok(id),
        _ => Err(AppError::Auth("Invalid username and/or password".into())),
    }
}

/// Session signing key: `PAPERTRADE_SECRET` if set, else a random per-process
/// key (existing sessions die on restart, which is fine for a simulator).
pub fn session_secret() -> Vec<u8> {
    match std::env::var("PAPERTRADE_SECRET") {
        Ok(s) if !s.is_empty() => s.into_bytes(),
        _ => {
            warn!("PAPERTRADE_SECRET not set; sessions will not survive a restart");
            let mut key = [0u8; 32];
            rand::thread_rng().fill(&mut key);
            key.to_vec()
        }
    }
}

fn sign_payload(secret: &[u8], payload: &str) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| anyhow!("invalid session key: {}", e))?;
    mac.update(payload.as_bytes());
    Ok(BASE64_URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

fn token_with_expiry(secret: &[u8], user_id: i64, exp: i64) -> AppResult<String> {
    let payload = format!("{}.{}", user_id, exp);
    let sig = sign_payload(secret, &payload)?;
    Ok(format!("{}.{}", payload, sig))
}

pub fn issue_token(secret: &[u8], user_id: i64) -> AppResult<String> {
    token_with_expiry(secret, user_id, Utc::now().timestamp() + SESSION_TTL_SECS)
}

/// Validate a session token; returns the user id for a well-formed, unexpired
/// token with a matching signature.
pub fn verify_token(secret: &[u8], token: &str) -> Option<i64> {
    let parts: Vec<&str> = token.split('.').collect();
    let [uid_s, exp_s, sig] = parts.as_slice() else {
        return None;
    };
    let user_id: i64 = uid_s.parse().ok()?;
    let exp: i64 = exp_s.parse().ok()?;
    if exp < Utc::now().timestamp() {
        return None;
    }
    let expected = sign_payload(secret, &format!("{}.{}", user_id, exp)).ok()?;
    if ct_eq(sig.as_bytes(), expected.as_bytes()) {
        Some(user_id)
    } else {
        None
    }
}
