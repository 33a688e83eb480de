// Copyright (c) 2025 Papertrade contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;
use warp::http::StatusCode;

/// Errors surfaced by the accounting, auth, and web layers. Each maps to the
/// HTTP status the rendered apology page should carry.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    NotFound(String),
    #[error("not enough cash")]
    InsufficientFunds,
    #[error("not enough shares")]
    InsufficientShares,
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::BAD_REQUEST,
            AppError::InsufficientFunds => StatusCode::FORBIDDEN,
            AppError::InsufficientShares => StatusCode::FORBIDDEN,
            AppError::Sqlite(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl warp::reject::Reject for AppError {}

pub type AppResult<T> = Result<T, AppError>;
