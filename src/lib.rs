// Copyright (c) 2025 Papertrade contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod auth;
pub mod cli;
pub mod db;
pub mod error;
pub mod ledger;
pub mod models;
pub mod quotes;
pub mod render;
pub mod utils;
pub mod web;
