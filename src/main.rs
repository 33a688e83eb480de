// Copyright (c) 2025 Papertrade contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use env_logger::Builder;
use log::{info, LevelFilter};
use std::net::SocketAddr;
use std::path::Path;

use papertrade::{cli, db, web};

#[tokio::main]
async fn main() -> Result<()> {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    let matches = cli::build_cli().get_matches();

    let conn = match matches.get_one::<String>("db") {
        Some(p) => db::open_or_init_at(Path::new(p))?,
        None => db::open_or_init()?,
    };
    info!("Database ready");

    let bind: SocketAddr = matches
        .get_one::<String>("bind")
        .map(String::as_str)
        .unwrap_or("127.0.0.1:3030")
        .parse()
        .context("Invalid --bind address")?;

    let state = web::AppState::new(conn)?;

    info!("Server running on http://{}", bind);
    warp::serve(web::routes(state)).run(bind).await;
    Ok(())
}
