// Copyright (c) 2025 Papertrade contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{arg, crate_version, Command};

pub fn build_cli() -> Command {
    Command::new("papertrade")
        .version(crate_version!())
        .about("Virtual-cash stock trading simulator served over HTTP")
        .arg(arg!(--bind <ADDR> "Address to listen on (default 127.0.0.1:3030)").required(false))
        .arg(arg!(--db <PATH> "SQLite database path (default: platform data dir)").required(false))
}
