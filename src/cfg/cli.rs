// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

/// Command-line surface of the bridge daemon.
#[derive(Parser, Debug, Default)]
#[command(
    name = "docbridge",
    about = "Fault-injecting wire bridge between clients and a database server"
)]
pub struct BridgeArgs {
    /// Port to listen on for inbound connections.
    #[arg(long)]
    pub port: Option<u16>,

    /// host:port of the database server to forward traffic to.
    #[arg(long)]
    pub dest: Option<String>,

    /// Optional YAML runtime config; command-line values override it.
    #[arg(long)]
    pub config: Option<String>,

    /// Optional YAML logger config.
    #[arg(long = "log-config")]
    pub log_config: Option<String>,
}

pub fn resolve_config_path(rel: &str) -> Result<PathBuf> {
    let p = Path::new(rel);

    let abs = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()
            .context("cannot get current working dir")?
            .join(p)
    };

    let canon = abs
        .canonicalize()
        .with_context(|| format!("failed to canonicalize path {abs:?}"))?;

    Ok(canon)
}
