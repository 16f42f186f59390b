// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result};
use clap::Parser;
use docdb_rs::{
    bridge::listener::BridgeListener,
    cfg::{
        cli::{BridgeArgs, resolve_config_path},
        config::BridgeConfig,
        logger::init_logger,
    },
    utils::{EXIT_CLEAN, quick_exit},
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = BridgeArgs::parse();
    let _log_guard = init_logger(args.log_config.as_deref())?;

    let mut cfg = match &args.config {
        Some(path) => resolve_config_path(path)
            .and_then(BridgeConfig::load_from_file)
            .context("failed to resolve or load config")?,
        None => BridgeConfig::default(),
    };
    cfg.apply_cli(&args);
    cfg.validate().context("invalid bridge configuration")?;

    let listener = BridgeListener::new(cfg);

    tokio::select! {
        res = listener.listen() => {
            res.context("bridge listener failed")?;
        },
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            listener.shutdown_all();
            quick_exit(EXIT_CLEAN);
        },
    }

    Ok(())
}
