// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
};

#[derive(Debug, Deserialize, Clone)]
struct LoggerConfig {
    logger: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "lowercase")]
enum Output {
    Stdout,
    Stderr,
    File,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "lowercase")]
enum RotationFreq {
    Minutely,
    Hourly,
    Daily,
    Never,
}

#[derive(Debug, Deserialize, Clone)]
struct LogFileConfig {
    path: String,
    #[serde(default)]
    rotation_frequency: Option<RotationFreq>,
}

#[derive(Debug, Deserialize, Clone)]
struct LogConfig {
    level: String,
    output: Output,
    #[serde(default)]
    json: bool,
    file: Option<LogFileConfig>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: Output::Stderr,
            json: false,
            file: None,
        }
    }
}

/// Install the global subscriber. With no config file, events go to
/// stderr at `info` (or whatever `RUST_LOG` says). The returned guard
/// must stay alive for the non-blocking writer to flush.
pub fn init_logger(config_path: Option<&str>) -> Result<WorkerGuard> {
    let config = match config_path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {path}"))?;
            let parsed: LoggerConfig = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {path}"))?;
            parsed.logger
        },
        None => LogConfig::default(),
    };

    let (writer, guard) = make_writer(&config)?;

    let env_filter = EnvFilter::try_new(&config.level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .context("Failed to parse log level from config or env")?;

    let base = fmt::layer().with_writer(writer).with_ansi(false);
    if config.json {
        let subscriber = Registry::default().with(env_filter).with(base.json());
        tracing::subscriber::set_global_default(subscriber)
            .context("Failed to set global default subscriber")?;
    } else {
        let subscriber = Registry::default().with(env_filter).with(base.compact());
        tracing::subscriber::set_global_default(subscriber)
            .context("Failed to set global default subscriber")?;
    }

    Ok(guard)
}

fn make_writer(cfg: &LogConfig) -> Result<(BoxMakeWriter, WorkerGuard)> {
    Ok(match cfg.output {
        Output::Stdout => {
            let (w, g) = tracing_appender::non_blocking(std::io::stdout());
            (BoxMakeWriter::new(w), g)
        },
        Output::Stderr => {
            let (w, g) = tracing_appender::non_blocking(std::io::stderr());
            (BoxMakeWriter::new(w), g)
        },
        Output::File => {
            let fcfg = cfg
                .file
                .clone()
                .context("log.file is required for output=file")?;
            let path = PathBuf::from(&fcfg.path);
            let dir = path.parent().unwrap_or_else(|| Path::new(""));

            let rotation = match fcfg.rotation_frequency.unwrap_or(RotationFreq::Never) {
                RotationFreq::Minutely => Rotation::MINUTELY,
                RotationFreq::Hourly => Rotation::HOURLY,
                RotationFreq::Daily => Rotation::DAILY,
                RotationFreq::Never => Rotation::NEVER,
            };

            let file_appender = RollingFileAppender::new(
                rotation,
                dir,
                path.file_name().unwrap_or_default(),
            );
            let (w, g) = tracing_appender::non_blocking(file_appender);
            (BoxMakeWriter::new(w), g)
        },
    })
}
