// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{bridge::policy::HostAndPort, cfg::cli::BridgeArgs};

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_retry() -> Duration {
    Duration::from_millis(500)
}

/// Runtime settings of the bridge process. Everything can come from a
/// YAML file; the listen port and upstream address also come from the
/// command line, and command-line values win.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct BridgeConfig {
    #[serde(rename = "Port", default)]
    /// Port to accept inbound connections on.
    pub port: u16,

    #[serde(rename = "Dest", default)]
    /// `host:port` of the database server to forward to.
    pub dest: String,

    #[serde(
        rename = "ConnectTimeout",
        with = "serde_secs",
        default = "default_connect_timeout"
    )]
    /// How long a forwarder keeps retrying the upstream dial.
    pub connect_timeout: Duration,

    #[serde(
        rename = "ConnectRetryMillis",
        with = "serde_millis",
        default = "default_connect_retry"
    )]
    /// Pause between upstream dial attempts.
    pub connect_retry: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: 0,
            dest: String::new(),
            connect_timeout: default_connect_timeout(),
            connect_retry: default_connect_retry(),
        }
    }
}

impl BridgeConfig {
    /// Loads the configuration from YAML and returns it unvalidated;
    /// validation runs after command-line overrides are applied.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {:?}", path.as_ref()))?;
        serde_yaml::from_str(&s).context("failed to parse config YAML")
    }

    /// Fold command-line arguments over the file values.
    pub fn apply_cli(&mut self, args: &BridgeArgs) {
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(dest) = &args.dest {
            self.dest = dest.clone();
        }
    }

    /// Validates invariants once every source has been merged.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.port != 0, "a listen port is required (--port)");
        ensure!(
            !self.dest.is_empty(),
            "an upstream address is required (--dest)"
        );
        self.dest
            .parse::<HostAndPort>()
            .with_context(|| format!("invalid --dest {:?}", self.dest))?;
        ensure!(
            !self.connect_retry.is_zero(),
            "ConnectRetryMillis must be positive"
        );
        ensure!(
            self.connect_timeout >= self.connect_retry,
            "ConnectTimeout must be at least the retry interval"
        );
        Ok(())
    }
}

/// Serde helpers for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Serde helpers for representing `Duration` as milliseconds.
mod serde_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
