// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Per-remote-host forwarding policies.
//!
//! The table is read once per inbound message and written only by admin
//! commands, so a single mutex with copy-on-read keeps every critical
//! section short and never holds the lock across network I/O.

use std::{
    collections::HashMap,
    fmt,
    str::FromStr,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use thiserror::Error;

/// Identity of a remote peer as `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostAndPort {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Error)]
#[error("invalid host:port string: {0:?}")]
pub struct InvalidHostAndPort(pub String);

impl FromStr for HostAndPort {
    type Err = InvalidHostAndPort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| InvalidHostAndPort(s.to_string()))?;
        if host.is_empty() {
            return Err(InvalidHostAndPort(s.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| InvalidHostAndPort(s.to_string()))?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for HostAndPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// What to do with traffic from one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostState {
    #[default]
    Forward,
    HangUp,
}

/// Forwarding policy for one host. Unknown hosts forward undelayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostPolicy {
    pub state: HostState,
    pub delay: Duration,
}

/// Mapping from host identity to policy, shared by every forwarder.
#[derive(Debug, Default)]
pub struct PolicyTable {
    entries: Mutex<HashMap<HostAndPort, HostPolicy>>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entry<R>(&self, host: &HostAndPort, f: impl FnOnce(&mut HostPolicy) -> R) -> R {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(entries.entry(host.clone()).or_default())
    }

    /// Copy of the current policy for `host`, default on a miss.
    pub fn policy_for(&self, host: &HostAndPort) -> HostPolicy {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
            .copied()
            .unwrap_or_default()
    }

    /// Forward traffic from `host` after sitting on it for `delay`.
    pub fn set_delay(&self, host: &HostAndPort, delay: Duration) {
        self.with_entry(host, |policy| {
            policy.state = HostState::Forward;
            policy.delay = delay;
        });
    }

    /// Forward traffic from `host` again; a configured delay survives.
    pub fn set_forward(&self, host: &HostAndPort) {
        self.with_entry(host, |policy| {
            policy.state = HostState::Forward;
        });
    }

    /// Drop every connection whose traffic originates from `host`.
    pub fn set_hang_up(&self, host: &HostAndPort) {
        self.with_entry(host, |policy| {
            policy.state = HostState::HangUp;
        });
    }
}
