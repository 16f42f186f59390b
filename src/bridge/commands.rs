// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Administrative commands addressed to the bridge itself.
//!
//! Requests whose metadata carries a truthy `$forBridge` field are not
//! forwarded; their command name is resolved against this closed set and
//! the handler mutates the policy table. The set is closed by design, so
//! dispatch is an enum rather than anything extensible.

use std::{collections::HashMap, time::Duration};

use enum_dispatch::enum_dispatch;
use thiserror::Error;

use crate::{
    bridge::policy::{HostAndPort, PolicyTable},
    doc::{Document, Value},
};

/// Typed failures surfaced in an admin command reply.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Missing required field '{0}'")]
    BadValue(&'static str),
    #[error("'{0}' field must be a {1}")]
    TypeMismatch(&'static str, &'static str),
    #[error("Unknown command: {0}")]
    CommandNotFound(String),
    #[error("{0}")]
    OperationFailed(String),
}

impl CommandError {
    /// Numeric error code carried in the reply document.
    pub fn code(&self) -> i64 {
        match self {
            CommandError::BadValue(_) => 2,
            CommandError::TypeMismatch(_, _) => 14,
            CommandError::CommandNotFound(_) => 59,
            CommandError::OperationFailed(_) => 96,
        }
    }
}

fn required_host(args: &Document) -> Result<HostAndPort, CommandError> {
    let value = args.get("host").ok_or(CommandError::BadValue("host"))?;
    let raw = match value {
        Value::String(s) => s,
        _ => return Err(CommandError::TypeMismatch("host", "string")),
    };
    raw.parse::<HostAndPort>()
        .map_err(|e| CommandError::OperationFailed(e.to_string()))
}

fn required_delay_millis(args: &Document) -> Result<u64, CommandError> {
    let value = args.get("delay").ok_or(CommandError::BadValue("delay"))?;
    let millis = match value {
        Value::Int(n) => *n as f64,
        Value::Double(d) => *d,
        _ => return Err(CommandError::TypeMismatch("delay", "number")),
    };
    if !millis.is_finite() || millis < 0.0 {
        return Err(CommandError::OperationFailed(
            "'delay' must be a non-negative number of milliseconds".to_string(),
        ));
    }
    Ok(millis as u64)
}

#[enum_dispatch]
pub trait BridgeCommand {
    fn run(&self, args: &Document, settings: &PolicyTable) -> Result<(), CommandError>;
}

#[derive(Debug, Default)]
pub struct DelayMessagesFrom;

impl BridgeCommand for DelayMessagesFrom {
    fn run(&self, args: &Document, settings: &PolicyTable) -> Result<(), CommandError> {
        let host = required_host(args)?;
        let delay = required_delay_millis(args)?;
        settings.set_delay(&host, Duration::from_millis(delay));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct AcceptConnectionsFrom;

impl BridgeCommand for AcceptConnectionsFrom {
    fn run(&self, args: &Document, settings: &PolicyTable) -> Result<(), CommandError> {
        let host = required_host(args)?;
        settings.set_forward(&host);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RejectConnectionsFrom;

impl BridgeCommand for RejectConnectionsFrom {
    fn run(&self, args: &Document, settings: &PolicyTable) -> Result<(), CommandError> {
        let host = required_host(args)?;
        settings.set_hang_up(&host);
        Ok(())
    }
}

#[enum_dispatch(BridgeCommand)]
#[derive(Debug)]
pub enum Command {
    DelayMessagesFrom,
    AcceptConnectionsFrom,
    RejectConnectionsFrom,
}

/// Name-indexed command table, built once at startup and passed to every
/// forwarder.
#[derive(Debug)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let mut commands: HashMap<&'static str, Command> = HashMap::new();
        commands.insert("delayMessagesFrom", DelayMessagesFrom.into());
        commands.insert("acceptConnectionsFrom", AcceptConnectionsFrom.into());
        commands.insert("rejectConnectionsFrom", RejectConnectionsFrom.into());
        Self { commands }
    }

    /// Resolve and run one command against the policy table.
    pub fn run(
        &self,
        name: &str,
        args: &Document,
        settings: &PolicyTable,
    ) -> Result<(), CommandError> {
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| CommandError::CommandNotFound(name.to_string()))?;
        command.run(args, settings)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
