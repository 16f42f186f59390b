// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The per-connection forwarding task.
//!
//! One forwarder serves one inbound connection and dials its own upstream
//! connection; sessions are never multiplexed. The loop reads a request,
//! answers admin commands itself, applies the origin host's policy, and
//! shuttles everything else to the upstream peer, streaming exhaust
//! replies back until the cursor is exhausted.
//!
//! Failures split two ways: protocol-layer failures end the session
//! quietly (log, close the inbound port), anything else is a bug and
//! takes the process down with the uncaught exit code.

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{error, info, warn};

use crate::{
    bridge::{
        commands::{CommandError, CommandRegistry},
        policy::{HostAndPort, HostState, PolicyTable},
    },
    cfg::config::BridgeConfig,
    doc::{Document, Value},
    utils::{EXIT_UNCAUGHT, next_request_id, quick_exit},
    wire::{
        MessagingPort, OpCode, ProtocolError,
        message::{CommandBody, Message, QueryBody, QueryFlags, ReplyBody, reply_cursor_id},
    },
};

#[derive(Debug, Error)]
enum ForwarderError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

enum Flow {
    Continue,
    End,
}

fn extract_host_info(args: &Document) -> Option<HostAndPort> {
    match args.get("hostInfo") {
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

fn origin_name(host: Option<&HostAndPort>) -> String {
    match host {
        Some(h) => h.to_string(),
        None => "<unknown>".to_string(),
    }
}

/// Per-inbound-connection task state.
pub struct Forwarder {
    inbound: Arc<MessagingPort>,
    dest: String,
    settings: Arc<PolicyTable>,
    registry: Arc<CommandRegistry>,
    connect_timeout: Duration,
    connect_retry: Duration,
}

impl Forwarder {
    pub fn new(
        inbound: Arc<MessagingPort>,
        cfg: &BridgeConfig,
        settings: Arc<PolicyTable>,
        registry: Arc<CommandRegistry>,
    ) -> Self {
        Self {
            inbound,
            dest: cfg.dest.clone(),
            settings,
            registry,
            connect_timeout: cfg.connect_timeout,
            connect_retry: cfg.connect_retry,
        }
    }

    /// Serve the connection until either side goes away.
    pub async fn run(self) {
        let Some(upstream) = self.dial_upstream().await else {
            return;
        };

        let mut receiving_first_message = true;
        let mut host: Option<HostAndPort> = None;

        loop {
            let request = match self.inbound.recv().await {
                Ok(msg) => msg,
                Err(_) => {
                    info!("end connection {}", self.inbound.remote());
                    self.inbound.shutdown();
                    break;
                },
            };

            let step = self
                .dispatch(&request, &upstream, &mut receiving_first_message, &mut host)
                .await;
            match step {
                Ok(Flow::Continue) => {},
                Ok(Flow::End) => break,
                Err(ForwarderError::Protocol(e)) => {
                    error!(
                        "protocol failure in forwarder: {e}, end connection {}",
                        self.inbound.remote()
                    );
                    self.inbound.shutdown();
                    break;
                },
                Err(ForwarderError::Internal(e)) => {
                    error!("unexpected failure in forwarder: {e:#}, terminating");
                    quick_exit(EXIT_UNCAUGHT);
                },
            }
        }
    }

    /// Dial the upstream peer, retrying until the connect deadline.
    async fn dial_upstream(&self) -> Option<Arc<MessagingPort>> {
        let deadline = Instant::now() + self.connect_timeout;
        loop {
            match MessagingPort::connect(&self.dest).await {
                Ok(port) => return Some(port),
                Err(e) => {
                    if Instant::now() >= deadline {
                        warn!(
                            "Unable to establish connection to {} after {:?}: {e}",
                            self.dest, self.connect_timeout
                        );
                        info!("end connection {}", self.inbound.remote());
                        self.inbound.shutdown();
                        return None;
                    }
                    sleep(self.connect_retry).await;
                },
            }
        }
    }

    async fn dispatch(
        &self,
        request: &Message,
        upstream: &Arc<MessagingPort>,
        receiving_first_message: &mut bool,
        host: &mut Option<HostAndPort>,
    ) -> Result<Flow, ForwarderError> {
        let op = request.operation();
        let mut exhaust = false;

        // Command-shaped requests get logged, and the very first one on a
        // connection names the origin host the session is latched to.
        match op {
            Some(OpCode::Query) => {
                let query = QueryBody::parse(request)?;
                if *receiving_first_message {
                    *host = extract_host_info(&query.query);
                }
                info!(
                    "Received \"{}\" command with arguments {} from {}",
                    query.query.first_name().unwrap_or_default(),
                    query.query,
                    origin_name(host.as_ref())
                );
                exhaust = query.flags.contains(QueryFlags::EXHAUST);
            },
            Some(OpCode::Command) => {
                let command = CommandBody::parse(request)?;
                if *receiving_first_message {
                    *host = extract_host_info(&command.args);
                }
                info!(
                    "Received \"{}\" command with arguments {} from {}",
                    command.name,
                    command.args,
                    origin_name(host.as_ref())
                );
                *receiving_first_message = false;

                if command.metadata.get("$forBridge").is_some_and(Value::truthy) {
                    self.answer_bridge_command(request, &command).await?;
                    return Ok(Flow::Continue);
                }
            },
            _ => {},
        }
        *receiving_first_message = false;

        // Policy gate: copy the current policy, never holding the table
        // lock across I/O.
        let policy = host
            .as_ref()
            .map(|h| self.settings.policy_for(h))
            .unwrap_or_default();
        match policy.state {
            HostState::HangUp => {
                info!(
                    "Rejecting connection from {}, end connection {}",
                    origin_name(host.as_ref()),
                    self.inbound.remote()
                );
                self.inbound.shutdown();
                return Ok(Flow::End);
            },
            HostState::Forward => {
                if !policy.delay.is_zero() {
                    sleep(policy.delay).await;
                }
            },
        }

        match op {
            Some(OpCode::Query | OpCode::Msg | OpCode::GetMore | OpCode::Command) => {
                let response = match upstream.call(request).await {
                    Ok(r) => r,
                    Err(ProtocolError::Closed) => {
                        // Nothing to respond with; close the inbound side.
                        info!(
                            "Received an empty response, end connection {}",
                            self.inbound.remote()
                        );
                        self.inbound.shutdown();
                        return Ok(Flow::End);
                    },
                    Err(e) => return Err(e.into()),
                };
                self.inbound.say(&response, request.request_id()).await?;

                if exhaust {
                    self.stream_exhaust(request, upstream, response).await?;
                }
            },
            _ => {
                // No reply comes back for these.
                upstream.say(request, request.request_id()).await?;
            },
        }

        Ok(Flow::Continue)
    }

    /// Run an admin command and reply on the inbound port.
    async fn answer_bridge_command(
        &self,
        request: &Message,
        command: &CommandBody,
    ) -> Result<(), ForwarderError> {
        let status = self
            .registry
            .run(&command.name, &command.args, &self.settings);
        let reply_doc = match &status {
            Ok(()) => Document::new().with("ok", 1i64),
            Err(e) => command_error_doc(e),
        };
        let reply = ReplyBody {
            response_flags: 0,
            cursor_id: 0,
            starting_from: 0,
            documents: vec![reply_doc],
        }
        .into_message(next_request_id())
        .map_err(|e| ForwarderError::Internal(e.into()))?;
        self.inbound.say(&reply, request.request_id()).await?;
        Ok(())
    }

    /// Relay upstream replies until one carries cursor id 0.
    async fn stream_exhaust(
        &self,
        request: &Message,
        upstream: &Arc<MessagingPort>,
        first_response: Message,
    ) -> Result<(), ForwarderError> {
        let mut response = first_response;
        while reply_cursor_id(&response)? != 0 {
            response = upstream.recv().await?;
            self.inbound.say(&response, request.request_id()).await?;
        }
        Ok(())
    }
}

fn command_error_doc(e: &CommandError) -> Document {
    Document::new()
        .with("ok", 0i64)
        .with("errmsg", e.to_string())
        .with("code", e.code())
}
