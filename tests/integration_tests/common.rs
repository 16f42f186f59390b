// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Shared scaffolding: a stub upstream database server and a bridge
//! wired to it, both on ephemeral localhost ports.

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::{Context, Result};
use docdb_rs::{
    bridge::listener::BridgeListener,
    cfg::config::BridgeConfig,
    doc::Document,
    utils::next_request_id,
    wire::{
        CommandBody, Message, MessagingPort, OpCode, QueryBody, QueryFlags, ReplyBody,
    },
};
use tokio::net::TcpListener;

/// Cursor ids the stub answers an exhaust query with; the zero ends the
/// stream.
pub const EXHAUST_CURSOR_IDS: [i64; 3] = [42, 42, 0];

fn stub_reply(cursor_id: i64, doc: Document) -> Result<Message> {
    ReplyBody {
        response_flags: 0,
        cursor_id,
        starting_from: 0,
        documents: vec![doc],
    }
    .into_message(next_request_id())
    .context("failed to build stub reply")
}

async fn serve_stub_connection(
    port: Arc<MessagingPort>,
    requests_seen: Arc<AtomicUsize>,
) -> Result<()> {
    loop {
        let request = match port.recv().await {
            Ok(msg) => msg,
            Err(_) => return Ok(()),
        };
        requests_seen.fetch_add(1, Ordering::SeqCst);

        match request.operation() {
            Some(OpCode::Query) => {
                let query = QueryBody::parse(&request)?;
                if query.flags.contains(QueryFlags::EXHAUST) {
                    for (i, cursor_id) in EXHAUST_CURSOR_IDS.iter().enumerate() {
                        let doc = Document::new().with("n", i as i64);
                        port.say(&stub_reply(*cursor_id, doc)?, request.request_id())
                            .await?;
                    }
                } else {
                    let doc = Document::new()
                        .with("ok", 1i64)
                        .with("source", "upstream");
                    port.say(&stub_reply(0, doc)?, request.request_id()).await?;
                }
            },
            Some(OpCode::Command | OpCode::GetMore | OpCode::Msg) => {
                let doc = Document::new()
                    .with("ok", 1i64)
                    .with("source", "upstream");
                port.say(&stub_reply(0, doc)?, request.request_id()).await?;
            },
            // Fire-and-forget traffic is only counted.
            _ => {},
        }
    }
}

/// Stand-in for the database server behind the bridge.
pub struct StubUpstream {
    pub addr: SocketAddr,
    requests_seen: Arc<AtomicUsize>,
}

impl StubUpstream {
    pub async fn spawn() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind stub upstream")?;
        let addr = listener.local_addr()?;
        let requests_seen = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&requests_seen);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(port) = MessagingPort::from_stream(stream) else {
                    continue;
                };
                let seen = Arc::clone(&seen);
                tokio::spawn(async move {
                    let _ = serve_stub_connection(port, seen).await;
                });
            }
        });

        Ok(Self {
            addr,
            requests_seen,
        })
    }

    /// Messages that actually reached the upstream side.
    pub fn requests_seen(&self) -> usize {
        self.requests_seen.load(Ordering::SeqCst)
    }
}

/// Bridge listening on an ephemeral port, forwarding to `dest`.
pub async fn spawn_bridge(dest: SocketAddr) -> Result<(Arc<BridgeListener>, SocketAddr)> {
    spawn_bridge_with_timeouts(
        dest.to_string(),
        Duration::from_secs(5),
        Duration::from_millis(50),
    )
    .await
}

pub async fn spawn_bridge_with_timeouts(
    dest: String,
    connect_timeout: Duration,
    connect_retry: Duration,
) -> Result<(Arc<BridgeListener>, SocketAddr)> {
    let cfg = BridgeConfig {
        port: 0,
        dest,
        connect_timeout,
        connect_retry,
    };
    let listener = BridgeListener::new(cfg);

    let socket = TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind bridge")?;
    let addr = socket.local_addr()?;

    let accepting = Arc::clone(&listener);
    tokio::spawn(async move {
        let _ = accepting.listen_with(socket).await;
    });

    Ok((listener, addr))
}

/// A `{ping: 1}` query, optionally announcing the sender's identity and
/// optionally in exhaust mode.
pub fn ping_query(
    request_id: u32,
    host_info: Option<&str>,
    exhaust: bool,
) -> Result<Message> {
    let mut doc = Document::new().with("ping", 1i64);
    if let Some(host) = host_info {
        doc.push("hostInfo", host);
    }
    let flags = if exhaust {
        QueryFlags::EXHAUST
    } else {
        QueryFlags::empty()
    };
    QueryBody {
        flags,
        collection: "test.$cmd".to_string(),
        number_to_skip: 0,
        number_to_return: 1,
        query: doc,
    }
    .into_message(request_id)
    .context("failed to build query")
}

/// A command request, marked for the bridge itself or for forwarding.
pub fn command(
    request_id: u32,
    name: &str,
    args: Document,
    for_bridge: bool,
) -> Result<Message> {
    let metadata = if for_bridge {
        Document::new().with("$forBridge", true)
    } else {
        Document::new()
    };
    CommandBody {
        database: "admin".to_string(),
        name: name.to_string(),
        metadata,
        args,
    }
    .into_message(request_id)
    .context("failed to build command")
}
