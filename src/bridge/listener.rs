// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Accepting side of the bridge.
//!
//! The listener accepts inbound connections, wraps each in a messaging
//! port, and spawns a detached forwarder task per connection. Live ports
//! are tracked so `shutdown_all` can close every session at process exit;
//! entries drop out of the table when their task finishes.

use std::sync::{
    Arc, Weak,
    atomic::{AtomicU64, Ordering},
};

use anyhow::{Context, Result};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::{
    bridge::{commands::CommandRegistry, forwarder::Forwarder, policy::PolicyTable},
    cfg::config::BridgeConfig,
    wire::MessagingPort,
};

pub struct BridgeListener {
    cfg: BridgeConfig,
    settings: Arc<PolicyTable>,
    registry: Arc<CommandRegistry>,
    ports: DashMap<u64, Arc<MessagingPort>>,
    next_port_id: AtomicU64,
    self_weak: OnceCell<Weak<BridgeListener>>,
}

impl BridgeListener {
    pub fn new(cfg: BridgeConfig) -> Arc<Self> {
        let listener = Arc::new(Self {
            cfg,
            settings: Arc::new(PolicyTable::new()),
            registry: Arc::new(CommandRegistry::new()),
            ports: DashMap::new(),
            next_port_id: AtomicU64::new(0),
            self_weak: OnceCell::new(),
        });
        let _ = listener.self_weak.set(Arc::downgrade(&listener));
        listener
    }

    /// The policy table shared with every forwarder.
    pub fn settings(&self) -> Arc<PolicyTable> {
        Arc::clone(&self.settings)
    }

    /// Bind the configured port and accept connections forever. Resolves
    /// only on an accept failure.
    pub async fn listen(self: &Arc<Self>) -> Result<()> {
        let listener = TcpListener::bind(("0.0.0.0", self.cfg.port))
            .await
            .with_context(|| format!("failed to bind bridge port {}", self.cfg.port))?;
        self.listen_with(listener).await
    }

    /// Accept connections on an already-bound socket.
    pub async fn listen_with(self: &Arc<Self>, listener: TcpListener) -> Result<()> {
        info!(
            "bridge listening on {:?}, forwarding to {}",
            listener.local_addr().ok(),
            self.cfg.dest
        );

        loop {
            let (stream, peer) = listener.accept().await.context("accept failed")?;
            let port = match MessagingPort::from_stream(stream) {
                Ok(port) => port,
                Err(e) => {
                    warn!("dropping connection from {peer}: {e}");
                    continue;
                },
            };
            info!("connection accepted from {peer}");
            self.spawn_forwarder(port);
        }
    }

    fn spawn_forwarder(self: &Arc<Self>, port: Arc<MessagingPort>) {
        let id = self.next_port_id.fetch_add(1, Ordering::Relaxed);
        self.ports.insert(id, Arc::clone(&port));

        let forwarder = Forwarder::new(
            port,
            &self.cfg,
            Arc::clone(&self.settings),
            Arc::clone(&self.registry),
        );
        let weak = self.self_weak.get().cloned().unwrap_or_else(Weak::new);
        tokio::spawn(async move {
            forwarder.run().await;
            if let Some(listener) = weak.upgrade() {
                listener.ports.remove(&id);
            }
        });
    }

    /// Close every live session; blocked reads on them unblock and the
    /// forwarder tasks wind down.
    pub fn shutdown_all(&self) {
        for entry in self.ports.iter() {
            entry.value().shutdown();
        }
    }
}
