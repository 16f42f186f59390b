// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The messaging port: framed reads and writes over one TCP stream.
//!
//! A port owns the split halves of a stream behind async mutexes and a
//! cancellation token. `shutdown` cancels the token; a `recv` blocked on
//! the socket observes the cancellation and resolves to
//! [`ProtocolError::Closed`], which is also how a clean peer close
//! surfaces. There is no read timeout: a port waits as long as its peer
//! stays quiet.

use std::{io, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::Mutex,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::wire::{
    ProtocolError,
    header::{HEADER_LEN, MAX_MESSAGE_LEN, MsgHeader},
    message::Message,
};

async fn io_with_cancel<F, T>(fut: F, cancel: &CancellationToken) -> Result<T, ProtocolError>
where F: Future<Output = io::Result<T>> {
    tokio::select! {
        _ = cancel.cancelled() => Err(ProtocolError::Closed),
        res = fut => res.map_err(map_io_error),
    }
}

fn map_io_error(e: io::Error) -> ProtocolError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::BrokenPipe => ProtocolError::Closed,
        _ => ProtocolError::Io(e),
    }
}

/// Bidirectional framed-message transport over one TCP connection.
#[derive(Debug)]
pub struct MessagingPort {
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
    remote: SocketAddr,
    cancel: CancellationToken,
}

impl MessagingPort {
    /// Wrap an established stream.
    pub fn from_stream(stream: TcpStream) -> Result<Arc<Self>, ProtocolError> {
        let remote = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        let (r, w) = stream.into_split();
        Ok(Arc::new(Self {
            reader: Mutex::new(r),
            writer: Mutex::new(w),
            remote,
            cancel: CancellationToken::new(),
        }))
    }

    /// Dial a peer and wrap the resulting stream.
    pub async fn connect(addr: &str) -> Result<Arc<Self>, ProtocolError> {
        let stream = TcpStream::connect(addr).await.map_err(map_io_error)?;
        Self::from_stream(stream)
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    /// Close the port. Any blocked `recv` or write on it unblocks with
    /// [`ProtocolError::Closed`].
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Block until a full message arrives or the peer goes away.
    pub async fn recv(&self) -> Result<Message, ProtocolError> {
        let mut r = self.reader.lock().await;

        let mut head = [0u8; HEADER_LEN];
        io_with_cancel(r.read_exact(&mut head), &self.cancel).await?;
        let header = MsgHeader::read_from(&head);

        let total = header.message_length.get() as usize;
        if !(HEADER_LEN..=MAX_MESSAGE_LEN).contains(&total) {
            return Err(ProtocolError::BadLength(total));
        }

        let mut body = vec![0u8; total - HEADER_LEN];
        if !body.is_empty() {
            io_with_cancel(r.read_exact(&mut body), &self.cancel).await?;
        }
        debug!(
            "RECV op={} id={} len={} from {}",
            header.op_code.get(),
            header.request_id.get(),
            total,
            self.remote
        );

        Ok(Message::from_parts(header, Bytes::from(body)))
    }

    /// Write a message, stamping its `response_to` header word.
    pub async fn say(&self, msg: &Message, response_to: u32) -> Result<(), ProtocolError> {
        self.write_frame(msg.encode_with_response_to(response_to))
            .await
    }

    /// Send a request and wait for the peer's reply to it.
    pub async fn call(&self, request: &Message) -> Result<Message, ProtocolError> {
        self.write_frame(request.encode()).await?;
        self.recv().await
    }

    async fn write_frame(&self, frame: Bytes) -> Result<(), ProtocolError> {
        if self.cancel.is_cancelled() {
            return Err(ProtocolError::Closed);
        }
        let mut w = self.writer.lock().await;
        io_with_cancel(w.write_all(&frame), &self.cancel).await?;
        io_with_cancel(w.flush(), &self.cancel).await
    }
}
