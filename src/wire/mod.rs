//! Framed-message transport for the host wire protocol.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

/// The messaging port: framed reads and writes over one TCP stream.
pub mod framer;
/// The fixed frame header and operation codes.
pub mod header;
/// Whole messages and typed body views.
pub mod message;

pub use framer::MessagingPort;
pub use header::{HEADER_LEN, MAX_MESSAGE_LEN, MsgHeader, OpCode};
pub use message::{CommandBody, Message, QueryBody, QueryFlags, ReplyBody};

/// Failures of the protocol layer. All of them tear down the affected
/// connection and nothing else; the session owner decides how loudly.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The peer closed the stream, or the port was shut down locally.
    #[error("connection closed")]
    Closed,
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid message length {0}")]
    BadLength(usize),
    #[error("malformed message: {0}")]
    Malformed(String),
}
