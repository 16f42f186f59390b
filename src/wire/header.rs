// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The fixed 16-byte frame header and operation codes.
//!
//! Every wire message starts with four little-endian 32-bit words:
//!
//! ```text
//! +----------------+------------+-------------+---------+
//! | message_length | request_id | response_to | op_code |
//! +----------------+------------+-------------+---------+
//! ```
//!
//! `message_length` counts the whole frame, header included. The header
//! is mapped straight onto the wire bytes with zerocopy.

use thiserror::Error;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, LittleEndian, U32};

pub const HEADER_LEN: usize = 16;

/// Frames above this size are rejected as malformed.
pub const MAX_MESSAGE_LEN: usize = 48 * 1024 * 1024;

#[repr(C)]
#[derive(Debug, Default, Clone, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct MsgHeader {
    pub message_length: U32<LittleEndian>,
    pub request_id: U32<LittleEndian>,
    pub response_to: U32<LittleEndian>,
    pub op_code: U32<LittleEndian>,
}

impl MsgHeader {
    pub fn new(message_length: u32, request_id: u32, response_to: u32, op_code: u32) -> Self {
        Self {
            message_length: U32::new(message_length),
            request_id: U32::new(request_id),
            response_to: U32::new(response_to),
            op_code: U32::new(op_code),
        }
    }

    pub fn read_from(buf: &[u8; HEADER_LEN]) -> Self {
        // A 16-byte buffer always converts; the layout has no padding.
        Self::read_from_bytes(buf.as_slice()).unwrap_or_default()
    }

    pub fn write_to(&self, buf: &mut [u8; HEADER_LEN]) {
        buf.copy_from_slice(self.as_bytes());
    }
}

/// Operation codes of the host wire protocol. Codes outside this set are
/// carried through the bridge untouched.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Reply = 1,
    Msg = 1000,
    Update = 2001,
    Insert = 2002,
    Query = 2004,
    GetMore = 2005,
    Delete = 2006,
    KillCursors = 2007,
    Command = 2008,
}

impl OpCode {
    pub fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            1 => Self::Reply,
            1000 => Self::Msg,
            2001 => Self::Update,
            2002 => Self::Insert,
            2004 => Self::Query,
            2005 => Self::GetMore,
            2006 => Self::Delete,
            2007 => Self::KillCursors,
            2008 => Self::Command,
            _ => return None,
        })
    }
}

/// Returned when a frame declares an operation code outside the set.
#[derive(Debug, Error)]
#[error("invalid op code: {0}")]
pub struct UnknownOpCode(pub u32);

impl TryFrom<u32> for OpCode {
    type Error = UnknownOpCode;

    fn try_from(v: u32) -> Result<Self, Self::Error> {
        Self::from_u32(v).ok_or(UnknownOpCode(v))
    }
}
