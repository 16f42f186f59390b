// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Whole messages and typed views over their bodies.
//!
//! A `Message` is the raw frame: header words plus an opaque body. The
//! bridge never rewrites bodies, so the typed views (`QueryBody`,
//! `CommandBody`, `ReplyBody`) are parsed on demand and only for the
//! operations that need inspection. Documents travel as length-prefixed
//! JSON; strings as NUL-terminated bytes.

use bitflags::bitflags;
use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    doc::Document,
    wire::{
        ProtocolError,
        header::{HEADER_LEN, MsgHeader, OpCode},
    },
};

bitflags! {
    /// Bit flags of a query request. Only `EXHAUST` changes bridge
    /// behaviour; the rest are carried for completeness.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct QueryFlags: u32 {
        const TAILABLE_CURSOR   = 1 << 1;
        const SECONDARY_OK      = 1 << 2;
        const OPLOG_REPLAY      = 1 << 3;
        const NO_CURSOR_TIMEOUT = 1 << 4;
        const AWAIT_DATA        = 1 << 5;
        const EXHAUST           = 1 << 6;
        const PARTIAL           = 1 << 7;
    }
}

/// One framed wire message.
#[derive(Debug, Clone)]
pub struct Message {
    header: MsgHeader,
    pub body: Bytes,
}

impl Message {
    pub fn new(op_code: u32, request_id: u32, response_to: u32, body: Bytes) -> Self {
        let len = (HEADER_LEN + body.len()) as u32;
        Self {
            header: MsgHeader::new(len, request_id, response_to, op_code),
            body,
        }
    }

    pub(crate) fn from_parts(header: MsgHeader, body: Bytes) -> Self {
        Self { header, body }
    }

    pub fn request_id(&self) -> u32 {
        self.header.request_id.get()
    }

    pub fn response_to(&self) -> u32 {
        self.header.response_to.get()
    }

    pub fn raw_op_code(&self) -> u32 {
        self.header.op_code.get()
    }

    /// The decoded operation, or `None` for codes outside the known set.
    /// Unknown codes are still forwardable.
    pub fn operation(&self) -> Option<OpCode> {
        OpCode::from_u32(self.raw_op_code())
    }

    /// Encode the full frame, overriding the `response_to` header word.
    pub fn encode_with_response_to(&self, response_to: u32) -> Bytes {
        let mut header = self.header.clone();
        header.response_to = response_to.into();
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.body.len());
        let mut head = [0u8; HEADER_LEN];
        header.write_to(&mut head);
        buf.put_slice(&head);
        buf.put_slice(&self.body);
        buf.freeze()
    }

    pub fn encode(&self) -> Bytes {
        self.encode_with_response_to(self.response_to())
    }

    /// Decode one complete frame. The buffer must hold exactly the frame
    /// the header's length word declares.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        if frame.len() < HEADER_LEN {
            return Err(ProtocolError::BadLength(frame.len()));
        }
        let mut head = [0u8; HEADER_LEN];
        head.copy_from_slice(&frame[..HEADER_LEN]);
        let header = MsgHeader::read_from(&head);
        let total = header.message_length.get() as usize;
        if total != frame.len() {
            return Err(ProtocolError::BadLength(total));
        }
        Ok(Self::from_parts(
            header,
            Bytes::copy_from_slice(&frame[HEADER_LEN..]),
        ))
    }
}

// ── body primitives ─────────────────────────────────────────────────────

struct BodyReader<'a> {
    buf: &'a [u8],
}

impl<'a> BodyReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.buf.len() < n {
            return Err(ProtocolError::Malformed(format!(
                "body truncated: wanted {n} bytes, {} left",
                self.buf.len()
            )));
        }
        let (head, rest) = self.buf.split_at(n);
        self.buf = rest;
        Ok(head)
    }

    fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        let raw = self.take(4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(self.read_u32()? as i32)
    }

    fn read_i64(&mut self) -> Result<i64, ProtocolError> {
        let raw = self.take(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(raw);
        Ok(i64::from_le_bytes(bytes))
    }

    fn read_cstring(&mut self) -> Result<String, ProtocolError> {
        let nul = self
            .buf
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| ProtocolError::Malformed("unterminated string".into()))?;
        let raw = self.take(nul + 1)?;
        String::from_utf8(raw[..nul].to_vec())
            .map_err(|e| ProtocolError::Malformed(format!("invalid utf-8 string: {e}")))
    }

    fn read_document(&mut self) -> Result<Document, ProtocolError> {
        let len = self.read_u32()? as usize;
        let raw = self.take(len)?;
        serde_json::from_slice(raw)
            .map_err(|e| ProtocolError::Malformed(format!("invalid document: {e}")))
    }

    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

fn put_cstring(buf: &mut BytesMut, s: &str) {
    buf.put_slice(s.as_bytes());
    buf.put_u8(0);
}

fn put_document(buf: &mut BytesMut, doc: &Document) -> Result<(), ProtocolError> {
    let raw = serde_json::to_vec(doc)
        .map_err(|e| ProtocolError::Malformed(format!("unencodable document: {e}")))?;
    buf.put_u32_le(raw.len() as u32);
    buf.put_slice(&raw);
    Ok(())
}

// ── typed views ─────────────────────────────────────────────────────────

/// Body of a `Query` request.
#[derive(Debug, Clone)]
pub struct QueryBody {
    pub flags: QueryFlags,
    pub collection: String,
    pub number_to_skip: i32,
    pub number_to_return: i32,
    pub query: Document,
}

impl QueryBody {
    pub fn parse(msg: &Message) -> Result<Self, ProtocolError> {
        let mut r = BodyReader::new(&msg.body);
        let flags = QueryFlags::from_bits_retain(r.read_u32()?);
        let collection = r.read_cstring()?;
        let number_to_skip = r.read_i32()?;
        let number_to_return = r.read_i32()?;
        let query = r.read_document()?;
        Ok(Self {
            flags,
            collection,
            number_to_skip,
            number_to_return,
            query,
        })
    }

    pub fn into_message(self, request_id: u32) -> Result<Message, ProtocolError> {
        let mut buf = BytesMut::new();
        buf.put_u32_le(self.flags.bits());
        put_cstring(&mut buf, &self.collection);
        buf.put_i32_le(self.number_to_skip);
        buf.put_i32_le(self.number_to_return);
        put_document(&mut buf, &self.query)?;
        Ok(Message::new(OpCode::Query as u32, request_id, 0, buf.freeze()))
    }
}

/// Body of a `Command` request: command name plus the args and metadata
/// documents.
#[derive(Debug, Clone)]
pub struct CommandBody {
    pub database: String,
    pub name: String,
    pub metadata: Document,
    pub args: Document,
}

impl CommandBody {
    pub fn parse(msg: &Message) -> Result<Self, ProtocolError> {
        let mut r = BodyReader::new(&msg.body);
        let database = r.read_cstring()?;
        let name = r.read_cstring()?;
        let metadata = r.read_document()?;
        let args = r.read_document()?;
        Ok(Self {
            database,
            name,
            metadata,
            args,
        })
    }

    pub fn into_message(self, request_id: u32) -> Result<Message, ProtocolError> {
        let mut buf = BytesMut::new();
        put_cstring(&mut buf, &self.database);
        put_cstring(&mut buf, &self.name);
        put_document(&mut buf, &self.metadata)?;
        put_document(&mut buf, &self.args)?;
        Ok(Message::new(
            OpCode::Command as u32,
            request_id,
            0,
            buf.freeze(),
        ))
    }
}

/// Body of a `Reply`. The embedded cursor id is what terminates exhaust
/// streams: a reply carrying cursor id 0 is the last of its batch.
#[derive(Debug, Clone)]
pub struct ReplyBody {
    pub response_flags: u32,
    pub cursor_id: i64,
    pub starting_from: i32,
    pub documents: Vec<Document>,
}

impl ReplyBody {
    pub fn parse(msg: &Message) -> Result<Self, ProtocolError> {
        let mut r = BodyReader::new(&msg.body);
        let response_flags = r.read_u32()?;
        let cursor_id = r.read_i64()?;
        let starting_from = r.read_i32()?;
        let number_returned = r.read_i32()?;
        let mut documents = Vec::with_capacity(number_returned.max(0) as usize);
        while !r.is_empty() {
            documents.push(r.read_document()?);
        }
        Ok(Self {
            response_flags,
            cursor_id,
            starting_from,
            documents,
        })
    }

    pub fn into_message(self, request_id: u32) -> Result<Message, ProtocolError> {
        let mut buf = BytesMut::new();
        buf.put_u32_le(self.response_flags);
        buf.put_i64_le(self.cursor_id);
        buf.put_i32_le(self.starting_from);
        buf.put_i32_le(self.documents.len() as i32);
        for doc in &self.documents {
            put_document(&mut buf, doc)?;
        }
        Ok(Message::new(OpCode::Reply as u32, request_id, 0, buf.freeze()))
    }
}

/// Read just the cursor id out of a reply without decoding its documents.
pub fn reply_cursor_id(msg: &Message) -> Result<i64, ProtocolError> {
    if msg.operation() != Some(OpCode::Reply) {
        return Err(ProtocolError::Malformed(format!(
            "expected a reply, got op code {}",
            msg.raw_op_code()
        )));
    }
    let mut r = BodyReader::new(&msg.body);
    let _flags = r.read_u32()?;
    r.read_i64()
}
