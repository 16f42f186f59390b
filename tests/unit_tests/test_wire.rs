// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fs;

use anyhow::Result;
use docdb_rs::{
    doc::{Document, Value},
    wire::{
        CommandBody, Message, OpCode, QueryBody, QueryFlags, ReplyBody,
        message::reply_cursor_id,
    },
};
use hex::FromHex;

// Helper to load a hex fixture and decode it to a byte vector.
fn load_fixture(path: &str) -> Result<Vec<u8>> {
    let s = fs::read_to_string(path)?;
    let cleaned = s.trim().replace(|c: char| c.is_whitespace(), "");
    Ok(Vec::from_hex(&cleaned)?)
}

#[test]
fn exhaust_flag_is_bit_six() {
    assert_eq!(QueryFlags::EXHAUST.bits(), 1 << 6);
}

#[test]
fn query_frame_parses() -> Result<()> {
    let bytes = load_fixture("tests/unit_tests/fixtures/wire/query_exhaust.hex")?;
    let msg = Message::decode(&bytes)?;

    assert_eq!(msg.operation(), Some(OpCode::Query));
    assert_eq!(msg.request_id(), 42);
    assert_eq!(msg.response_to(), 0);

    let query = QueryBody::parse(&msg)?;
    assert!(query.flags.contains(QueryFlags::EXHAUST));
    assert_eq!(query.collection, "db.coll");
    assert_eq!(query.number_to_skip, 0);
    assert_eq!(query.number_to_return, 1);
    assert_eq!(query.query.first_name(), Some("ping"));
    assert_eq!(query.query.get("ping"), Some(&Value::Int(1)));
    Ok(())
}

#[test]
fn query_frame_rebuilds_byte_identical() -> Result<()> {
    let bytes = load_fixture("tests/unit_tests/fixtures/wire/query_exhaust.hex")?;
    let msg = Message::decode(&bytes)?;

    let rebuilt = QueryBody::parse(&msg)?.into_message(msg.request_id())?;
    assert_eq!(rebuilt.encode().as_ref(), bytes.as_slice());
    Ok(())
}

#[test]
fn reply_frame_exposes_cursor_id() -> Result<()> {
    let bytes = load_fixture("tests/unit_tests/fixtures/wire/reply_cursor.hex")?;
    let msg = Message::decode(&bytes)?;

    assert_eq!(msg.operation(), Some(OpCode::Reply));
    assert_eq!(msg.response_to(), 42);
    assert_eq!(reply_cursor_id(&msg)?, 42);

    let reply = ReplyBody::parse(&msg)?;
    assert_eq!(reply.cursor_id, 42);
    assert_eq!(reply.documents.len(), 1);
    assert_eq!(reply.documents[0].get("ok"), Some(&Value::Int(1)));
    Ok(())
}

#[test]
fn cursor_id_refuses_non_replies() -> Result<()> {
    let bytes = load_fixture("tests/unit_tests/fixtures/wire/query_exhaust.hex")?;
    let msg = Message::decode(&bytes)?;
    assert!(reply_cursor_id(&msg).is_err());
    Ok(())
}

#[test]
fn command_body_round_trip() -> Result<()> {
    let body = CommandBody {
        database: "admin".to_string(),
        name: "delayMessagesFrom".to_string(),
        metadata: Document::new().with("$forBridge", true),
        args: Document::new()
            .with("host", "10.0.0.1:27017")
            .with("delay", 200i64),
    };
    let msg = body.into_message(9)?;
    assert_eq!(msg.operation(), Some(OpCode::Command));

    let parsed = CommandBody::parse(&msg)?;
    assert_eq!(parsed.database, "admin");
    assert_eq!(parsed.name, "delayMessagesFrom");
    assert!(parsed
        .metadata
        .get("$forBridge")
        .is_some_and(Value::truthy));
    assert_eq!(parsed.args.get("delay"), Some(&Value::Int(200)));
    Ok(())
}

#[test]
fn bad_lengths_are_rejected() -> Result<()> {
    let bytes = load_fixture("tests/unit_tests/fixtures/wire/query_exhaust.hex")?;

    // Truncated frame: the header's length word no longer matches.
    assert!(Message::decode(&bytes[..bytes.len() - 1]).is_err());
    // Too short to even carry a header.
    assert!(Message::decode(&bytes[..8]).is_err());
    Ok(())
}

#[test]
fn unknown_op_codes_still_decode() -> Result<()> {
    let msg = Message::new(31337, 1, 0, bytes::Bytes::new());
    let decoded = Message::decode(&msg.encode())?;
    assert_eq!(decoded.operation(), None);
    assert_eq!(decoded.raw_op_code(), 31337);
    Ok(())
}
