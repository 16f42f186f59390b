// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use docdb_rs::{
    doc::Value,
    wire::{MessagingPort, ReplyBody},
};
use serial_test::serial;

use crate::integration_tests::common::{
    EXHAUST_CURSOR_IDS, StubUpstream, ping_query, spawn_bridge,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn exhaust_query_streams_until_cursor_zero() -> Result<()> {
    let upstream = StubUpstream::spawn().await?;
    let (_bridge, bridge_addr) = spawn_bridge(upstream.addr).await?;

    let client = MessagingPort::connect(&bridge_addr.to_string()).await?;
    client.say(&ping_query(9, None, true)?, 0).await?;

    // Every streamed reply answers the original query, in upstream
    // order, ending with the zero cursor.
    for (i, expected_cursor) in EXHAUST_CURSOR_IDS.iter().enumerate() {
        let reply = client.recv().await?;
        assert_eq!(reply.response_to(), 9);
        let body = ReplyBody::parse(&reply)?;
        assert_eq!(body.cursor_id, *expected_cursor);
        assert_eq!(body.documents[0].get("n"), Some(&Value::Int(i as i64)));
    }

    // The forwarder goes back to reading the inbound side afterwards.
    let reply = client.call(&ping_query(10, None, false)?).await?;
    assert_eq!(reply.response_to(), 10);
    let body = ReplyBody::parse(&reply)?;
    assert_eq!(body.documents[0].get("ok"), Some(&Value::Int(1)));
    Ok(())
}
