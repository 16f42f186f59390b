// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use docdb_rs::{
    bridge::{CommandError, CommandRegistry, HostAndPort, HostState, PolicyTable},
    doc::{Document, Value},
};

fn host() -> HostAndPort {
    "10.0.0.1:27017".parse().expect("valid host")
}

fn host_arg() -> Document {
    Document::new().with("host", "10.0.0.1:27017")
}

#[test]
fn unknown_hosts_forward_undelayed() {
    let table = PolicyTable::new();
    let policy = table.policy_for(&host());
    assert_eq!(policy.state, HostState::Forward);
    assert_eq!(policy.delay, Duration::ZERO);
}

#[test]
fn delay_messages_from_sets_forward_with_delay() {
    let registry = CommandRegistry::new();
    let table = PolicyTable::new();

    registry
        .run(
            "delayMessagesFrom",
            &host_arg().with("delay", 200i64),
            &table,
        )
        .expect("command runs");

    let policy = table.policy_for(&host());
    assert_eq!(policy.state, HostState::Forward);
    assert_eq!(policy.delay, Duration::from_millis(200));
}

#[test]
fn reject_then_accept_round_trip() {
    let registry = CommandRegistry::new();
    let table = PolicyTable::new();

    registry
        .run("rejectConnectionsFrom", &host_arg(), &table)
        .expect("reject runs");
    assert_eq!(table.policy_for(&host()).state, HostState::HangUp);

    registry
        .run("acceptConnectionsFrom", &host_arg(), &table)
        .expect("accept runs");
    assert_eq!(table.policy_for(&host()).state, HostState::Forward);
}

#[test]
fn accept_does_not_reset_delay() {
    let registry = CommandRegistry::new();
    let table = PolicyTable::new();

    registry
        .run(
            "delayMessagesFrom",
            &host_arg().with("delay", 150i64),
            &table,
        )
        .expect("delay runs");
    registry
        .run("rejectConnectionsFrom", &host_arg(), &table)
        .expect("reject runs");
    registry
        .run("acceptConnectionsFrom", &host_arg(), &table)
        .expect("accept runs");

    let policy = table.policy_for(&host());
    assert_eq!(policy.state, HostState::Forward);
    assert_eq!(policy.delay, Duration::from_millis(150));
}

#[test]
fn missing_fields_are_bad_values() {
    let registry = CommandRegistry::new();
    let table = PolicyTable::new();

    let err = registry
        .run("rejectConnectionsFrom", &Document::new(), &table)
        .expect_err("missing host");
    assert!(matches!(err, CommandError::BadValue("host")));
    assert_eq!(err.code(), 2);

    let err = registry
        .run("delayMessagesFrom", &host_arg(), &table)
        .expect_err("missing delay");
    assert!(matches!(err, CommandError::BadValue("delay")));
}

#[test]
fn wrong_types_are_type_mismatches() {
    let registry = CommandRegistry::new();
    let table = PolicyTable::new();

    let err = registry
        .run(
            "acceptConnectionsFrom",
            &Document::new().with("host", 42i64),
            &table,
        )
        .expect_err("host must be a string");
    assert!(matches!(err, CommandError::TypeMismatch("host", _)));
    assert_eq!(err.code(), 14);

    let err = registry
        .run(
            "delayMessagesFrom",
            &host_arg().with("delay", "soon"),
            &table,
        )
        .expect_err("delay must be a number");
    assert!(matches!(err, CommandError::TypeMismatch("delay", _)));
}

#[test]
fn fractional_delay_is_accepted() {
    let registry = CommandRegistry::new();
    let table = PolicyTable::new();

    registry
        .run(
            "delayMessagesFrom",
            &host_arg().with("delay", Value::Double(250.0)),
            &table,
        )
        .expect("numeric delay of either flavour");
    assert_eq!(table.policy_for(&host()).delay, Duration::from_millis(250));
}

#[test]
fn unknown_command_name() {
    let registry = CommandRegistry::new();
    let table = PolicyTable::new();

    let err = registry
        .run("dropAllTraffic", &host_arg(), &table)
        .expect_err("no such command");
    assert!(matches!(err, CommandError::CommandNotFound(_)));
    assert_eq!(err.code(), 59);
}

#[test]
fn unparsable_host_is_an_operation_failure() {
    let registry = CommandRegistry::new();
    let table = PolicyTable::new();

    let err = registry
        .run(
            "rejectConnectionsFrom",
            &Document::new().with("host", "not-a-host-port"),
            &table,
        )
        .expect_err("host must be host:port");
    assert!(matches!(err, CommandError::OperationFailed(_)));
    assert_eq!(err.code(), 96);
}
