// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use docdb_rs::{
    doc::{Document, Value},
    index::{
        HeapIndex, IndexInfo, IndexOrdering, RecordId, SortedData, make_heap_index,
    },
};

fn key(v: i64) -> Document {
    Document::unnamed([Value::Int(v)])
}

fn loc(n: i32) -> RecordId {
    RecordId::new(0, n)
}

fn empty_index() -> HeapIndex {
    let info = Arc::new(IndexInfo::new("bulk_idx", IndexOrdering::from_signs(&[1])));
    make_heap_index(info, &mut None)
}

#[test]
fn committed_build_keeps_entries() {
    let index = empty_index();

    let mut builder = index.bulk_builder(true);
    for i in 1..=4 {
        builder.add_key(&key(i), loc(i as i32)).expect("add_key");
    }
    assert_eq!(builder.commit(), 4);

    assert!(!index.is_empty());
    let mut cursor = index.new_cursor(1);
    assert!(cursor.locate(&key(1), RecordId::MIN));
}

#[test]
fn dropped_build_clears_the_store() {
    let index = empty_index();

    {
        let mut builder = index.bulk_builder(true);
        builder.add_key(&key(1), loc(1)).expect("add_key");
        builder.add_key(&key(2), loc(2)).expect("add_key");
        // No commit.
    }

    assert!(index.is_empty());
}

#[test]
fn unique_build_rejects_duplicate_keys() {
    let index = empty_index();

    let mut builder = index.bulk_builder(false);
    builder.add_key(&key(1), loc(1)).expect("add_key");
    let err = builder
        .add_key(&key(1), loc(2))
        .expect_err("duplicate key under unique build");
    assert!(err.to_string().contains("E11000"));
}

#[test]
#[should_panic(expected = "empty index")]
fn build_requires_an_empty_store() {
    let index = empty_index();
    index.insert(&key(1), loc(1), true).expect("insert");
    let _ = index.bulk_builder(true);
}
