// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::cmp::Ordering;

use docdb_rs::{
    doc::{Document, Value},
    index::IndexOrdering,
};

fn key(values: impl IntoIterator<Item = Value>) -> Document {
    Document::unnamed(values)
}

#[test]
fn ascending_single_field() {
    let ord = IndexOrdering::from_signs(&[1]);
    assert_eq!(
        ord.compare_keys(&key([Value::Int(1)]), &key([Value::Int(2)])),
        Ordering::Less
    );
    assert_eq!(
        ord.compare_keys(&key([Value::Int(2)]), &key([Value::Int(2)])),
        Ordering::Equal
    );
    assert_eq!(
        ord.compare_keys(&key([Value::Int(3)]), &key([Value::Int(2)])),
        Ordering::Greater
    );
}

#[test]
fn descending_flips_field_order() {
    let ord = IndexOrdering::from_signs(&[-1]);
    assert_eq!(
        ord.compare_keys(&key([Value::Int(1)]), &key([Value::Int(2)])),
        Ordering::Greater
    );
    assert_eq!(
        ord.compare_keys(&key([Value::Int(3)]), &key([Value::Int(2)])),
        Ordering::Less
    );
}

#[test]
fn compound_directions_apply_per_position() {
    // (ascending, descending): first field decides normally, ties fall
    // through to the reversed second field.
    let ord = IndexOrdering::from_signs(&[1, -1]);

    let a = key([Value::Int(1), Value::Int(10)]);
    let b = key([Value::Int(1), Value::Int(20)]);
    assert_eq!(ord.compare_keys(&a, &b), Ordering::Greater);

    let c = key([Value::Int(0), Value::Int(99)]);
    assert_eq!(ord.compare_keys(&c, &a), Ordering::Less);
}

#[test]
fn shorter_key_is_less() {
    let ord = IndexOrdering::from_signs(&[1, 1]);
    let short = key([Value::Int(1)]);
    let long = key([Value::Int(1), Value::Int(0)]);
    assert_eq!(ord.compare_keys(&short, &long), Ordering::Less);
    assert_eq!(ord.compare_keys(&long, &short), Ordering::Greater);
}

#[test]
fn cross_type_values_compare_by_rank() {
    let ord = IndexOrdering::from_signs(&[1]);
    let null = key([Value::Null]);
    let number = key([Value::Int(0)]);
    let string = key([Value::String("".into())]);
    let boolean = key([Value::Bool(false)]);

    assert_eq!(ord.compare_keys(&null, &number), Ordering::Less);
    assert_eq!(ord.compare_keys(&number, &string), Ordering::Less);
    assert_eq!(ord.compare_keys(&string, &boolean), Ordering::Less);
}

#[test]
fn field_names_are_ignored_by_comparison() {
    // Keys reach the comparator stripped; equality must hold on values
    // alone even if one side kept its names.
    let ord = IndexOrdering::from_signs(&[1]);
    let named = Document::new().with("a", 5i64);
    let anonymous = key([Value::Int(5)]);
    assert_eq!(
        ord.compare_keys(&named.strip_field_names(), &anonymous),
        Ordering::Equal
    );
}
