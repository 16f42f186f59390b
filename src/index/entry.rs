// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fmt;

use crate::doc::Document;

/// Compact record locator: the (segment, offset) address of a record in
/// the backing store. Ordered lexicographically, which matches insertion
/// order into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId {
    pub segment: i32,
    pub offset: i32,
}

impl RecordId {
    /// Sorts before every valid locator; search probes only.
    pub const MIN: RecordId = RecordId {
        segment: i32::MIN,
        offset: i32::MIN,
    };
    /// Sorts after every valid locator; search probes only.
    pub const MAX: RecordId = RecordId {
        segment: i32::MAX,
        offset: i32::MAX,
    };

    pub fn new(segment: i32, offset: i32) -> Self {
        Self { segment, offset }
    }

    /// The reserved "no record" locator.
    pub fn null() -> Self {
        Self {
            segment: -1,
            offset: -1,
        }
    }

    pub fn is_null(&self) -> bool {
        self.segment == -1 && self.offset == -1
    }

    pub fn is_valid(&self) -> bool {
        !self.is_null() && self.offset >= 0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.segment, self.offset)
    }
}

/// One slot of the index: a key paired with the locator of the record it
/// points at. Entries with equal keys are kept apart by the locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: Document,
    pub loc: RecordId,
}

impl IndexEntry {
    pub fn new(key: Document, loc: RecordId) -> Self {
        Self { key, loc }
    }
}

impl fmt::Display for IndexEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} @ {})", self.key, self.loc)
    }
}
