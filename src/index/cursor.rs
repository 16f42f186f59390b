// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Bidirectional positioned cursors.
//!
//! A cursor never holds an iterator into the store; its position is the
//! entry it currently points at, and every movement is a fresh bound
//! search. Mutation of the store between operations therefore cannot
//! leave a cursor dangling, but it can move what `advance` lands on. The
//! save/restore protocol makes that explicit: the saved position is a
//! (key, locator) value and restoring re-runs `locate` against whatever
//! the store holds by then.

use std::sync::Arc;

use crate::{
    doc::{Document, Value},
    index::{
        entry::{IndexEntry, RecordId},
        heap::{SharedEntryStore, read_store},
    },
};

#[derive(Debug, Clone)]
enum SavedPosition {
    AtEnd,
    At { key: Document, loc: RecordId },
}

/// Forward (+1) or reverse (-1) cursor over one index.
#[derive(Debug)]
pub struct HeapCursor {
    store: SharedEntryStore,
    direction: i32,
    /// `None` is the end state on either side.
    current: Option<IndexEntry>,
    saved: Option<SavedPosition>,
}

impl HeapCursor {
    pub(crate) fn new(store: SharedEntryStore, direction: i32) -> Self {
        assert!(
            direction == 1 || direction == -1,
            "cursor direction must be +1 or -1"
        );
        Self {
            store,
            direction,
            current: None,
            saved: None,
        }
    }

    pub fn direction(&self) -> i32 {
        self.direction
    }

    pub fn is_eof(&self) -> bool {
        self.current.is_none()
    }

    /// Position at the first entry on the cursor's side of (key, loc):
    /// first entry >= for forward, last entry <= for reverse. Returns
    /// true iff the landed entry's key equals `key`; the locator is
    /// intentionally not compared.
    pub fn locate(&mut self, key: &Document, loc: RecordId) -> bool {
        let key = key.strip_field_names();
        let store = read_store(&self.store);
        self.current = if self.direction > 0 {
            store.lower_bound(&key, loc)
        } else {
            store.last_at_or_before(&key, loc)
        };
        match &self.current {
            Some(entry) => {
                store.ordering().compare_keys(&entry.key, &key) == std::cmp::Ordering::Equal
            },
            None => false,
        }
    }

    /// Position using a synthetic search key built from a key prefix and
    /// a per-position-inclusive suffix. Field names are stripped by the
    /// query construction.
    pub fn custom_locate(
        &mut self,
        key_begin: &Document,
        key_begin_len: usize,
        after_key: bool,
        key_end: &[Value],
        key_end_inclusive: &[bool],
    ) {
        let store = read_store(&self.store);
        let query = store.ordering().make_key_query(
            &key_begin.strip_field_names(),
            key_begin_len,
            after_key,
            key_end,
            key_end_inclusive,
            self.direction,
        );
        self.current = if self.direction > 0 {
            store.lower_bound_query(&query)
        } else {
            store.last_at_or_before_query(&query)
        };
    }

    /// Identical to `custom_locate`.
    pub fn advance_to(
        &mut self,
        key_begin: &Document,
        key_begin_len: usize,
        after_key: bool,
        key_end: &[Value],
        key_end_inclusive: &[bool],
    ) {
        self.custom_locate(key_begin, key_begin_len, after_key, key_end, key_end_inclusive);
    }

    /// Key at the current position. Must not be at end.
    pub fn get_key(&self) -> &Document {
        &self
            .current
            .as_ref()
            .expect("cursor is positioned")
            .key
    }

    /// Locator at the current position. Must not be at end.
    pub fn get_locator(&self) -> RecordId {
        self.current.as_ref().expect("cursor is positioned").loc
    }

    /// Step one entry in the cursor's direction; past the last entry the
    /// cursor becomes (and stays) at end.
    pub fn advance(&mut self) {
        let Some(entry) = self.current.take() else {
            return;
        };
        let store = read_store(&self.store);
        self.current = if self.direction > 0 {
            store.upper_bound(&entry.key, entry.loc)
        } else {
            store.last_before(&entry.key, entry.loc)
        };
    }

    /// Snapshot the current position as values. The cursor may be
    /// invalidated by store mutation afterwards.
    pub fn save_position(&mut self) {
        self.saved = Some(match &self.current {
            None => SavedPosition::AtEnd,
            Some(entry) => SavedPosition::At {
                key: entry.key.clone(),
                loc: entry.loc,
            },
        });
    }

    /// Re-position from the snapshot. If the saved entry is gone the
    /// cursor lands on the nearest entry on its side of it, or at end;
    /// callers observe the difference.
    pub fn restore_position(&mut self) {
        let saved = self
            .saved
            .clone()
            .expect("restore_position requires a prior save_position");
        match saved {
            SavedPosition::AtEnd => self.current = None,
            SavedPosition::At { key, loc } => {
                self.locate(&key, loc);
            },
        }
    }

    /// True iff both cursors sit on the same position of the same store.
    pub fn points_to_same_place_as(&self, other: &HeapCursor) -> bool {
        assert!(
            Arc::ptr_eq(&self.store, &other.store),
            "cursors must iterate the same index"
        );
        match (&self.current, &other.current) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Bucket lifecycle callbacks do not apply to an in-memory index.
    pub fn about_to_delete_bucket(&self, _bucket: RecordId) {
        panic!("about_to_delete_bucket should not be called");
    }
}
