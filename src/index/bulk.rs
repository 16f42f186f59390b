// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    doc::Document,
    index::{
        entry::RecordId,
        heap::{IndexError, SharedEntryStore, dup_key_error, read_store, write_store},
    },
};

/// Append-only construction of a fresh index. The caller presents keys in
/// non-decreasing order; correctness does not depend on it, only the
/// amortised insert cost does. Dropping the builder without `commit`
/// clears everything it added.
#[derive(Debug)]
pub struct BulkBuilder {
    store: SharedEntryStore,
    dups_allowed: bool,
    committed: bool,
}

impl BulkBuilder {
    pub(crate) fn new(store: SharedEntryStore, dups_allowed: bool) -> Self {
        assert!(
            read_store(&store).is_empty(),
            "bulk build requires an empty index"
        );
        Self {
            store,
            dups_allowed,
            committed: false,
        }
    }

    pub fn add_key(&mut self, key: &Document, loc: RecordId) -> Result<(), IndexError> {
        assert!(!loc.is_null(), "record locator must not be null");
        assert!(loc.is_valid(), "record locator must be valid");
        assert!(
            !key.has_field_names(),
            "index keys must have field names stripped"
        );

        let mut store = write_store(&self.store);
        // TODO optimization: with ordered input a dup is only possible
        // against the last inserted key, which would avoid the lookup.
        if !self.dups_allowed && store.has_other_loc_for_key(key, loc) {
            return Err(dup_key_error(key));
        }
        store.insert(key, loc);
        Ok(())
    }

    /// Mark the build successful and return the final entry count.
    pub fn commit(mut self) -> u64 {
        self.committed = true;
        read_store(&self.store).len() as u64
    }
}

impl Drop for BulkBuilder {
    fn drop(&mut self) {
        if !self.committed {
            write_store(&self.store).clear();
        }
    }
}
