// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The in-memory ("heap") implementation of the sorted-data contract.
//!
//! The entry store itself is owned by the catalog through a shared cell,
//! so an index handle can be dropped and reopened without losing data.
//! All operations run under the owner's collection lock discipline; the
//! `RwLock` here only re-establishes that discipline at the Rust level
//! and is never contended in correct use.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use crate::{
    doc::Document,
    index::{
        bulk::BulkBuilder,
        cursor::HeapCursor,
        entry::RecordId,
        ordering::IndexInfo,
        store::EntryStore,
    },
};

/// Store cell shared between the catalog, the index handle and cursors.
pub type SharedEntryStore = Arc<RwLock<EntryStore>>;

pub(crate) fn read_store(store: &SharedEntryStore) -> RwLockReadGuard<'_, EntryStore> {
    store.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_store(store: &SharedEntryStore) -> RwLockWriteGuard<'_, EntryStore> {
    store.write().unwrap_or_else(PoisonError::into_inner)
}

/// Unique-constraint violation.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("E11000 duplicate key error dup key: {key}")]
    DuplicateKey { key: Document },
}

pub(crate) fn dup_key_error(key: &Document) -> IndexError {
    IndexError::DuplicateKey { key: key.clone() }
}

/// The sorted-data contract an index backend exposes to its owner.
pub trait SortedData {
    fn insert(
        &self,
        key: &Document,
        loc: RecordId,
        dups_allowed: bool,
    ) -> Result<(), IndexError>;

    /// Remove the exact (key, locator) entry; true iff one was removed.
    fn unindex(&self, key: &Document, loc: RecordId) -> bool;

    /// Fails iff an entry with an equal key points at a different record.
    fn dup_key_check(&self, key: &Document, loc: RecordId) -> Result<(), IndexError>;

    fn is_empty(&self) -> bool;

    /// Report the number of entries and sweep the order invariant.
    fn full_validate(&self, num_keys_out: &mut u64);

    /// Everything is already in memory.
    fn touch(&self) {}

    fn init_as_empty(&self) {}

    /// Append-only builder; the store must start empty.
    fn bulk_builder(&self, dups_allowed: bool) -> BulkBuilder;

    /// `direction` is +1 (forward) or -1 (reverse).
    fn new_cursor(&self, direction: i32) -> HeapCursor;
}

/// Index handle bound to one catalog entry.
#[derive(Debug)]
pub struct HeapIndex {
    info: Arc<IndexInfo>,
    store: SharedEntryStore,
}

fn check_entry_args(key: &Document, loc: RecordId) {
    assert!(!loc.is_null(), "record locator must not be null");
    assert!(loc.is_valid(), "record locator must be valid");
    assert!(
        !key.has_field_names(),
        "index keys must have field names stripped"
    );
}

impl SortedData for HeapIndex {
    fn insert(
        &self,
        key: &Document,
        loc: RecordId,
        dups_allowed: bool,
    ) -> Result<(), IndexError> {
        check_entry_args(key, loc);

        let mut store = write_store(&self.store);
        if !dups_allowed && store.has_other_loc_for_key(key, loc) {
            return Err(dup_key_error(key));
        }
        // Re-inserting the exact same entry is an idempotent no-op.
        store.insert(key, loc);
        Ok(())
    }

    fn unindex(&self, key: &Document, loc: RecordId) -> bool {
        check_entry_args(key, loc);

        let num_deleted = write_store(&self.store).erase(key, loc);
        debug_assert!(num_deleted <= 1);
        num_deleted == 1
    }

    fn dup_key_check(&self, key: &Document, loc: RecordId) -> Result<(), IndexError> {
        assert!(
            !key.has_field_names(),
            "index keys must have field names stripped"
        );
        let store = read_store(&self.store);
        if store.has_other_loc_for_key(key, loc) {
            return Err(dup_key_error(key));
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        read_store(&self.store).is_empty()
    }

    fn full_validate(&self, num_keys_out: &mut u64) {
        let store = read_store(&self.store);
        assert!(
            store.is_strictly_ordered(),
            "index {} entries out of order",
            self.info.name
        );
        *num_keys_out = store.len() as u64;
    }

    fn bulk_builder(&self, dups_allowed: bool) -> BulkBuilder {
        BulkBuilder::new(Arc::clone(&self.store), dups_allowed)
    }

    fn new_cursor(&self, direction: i32) -> HeapCursor {
        HeapCursor::new(Arc::clone(&self.store), direction)
    }
}

/// Create an index handle over the shared store cell, building the cell
/// from the descriptor's ordering when this is the first open.
pub fn make_heap_index(
    info: Arc<IndexInfo>,
    shared: &mut Option<SharedEntryStore>,
) -> HeapIndex {
    let store = match shared {
        Some(existing) => Arc::clone(existing),
        None => {
            let created = Arc::new(RwLock::new(EntryStore::new(info.ordering.clone())));
            *shared = Some(Arc::clone(&created));
            created
        },
    };
    HeapIndex { info, store }
}
