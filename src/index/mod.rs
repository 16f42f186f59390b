//! The in-memory sorted index backend.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Append-only bulk construction.
pub mod bulk;
/// Bidirectional positioned cursors.
pub mod cursor;
/// Entries and record locators.
pub mod entry;
/// The sorted-data facade and its heap implementation.
pub mod heap;
/// Key comparison and search-key construction.
pub mod ordering;
/// The ordered entry set.
pub mod store;

pub use bulk::BulkBuilder;
pub use cursor::HeapCursor;
pub use entry::{IndexEntry, RecordId};
pub use heap::{HeapIndex, IndexError, SharedEntryStore, SortedData, make_heap_index};
pub use ordering::{Direction, IndexInfo, IndexOrdering};
