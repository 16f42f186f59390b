// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The ordered set backing a heap index.
//!
//! `BTreeSet` orders elements through `Ord`, so every element carries the
//! index ordering it must be compared under. Search probes are built the
//! same way; a probe may additionally carry the per-position
//! discriminators of a synthetic search key, in which case the record
//! locator is ignored and full-key ties compare equal. Probes exist only
//! for the duration of one search and never enter the set.

use std::{cmp::Ordering as Cmp, collections::BTreeSet, ops::Bound, sync::Arc};

use crate::{
    doc::Document,
    index::{
        entry::{IndexEntry, RecordId},
        ordering::{Discriminator, IndexOrdering, KeyQuery},
    },
};

struct SetEntry {
    ordering: Arc<IndexOrdering>,
    key: Document,
    loc: RecordId,
    discriminators: Option<Vec<Discriminator>>,
}

impl SetEntry {
    fn to_entry(&self) -> IndexEntry {
        IndexEntry::new(self.key.clone(), self.loc)
    }
}

impl Ord for SetEntry {
    fn cmp(&self, other: &Self) -> Cmp {
        if let Some(disc) = &self.discriminators {
            return self
                .ordering
                .compare_query_to_key(&self.key, disc, &other.key);
        }
        if let Some(disc) = &other.discriminators {
            return other
                .ordering
                .compare_query_to_key(&other.key, disc, &self.key)
                .reverse();
        }
        let by_key = self.ordering.compare_keys(&self.key, &other.key);
        if by_key != Cmp::Equal {
            return by_key;
        }
        // Locator is the secondary sort; it keeps duplicate keys strictly
        // ordered instead of collapsing them.
        self.loc.cmp(&other.loc)
    }
}

impl PartialOrd for SetEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Cmp> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SetEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Cmp::Equal
    }
}

impl Eq for SetEntry {}

impl std::fmt::Debug for SetEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SetEntry({} @ {})", self.key, self.loc)
    }
}

/// Ordered collection of (key, locator) entries with logarithmic insert,
/// erase and bound searches.
#[derive(Debug)]
pub struct EntryStore {
    ordering: Arc<IndexOrdering>,
    set: BTreeSet<SetEntry>,
}

impl EntryStore {
    pub fn new(ordering: IndexOrdering) -> Self {
        Self {
            ordering: Arc::new(ordering),
            set: BTreeSet::new(),
        }
    }

    pub fn ordering(&self) -> &IndexOrdering {
        &self.ordering
    }

    fn probe(&self, key: &Document, loc: RecordId) -> SetEntry {
        SetEntry {
            ordering: Arc::clone(&self.ordering),
            key: key.clone(),
            loc,
            discriminators: None,
        }
    }

    fn query_probe(&self, query: &KeyQuery) -> SetEntry {
        SetEntry {
            ordering: Arc::clone(&self.ordering),
            key: query.key.clone(),
            loc: RecordId::null(),
            discriminators: Some(query.discriminators.clone()),
        }
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn clear(&mut self) {
        self.set.clear();
    }

    /// Insert a deep-owned copy of the entry; returns whether it was new.
    pub fn insert(&mut self, key: &Document, loc: RecordId) -> bool {
        self.set.insert(self.probe(key, loc))
    }

    /// Erase the entry matching exactly this key AND locator; returns the
    /// number of entries removed (0 or 1).
    pub fn erase(&mut self, key: &Document, loc: RecordId) -> usize {
        usize::from(self.set.remove(&self.probe(key, loc)))
    }

    /// First entry greater than or equal to (key, loc).
    pub fn lower_bound(&self, key: &Document, loc: RecordId) -> Option<IndexEntry> {
        self.set
            .range((Bound::Included(self.probe(key, loc)), Bound::Unbounded))
            .next()
            .map(SetEntry::to_entry)
    }

    /// First entry strictly greater than (key, loc).
    pub fn upper_bound(&self, key: &Document, loc: RecordId) -> Option<IndexEntry> {
        self.set
            .range((Bound::Excluded(self.probe(key, loc)), Bound::Unbounded))
            .next()
            .map(SetEntry::to_entry)
    }

    /// Last entry less than or equal to (key, loc): the reverse-iteration
    /// counterpart of `lower_bound`, spelled as `upper_bound` and one
    /// step left.
    pub fn last_at_or_before(&self, key: &Document, loc: RecordId) -> Option<IndexEntry> {
        self.set
            .range((Bound::Unbounded, Bound::Included(self.probe(key, loc))))
            .next_back()
            .map(SetEntry::to_entry)
    }

    /// Last entry strictly less than (key, loc).
    pub fn last_before(&self, key: &Document, loc: RecordId) -> Option<IndexEntry> {
        self.set
            .range((Bound::Unbounded, Bound::Excluded(self.probe(key, loc))))
            .next_back()
            .map(SetEntry::to_entry)
    }

    /// First entry at or past the synthetic search key.
    pub fn lower_bound_query(&self, query: &KeyQuery) -> Option<IndexEntry> {
        self.set
            .range((Bound::Included(self.query_probe(query)), Bound::Unbounded))
            .next()
            .map(SetEntry::to_entry)
    }

    /// Last entry at or before the synthetic search key.
    pub fn last_at_or_before_query(&self, query: &KeyQuery) -> Option<IndexEntry> {
        self.set
            .range((Bound::Unbounded, Bound::Included(self.query_probe(query))))
            .next_back()
            .map(SetEntry::to_entry)
    }

    /// True when some entry shares this key but points at a different
    /// record. Re-indexing the same record under the same key is not a
    /// duplicate.
    pub fn has_other_loc_for_key(&self, key: &Document, loc: RecordId) -> bool {
        let from = self.probe(key, RecordId::MIN);
        let to = self.probe(key, RecordId::MAX);
        self.set
            .range((Bound::Included(from), Bound::Included(to)))
            .any(|e| e.loc != loc)
    }

    /// Walk adjacent pairs and confirm the set is strictly ordered under
    /// the comparator. Cheap, and only ever called from validation.
    pub fn is_strictly_ordered(&self) -> bool {
        let mut prev: Option<&SetEntry> = None;
        for entry in &self.set {
            if let Some(p) = prev
                && p.cmp(entry) != Cmp::Less
            {
                return false;
            }
            prev = Some(entry);
        }
        true
    }
}
