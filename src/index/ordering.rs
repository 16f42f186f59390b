// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Key comparison under a per-field direction vector, and construction of
//! the synthetic search keys used for ranged cursor positioning.

use std::cmp::Ordering as Cmp;

use crate::doc::{Document, Value};

/// Per-field sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn sign(self) -> i32 {
        match self {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        }
    }

    fn apply(self, ord: Cmp) -> Cmp {
        match self {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    }
}

/// Immutable descriptor the catalog hands to the index factory.
#[derive(Debug, Clone)]
pub struct IndexInfo {
    pub name: String,
    pub ordering: IndexOrdering,
}

impl IndexInfo {
    pub fn new(name: impl Into<String>, ordering: IndexOrdering) -> Self {
        Self {
            name: name.into(),
            ordering,
        }
    }
}

/// The per-index field-direction vector. Fields beyond the vector's length
/// compare ascending.
#[derive(Debug, Clone, Default)]
pub struct IndexOrdering {
    directions: Vec<Direction>,
}

/// Tie-break applied at one key position of a synthetic search key when
/// the values at that position compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discriminator {
    /// Keep comparing; ties fall through to later positions.
    Inclusive,
    /// The search key sorts before every entry that ties here.
    Less,
    /// The search key sorts after every entry that ties here.
    Greater,
}

/// A fully-specified search key: anonymous key values plus a per-position
/// tie-break. Produced by [`IndexOrdering::make_key_query`].
#[derive(Debug, Clone)]
pub struct KeyQuery {
    pub key: Document,
    pub discriminators: Vec<Discriminator>,
}

impl IndexOrdering {
    pub fn new(directions: Vec<Direction>) -> Self {
        Self { directions }
    }

    /// Shorthand for an ordering built from +1/-1 signs.
    pub fn from_signs(signs: &[i32]) -> Self {
        Self {
            directions: signs
                .iter()
                .map(|s| {
                    if *s < 0 {
                        Direction::Descending
                    } else {
                        Direction::Ascending
                    }
                })
                .collect(),
        }
    }

    fn direction_at(&self, idx: usize) -> Direction {
        self.directions
            .get(idx)
            .copied()
            .unwrap_or(Direction::Ascending)
    }

    /// Pairwise field comparison under the direction vector. Field names
    /// are ignored; keys must already be stripped. If one key runs out of
    /// fields first, the shorter key is less.
    pub fn compare_keys(&self, a: &Document, b: &Document) -> Cmp {
        for (idx, (va, vb)) in a.values().zip(b.values()).enumerate() {
            let ord = self.direction_at(idx).apply(va.cmp(vb));
            if ord != Cmp::Equal {
                return ord;
            }
        }
        a.len().cmp(&b.len())
    }

    /// As `compare_keys`, but the left side carries per-position
    /// discriminators that win ties at their position.
    pub(crate) fn compare_query_to_key(
        &self,
        query_key: &Document,
        discriminators: &[Discriminator],
        key: &Document,
    ) -> Cmp {
        for (idx, (vq, vk)) in query_key.values().zip(key.values()).enumerate() {
            let ord = self.direction_at(idx).apply(vq.cmp(vk));
            if ord != Cmp::Equal {
                return ord;
            }
            match discriminators.get(idx) {
                Some(Discriminator::Less) => return Cmp::Less,
                Some(Discriminator::Greater) => return Cmp::Greater,
                Some(Discriminator::Inclusive) | None => {},
            }
        }
        query_key.len().cmp(&key.len())
    }

    /// Build the search key for ranged positioning. The key consists of
    /// the first `key_begin_len` fields of `key_begin` followed by the
    /// `key_end` values, all anonymous. Exclusivity is encoded as
    /// discriminators:
    ///
    /// * `after_key` marks the last prefix position so the search key
    ///   sorts past every entry sharing the prefix;
    /// * a non-inclusive suffix position sorts the search key past every
    ///   entry tying there.
    ///
    /// "Past" depends on the cursor direction: a forward cursor positions
    /// with `lower_bound`, a reverse cursor with `upper_bound` and one
    /// step left, so the exclusive side flips with `direction`.
    pub fn make_key_query(
        &self,
        key_begin: &Document,
        key_begin_len: usize,
        after_key: bool,
        key_end: &[Value],
        key_end_inclusive: &[bool],
        direction: i32,
    ) -> KeyQuery {
        assert_eq!(
            key_end.len(),
            key_end_inclusive.len(),
            "suffix values and inclusivity flags must be parallel"
        );
        assert!(
            key_begin.len() >= key_begin_len,
            "key prefix is shorter than its declared length"
        );
        // A forward cursor skips ties by sorting the search key after
        // them; a reverse cursor walks leftward, so it skips ties by
        // sorting before them. Inclusive positions tie equal either way.
        let exclusive = if direction >= 0 {
            Discriminator::Greater
        } else {
            Discriminator::Less
        };

        let mut values = Vec::with_capacity(key_begin_len + key_end.len());
        let mut discriminators = Vec::with_capacity(key_begin_len + key_end.len());

        for (idx, value) in key_begin.values().take(key_begin_len).enumerate() {
            values.push(value.clone());
            let last_prefix = idx + 1 == key_begin_len;
            discriminators.push(if after_key && last_prefix {
                exclusive
            } else {
                Discriminator::Inclusive
            });
        }
        for (value, incl) in key_end.iter().zip(key_end_inclusive.iter()) {
            values.push(value.clone());
            discriminators.push(if *incl {
                Discriminator::Inclusive
            } else {
                exclusive
            });
        }

        KeyQuery {
            key: Document::unnamed(values),
            discriminators,
        }
    }
}
