//! Expiry index for lazy expiration
//!
//! Maps expiry timestamp → set of primary keys, so expired records can be
//! enumerated in expiry order without scanning the primary tree:
//! - `find_expired(now)` is O(expired count), not O(table size)
//! - records are never evicted from here on their own; the table removes
//!   entries when a record is replaced or deleted

use doctable_core::{Key, Timestamp};
use std::collections::{BTreeMap, BTreeSet};

/// Expiry index: expiry timestamp → keys
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    index: BTreeMap<Timestamp, BTreeSet<Key>>,
}

impl ExpiryIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self {
            index: BTreeMap::new(),
        }
    }

    /// Register `key` as expiring at `expires_at`
    pub fn insert(&mut self, expires_at: Timestamp, key: Key) {
        self.index.entry(expires_at).or_default().insert(key);
    }

    /// Remove `key` from the bucket for `expires_at`
    ///
    /// Empty buckets are dropped.
    pub fn remove(&mut self, expires_at: Timestamp, key: &Key) {
        if let Some(keys) = self.index.get_mut(&expires_at) {
            keys.remove(key);
            if keys.is_empty() {
                self.index.remove(&expires_at);
            }
        }
    }

    /// Keys whose expiry is strictly before `now`, earliest first
    ///
    /// Keys sharing an expiry come out in primary-key order.
    pub fn find_expired(&self, now: Timestamp) -> Vec<Key> {
        self.index
            .range(..now)
            .flat_map(|(_, keys)| keys.iter().cloned())
            .collect()
    }

    /// Earliest registered expiry
    pub fn next_expiry(&self) -> Option<Timestamp> {
        self.index.keys().next().copied()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Total number of keys in the index
    pub fn len(&self) -> usize {
        self.index.values().map(|keys| keys.len()).sum()
    }

    /// Number of distinct expiry timestamps
    pub fn timestamp_count(&self) -> usize {
        self.index.len()
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.index.clear();
    }
}
