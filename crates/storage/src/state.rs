//! Table state
//!
//! [`TableState`] is the unlocked table: the primary tree, the expiry index
//! and the secondary-index registry, plus the record arena they all point
//! into. [`Table`](crate::Table) wraps it in a lock; everything here assumes
//! the caller already holds the right access.
//!
//! # Invariants
//!
//! - Every record in the arena is reachable from the primary tree under its
//!   own key, and nothing else is.
//! - A record holds an `index_refs` entry for index `i` iff index `i` holds
//!   exactly one entry pointing at that record, under the same key.
//! - A record with `expires_at = Some(t)` is in the expiry index under `t`.
//!
//! Expiry is lazy: reads treat expired records as absent, but nothing is
//! removed until `delete` or `purge_expired`.

use doctable_core::{Error, Key, KeyPattern, Rect, Result, Timestamp};
use doctable_document::Projector;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::TableConfig;
use crate::index::{Index, IndexId, IndexKind};
use crate::ordered::{bounded_range, Span};
use crate::record::{Record, RecordArena, RecordId};
use crate::ttl::ExpiryIndex;

/// Name of the implicit primary index
pub const PRIMARY_INDEX: &str = "";

type Projections = SmallVec<[(IndexId, Key); 4]>;

/// Outcome of an index rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildStats {
    /// Records whose key matched the index pattern
    pub records: usize,
    /// Entries inserted
    pub entries: usize,
    /// Records left out because their value could not be decoded
    pub errors: usize,
}

/// Unlocked table contents
#[derive(Debug)]
pub struct TableState {
    config: TableConfig,
    records: RecordArena,
    primary: BTreeMap<Key, RecordId>,
    expiry: ExpiryIndex,
    registry: BTreeMap<String, IndexId>,
    indexes: FxHashMap<IndexId, Index>,
    next_index_id: u64,
}

impl Default for TableState {
    fn default() -> Self {
        Self::new(TableConfig::default())
    }
}

impl TableState {
    /// Empty table
    pub fn new(config: TableConfig) -> Self {
        TableState {
            config,
            records: RecordArena::new(),
            primary: BTreeMap::new(),
            expiry: ExpiryIndex::new(),
            registry: BTreeMap::new(),
            indexes: FxHashMap::default(),
            next_index_id: 1,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Stored records, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.primary.len()
    }

    /// True when no records are stored
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Insert or replace the record under `key`
    ///
    /// Every matching index is re-projected against the new value; entries
    /// derived from the old value are removed first. All projections are
    /// computed before anything changes, so a value that fails to decode
    /// leaves the table untouched.
    ///
    /// Returns the previous value, unless there was none or it had expired.
    pub fn set(
        &mut self,
        key: Key,
        value: Vec<u8>,
        expires_at: Option<Timestamp>,
    ) -> Result<Option<Vec<u8>>> {
        let projections = self.project_all(&key, &value)?;
        let now = Timestamp::now();

        let existing = self
            .primary
            .get(&key)
            .copied()
            .filter(|id| self.records.get(*id).is_some());
        let (id, previous) = match existing {
            Some(id) => {
                self.unlink(id);
                let mut previous = None;
                if let Some(record) = self.records.get_mut(id) {
                    let expired = record.is_expired(now);
                    let old = std::mem::replace(&mut record.value, value);
                    record.expires_at = expires_at;
                    if !expired {
                        previous = Some(old);
                    }
                }
                (id, previous)
            }
            None => {
                let id = self
                    .records
                    .insert(Record::new(key.clone(), value, expires_at));
                self.primary.insert(key, id);
                (id, None)
            }
        };
        self.link(id, projections);
        Ok(previous)
    }

    /// Value stored under `key`
    ///
    /// `NotFound` when absent or expired.
    pub fn get(&self, key: &Key) -> Result<&[u8]> {
        self.live(key, Timestamp::now())
            .map(|record| record.value.as_slice())
            .ok_or_else(|| not_found(key))
    }

    /// Expiry of the record under `key`, `None` when it never expires
    ///
    /// `NotFound` when absent or expired.
    pub fn expires_at(&self, key: &Key) -> Result<Option<Timestamp>> {
        self.live(key, Timestamp::now())
            .map(|record| record.expires_at)
            .ok_or_else(|| not_found(key))
    }

    /// Remove the record under `key` and return its value
    ///
    /// An expired record is still removed, but reported as `NotFound`.
    pub fn delete(&mut self, key: &Key) -> Result<Vec<u8>> {
        let now = Timestamp::now();
        let record = self.remove_record(key).ok_or_else(|| not_found(key))?;
        if record.is_expired(now) {
            return Err(not_found(key));
        }
        Ok(record.value)
    }

    /// Remove every record and every index
    ///
    /// Indexes are discarded with the data and must be created again.
    pub fn delete_all(&mut self) {
        let records = self.primary.len();
        let indexes = self.registry.len();
        self.records.clear();
        self.primary.clear();
        self.expiry.clear();
        self.registry.clear();
        self.indexes.clear();
        info!(target: "doctable::table", records, indexes, "table cleared");
    }

    /// Primary keys whose expiry is before `now`, earliest expiry first
    pub fn expired_keys(&self, now: Timestamp) -> Vec<Key> {
        self.expiry.find_expired(now)
    }

    /// Remove every record that expired before `now`
    ///
    /// Returns the number of records removed.
    pub fn purge_expired(&mut self, now: Timestamp) -> usize {
        let expired = self.expiry.find_expired(now);
        let mut removed = 0;
        for key in &expired {
            if self.remove_record(key).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(target: "doctable::table", removed, "purged expired records");
        }
        removed
    }

    fn live(&self, key: &Key, now: Timestamp) -> Option<&Record> {
        let id = self.primary.get(key)?;
        self.records.get(*id).filter(|r| !r.is_expired(now))
    }

    fn project_all(&self, key: &Key, value: &[u8]) -> Result<Projections> {
        let mut out = Projections::new();
        for (name, id) in &self.registry {
            let Some(index) = self.indexes.get(id) else {
                continue;
            };
            if !index.covers(key) {
                continue;
            }
            match index.project(value)? {
                Some(projected) => out.push((*id, projected)),
                None => debug!(target: "doctable::index", index = %name, key = %key, "projection skipped"),
            }
        }
        Ok(out)
    }

    /// Attach a record to the expiry index and to its projected entries
    fn link(&mut self, id: RecordId, projections: Projections) {
        let Some(record) = self.records.get_mut(id) else {
            return;
        };
        if let Some(at) = record.expires_at {
            self.expiry.insert(at, record.key.clone());
        }
        for (index_id, projected) in projections {
            if let Some(index) = self.indexes.get_mut(&index_id) {
                index.insert(projected.clone(), record.key.clone(), id);
                record.index_refs.push((index_id, projected));
            }
        }
    }

    /// Detach a record from the expiry index and every index entry it owns
    fn unlink(&mut self, id: RecordId) {
        let Some(record) = self.records.get_mut(id) else {
            return;
        };
        if let Some(at) = record.expires_at {
            self.expiry.remove(at, &record.key);
        }
        for (index_id, projected) in record.index_refs.drain(..) {
            if let Some(index) = self.indexes.get_mut(&index_id) {
                index.remove(projected, record.key.clone(), id);
            }
        }
    }

    fn remove_record(&mut self, key: &Key) -> Option<Record> {
        let id = self.primary.remove(key)?;
        self.unlink(id);
        self.records.remove(id)
    }

    // ========================================================================
    // Indexes
    // ========================================================================

    /// Create an ordered index over records whose key matches `pattern`
    ///
    /// Fails with `InvalidName` for the empty name and `AlreadyExists` when
    /// the name is taken. Existing records are indexed immediately.
    pub fn create_index(&mut self, name: &str, pattern: &str, projector: Projector) -> Result<()> {
        let pattern = KeyPattern::new(pattern)?;
        self.add_index(name, |id| Index::ordered(id, name, pattern, projector))
    }

    /// Create a spatial index; the projector must yield rectangles
    ///
    /// Records whose projection is not a rectangle are left out.
    pub fn create_spatial_index(
        &mut self,
        name: &str,
        pattern: &str,
        projector: Projector,
    ) -> Result<()> {
        let pattern = KeyPattern::new(pattern)?;
        let capacity = self.config.spatial_node_capacity;
        self.add_index(name, |id| {
            Index::spatial(id, name, pattern, projector, capacity)
        })
    }

    fn add_index(&mut self, name: &str, make: impl FnOnce(IndexId) -> Index) -> Result<()> {
        if name == PRIMARY_INDEX {
            return Err(Error::InvalidName(name.to_string()));
        }
        if self.registry.contains_key(name) {
            return Err(Error::AlreadyExists(format!("index {:?}", name)));
        }
        let id = IndexId::new(self.next_index_id);
        self.next_index_id += 1;
        let index = make(id);
        let kind = index.kind();
        self.indexes.insert(id, index);
        self.registry.insert(name.to_string(), id);

        let stats = self.rebuild(id);
        info!(
            target: "doctable::index",
            index = name,
            %kind,
            entries = stats.entries,
            records = stats.records,
            errors = stats.errors,
            "index created"
        );
        Ok(())
    }

    /// Remove an index and all its entries
    ///
    /// `InvalidOperation` for the primary index, `NotFound` when absent.
    pub fn drop_index(&mut self, name: &str) -> Result<()> {
        if name == PRIMARY_INDEX {
            return Err(Error::InvalidOperation(
                "the primary index cannot be dropped".to_string(),
            ));
        }
        let id = self.registry.remove(name).ok_or_else(|| index_not_found(name))?;
        if let Some(index) = self.indexes.remove(&id) {
            for record in index.records() {
                if let Some(record) = self.records.get_mut(record) {
                    record.take_index_ref(id);
                }
            }
            info!(target: "doctable::index", index = name, entries = index.len(), "index dropped");
        }
        Ok(())
    }

    /// Discard and repopulate one index from the primary tree
    pub fn rebuild_index(&mut self, name: &str) -> Result<RebuildStats> {
        if name == PRIMARY_INDEX {
            return Err(Error::InvalidOperation(
                "the primary index cannot be rebuilt".to_string(),
            ));
        }
        let id = *self.registry.get(name).ok_or_else(|| index_not_found(name))?;
        let stats = self.rebuild(id);
        info!(
            target: "doctable::index",
            index = name,
            entries = stats.entries,
            records = stats.records,
            errors = stats.errors,
            "index rebuilt"
        );
        Ok(stats)
    }

    fn rebuild(&mut self, id: IndexId) -> RebuildStats {
        let mut stats = RebuildStats::default();
        let Some(index) = self.indexes.get_mut(&id) else {
            return stats;
        };
        index.clear();
        for (pk, &rid) in &self.primary {
            let Some(record) = self.records.get_mut(rid) else {
                continue;
            };
            record.take_index_ref(id);
            if !index.covers(pk) {
                continue;
            }
            stats.records += 1;
            match index.project(&record.value) {
                Ok(Some(projected)) => {
                    index.insert(projected.clone(), pk.clone(), rid);
                    record.index_refs.push((id, projected));
                    stats.entries += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    stats.errors += 1;
                    warn!(
                        target: "doctable::index",
                        index = index.name(),
                        key = %pk,
                        error = %e,
                        "record left out of index"
                    );
                }
            }
        }
        stats
    }

    /// Registered index, by name
    pub fn index(&self, name: &str) -> Result<&Index> {
        self.registry
            .get(name)
            .and_then(|id| self.indexes.get(id))
            .ok_or_else(|| index_not_found(name))
    }

    /// Names of all secondary indexes, sorted
    pub fn index_names(&self) -> Vec<String> {
        self.registry.keys().cloned().collect()
    }

    /// Entry count of an index; the primary index counts records
    pub fn index_len(&self, name: &str) -> Result<usize> {
        if name == PRIMARY_INDEX {
            return Ok(self.primary.len());
        }
        self.index(name).map(Index::len)
    }

    /// Backing structure of an index; the primary index is ordered
    pub fn index_kind(&self, name: &str) -> Result<IndexKind> {
        if name == PRIMARY_INDEX {
            return Ok(IndexKind::Ordered);
        }
        self.index(name).map(Index::kind)
    }

    // ========================================================================
    // Primary scans
    // ========================================================================

    fn scan_primary<F>(&self, span: Span, mut visit: F)
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        let now = Timestamp::now();
        let mut step = |id: &RecordId| match self.records.get(*id) {
            Some(record) if !record.is_expired(now) => visit(&record.key, &record.value),
            _ => true,
        };
        let range = bounded_range(&self.primary, span.lower, span.upper);
        if span.reverse {
            for (_, id) in range.rev() {
                if !step(id) {
                    break;
                }
            }
        } else {
            for (_, id) in range {
                if !step(id) {
                    break;
                }
            }
        }
    }

    /// Every record in primary-key order
    pub fn ascend_primary<F>(&self, visit: F)
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        self.scan_primary(Span::ascend(), visit)
    }

    /// Records with key `>= pivot`, ascending
    pub fn ascend_primary_greater_or_equal<F>(&self, pivot: Key, visit: F)
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        self.scan_primary(Span::ascend_greater_or_equal(pivot), visit)
    }

    /// Records with key `< pivot`, ascending
    pub fn ascend_primary_less_than<F>(&self, pivot: Key, visit: F)
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        self.scan_primary(Span::ascend_less_than(pivot), visit)
    }

    /// Records with key in `[ge, lt)`, ascending
    pub fn ascend_primary_range<F>(&self, ge: Key, lt: Key, visit: F)
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        self.scan_primary(Span::ascend_range(ge, lt), visit)
    }

    /// Every record in reverse primary-key order
    pub fn descend_primary<F>(&self, visit: F)
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        self.scan_primary(Span::descend(), visit)
    }

    /// Records with key `<= pivot`, descending
    pub fn descend_primary_less_or_equal<F>(&self, pivot: Key, visit: F)
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        self.scan_primary(Span::descend_less_or_equal(pivot), visit)
    }

    /// Records with key `> pivot`, descending
    pub fn descend_primary_greater_than<F>(&self, pivot: Key, visit: F)
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        self.scan_primary(Span::descend_greater_than(pivot), visit)
    }

    /// Records with key in `(gt, le]`, descending from `le`
    pub fn descend_primary_range<F>(&self, le: Key, gt: Key, visit: F)
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        self.scan_primary(Span::descend_range(le, gt), visit)
    }

    // ========================================================================
    // Secondary scans
    // ========================================================================

    fn scan_index<F>(&self, name: &str, span: Span, mut visit: F) -> Result<()>
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        if name == PRIMARY_INDEX {
            self.scan_primary(span, visit);
            return Ok(());
        }
        let index = self.index(name)?;
        let now = Timestamp::now();
        index.scan(span, |id| match self.records.get(id) {
            Some(record) if !record.is_expired(now) => visit(&record.key, &record.value),
            _ => true,
        });
        Ok(())
    }

    /// Every entry of `index` in index order
    ///
    /// Pivots in the bounded forms are given as plain keys and re-shaped to
    /// the index's key space. On a composite index a scalar pivot bounds the
    /// first field only. The empty name scans the primary tree; a spatial
    /// index yields nothing.
    pub fn ascend<F>(&self, index: &str, visit: F) -> Result<()>
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        self.scan_index(index, Span::ascend(), visit)
    }

    /// Entries `>= pivot`, ascending
    pub fn ascend_greater_or_equal<F>(&self, index: &str, pivot: Key, visit: F) -> Result<()>
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        self.scan_index(index, Span::ascend_greater_or_equal(pivot), visit)
    }

    /// Entries `< pivot`, ascending
    pub fn ascend_less_than<F>(&self, index: &str, pivot: Key, visit: F) -> Result<()>
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        self.scan_index(index, Span::ascend_less_than(pivot), visit)
    }

    /// Entries in `[ge, lt)`, ascending
    pub fn ascend_range<F>(&self, index: &str, ge: Key, lt: Key, visit: F) -> Result<()>
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        self.scan_index(index, Span::ascend_range(ge, lt), visit)
    }

    /// Every entry of `index` in reverse index order
    pub fn descend<F>(&self, index: &str, visit: F) -> Result<()>
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        self.scan_index(index, Span::descend(), visit)
    }

    /// Entries `<= pivot`, descending
    pub fn descend_less_or_equal<F>(&self, index: &str, pivot: Key, visit: F) -> Result<()>
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        self.scan_index(index, Span::descend_less_or_equal(pivot), visit)
    }

    /// Entries `> pivot`, descending
    pub fn descend_greater_than<F>(&self, index: &str, pivot: Key, visit: F) -> Result<()>
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        self.scan_index(index, Span::descend_greater_than(pivot), visit)
    }

    /// Entries in `(gt, le]`, descending from `le`
    pub fn descend_range<F>(&self, index: &str, le: Key, gt: Key, visit: F) -> Result<()>
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        self.scan_index(index, Span::descend_range(le, gt), visit)
    }

    // ========================================================================
    // Spatial scans
    // ========================================================================

    /// Entries of a spatial index in ascending distance from `target`
    ///
    /// `visit` receives the primary key, the value and the distance. The
    /// distance mode comes from the table configuration. The primary index
    /// and ordered indexes yield nothing.
    pub fn nearby<F>(&self, index: &str, target: &Rect, mut visit: F) -> Result<()>
    where
        F: FnMut(&Key, &[u8], f64) -> bool,
    {
        if index == PRIMARY_INDEX {
            return Ok(());
        }
        let index = self.index(index)?;
        let now = Timestamp::now();
        index.nearby(target, self.config.nearby_distance, |item, dist| {
            match self.records.get(item.record) {
                Some(record) if !record.is_expired(now) => visit(&record.key, &record.value, dist),
                _ => true,
            }
        });
        Ok(())
    }

    /// Entries of a spatial index overlapping `target`, in no particular order
    pub fn intersects<F>(&self, index: &str, target: &Rect, mut visit: F) -> Result<()>
    where
        F: FnMut(&Key, &[u8]) -> bool,
    {
        if index == PRIMARY_INDEX {
            return Ok(());
        }
        let index = self.index(index)?;
        let now = Timestamp::now();
        index.intersects(target, |item| match self.records.get(item.record) {
            Some(record) if !record.is_expired(now) => visit(&record.key, &record.value),
            _ => true,
        });
        Ok(())
    }
}

fn not_found(key: &Key) -> Error {
    Error::NotFound(format!("key {}", key))
}

fn index_not_found(name: &str) -> Error {
    Error::NotFound(format!("index {:?}", name))
}
