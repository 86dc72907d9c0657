//! Locked table handle
//!
//! [`Table`] puts a [`TableState`] behind a `parking_lot::RwLock`: reads run
//! under the shared lock, writes under the exclusive lock. A transaction is
//! one closure call, `view` for reads and `update` for writes.
//!
//! # Nested transactions
//!
//! Starting a transaction on a table from inside another transaction on the
//! same table, on the same thread, is a programmer error. It would deadlock
//! on the write lock (and can on the read lock once a writer queues), so it
//! is detected up front and panics instead.

use doctable_core::{Key, Result, Timestamp};
use doctable_document::Projector;
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::{ConfigError, TableConfig};
use crate::state::{RebuildStats, TableState};

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Tables with a transaction open on this thread
    static HELD: RefCell<SmallVec<[u64; 4]>> = RefCell::new(SmallVec::new());
}

/// Marks a table as held by the current thread until dropped
struct HeldGuard(u64);

impl HeldGuard {
    fn enter(table: u64) -> Self {
        HELD.with(|held| {
            let mut held = held.borrow_mut();
            if held.contains(&table) {
                drop(held);
                panic!("nested transaction on table {}", table);
            }
            held.push(table);
        });
        HeldGuard(table)
    }
}

impl Drop for HeldGuard {
    fn drop(&mut self) {
        HELD.with(|held| {
            let mut held = held.borrow_mut();
            if let Some(pos) = held.iter().rposition(|&t| t == self.0) {
                held.remove(pos);
            }
        });
    }
}

/// Thread-safe ordered document table
///
/// # Example
///
/// ```
/// use doctable_core::Key;
/// use doctable_document::{IndexField, IndexOpts, Projector};
/// use doctable_storage::Table;
///
/// let table = Table::new();
/// let age = Projector::single(IndexField::json("age", IndexOpts::int(false)).unwrap());
/// table.create_index("age", "user:*", age).unwrap();
/// table.set(Key::string("user:1"), br#"{"age":38}"#.to_vec(), None).unwrap();
///
/// let mut found = Vec::new();
/// table
///     .view(|tx| {
///         tx.ascend_greater_or_equal("age", Key::Int(30), |key, _| {
///             found.push(key.clone());
///             true
///         })
///     })
///     .unwrap();
/// assert_eq!(found, vec![Key::string("user:1")]);
/// ```
#[derive(Debug)]
pub struct Table {
    id: u64,
    state: RwLock<TableState>,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    /// Empty table with default configuration
    pub fn new() -> Self {
        Self::build(TableConfig::default())
    }

    /// Empty table with a validated configuration
    pub fn with_config(config: TableConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: TableConfig) -> Self {
        Table {
            id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
            state: RwLock::new(TableState::new(config)),
        }
    }

    /// Active configuration
    pub fn config(&self) -> TableConfig {
        self.view(|tx| tx.config().clone())
    }

    /// Run `f` under the shared lock
    ///
    /// # Panics
    ///
    /// If called from inside another transaction on this table.
    pub fn view<R>(&self, f: impl FnOnce(&TableState) -> R) -> R {
        let _held = HeldGuard::enter(self.id);
        let state = self.state.read();
        f(&state)
    }

    /// Run `f` under the exclusive lock
    ///
    /// # Panics
    ///
    /// If called from inside another transaction on this table.
    pub fn update<R>(&self, f: impl FnOnce(&mut TableState) -> R) -> R {
        let _held = HeldGuard::enter(self.id);
        let mut state = self.state.write();
        f(&mut state)
    }

    /// See [`TableState::set`]
    pub fn set(
        &self,
        key: Key,
        value: Vec<u8>,
        expires_at: Option<Timestamp>,
    ) -> Result<Option<Vec<u8>>> {
        self.update(|tx| tx.set(key, value, expires_at))
    }

    /// See [`TableState::get`]; the value is copied out of the lock
    pub fn get(&self, key: &Key) -> Result<Vec<u8>> {
        self.view(|tx| tx.get(key).map(<[u8]>::to_vec))
    }

    /// See [`TableState::delete`]
    pub fn delete(&self, key: &Key) -> Result<Vec<u8>> {
        self.update(|tx| tx.delete(key))
    }

    /// See [`TableState::delete_all`]
    pub fn delete_all(&self) {
        self.update(|tx| tx.delete_all())
    }

    /// See [`TableState::create_index`]
    pub fn create_index(&self, name: &str, pattern: &str, projector: Projector) -> Result<()> {
        self.update(|tx| tx.create_index(name, pattern, projector))
    }

    /// See [`TableState::create_spatial_index`]
    pub fn create_spatial_index(
        &self,
        name: &str,
        pattern: &str,
        projector: Projector,
    ) -> Result<()> {
        self.update(|tx| tx.create_spatial_index(name, pattern, projector))
    }

    /// See [`TableState::drop_index`]
    pub fn drop_index(&self, name: &str) -> Result<()> {
        self.update(|tx| tx.drop_index(name))
    }

    /// See [`TableState::rebuild_index`]
    pub fn rebuild_index(&self, name: &str) -> Result<RebuildStats> {
        self.update(|tx| tx.rebuild_index(name))
    }

    /// Stored records, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.view(|tx| tx.len())
    }

    /// True when no records are stored
    pub fn is_empty(&self) -> bool {
        self.view(|tx| tx.is_empty())
    }

    /// Names of all secondary indexes, sorted
    pub fn index_names(&self) -> Vec<String> {
        self.view(|tx| tx.index_names())
    }

    /// See [`TableState::expired_keys`]
    pub fn expired_keys(&self, now: Timestamp) -> Vec<Key> {
        self.view(|tx| tx.expired_keys(now))
    }

    /// See [`TableState::purge_expired`]
    pub fn purge_expired(&self, now: Timestamp) -> usize {
        self.update(|tx| tx.purge_expired(now))
    }
}
