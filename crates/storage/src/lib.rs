//! Storage layer for doctable
//!
//! This crate implements the in-memory table with:
//! - RecordArena: slot storage for records, addressed by RecordId handles
//! - Primary tree: BTreeMap from primary key to record
//! - ExpiryIndex: expiry timestamp → keys, for lazy expiration
//! - OrderedTree: secondary index entries ordered by key, tie-broken by primary key
//! - SpatialTree: R-tree for rectangle indexes with nearest-neighbour search
//! - Index / TableState: the index registry and every table operation
//! - Table: RwLock wrapper with view/update transactions
//! - ExpiryReaper: optional background purge of expired records
//!
//! # Concurrency
//!
//! One writer or many readers per table. All operations are synchronous and
//! in-memory; nested transactions on the same table panic instead of
//! deadlocking.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cleaner;
pub mod config;
pub mod index;
pub mod ordered;
pub mod record;
pub mod spatial;
pub mod state;
pub mod table;
pub mod ttl;

pub use cleaner::ExpiryReaper;
pub use config::{ConfigError, TableConfig};
pub use index::{Index, IndexId, IndexKind};
pub use ordered::{EntryKey, OrderedTree, Span};
pub use record::{Record, RecordArena, RecordId};
pub use spatial::{DistanceMode, SpatialItem, SpatialTree};
pub use state::{RebuildStats, TableState, PRIMARY_INDEX};
pub use table::Table;
pub use ttl::ExpiryIndex;
