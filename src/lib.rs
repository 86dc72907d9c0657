//! Doctable - embeddable ordered document table
//!
//! A table stores raw values under polymorphic [`Key`]s and keeps any number
//! of named secondary indexes in step with every write. Index keys are
//! projected from the values themselves: JSON paths, Protobuf fields read
//! straight off the wire, whole values, or rectangles for spatial indexes.
//!
//! # Quick Start
//!
//! ```
//! use doctable::{IndexField, IndexOpts, Key, Projector, Table};
//!
//! let table = Table::new();
//! let by_age = Projector::single(IndexField::json("age", IndexOpts::int(false))?);
//! table.create_index("age", "user:*", by_age)?;
//!
//! table.set(Key::string("user:1"), br#"{"age":47}"#.to_vec(), None)?;
//! table.set(Key::string("user:2"), br#"{"age":38}"#.to_vec(), None)?;
//!
//! let mut youngest_first = Vec::new();
//! table.view(|tx| {
//!     tx.ascend("age", |key, _| {
//!         youngest_first.push(key.to_string());
//!         true
//!     })
//! })?;
//! assert_eq!(youngest_first, ["user:2", "user:1"]);
//! # Ok::<(), doctable::Error>(())
//! ```
//!
//! # Architecture
//!
//! - `doctable-core`: keys, ordering, rectangles, parsing, errors
//! - `doctable-document`: projectors, JSON and Protobuf field extraction
//! - `doctable-storage`: trees, indexes, the table and its lock

pub use doctable_core::*;
pub use doctable_document::*;
pub use doctable_storage::*;
