//! Document projection for doctable
//!
//! Everything needed to turn a raw record value into index keys:
//! - JSON path evaluation boundary and the serde_json evaluator
//! - IndexOpts: per-field inclusion policy
//! - IndexField / Projector: single and two-field key projection
//! - Protobuf schema boundary (SchemaLookup, SchemaRegistry)
//! - Wire-level field reader and the typed WireScanner

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod json;
pub mod opts;
pub mod projector;
pub mod scanner;
pub mod schema;
pub mod wire;

pub use json::{json_to_key, JsonEvaluator, JsonPath, PathParseError, SerdeJsonEvaluator, TypedScalar};
pub use opts::IndexOpts;
pub use projector::{FieldSource, IndexField, Projector};
pub use scanner::WireScanner;
pub use schema::{FieldDescriptor, MessageType, ScalarKind, SchemaLookup, SchemaRegistry};
pub use wire::{FieldReader, MessageWriter, WireField, WireValue};
