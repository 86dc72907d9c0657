//! Core types for doctable
//!
//! This crate defines the foundational types used throughout the system:
//! - Key: the polymorphic ordered key and its total order
//! - DataKind: coarse key classification
//! - Rect: axis-aligned boxes for spatial keys
//! - Glob matching for index membership patterns
//! - Key parsing (auto-detecting and typed)
//! - Timestamp: record expiry instants
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod glob;
pub mod key;
pub mod parse;
pub mod rect;
pub mod timestamp;

pub use error::{Error, Result, WireError};
pub use glob::{glob_match, KeyPattern, MATCH_ALL};
pub use key::{DataKind, Key};
pub use parse::{
    parse_as_bool, parse_as_float, parse_as_int, parse_as_string, parse_bool, parse_key,
    parse_rect,
};
pub use rect::{Rect, MAX_DIMS};
pub use timestamp::Timestamp;
