//! Error types for doctable
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Scans against an index of the wrong kind are deliberately not errors:
//! they simply yield nothing.

use thiserror::Error;

/// Result type alias for doctable operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for table, index and projection operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Missing key or index on a read-style operation
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate index name
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Disallowed structural operation (e.g. dropping the primary index)
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Empty or otherwise unusable index name
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// Invalid argument (bad rectangle, bad path, too many composite fields)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Protobuf buffer could not be decoded
    #[error("malformed wire data: {0}")]
    MalformedWireData(#[from] WireError),
}

impl Error {
    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Protobuf decoding failures
///
/// Every variant is fatal for the scan that produced it; no partial keys are
/// returned once one of these is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WireError {
    /// Varint ran off the end of the buffer or exceeded ten bytes
    #[error("bad varint at offset {offset}")]
    BadVarint {
        /// Byte offset where the varint started
        offset: usize,
    },

    /// Legacy group-end wire type (4) encountered
    #[error("unexpected group end tag at offset {offset}")]
    GroupEnd {
        /// Byte offset of the tag
        offset: usize,
    },

    /// Field number zero or out of the 29-bit range
    #[error("illegal field number {number}")]
    IllegalFieldNumber {
        /// Decoded field number
        number: u64,
    },

    /// Start-group (3) or an undefined wire type (6, 7)
    #[error("unknown wire type {0}")]
    UnknownWireType(u8),

    /// Fewer bytes remain than the value requires
    #[error("truncated value: wire type {wire_type} needs {needed} bytes, {remaining} remain")]
    Truncated {
        /// Wire type being read
        wire_type: u8,
        /// Bytes required
        needed: u64,
        /// Bytes available
        remaining: usize,
    },

    /// String field is not valid UTF-8
    #[error("field {field} is not valid UTF-8")]
    InvalidUtf8 {
        /// Field number
        field: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("index age".to_string());
        let msg = err.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("index age"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_error_display_invalid_name() {
        let err = Error::InvalidName(String::new());
        assert_eq!(err.to_string(), "invalid name: \"\"");
    }

    #[test]
    fn test_wire_error_converts() {
        let err: Error = WireError::GroupEnd { offset: 3 }.into();
        assert!(matches!(err, Error::MalformedWireData(WireError::GroupEnd { offset: 3 })));
        assert!(err.to_string().contains("group end"));
    }

    #[test]
    fn test_truncated_display() {
        let err = WireError::Truncated {
            wire_type: 2,
            needed: 10,
            remaining: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("needs 10"));
        assert!(msg.contains("4 remain"));
    }
}
