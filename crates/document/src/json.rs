//! JSON path evaluation boundary
//!
//! Projectors only need one thing from a JSON engine: evaluate a dot path
//! against a document and report the type of what was found. That contract is
//! the [`JsonEvaluator`] trait. [`SerdeJsonEvaluator`] is the built-in
//! implementation on top of `serde_json`.
//!
//! # Path Syntax
//!
//! | Syntax | Meaning | Example |
//! |--------|---------|---------|
//! | `key` | Object property | `age` |
//! | `a.b` | Nested property | `name.last` |
//! | `a[n]` | Array element | `tags[0]` |
//! | `a.n` | Array element when `a` is an array | `tags.0` |

use doctable_core::Key;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Result of evaluating a path, tagged by JSON type
#[derive(Debug, Clone, PartialEq)]
pub enum TypedScalar {
    /// `null`, or nothing at the path
    Null,
    /// `false`
    False,
    /// `true`
    True,
    /// Any JSON number
    Number(f64),
    /// A JSON string, unescaped
    String(String),
    /// An object or array, as JSON text
    Raw(String),
}

/// Map an evaluation result to a key
///
/// `null → Nil`, booleans → `Bool`, numbers → `Float`, strings → `String`,
/// objects and arrays → `String` holding the raw JSON text.
pub fn json_to_key(scalar: TypedScalar) -> Key {
    match scalar {
        TypedScalar::Null => Key::Nil,
        TypedScalar::False => Key::Bool(false),
        TypedScalar::True => Key::Bool(true),
        TypedScalar::Number(n) => Key::Float(n),
        TypedScalar::String(s) | TypedScalar::Raw(s) => Key::String(s),
    }
}

/// External JSON path evaluator
pub trait JsonEvaluator: Send + Sync {
    /// Evaluate `path` against `document`
    ///
    /// Unparsable documents and missing paths evaluate to [`TypedScalar::Null`].
    fn evaluate(&self, document: &[u8], path: &str) -> TypedScalar;
}

/// [`JsonEvaluator`] backed by `serde_json`
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeJsonEvaluator;

impl JsonEvaluator for SerdeJsonEvaluator {
    fn evaluate(&self, document: &[u8], path: &str) -> TypedScalar {
        let Ok(path) = path.parse::<JsonPath>() else {
            return TypedScalar::Null;
        };
        let Ok(doc) = serde_json::from_slice::<serde_json::Value>(document) else {
            return TypedScalar::Null;
        };
        lookup(&doc, &path).map_or(TypedScalar::Null, to_typed)
    }
}

fn to_typed(value: &serde_json::Value) -> TypedScalar {
    use serde_json::Value;
    match value {
        Value::Null => TypedScalar::Null,
        Value::Bool(false) => TypedScalar::False,
        Value::Bool(true) => TypedScalar::True,
        Value::Number(n) => n.as_f64().map_or(TypedScalar::Null, TypedScalar::Number),
        Value::String(s) => TypedScalar::String(s.clone()),
        Value::Array(_) | Value::Object(_) => TypedScalar::Raw(value.to_string()),
    }
}

/// Walk `path` through `value`
pub fn lookup<'a>(value: &'a serde_json::Value, path: &JsonPath) -> Option<&'a serde_json::Value> {
    use serde_json::Value;
    let mut current = value;
    for segment in path.segments() {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(obj)) => obj.get(key)?,
            (PathSegment::Key(key), Value::Array(arr)) => arr.get(key.parse::<usize>().ok()?)?,
            (PathSegment::Index(idx), Value::Array(arr)) => arr.get(*idx)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Error type for JSON path parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathParseError {
    /// Empty path or empty key in path
    #[error("empty key in path at position {0}")]
    EmptyKey(usize),
    /// Unclosed bracket
    #[error("unclosed bracket starting at position {0}")]
    UnclosedBracket(usize),
    /// Invalid array index
    #[error("invalid array index at position {0}: {1}")]
    InvalidIndex(usize, String),
    /// Unexpected character
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
}

/// One step of a [`JsonPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Object key, or array position written as `a.0`
    Key(String),
    /// Array index written as `a[0]`
    Index(usize),
}

/// A parsed dot path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JsonPath {
    segments: Vec<PathSegment>,
}

impl JsonPath {
    /// Path segments, outermost first
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }
}

impl FromStr for JsonPath {
    type Err = PathParseError;

    /// Parse `a.b`, `a[0]`, `a.0.b`; the path must not be empty
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = s.chars().collect();
        if chars.is_empty() {
            return Err(PathParseError::EmptyKey(0));
        }
        let is_key_char = |c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '$';

        let mut segments = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '.' {
                if segments.is_empty() && i == 0 {
                    return Err(PathParseError::EmptyKey(0));
                }
                i += 1;
                if i >= chars.len() || chars[i] == '.' {
                    return Err(PathParseError::EmptyKey(i));
                }
            }

            if chars[i] == '[' {
                let start = i;
                i += 1;
                let idx_start = i;
                while i < chars.len() && chars[i] != ']' {
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(PathParseError::UnclosedBracket(start));
                }
                let idx_str: String = chars[idx_start..i].iter().collect();
                let idx = idx_str
                    .parse::<usize>()
                    .map_err(|_| PathParseError::InvalidIndex(idx_start, idx_str))?;
                segments.push(PathSegment::Index(idx));
                i += 1;
            } else if is_key_char(chars[i]) {
                let key_start = i;
                while i < chars.len() && is_key_char(chars[i]) {
                    i += 1;
                }
                segments.push(PathSegment::Key(chars[key_start..i].iter().collect()));
            } else {
                return Err(PathParseError::UnexpectedChar(chars[i], i));
            }
        }

        Ok(JsonPath { segments })
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(k) if i == 0 => write!(f, "{k}")?,
                PathSegment::Key(k) => write!(f, ".{k}")?,
                PathSegment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &[u8] = br#"{"name":{"first":"Tom","last":"Johnson"},"age":38,"active":true,
        "nick":null,"tags":["a","b"],"location":[-115.567,33.532]}"#;

    fn eval(path: &str) -> TypedScalar {
        SerdeJsonEvaluator.evaluate(DOC, path)
    }

    #[test]
    fn test_parse_paths() {
        let p: JsonPath = "name.last".parse().unwrap();
        assert_eq!(
            p.segments(),
            &[PathSegment::Key("name".into()), PathSegment::Key("last".into())]
        );
        let p: JsonPath = "tags[1]".parse().unwrap();
        assert_eq!(p.segments()[1], PathSegment::Index(1));
        assert_eq!(p.to_string(), "tags[1]");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<JsonPath>(), Err(PathParseError::EmptyKey(0)));
        assert!(matches!("a..b".parse::<JsonPath>(), Err(PathParseError::EmptyKey(_))));
        assert!(matches!("a[".parse::<JsonPath>(), Err(PathParseError::UnclosedBracket(1))));
        assert!(matches!("a[x]".parse::<JsonPath>(), Err(PathParseError::InvalidIndex(..))));
        assert!(matches!("a b".parse::<JsonPath>(), Err(PathParseError::UnexpectedChar(' ', 1))));
    }

    #[test]
    fn test_evaluate_types() {
        assert_eq!(eval("age"), TypedScalar::Number(38.0));
        assert_eq!(eval("name.last"), TypedScalar::String("Johnson".into()));
        assert_eq!(eval("active"), TypedScalar::True);
        assert_eq!(eval("nick"), TypedScalar::Null);
        assert_eq!(eval("missing.path"), TypedScalar::Null);
        assert_eq!(eval("tags.1"), TypedScalar::String("b".into()));
        assert_eq!(eval("tags[0]"), TypedScalar::String("a".into()));
        assert_eq!(eval("location"), TypedScalar::Raw("[-115.567,33.532]".into()));
    }

    #[test]
    fn test_evaluate_unparsable_document() {
        assert_eq!(SerdeJsonEvaluator.evaluate(b"{not json", "a"), TypedScalar::Null);
    }

    #[test]
    fn test_json_to_key() {
        assert!(matches!(json_to_key(TypedScalar::Null), Key::Nil));
        assert!(matches!(json_to_key(TypedScalar::True), Key::Bool(true)));
        assert!(matches!(json_to_key(TypedScalar::Number(2.5)), Key::Float(f) if f == 2.5));
        assert!(matches!(json_to_key(TypedScalar::String("x".into())), Key::String(s) if s == "x"));
        assert!(matches!(json_to_key(TypedScalar::Raw("[1]".into())), Key::String(s) if s == "[1]"));
    }
}
