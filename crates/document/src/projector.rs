//! Key projection from raw record values
//!
//! An [`IndexField`] turns a raw value into at most one key: it extracts a
//! candidate from the value (the whole value, a JSON path, a Protobuf field,
//! or a rectangle) and then filters it through its [`IndexOpts`]. A
//! [`Projector`] combines one or two fields; with two fields the result is a
//! `Composite2` key, and the record is skipped if either field is skipped.

use crate::json::{json_to_key, JsonEvaluator, JsonPath, SerdeJsonEvaluator, TypedScalar};
use crate::opts::IndexOpts;
use crate::scanner::WireScanner;
use crate::schema::SchemaLookup;
use doctable_core::{parse_key, parse_rect, Error, Key, Result};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Where an index field reads its candidate key from
#[derive(Clone)]
pub enum FieldSource {
    /// The whole raw value, type auto-detected
    Value,
    /// The whole raw value, parsed as a rectangle
    Rect,
    /// A JSON dot path
    Json {
        /// Dot path
        path: String,
        /// Path evaluator
        evaluator: Arc<dyn JsonEvaluator>,
    },
    /// A JSON dot path holding a rectangle (string or array)
    JsonRect {
        /// Dot path
        path: String,
        /// Path evaluator
        evaluator: Arc<dyn JsonEvaluator>,
    },
    /// A Protobuf field path
    Protobuf {
        /// Field metadata
        schema: Arc<dyn SchemaLookup>,
        /// Top-level message type
        message: String,
        /// Field numbers, outermost first
        path: Vec<u32>,
    },
}

impl fmt::Debug for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSource::Value => f.write_str("Value"),
            FieldSource::Rect => f.write_str("Rect"),
            FieldSource::Json { path, .. } => f.debug_struct("Json").field("path", path).finish(),
            FieldSource::JsonRect { path, .. } => {
                f.debug_struct("JsonRect").field("path", path).finish()
            }
            FieldSource::Protobuf { message, path, .. } => f
                .debug_struct("Protobuf")
                .field("message", message)
                .field("path", path)
                .finish(),
        }
    }
}

/// One dimension of an index
#[derive(Debug, Clone)]
pub struct IndexField {
    source: FieldSource,
    opts: IndexOpts,
    max_len: usize,
}

impl IndexField {
    /// Index the whole value
    pub fn value(opts: IndexOpts) -> Self {
        IndexField::from_source(FieldSource::Value, opts)
    }

    /// Index the whole value as a rectangle
    pub fn rect() -> Self {
        IndexField::from_source(FieldSource::Rect, IndexOpts::spatial())
    }

    /// Index a JSON path using the built-in evaluator
    pub fn json(path: &str, opts: IndexOpts) -> Result<Self> {
        IndexField::json_with(path, opts, Arc::new(SerdeJsonEvaluator))
    }

    /// Index a JSON path using a caller-supplied evaluator
    pub fn json_with(
        path: &str,
        opts: IndexOpts,
        evaluator: Arc<dyn JsonEvaluator>,
    ) -> Result<Self> {
        validate_json_path(path)?;
        Ok(IndexField::from_source(
            FieldSource::Json {
                path: path.to_string(),
                evaluator,
            },
            opts,
        ))
    }

    /// Index a rectangle stored at a JSON path
    pub fn json_rect(path: &str) -> Result<Self> {
        validate_json_path(path)?;
        Ok(IndexField::from_source(
            FieldSource::JsonRect {
                path: path.to_string(),
                evaluator: Arc::new(SerdeJsonEvaluator),
            },
            IndexOpts::spatial(),
        ))
    }

    /// Index a Protobuf field reached through `path`
    pub fn protobuf(
        schema: Arc<dyn SchemaLookup>,
        message: &str,
        path: Vec<u32>,
        opts: IndexOpts,
    ) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::InvalidArgument(
                "protobuf field path must not be empty".to_string(),
            ));
        }
        Ok(IndexField::from_source(
            FieldSource::Protobuf {
                schema,
                message: message.to_string(),
                path,
            },
            opts,
        ))
    }

    fn from_source(source: FieldSource, opts: IndexOpts) -> Self {
        IndexField {
            source,
            opts,
            max_len: 0,
        }
    }

    /// Truncate projected strings to at most `max_len` bytes (0 disables)
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Inclusion policy
    pub fn opts(&self) -> IndexOpts {
        self.opts
    }

    /// Candidate source
    pub fn source(&self) -> &FieldSource {
        &self.source
    }

    /// Project `raw` to a key, or `None` to skip the record
    pub fn project(&self, raw: &[u8]) -> Result<Option<Key>> {
        let candidate = match &self.source {
            FieldSource::Value => Some(project_value(raw)),
            FieldSource::Rect => std::str::from_utf8(raw)
                .ok()
                .and_then(|s| parse_rect(s).ok())
                .map(Key::Rect),
            FieldSource::Json { path, evaluator } => {
                Some(json_to_key(evaluator.evaluate(raw, path)))
            }
            FieldSource::JsonRect { path, evaluator } => {
                project_json_rect(evaluator.evaluate(raw, path))
            }
            FieldSource::Protobuf {
                schema,
                message,
                path,
            } => WireScanner::new(schema.as_ref(), message).get(raw, path)?,
        };
        Ok(candidate.and_then(|key| self.finish(key)))
    }

    /// Truncate and filter a candidate key
    fn finish(&self, key: Key) -> Option<Key> {
        self.opts.apply(self.truncate(key))
    }

    fn truncate(&self, key: Key) -> Key {
        if self.max_len == 0 {
            return key;
        }
        match key {
            Key::String(s) => Key::String(truncate_str(s, self.max_len)),
            Key::StringDesc(s) => Key::StringDesc(truncate_str(s, self.max_len)),
            Key::StringCI(s) => Key::StringCI(truncate_str(s, self.max_len)),
            Key::StringCIDesc(s) => Key::StringCIDesc(truncate_str(s, self.max_len)),
            other => other,
        }
    }

    /// Re-shape a scan pivot into this field's key space
    pub fn coerce(&self, pivot: Key) -> Key {
        self.opts.coerce(self.truncate(pivot))
    }
}

fn validate_json_path(path: &str) -> Result<()> {
    path.parse::<JsonPath>()
        .map(|_| ())
        .map_err(|e| Error::InvalidArgument(format!("bad json path {path:?}: {e}")))
}

fn truncate_str(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}

/// Empty → `String("")`; an object → the whole text as `String`; otherwise auto-detect
fn project_value(raw: &[u8]) -> Key {
    match raw.first() {
        None => Key::String(String::new()),
        Some(b'{') => Key::String(String::from_utf8_lossy(raw).into_owned()),
        Some(_) => parse_key(raw),
    }
}

fn project_json_rect(scalar: TypedScalar) -> Option<Key> {
    let text = match scalar {
        TypedScalar::String(s) => s,
        TypedScalar::Raw(s) if s.starts_with('[') => s,
        _ => return None,
    };
    parse_rect(&text).ok().map(Key::Rect)
}

/// One or two index fields
#[derive(Debug, Clone)]
pub struct Projector {
    fields: SmallVec<[IndexField; 2]>,
}

impl Projector {
    /// Most fields a projector may combine
    pub const MAX_FIELDS: usize = 2;

    /// Single-field projector
    pub fn single(field: IndexField) -> Self {
        let mut fields = SmallVec::new();
        fields.push(field);
        Projector { fields }
    }

    /// Two-field projector producing `Composite2` keys
    pub fn composite(first: IndexField, second: IndexField) -> Self {
        let mut fields = SmallVec::new();
        fields.push(first);
        fields.push(second);
        Projector { fields }
    }

    /// Projector over 1 or 2 fields
    pub fn new(fields: Vec<IndexField>) -> Result<Self> {
        if fields.is_empty() || fields.len() > Self::MAX_FIELDS {
            return Err(Error::InvalidArgument(format!(
                "an index has 1 to {} fields, got {}",
                Self::MAX_FIELDS,
                fields.len()
            )));
        }
        Ok(Projector {
            fields: fields.into_iter().collect(),
        })
    }

    /// Fields, in key order
    pub fn fields(&self) -> &[IndexField] {
        &self.fields
    }

    /// Project `raw`, or `None` to leave the record out of the index
    ///
    /// Malformed Protobuf data is an error, never a skip.
    pub fn project(&self, raw: &[u8]) -> Result<Option<Key>> {
        match self.fields.as_slice() {
            [field] => field.project(raw),
            [first, second] => {
                let (a, b) = match shared_protobuf(first, second) {
                    Some((scanner, pa, pb)) => {
                        let mut keys = scanner.keys_of(raw, &[pa, pb])?.into_iter();
                        let a = keys.next().flatten().and_then(|k| first.finish(k));
                        let b = keys.next().flatten().and_then(|k| second.finish(k));
                        (a, b)
                    }
                    None => (first.project(raw)?, second.project(raw)?),
                };
                match (a, b) {
                    (Some(a), Some(b)) => Key::composite(a, b).map(Some),
                    _ => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }

    /// Re-shape a scan pivot into this projector's key space
    ///
    /// For a two-field projector, a scalar pivot constrains only the first
    /// field; the second is filled with `fill` (`Key::Nil` for a lower
    /// bound, `Key::StringMax` for an upper bound).
    pub fn pivot(&self, pivot: Key, fill: Key) -> Key {
        match (self.fields.as_slice(), pivot) {
            ([first, second], Key::Composite2(pair)) => {
                let (a, b) = *pair;
                Key::Composite2(Box::new((first.coerce(a), second.coerce(b))))
            }
            ([first, _], scalar) => Key::Composite2(Box::new((first.coerce(scalar), fill))),
            ([field], pivot) => field.coerce(pivot),
            (_, pivot) => pivot,
        }
    }
}

/// Both fields read the same Protobuf message: use one batch scan
fn shared_protobuf<'a>(
    first: &'a IndexField,
    second: &'a IndexField,
) -> Option<(WireScanner<'a>, &'a [u32], &'a [u32])> {
    match (&first.source, &second.source) {
        (
            FieldSource::Protobuf {
                schema,
                message,
                path: pa,
            },
            FieldSource::Protobuf {
                schema: schema_b,
                message: message_b,
                path: pb,
            },
        ) if Arc::ptr_eq(schema, schema_b) && message == message_b => {
            Some((
                WireScanner::new(schema.as_ref(), message),
                pa.as_slice(),
                pb.as_slice(),
            ))
        }
        _ => None,
    }
}
