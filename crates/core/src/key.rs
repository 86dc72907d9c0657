//! The polymorphic ordered key
//!
//! A [`Key`] is both the primary identity of a record and the unit of ordering
//! inside every secondary index. Keys of different kinds are ordered by tier:
//!
//! ```text
//! Nil < Bool < Numeric < String* < Rect < Composite2 < StringMax
//! ```
//!
//! Within the numeric tier, ascending kinds (`Int`, `Float`) sort before the
//! descending kinds (`IntDesc`, `FloatDesc`); within the string tier the order
//! is `String < StringDesc < StringCI < StringCIDesc`. Int and Float compare by
//! exact numeric value, so `Int(3) == Float(3.0)` and `Int(3) > Float(2.5)`.
//! `*Desc` variants reverse only the comparison inside their own kind.
//!
//! Equality is defined by the order: two keys are equal exactly when
//! [`Ord::cmp`] returns `Equal`. Case-insensitive strings that differ only in
//! ASCII case are therefore equal, and index entries holding them are ordered
//! by the owning record's primary key instead.

use crate::error::{Error, Result};
use crate::glob::KeyPattern;
use crate::rect::Rect;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Coarse type of a key, independent of sort direction or case folding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    /// [`Key::Nil`]
    Nil,
    /// [`Key::Bool`]
    Bool,
    /// [`Key::Int`], [`Key::IntDesc`]
    Int,
    /// [`Key::Float`], [`Key::FloatDesc`]
    Float,
    /// Every string variant
    String,
    /// [`Key::StringMax`]
    Max,
    /// [`Key::Rect`]
    Rect,
    /// [`Key::Composite2`]
    Composite,
}

/// An ordered, pattern-matchable key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Key {
    /// Smallest key
    Nil,
    /// `false < true`
    Bool(bool),
    /// Signed integer, ascending
    Int(i64),
    /// Signed integer, descending
    IntDesc(i64),
    /// Float, ascending
    Float(f64),
    /// Float, descending
    FloatDesc(f64),
    /// Byte-wise ordered string
    String(String),
    /// Byte-wise ordered string, descending
    StringDesc(String),
    /// ASCII case-insensitive string
    StringCI(String),
    /// ASCII case-insensitive string, descending
    StringCIDesc(String),
    /// Greatest key; open upper bound for ranges
    StringMax,
    /// Axis-aligned box for spatial indexes
    Rect(Rect),
    /// Two non-composite keys ordered lexicographically
    Composite2(Box<(Key, Key)>),
}

impl Key {
    /// Smallest possible key
    pub const fn min() -> Key {
        Key::Nil
    }

    /// Greatest possible key
    pub const fn max() -> Key {
        Key::StringMax
    }

    /// Build a two-component key
    ///
    /// Fails with `InvalidArgument` if either component is itself composite.
    pub fn composite(first: Key, second: Key) -> Result<Key> {
        if first.is_composite() || second.is_composite() {
            return Err(Error::InvalidArgument(
                "composite keys cannot be nested".to_string(),
            ));
        }
        Ok(Key::Composite2(Box::new((first, second))))
    }

    /// Shorthand for `Key::String`
    pub fn string(s: impl Into<String>) -> Key {
        Key::String(s.into())
    }

    /// Coarse kind
    pub fn kind(&self) -> DataKind {
        match self {
            Key::Nil => DataKind::Nil,
            Key::Bool(_) => DataKind::Bool,
            Key::Int(_) | Key::IntDesc(_) => DataKind::Int,
            Key::Float(_) | Key::FloatDesc(_) => DataKind::Float,
            Key::String(_) | Key::StringDesc(_) | Key::StringCI(_) | Key::StringCIDesc(_) => {
                DataKind::String
            }
            Key::StringMax => DataKind::Max,
            Key::Rect(_) => DataKind::Rect,
            Key::Composite2(_) => DataKind::Composite,
        }
    }

    /// True for [`Key::Composite2`]
    pub fn is_composite(&self) -> bool {
        matches!(self, Key::Composite2(_))
    }

    /// Number of components: two for composites, one otherwise
    pub fn key_count(&self) -> usize {
        if self.is_composite() {
            2
        } else {
            1
        }
    }

    /// Component `i`; a scalar key is its own component 0
    pub fn key_at(&self, i: usize) -> Option<&Key> {
        match (self, i) {
            (Key::Composite2(pair), 0) => Some(&pair.0),
            (Key::Composite2(pair), 1) => Some(&pair.1),
            (Key::Composite2(_), _) => None,
            (scalar, 0) => Some(scalar),
            _ => None,
        }
    }

    /// Text payload of any string variant
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::String(s) | Key::StringDesc(s) | Key::StringCI(s) | Key::StringCIDesc(s) => {
                Some(s)
            }
            _ => None,
        }
    }

    /// Rectangle payload
    pub fn as_rect(&self) -> Option<&Rect> {
        match self {
            Key::Rect(r) => Some(r),
            _ => None,
        }
    }

    /// Glob match against this key
    ///
    /// Only string keys carry text to match; every other kind matches nothing
    /// but the catch-all `*`. Case-insensitive keys are lower-cased before
    /// matching. Composites match on their first component.
    pub fn matches(&self, pattern: &KeyPattern) -> bool {
        if pattern.is_match_all() {
            return true;
        }
        match self {
            Key::String(s) | Key::StringDesc(s) => pattern.is_match(s),
            Key::StringCI(s) | Key::StringCIDesc(s) => {
                if s.bytes().any(|b| b.is_ascii_uppercase()) {
                    pattern.is_match(&s.to_ascii_lowercase())
                } else {
                    pattern.is_match(s)
                }
            }
            Key::Composite2(pair) => pair.0.matches(pattern),
            _ => false,
        }
    }

    /// Compare two keys by the total order
    pub fn compare(&self, other: &Key) -> Ordering {
        let (ta, tb) = (self.tier(), other.tier());
        if ta != tb {
            return ta.cmp(&tb);
        }
        match (self, other) {
            (Key::Bool(a), Key::Bool(b)) => a.cmp(b),
            (Key::String(a), Key::String(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Key::StringDesc(a), Key::StringDesc(b)) => b.as_bytes().cmp(a.as_bytes()),
            (Key::StringCI(a), Key::StringCI(b)) => cmp_case_insensitive(a, b),
            (Key::StringCIDesc(a), Key::StringCIDesc(b)) => cmp_case_insensitive(b, a),
            (Key::Rect(a), Key::Rect(b)) => a.total_cmp(b),
            (Key::Composite2(a), Key::Composite2(b)) => {
                a.0.compare(&b.0).then_with(|| a.1.compare(&b.1))
            }
            _ => match (self.numeric(), other.numeric()) {
                // Ascending and descending numerics never share a tier
                (Some(a), Some(b)) if self.is_descending() => b.cmp(&a),
                (Some(a), Some(b)) => a.cmp(&b),
                // Nil/Nil and StringMax/StringMax
                _ => Ordering::Equal,
            },
        }
    }

    /// Order two index entries, tie-broken by the owning records' primary keys
    pub fn compare_entry(&self, own_pk: &Key, other: &Key, other_pk: &Key) -> Ordering {
        self.compare(other).then_with(|| own_pk.compare(other_pk))
    }

    /// Strict less-than for index entries, tie-broken by primary key
    pub fn less_than_entry(&self, own_pk: &Key, other: &Key, other_pk: &Key) -> bool {
        self.compare_entry(own_pk, other, other_pk) == Ordering::Less
    }

    fn tier(&self) -> u8 {
        match self {
            Key::Nil => 0,
            Key::Bool(_) => 1,
            Key::Int(_) | Key::Float(_) => 2,
            Key::IntDesc(_) | Key::FloatDesc(_) => 3,
            Key::String(_) => 4,
            Key::StringDesc(_) => 5,
            Key::StringCI(_) => 6,
            Key::StringCIDesc(_) => 7,
            Key::Rect(_) => 8,
            Key::Composite2(_) => 9,
            Key::StringMax => 10,
        }
    }

    fn is_descending(&self) -> bool {
        matches!(self, Key::IntDesc(_) | Key::FloatDesc(_))
    }

    fn numeric(&self) -> Option<Numeric> {
        match self {
            Key::Int(v) | Key::IntDesc(v) => Some(Numeric::Int(*v)),
            Key::Float(v) | Key::FloatDesc(v) => Some(Numeric::Float(*v)),
            _ => None,
        }
    }
}

fn cmp_case_insensitive(a: &str, b: &str) -> Ordering {
    let fold = |c: &u8| c.to_ascii_lowercase();
    a.as_bytes().iter().map(fold).cmp(b.as_bytes().iter().map(fold))
}

/// A number viewed for cross-kind comparison
#[derive(Clone, Copy)]
enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    fn cmp(&self, other: &Numeric) -> Ordering {
        match (*self, *other) {
            (Numeric::Int(a), Numeric::Int(b)) => a.cmp(&b),
            (Numeric::Float(a), Numeric::Float(b)) => cmp_float(a, b),
            (Numeric::Int(a), Numeric::Float(b)) => cmp_int_float(a, b),
            (Numeric::Float(a), Numeric::Int(b)) => cmp_int_float(b, a).reverse(),
        }
    }
}

/// NaN sorts above every number and equals itself; `-0.0 == 0.0`
fn cmp_float(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Exact comparison of an integer against a float
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    // 2^63: every float at or above it exceeds i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() || f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => cmp_float(whole, f),
        ord => ord,
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Nil => f.write_str("nil"),
            Key::Bool(b) => write!(f, "{b}"),
            Key::Int(v) | Key::IntDesc(v) => write!(f, "{v}"),
            Key::Float(v) | Key::FloatDesc(v) => write!(f, "{v}"),
            Key::String(s) | Key::StringDesc(s) | Key::StringCI(s) | Key::StringCIDesc(s) => {
                f.write_str(s)
            }
            Key::StringMax => f.write_str("+inf"),
            Key::Rect(r) => write!(f, "{r}"),
            Key::Composite2(pair) => write!(f, "({}, {})", pair.0, pair.1),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(s)
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Int(v)
    }
}

impl From<f64> for Key {
    fn from(v: f64) -> Self {
        Key::Float(v)
    }
}

impl From<bool> for Key {
    fn from(v: bool) -> Self {
        Key::Bool(v)
    }
}

impl From<Rect> for Key {
    fn from(r: Rect) -> Self {
        Key::Rect(r)
    }
}
