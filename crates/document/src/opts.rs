//! Index inclusion policy
//!
//! An [`IndexOpts`] set decides which projected key kinds an index field keeps
//! and how kept keys are re-shaped (direction, case folding, float-to-int).

use doctable_core::Key;

bitflags::bitflags! {
    /// Which projected kinds a field keeps, and how it orders them
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct IndexOpts: u32 {
        /// Keep string keys
        const INCLUDE_STRING = 1 << 0;
        /// Keep integer keys
        const INCLUDE_INT = 1 << 1;
        /// Keep float keys
        const INCLUDE_FLOAT = 1 << 2;
        /// Keep boolean keys
        const INCLUDE_BOOL = 1 << 3;
        /// Keep rectangles
        const INCLUDE_RECT = 1 << 4;
        /// Keep nil
        const INCLUDE_NIL = 1 << 5;
        /// Keep every scalar kind
        const INCLUDE_ANY = 1 << 6;
        /// Truncate kept floats to integers
        const FLOAT_AS_INT = 1 << 7;
        /// Order kept strings ignoring ASCII case
        const CASE_INSENSITIVE = 1 << 8;
        /// Descending order
        const SORT_DESC = 1 << 9;
    }
}

impl IndexOpts {
    /// Strings only
    pub fn string(desc: bool) -> Self {
        Self::INCLUDE_STRING.directed(desc)
    }

    /// Integers, with floats truncated to integers
    pub fn int(desc: bool) -> Self {
        (Self::INCLUDE_INT | Self::INCLUDE_FLOAT | Self::FLOAT_AS_INT).directed(desc)
    }

    /// Integers and floats
    pub fn float(desc: bool) -> Self {
        (Self::INCLUDE_INT | Self::INCLUDE_FLOAT).directed(desc)
    }

    /// Numbers, strings and nil
    pub fn any(desc: bool) -> Self {
        (Self::INCLUDE_INT | Self::INCLUDE_FLOAT | Self::INCLUDE_STRING | Self::INCLUDE_NIL)
            .directed(desc)
    }

    /// Rectangles only
    pub fn spatial() -> Self {
        Self::INCLUDE_RECT
    }

    fn directed(self, desc: bool) -> Self {
        if desc {
            self | Self::SORT_DESC
        } else {
            self
        }
    }

    fn keeps(&self, kind: IndexOpts) -> bool {
        self.intersects(kind | Self::INCLUDE_ANY)
    }

    fn desc(&self) -> bool {
        self.contains(Self::SORT_DESC)
    }

    /// Filter and re-shape a projected key
    ///
    /// Returns `None` when the key's kind is not kept; the record then has no
    /// entry in this index. Sentinels and composites are never kept.
    pub fn apply(&self, key: Key) -> Option<Key> {
        match key {
            Key::Nil => self.keeps(Self::INCLUDE_NIL).then_some(Key::Nil),
            Key::Bool(b) => self.keeps(Self::INCLUDE_BOOL).then_some(Key::Bool(b)),
            Key::Int(v) | Key::IntDesc(v) => {
                self.keeps(Self::INCLUDE_INT).then(|| self.shape_int(v))
            }
            Key::Float(v) | Key::FloatDesc(v) => {
                self.keeps(Self::INCLUDE_FLOAT).then(|| self.shape_float(v))
            }
            Key::String(s) | Key::StringDesc(s) | Key::StringCI(s) | Key::StringCIDesc(s) => {
                self.keeps(Self::INCLUDE_STRING).then(|| self.shape_string(s))
            }
            Key::Rect(r) => self.keeps(Self::INCLUDE_RECT).then_some(Key::Rect(r)),
            Key::StringMax | Key::Composite2(_) => None,
        }
    }

    /// Re-shape a scan pivot into this field's key space
    ///
    /// Unlike [`apply`](Self::apply) nothing is dropped: sentinels pass
    /// through, and kinds the field does not keep are left as they are.
    /// Floats keep their fractional part so range bounds stay exact.
    pub fn coerce(&self, pivot: Key) -> Key {
        match pivot {
            Key::Int(v) | Key::IntDesc(v) => self.shape_int(v),
            Key::Float(v) | Key::FloatDesc(v) => {
                if self.desc() {
                    Key::FloatDesc(v)
                } else {
                    Key::Float(v)
                }
            }
            Key::String(s) | Key::StringDesc(s) | Key::StringCI(s) | Key::StringCIDesc(s)
                if self.keeps(Self::INCLUDE_STRING) =>
            {
                self.shape_string(s)
            }
            other => other,
        }
    }

    fn shape_int(&self, v: i64) -> Key {
        if self.desc() {
            Key::IntDesc(v)
        } else {
            Key::Int(v)
        }
    }

    fn shape_float(&self, v: f64) -> Key {
        match (self.contains(Self::FLOAT_AS_INT), self.desc()) {
            // `as` saturates out-of-range values and maps NaN to zero
            (true, _) => self.shape_int(v as i64),
            (false, true) => Key::FloatDesc(v),
            (false, false) => Key::Float(v),
        }
    }

    fn shape_string(&self, s: String) -> Key {
        match (self.contains(Self::CASE_INSENSITIVE), self.desc()) {
            (true, true) => Key::StringCIDesc(s),
            (true, false) => Key::StringCI(s),
            (false, true) => Key::StringDesc(s),
            (false, false) => Key::String(s),
        }
    }
}
