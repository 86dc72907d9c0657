//! Ordered index tree
//!
//! Entries are `(projected key, primary key)` pairs ordered by the key total
//! order, tie-broken by primary key, so equal projections iterate in a
//! deterministic order. Each entry points back at its record through a
//! [`RecordId`] handle.

use doctable_core::Key;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;

use crate::record::RecordId;

/// Position of an entry in an ordered index
#[derive(Debug, Clone)]
pub struct EntryKey {
    /// Projected key
    pub key: Key,
    /// Owning record's primary key
    pub pk: Key,
}

impl EntryKey {
    /// Build an entry position
    pub fn new(key: Key, pk: Key) -> Self {
        EntryKey { key, pk }
    }
}

impl PartialEq for EntryKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EntryKey {}

impl PartialOrd for EntryKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntryKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.compare_entry(&self.pk, &other.key, &other.pk)
    }
}

/// A bounded walk over an ordered tree
///
/// `lower`/`upper` are in tree order; `reverse` walks from the upper end.
#[derive(Debug, Clone)]
pub struct Span {
    /// Lower bound
    pub lower: Bound<Key>,
    /// Upper bound
    pub upper: Bound<Key>,
    /// Walk from the upper end down
    pub reverse: bool,
}

impl Span {
    /// Every entry, ascending
    pub fn ascend() -> Self {
        Span {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
            reverse: false,
        }
    }

    /// Entries `>= pivot`, ascending
    pub fn ascend_greater_or_equal(pivot: Key) -> Self {
        Span {
            lower: Bound::Included(pivot),
            ..Self::ascend()
        }
    }

    /// Entries `< pivot`, ascending
    pub fn ascend_less_than(pivot: Key) -> Self {
        Span {
            upper: Bound::Excluded(pivot),
            ..Self::ascend()
        }
    }

    /// Entries in `[ge, lt)`, ascending
    pub fn ascend_range(ge: Key, lt: Key) -> Self {
        Span {
            lower: Bound::Included(ge),
            upper: Bound::Excluded(lt),
            reverse: false,
        }
    }

    /// Every entry, descending
    pub fn descend() -> Self {
        Span {
            reverse: true,
            ..Self::ascend()
        }
    }

    /// Entries `<= pivot`, descending
    pub fn descend_less_or_equal(pivot: Key) -> Self {
        Span {
            upper: Bound::Included(pivot),
            ..Self::descend()
        }
    }

    /// Entries `> pivot`, descending
    pub fn descend_greater_than(pivot: Key) -> Self {
        Span {
            lower: Bound::Excluded(pivot),
            ..Self::descend()
        }
    }

    /// Entries in `(gt, le]`, descending from `le`
    pub fn descend_range(le: Key, gt: Key) -> Self {
        Span {
            lower: Bound::Excluded(gt),
            upper: Bound::Included(le),
            reverse: true,
        }
    }

    /// Re-shape both pivots
    ///
    /// `f` receives each pivot with the key that fills any unconstrained
    /// trailing position: `Key::min()` for `>=` and `<` bounds, `Key::max()`
    /// for `<=` and `>` bounds.
    pub fn map_pivots(self, mut f: impl FnMut(Key, Key) -> Key) -> Span {
        let lower = match self.lower {
            Bound::Included(k) => Bound::Included(f(k, Key::min())),
            Bound::Excluded(k) => Bound::Excluded(f(k, Key::max())),
            Bound::Unbounded => Bound::Unbounded,
        };
        let upper = match self.upper {
            Bound::Included(k) => Bound::Included(f(k, Key::max())),
            Bound::Excluded(k) => Bound::Excluded(f(k, Key::min())),
            Bound::Unbounded => Bound::Unbounded,
        };
        Span {
            lower,
            upper,
            reverse: self.reverse,
        }
    }

    /// Bounds over index entries, with the primary key filled the same way
    pub fn entry_bounds(&self) -> (Bound<EntryKey>, Bound<EntryKey>) {
        let lower = match &self.lower {
            Bound::Included(k) => Bound::Included(EntryKey::new(k.clone(), Key::min())),
            Bound::Excluded(k) => Bound::Excluded(EntryKey::new(k.clone(), Key::max())),
            Bound::Unbounded => Bound::Unbounded,
        };
        let upper = match &self.upper {
            Bound::Included(k) => Bound::Included(EntryKey::new(k.clone(), Key::max())),
            Bound::Excluded(k) => Bound::Excluded(EntryKey::new(k.clone(), Key::min())),
            Bound::Unbounded => Bound::Unbounded,
        };
        (lower, upper)
    }
}

/// Range over a map that yields nothing, instead of panicking, when the
/// bounds are inverted
pub(crate) fn bounded_range<K: Ord, V>(
    map: &BTreeMap<K, V>,
    lower: Bound<K>,
    upper: Bound<K>,
) -> impl DoubleEndedIterator<Item = (&K, &V)> {
    let empty = match (&lower, &upper) {
        (
            Bound::Included(lo) | Bound::Excluded(lo),
            Bound::Included(hi) | Bound::Excluded(hi),
        ) => match lo.cmp(hi) {
            Ordering::Greater => true,
            Ordering::Equal => {
                !matches!((&lower, &upper), (Bound::Included(_), Bound::Included(_)))
            }
            Ordering::Less => false,
        },
        _ => false,
    };
    let range = if empty {
        None
    } else {
        Some(map.range((lower, upper)))
    };
    range.into_iter().flatten()
}

/// Balanced ordered tree of index entries
#[derive(Debug, Default)]
pub struct OrderedTree {
    entries: BTreeMap<EntryKey, RecordId>,
}

impl OrderedTree {
    /// Empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any entry at the same position
    pub fn insert(&mut self, key: Key, pk: Key, record: RecordId) -> Option<RecordId> {
        self.entries.insert(EntryKey::new(key, pk), record)
    }

    /// Remove the entry at `(key, pk)`
    pub fn remove(&mut self, key: Key, pk: Key) -> Option<RecordId> {
        self.entries.remove(&EntryKey::new(key, pk))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the tree holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Record handles of every entry, in tree order
    pub fn records(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.entries.values().copied()
    }

    /// Walk the entries selected by `span`
    ///
    /// Stops early when `visit` returns `false`.
    pub fn scan<F>(&self, span: &Span, mut visit: F)
    where
        F: FnMut(&EntryKey, RecordId) -> bool,
    {
        let (lower, upper) = span.entry_bounds();
        let range = bounded_range(&self.entries, lower, upper);
        if span.reverse {
            for (entry, record) in range.rev() {
                if !visit(entry, *record) {
                    break;
                }
            }
        } else {
            for (entry, record) in range {
                if !visit(entry, *record) {
                    break;
                }
            }
        }
    }
}
