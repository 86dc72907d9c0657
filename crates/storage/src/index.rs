//! Secondary indexes
//!
//! An [`Index`] is a named, pattern-scoped view over the primary store. It
//! owns its backing tree outright: an [`OrderedTree`] for ordered indexes, a
//! [`SpatialTree`] for spatial ones. Entries are derived from record values
//! through the index's [`Projector`]; the table keeps them in step on every
//! write.

use doctable_core::{Key, KeyPattern, Rect, Result};
use doctable_document::Projector;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ordered::{OrderedTree, Span};
use crate::record::RecordId;
use crate::spatial::{DistanceMode, SpatialItem, SpatialTree};

/// Stable identity of an index for the lifetime of a table
///
/// Never reused, so record back-references to a dropped index cannot be
/// mistaken for a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexId(u64);

impl IndexId {
    /// Wrap a raw id
    pub const fn new(id: u64) -> Self {
        IndexId(id)
    }

    /// Raw id
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Backing structure of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    /// Ordered tree of projected keys
    Ordered,
    /// R-tree of rectangles
    Spatial,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Ordered => write!(f, "ordered"),
            IndexKind::Spatial => write!(f, "spatial"),
        }
    }
}

#[derive(Debug)]
enum IndexTree {
    Ordered(OrderedTree),
    Spatial(SpatialTree),
}

/// A named secondary index
#[derive(Debug)]
pub struct Index {
    id: IndexId,
    name: String,
    pattern: KeyPattern,
    projector: Projector,
    tree: IndexTree,
}

impl Index {
    /// Empty ordered index
    pub fn ordered(id: IndexId, name: &str, pattern: KeyPattern, projector: Projector) -> Self {
        Index {
            id,
            name: name.to_string(),
            pattern,
            projector,
            tree: IndexTree::Ordered(OrderedTree::new()),
        }
    }

    /// Empty spatial index with the given node capacity
    pub fn spatial(
        id: IndexId,
        name: &str,
        pattern: KeyPattern,
        projector: Projector,
        node_capacity: usize,
    ) -> Self {
        Index {
            id,
            name: name.to_string(),
            pattern,
            projector,
            tree: IndexTree::Spatial(SpatialTree::new(node_capacity)),
        }
    }

    /// Index identity
    pub fn id(&self) -> IndexId {
        self.id
    }

    /// Index name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Glob pattern over primary keys
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Key projector
    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    /// Backing structure
    pub fn kind(&self) -> IndexKind {
        match self.tree {
            IndexTree::Ordered(_) => IndexKind::Ordered,
            IndexTree::Spatial(_) => IndexKind::Spatial,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        match &self.tree {
            IndexTree::Ordered(tree) => tree.len(),
            IndexTree::Spatial(tree) => tree.len(),
        }
    }

    /// True when the index holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when records under `pk` belong to this index
    pub fn covers(&self, pk: &Key) -> bool {
        pk.matches(&self.pattern)
    }

    /// Project a record value into this index's key space
    ///
    /// `Ok(None)` leaves the record out. Spatial indexes keep rectangles only.
    pub fn project(&self, value: &[u8]) -> Result<Option<Key>> {
        let key = self.projector.project(value)?;
        Ok(match self.tree {
            IndexTree::Ordered(_) => key,
            IndexTree::Spatial(_) => key.filter(|k| k.as_rect().is_some()),
        })
    }

    pub(crate) fn insert(&mut self, key: Key, pk: Key, record: RecordId) {
        match (&mut self.tree, key) {
            (IndexTree::Ordered(tree), key) => {
                tree.insert(key, pk, record);
            }
            (IndexTree::Spatial(tree), Key::Rect(rect)) => tree.insert(rect, pk, record),
            (IndexTree::Spatial(_), _) => {}
        }
    }

    pub(crate) fn remove(&mut self, key: Key, pk: Key, record: RecordId) {
        match (&mut self.tree, key) {
            (IndexTree::Ordered(tree), key) => {
                tree.remove(key, pk);
            }
            (IndexTree::Spatial(tree), Key::Rect(rect)) => {
                tree.remove(&rect, record);
            }
            (IndexTree::Spatial(_), _) => {}
        }
    }

    pub(crate) fn clear(&mut self) {
        match &mut self.tree {
            IndexTree::Ordered(tree) => tree.clear(),
            IndexTree::Spatial(tree) => tree.clear(),
        }
    }

    /// Records currently holding an entry
    pub(crate) fn records(&self) -> Vec<RecordId> {
        match &self.tree {
            IndexTree::Ordered(tree) => tree.records().collect(),
            IndexTree::Spatial(tree) => {
                let mut out = Vec::with_capacity(tree.len());
                if let Some(bounds) = tree.bounds() {
                    tree.search(&bounds, |item| {
                        out.push(item.record);
                        true
                    });
                }
                out
            }
        }
    }

    /// Walk an ordered index over `span`, pivots given in caller key space
    ///
    /// Spatial indexes yield nothing.
    pub(crate) fn scan<F>(&self, span: Span, mut visit: F)
    where
        F: FnMut(RecordId) -> bool,
    {
        if let IndexTree::Ordered(tree) = &self.tree {
            let span = span.map_pivots(|pivot, fill| self.projector.pivot(pivot, fill));
            tree.scan(&span, |_, record| visit(record));
        }
    }

    /// Entries overlapping `target`; ordered indexes yield nothing
    pub(crate) fn intersects<F>(&self, target: &Rect, visit: F)
    where
        F: FnMut(&SpatialItem) -> bool,
    {
        if let IndexTree::Spatial(tree) = &self.tree {
            tree.search(target, visit);
        }
    }

    /// Entries by ascending distance from `target`; ordered indexes yield nothing
    pub(crate) fn nearby<F>(&self, target: &Rect, mode: DistanceMode, visit: F)
    where
        F: FnMut(&SpatialItem, f64) -> bool,
    {
        if let IndexTree::Spatial(tree) = &self.tree {
            tree.nearby(target, mode, visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Record, RecordArena};
    use doctable_document::{IndexField, IndexOpts};

    fn age_index() -> Index {
        let projector = Projector::single(IndexField::json("age", IndexOpts::int(false)).unwrap());
        let pattern = KeyPattern::new("user:*").unwrap();
        Index::ordered(IndexId::new(1), "age", pattern, projector)
    }

    #[test]
    fn test_covers_pattern() {
        let index = age_index();
        assert!(index.covers(&Key::string("user:1")));
        assert!(!index.covers(&Key::string("group:1")));
        assert!(!index.covers(&Key::Int(1)));
    }

    #[test]
    fn test_project_and_scan() {
        let mut index = age_index();
        let mut arena = RecordArena::new();
        for (pk, doc) in [("user:1", r#"{"age":40}"#), ("user:2", r#"{"age":30.7}"#)] {
            let pk = Key::string(pk);
            let id = arena.insert(Record::new(pk.clone(), doc.as_bytes().to_vec(), None));
            let key = index.project(doc.as_bytes()).unwrap().unwrap();
            index.insert(key, pk, id);
        }
        assert_eq!(index.len(), 2);
        assert!(index.project(br#"{"name":"x"}"#).unwrap().is_none());

        let mut seen = Vec::new();
        index.scan(Span::ascend_greater_or_equal(Key::Float(30.0)), |id| {
            seen.push(arena.get(id).unwrap().key.clone());
            true
        });
        assert_eq!(seen, vec![Key::string("user:2"), Key::string("user:1")]);
    }

    #[test]
    fn test_spatial_keeps_rects_only() {
        let index = Index::spatial(
            IndexId::new(2),
            "loc",
            KeyPattern::all(),
            Projector::single(IndexField::value(IndexOpts::INCLUDE_ANY)),
            8,
        );
        assert_eq!(index.kind(), IndexKind::Spatial);
        assert!(index.project(b"42").unwrap().is_none());

        let mut seen = 0;
        index.scan(Span::ascend(), |_| {
            seen += 1;
            true
        });
        assert_eq!(seen, 0);
    }

    #[test]
    fn test_records_and_clear() {
        let mut index = Index::spatial(
            IndexId::new(3),
            "loc",
            KeyPattern::all(),
            Projector::single(IndexField::rect()),
            4,
        );
        let mut arena = RecordArena::new();
        for i in 0..10 {
            let pk = Key::Int(i);
            let id = arena.insert(Record::new(pk.clone(), Vec::new(), None));
            let rect = Rect::point(vec![i as f64, 0.0]).unwrap();
            index.insert(Key::Rect(rect), pk, id);
        }
        assert_eq!(index.records().len(), 10);
        index.clear();
        assert!(index.is_empty());
        assert_eq!(IndexKind::Ordered.to_string(), "ordered");
    }
}
