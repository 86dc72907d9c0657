//! R-tree over rectangle entries
//!
//! Nodes hold at most `capacity` children. Inserts descend by least area
//! enlargement; an overfull node splits along the axis where its children's
//! centers spread the most. Removal prunes empty nodes and collapses a root
//! left with a single branch.
//!
//! Nearest-neighbour search is best-first over a min-heap of node and item
//! distances, so results come out in ascending distance order without
//! visiting subtrees whose bounding box is farther than the next result.

use doctable_core::{Key, Rect};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::record::RecordId;

/// Distance used by nearest-neighbour search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMode {
    /// Gap between the closest points of the two boxes
    #[default]
    Box,
    /// Distance between box centers
    Center,
}

impl DistanceMode {
    /// Distance between `a` and `b` under this mode
    pub fn distance(&self, a: &Rect, b: &Rect) -> f64 {
        match self {
            DistanceMode::Box => a.box_distance(b),
            DistanceMode::Center => a.center_distance(b),
        }
    }
}

/// One stored rectangle
#[derive(Debug, Clone)]
pub struct SpatialItem {
    /// Indexed rectangle
    pub rect: Rect,
    /// Owning record's primary key
    pub pk: Key,
    /// Owning record
    pub record: RecordId,
}

#[derive(Debug)]
struct Child {
    bbox: Rect,
    node: Box<Node>,
}

#[derive(Debug)]
enum Node {
    Leaf(Vec<SpatialItem>),
    Branch(Vec<Child>),
}

impl Node {
    fn len(&self) -> usize {
        match self {
            Node::Leaf(items) => items.len(),
            Node::Branch(children) => children.len(),
        }
    }

    fn bbox(&self) -> Option<Rect> {
        match self {
            Node::Leaf(items) => union_all(items.iter().map(|i| &i.rect)),
            Node::Branch(children) => union_all(children.iter().map(|c| &c.bbox)),
        }
    }
}

fn union_all<'a>(mut rects: impl Iterator<Item = &'a Rect>) -> Option<Rect> {
    let first = rects.next()?.clone();
    Some(rects.fold(first, |acc, r| acc.union(r)))
}

fn center(rect: &Rect, axis: usize) -> f64 {
    match (rect.min().get(axis), rect.max().get(axis)) {
        (Some(lo), Some(hi)) => (lo + hi) / 2.0,
        _ => 0.0,
    }
}

/// Split `items` in half along the axis of largest center spread
fn split_by_axis<T>(mut items: Vec<T>, rect_of: impl Fn(&T) -> &Rect) -> (Vec<T>, Vec<T>) {
    let dims = items.iter().map(|i| rect_of(i).dims()).max().unwrap_or(0);
    let mut best_axis = 0;
    let mut best_spread = f64::NEG_INFINITY;
    for axis in 0..dims {
        let (lo, hi) = items.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), i| {
            let c = center(rect_of(i), axis);
            (lo.min(c), hi.max(c))
        });
        if hi - lo > best_spread {
            best_spread = hi - lo;
            best_axis = axis;
        }
    }
    items.sort_by(|a, b| {
        center(rect_of(a), best_axis)
            .partial_cmp(&center(rect_of(b), best_axis))
            .unwrap_or(Ordering::Equal)
    });
    let rest = items.split_off(items.len() / 2);
    (items, rest)
}

fn enlargement(bbox: &Rect, rect: &Rect) -> f64 {
    bbox.union(rect).area() - bbox.area()
}

/// Candidate in a nearest-neighbour walk
enum Candidate<'a> {
    Node(&'a Node),
    Item(&'a SpatialItem),
}

/// Heap entry ordered by distance, items before nodes on ties
struct Scored<'a> {
    dist: f64,
    seq: u64,
    candidate: Candidate<'a>,
}

impl Scored<'_> {
    fn rank(&self) -> u8 {
        match self.candidate {
            Candidate::Item(_) => 0,
            Candidate::Node(_) => 1,
        }
    }
}

impl PartialEq for Scored<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scored<'_> {}

impl PartialOrd for Scored<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scored<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Wrapped in Reverse on the heap, so smaller pops first
        self.dist
            .total_cmp(&other.dist)
            .then_with(|| self.rank().cmp(&other.rank()))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// R-tree of rectangle entries
#[derive(Debug)]
pub struct SpatialTree {
    root: Node,
    capacity: usize,
    len: usize,
}

impl SpatialTree {
    /// Default maximum children per node
    pub const DEFAULT_CAPACITY: usize = 16;

    /// Empty tree with the given node capacity (at least 4)
    pub fn new(capacity: usize) -> Self {
        SpatialTree {
            root: Node::Leaf(Vec::new()),
            capacity: capacity.max(4),
            len: 0,
        }
    }

    /// Number of stored rectangles
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the tree is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.root = Node::Leaf(Vec::new());
        self.len = 0;
    }

    /// Bounding box of every stored rectangle
    pub fn bounds(&self) -> Option<Rect> {
        self.root.bbox()
    }

    /// Node depth; a lone leaf is height 1
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut node = &self.root;
        while let Node::Branch(children) = node {
            match children.first() {
                Some(child) => node = &child.node,
                None => break,
            }
            height += 1;
        }
        height
    }

    /// Add an entry
    pub fn insert(&mut self, rect: Rect, pk: Key, record: RecordId) {
        let item = SpatialItem { rect, pk, record };
        if let Some(sibling) = Self::insert_into(&mut self.root, item, self.capacity) {
            let old = std::mem::replace(&mut self.root, Node::Branch(Vec::new()));
            let mut children = Vec::with_capacity(2);
            for node in [old, sibling] {
                if let Some(bbox) = node.bbox() {
                    children.push(Child {
                        bbox,
                        node: Box::new(node),
                    });
                }
            }
            self.root = Node::Branch(children);
        }
        self.len += 1;
    }

    /// Returns the split-off sibling when `node` overflowed
    fn insert_into(node: &mut Node, item: SpatialItem, capacity: usize) -> Option<Node> {
        match node {
            Node::Leaf(items) => {
                items.push(item);
                if items.len() <= capacity {
                    return None;
                }
                let (keep, moved) = split_by_axis(std::mem::take(items), |i| &i.rect);
                *items = keep;
                Some(Node::Leaf(moved))
            }
            Node::Branch(children) => {
                let best = children
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| {
                        enlargement(&a.bbox, &item.rect)
                            .total_cmp(&enlargement(&b.bbox, &item.rect))
                            .then_with(|| a.bbox.area().total_cmp(&b.bbox.area()))
                    })
                    .map(|(i, _)| i);
                let Some(best) = best else {
                    children.push(Child {
                        bbox: item.rect.clone(),
                        node: Box::new(Node::Leaf(vec![item])),
                    });
                    return None;
                };
                let rect = item.rect.clone();
                let child = &mut children[best];
                match Self::insert_into(&mut child.node, item, capacity) {
                    None => {
                        child.bbox = child.bbox.union(&rect);
                    }
                    Some(sibling) => {
                        if let Some(bbox) = child.node.bbox() {
                            child.bbox = bbox;
                        }
                        if let Some(bbox) = sibling.bbox() {
                            children.push(Child {
                                bbox,
                                node: Box::new(sibling),
                            });
                        }
                    }
                }
                if children.len() <= capacity {
                    return None;
                }
                let (keep, moved) = split_by_axis(std::mem::take(children), |c| &c.bbox);
                *children = keep;
                Some(Node::Branch(moved))
            }
        }
    }

    /// Remove the entry for `record` stored under `rect`
    pub fn remove(&mut self, rect: &Rect, record: RecordId) -> bool {
        let removed = Self::remove_from(&mut self.root, rect, record);
        if removed {
            self.len -= 1;
            // Collapse single-child roots
            loop {
                match &mut self.root {
                    Node::Branch(children) if children.len() == 1 => {
                        let only = children.remove(0);
                        self.root = *only.node;
                    }
                    Node::Branch(children) if children.is_empty() => {
                        self.root = Node::Leaf(Vec::new());
                    }
                    _ => break,
                }
            }
        }
        removed
    }

    fn remove_from(node: &mut Node, rect: &Rect, record: RecordId) -> bool {
        match node {
            Node::Leaf(items) => match items.iter().position(|i| i.record == record) {
                Some(pos) => {
                    items.swap_remove(pos);
                    true
                }
                None => false,
            },
            Node::Branch(children) => {
                for i in 0..children.len() {
                    if !children[i].bbox.contains(rect) {
                        continue;
                    }
                    if Self::remove_from(&mut children[i].node, rect, record) {
                        match children[i].node.bbox() {
                            Some(bbox) if children[i].node.len() > 0 => children[i].bbox = bbox,
                            _ => {
                                children.swap_remove(i);
                            }
                        }
                        return true;
                    }
                }
                false
            }
        }
    }

    /// Visit every entry whose rectangle overlaps `target`, in no particular
    /// order; stops when `visit` returns `false`
    pub fn search<F>(&self, target: &Rect, mut visit: F)
    where
        F: FnMut(&SpatialItem) -> bool,
    {
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            match node {
                Node::Leaf(items) => {
                    for item in items.iter().filter(|i| i.rect.intersects(target)) {
                        if !visit(item) {
                            return;
                        }
                    }
                }
                Node::Branch(children) => {
                    stack.extend(
                        children
                            .iter()
                            .filter(|c| c.bbox.intersects(target))
                            .map(|c| &*c.node),
                    );
                }
            }
        }
    }

    /// Visit entries in ascending distance from `target`
    ///
    /// Stops when `visit` returns `false`. Node pruning uses box distance,
    /// which never exceeds the distance of anything inside the node under
    /// either mode.
    pub fn nearby<F>(&self, target: &Rect, mode: DistanceMode, mut visit: F)
    where
        F: FnMut(&SpatialItem, f64) -> bool,
    {
        let mut seq = 0u64;
        let mut heap = BinaryHeap::new();
        heap.push(Reverse(Scored {
            dist: 0.0,
            seq,
            candidate: Candidate::Node(&self.root),
        }));
        while let Some(Reverse(scored)) = heap.pop() {
            match scored.candidate {
                Candidate::Item(item) => {
                    if !visit(item, scored.dist) {
                        return;
                    }
                }
                Candidate::Node(Node::Leaf(items)) => {
                    for item in items {
                        seq += 1;
                        heap.push(Reverse(Scored {
                            dist: mode.distance(&item.rect, target),
                            seq,
                            candidate: Candidate::Item(item),
                        }));
                    }
                }
                Candidate::Node(Node::Branch(children)) => {
                    for child in children {
                        seq += 1;
                        heap.push(Reverse(Scored {
                            dist: child.bbox.box_distance(target),
                            seq,
                            candidate: Candidate::Node(&child.node),
                        }));
                    }
                }
            }
        }
    }
}

impl Default for SpatialTree {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
