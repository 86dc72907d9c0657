//! Axis-aligned bounding boxes for spatial keys

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Maximum number of dimensions a rectangle may have
pub const MAX_DIMS: usize = 20;

/// An axis-aligned box of 1 to [`MAX_DIMS`] dimensions
///
/// Construction validates that `min` and `max` have the same length, that
/// every coordinate is a number, and that `min[i] <= max[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RectParts")]
pub struct Rect {
    min: Vec<f64>,
    max: Vec<f64>,
}

/// Unvalidated wire shape of a [`Rect`]
#[derive(Deserialize)]
struct RectParts {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl TryFrom<RectParts> for Rect {
    type Error = Error;

    fn try_from(parts: RectParts) -> Result<Self> {
        Rect::new(parts.min, parts.max)
    }
}

impl Rect {
    /// Create a validated rectangle
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> Result<Self> {
        if min.is_empty() || min.len() > MAX_DIMS {
            return Err(Error::InvalidArgument(format!(
                "rect must have 1 to {} dimensions, got {}",
                MAX_DIMS,
                min.len()
            )));
        }
        if min.len() != max.len() {
            return Err(Error::InvalidArgument(format!(
                "rect min has {} dimensions but max has {}",
                min.len(),
                max.len()
            )));
        }
        for (i, (lo, hi)) in min.iter().zip(&max).enumerate() {
            if lo.is_nan() || hi.is_nan() {
                return Err(Error::InvalidArgument(format!("rect dimension {i} is NaN")));
            }
            if lo > hi {
                return Err(Error::InvalidArgument(format!(
                    "rect dimension {i}: min {lo} exceeds max {hi}"
                )));
            }
        }
        Ok(Rect { min, max })
    }

    /// A degenerate rectangle covering one point
    pub fn point(coords: Vec<f64>) -> Result<Self> {
        Rect::new(coords.clone(), coords)
    }

    /// Lower corner
    pub fn min(&self) -> &[f64] {
        &self.min
    }

    /// Upper corner
    pub fn max(&self) -> &[f64] {
        &self.max
    }

    /// Number of dimensions
    pub fn dims(&self) -> usize {
        self.min.len()
    }

    /// True when `min == max` in every dimension
    pub fn is_point(&self) -> bool {
        self.min == self.max
    }

    /// Overlap test over the dimensions both rectangles share
    pub fn intersects(&self, other: &Rect) -> bool {
        self.common(other)
            .all(|(a_lo, a_hi, b_lo, b_hi)| a_lo <= b_hi && b_lo <= a_hi)
    }

    /// True when `other` lies entirely inside `self`
    pub fn contains(&self, other: &Rect) -> bool {
        self.common(other)
            .all(|(a_lo, a_hi, b_lo, b_hi)| a_lo <= b_lo && b_hi <= a_hi)
    }

    /// Smallest rectangle covering both
    ///
    /// Dimensions present in only one input are carried over unchanged.
    pub fn union(&self, other: &Rect) -> Rect {
        let dims = self.dims().max(other.dims());
        let mut min = Vec::with_capacity(dims);
        let mut max = Vec::with_capacity(dims);
        for i in 0..dims {
            let (lo, hi) = match (self.min.get(i), other.min.get(i)) {
                (Some(&a), Some(&b)) => (a.min(b), self.max[i].max(other.max[i])),
                (Some(&a), None) => (a, self.max[i]),
                (None, Some(&b)) => (b, other.max[i]),
                (None, None) => (0.0, 0.0),
            };
            min.push(lo);
            max.push(hi);
        }
        Rect { min, max }
    }

    /// Product of side lengths
    pub fn area(&self) -> f64 {
        self.min
            .iter()
            .zip(&self.max)
            .map(|(lo, hi)| hi - lo)
            .product()
    }

    /// Euclidean distance between the closest points of the two boxes
    ///
    /// Zero when the boxes overlap.
    pub fn box_distance(&self, other: &Rect) -> f64 {
        self.common(other)
            .map(|(a_lo, a_hi, b_lo, b_hi)| {
                let gap = if b_hi < a_lo {
                    a_lo - b_hi
                } else if a_hi < b_lo {
                    b_lo - a_hi
                } else {
                    0.0
                };
                gap * gap
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Euclidean distance between the two centers
    pub fn center_distance(&self, other: &Rect) -> f64 {
        self.common(other)
            .map(|(a_lo, a_hi, b_lo, b_hi)| {
                let d = (a_lo + a_hi) / 2.0 - (b_lo + b_hi) / 2.0;
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }

    fn common<'a>(&'a self, other: &'a Rect) -> impl Iterator<Item = (f64, f64, f64, f64)> + 'a {
        self.min
            .iter()
            .zip(&self.max)
            .zip(other.min.iter().zip(&other.max))
            .map(|((a_lo, a_hi), (b_lo, b_hi))| (*a_lo, *a_hi, *b_lo, *b_hi))
    }

    /// Lexicographic order over min then max coordinates
    pub(crate) fn total_cmp(&self, other: &Rect) -> Ordering {
        let by_min = cmp_coords(&self.min, &other.min);
        if by_min != Ordering::Equal {
            return by_min;
        }
        cmp_coords(&self.max, &other.max)
    }
}

fn cmp_coords(a: &[f64], b: &[f64]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        match x.partial_cmp(y).unwrap_or(Ordering::Equal) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    a.len().cmp(&b.len())
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_coords(f, &self.min)?;
        if !self.is_point() {
            f.write_str(",")?;
            write_coords(f, &self.max)?;
        }
        Ok(())
    }
}

fn write_coords(f: &mut fmt::Formatter<'_>, coords: &[f64]) -> fmt::Result {
    f.write_str("[")?;
    for (i, c) in coords.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{c}")?;
    }
    f.write_str("]")
}
