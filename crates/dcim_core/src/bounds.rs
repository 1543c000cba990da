//! Axis-aligned bounding boxes built on glam
//!
//! Placement never rotates anything, so every box on the canvas stays
//! axis-aligned and overlap reduces to two interval comparisons.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box represented by minimum and maximum points
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// The minimum point (top-left in canvas coordinates)
    pub min: Vec2,
    /// The maximum point (bottom-right in canvas coordinates)
    pub max: Vec2,
}

impl Bounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Box of an element whose top-left corner is `origin`.
    pub fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self {
            min: origin,
            max: origin + size,
        }
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Tests if this bounds intersects with another
    ///
    /// Overlap must have non-zero measure on both axes: boxes that only share
    /// an edge or a corner do not intersect.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// The smallest bounds that contains both input bounds
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Tests if another bounds is entirely contained within this bounds.
    /// Shared edges count as contained.
    pub fn contains_bounds(&self, other: &Self) -> bool {
        other.min.x >= self.min.x
            && other.max.x <= self.max.x
            && other.min.y >= self.min.y
            && other.max.y <= self.max.y
    }
}
