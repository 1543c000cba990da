//! Typed coordinate spaces.
//!
//! Keeps parent-relative and absolute positions from being mixed by accident.
//!
//! # Coordinate Spaces
//!
//! - **Canvas space**: absolute positions on the infinite canvas
//! - **Screen space**: pixels relative to the canvas widget, after zoom/pan
//! - **Local space**: position relative to the parent element's origin, or to
//!   the canvas origin for elements without a parent

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Absolute position in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasPoint(pub Vec2);

/// Position in screen space (pixels relative to the canvas widget).
///
/// Only used to anchor context menus; placement never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint(pub Vec2);

/// Position relative to the parent element's origin.
///
/// This is what an element stores. For an element without a parent, local
/// space and canvas space coincide.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LocalPoint(pub Vec2);

/// Width and height in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasSize(pub Vec2);

// === CanvasPoint ===

impl CanvasPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self(Vec2::new(x, y))
    }

    pub fn x(&self) -> f32 {
        self.0.x
    }

    pub fn y(&self) -> f32 {
        self.0.y
    }
}

impl From<Vec2> for CanvasPoint {
    fn from(v: Vec2) -> Self {
        Self(v)
    }
}

impl From<CanvasPoint> for Vec2 {
    fn from(p: CanvasPoint) -> Self {
        p.0
    }
}

// === ScreenPoint ===

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self(Vec2::new(x, y))
    }
}

// === LocalPoint ===

impl LocalPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self(Vec2::new(x, y))
    }

    pub fn x(&self) -> f32 {
        self.0.x
    }

    pub fn y(&self) -> f32 {
        self.0.y
    }

    /// Express an absolute point relative to a parent at `parent_origin`.
    pub fn from_canvas(point: CanvasPoint, parent_origin: CanvasPoint) -> Self {
        LocalPoint(point.0 - parent_origin.0)
    }

    /// Local position of a root element: canvas space is its parent space.
    pub fn root(point: CanvasPoint) -> Self {
        LocalPoint(point.0)
    }
}

impl From<Vec2> for LocalPoint {
    fn from(v: Vec2) -> Self {
        Self(v)
    }
}

// === CanvasSize ===

impl CanvasSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self(Vec2::new(width, height))
    }

    pub fn width(&self) -> f32 {
        self.0.x
    }

    pub fn height(&self) -> f32 {
        self.0.y
    }
}

impl From<Vec2> for CanvasSize {
    fn from(v: Vec2) -> Self {
        Self(v)
    }
}

impl From<CanvasSize> for Vec2 {
    fn from(s: CanvasSize) -> Self {
        s.0
    }
}
