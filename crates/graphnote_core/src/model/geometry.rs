//! Geometry value types shared across the overlay engine.
//!
//! # Responsibility
//! - Separate world-space and view-space coordinates at the type level.
//! - Provide the box-size type used by notes and visual frames.
//!
//! # Invariants
//! - World coordinates are pan/zoom independent; view coordinates are not.
//! - The two spaces never mix without going through `ViewTransform`.

use serde::{Deserialize, Serialize};

/// A point in world space, the pan/zoom-independent space notes persist in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

impl WorldPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns whether both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Returns this point shifted by a world-space delta.
    pub fn offset_by(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// A point in view space, the current on-screen space derived from the
/// live transform.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewPoint {
    pub x: f64,
    pub y: f64,
}

impl ViewPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns this point shifted by a view-space delta.
    pub fn offset_by(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Box dimensions in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns this size with both dimensions clamped to the given minima.
    pub fn clamped_to(&self, min_width: f64, min_height: f64) -> Self {
        Self::new(self.width.max(min_width), self.height.max(min_height))
    }
}
