//! View-transform access and world/view coordinate mapping.
//!
//! # Responsibility
//! - Read the host's pan/zoom transform on demand through a narrow seam.
//! - Map between world space (storage) and view space (display).
//! - Detect transform changes across ticks; the host sends no notifications.
//!
//! # Invariants
//! - `scale` is strictly positive (host invariant, not re-validated here).
//! - Mapping is pure and always uses the transform snapshot taken at the
//!   current tick; values are never cached across ticks.
//! - `to_world(to_view(p)) == p` within floating tolerance.

use crate::model::geometry::{ViewPoint, WorldPoint};
use std::cell::RefCell;
use std::rc::Rc;

/// Host-owned pan/zoom state: a uniform scale plus a world-space offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    /// Zoom factor, strictly positive.
    pub scale: f64,
    /// Pan offset in world units, applied before scaling.
    pub offset_x: f64,
    pub offset_y: f64,
}

impl ViewTransform {
    pub fn new(scale: f64, offset_x: f64, offset_y: f64) -> Self {
        Self {
            scale,
            offset_x,
            offset_y,
        }
    }

    /// The identity transform: no zoom, no pan.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// Maps a world-space point into the current view space.
    pub fn to_view(&self, world: WorldPoint) -> ViewPoint {
        ViewPoint::new(
            (world.x + self.offset_x) * self.scale,
            (world.y + self.offset_y) * self.scale,
        )
    }

    /// Maps a view-space point back into world space.
    pub fn to_world(&self, view: ViewPoint) -> WorldPoint {
        WorldPoint::new(
            view.x / self.scale - self.offset_x,
            view.y / self.scale - self.offset_y,
        )
    }
}

/// Read-only seam to the host's current view transform.
///
/// Returns `None` while the host canvas is not available, which happens
/// briefly at startup and is handled by the session's retry budget.
pub trait TransformProvider {
    fn current(&self) -> Option<ViewTransform>;
}

/// In-process transform slot for hosts that push values, and for tests.
///
/// Clones share one underlying slot, so host glue can keep one end and hand
/// the other to the session.
#[derive(Debug, Clone, Default)]
pub struct SharedTransform {
    slot: Rc<RefCell<Option<ViewTransform>>>,
}

impl SharedTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot already holding a transform.
    pub fn with(transform: ViewTransform) -> Self {
        let shared = Self::new();
        shared.set(transform);
        shared
    }

    /// Publishes the host's latest transform values.
    pub fn set(&self, transform: ViewTransform) {
        *self.slot.borrow_mut() = Some(transform);
    }

    /// Marks the host canvas as unavailable.
    pub fn clear(&self) {
        *self.slot.borrow_mut() = None;
    }
}

impl TransformProvider for SharedTransform {
    fn current(&self) -> Option<ViewTransform> {
        *self.slot.borrow()
    }
}

/// Changed-since-last-tick comparator for the polling loop.
///
/// The host offers no change notification, so every tick compares the
/// freshly read transform against the last observed one and only a
/// difference (or the first observation) triggers a resync.
#[derive(Debug, Default)]
pub struct TransformWatcher {
    last_seen: Option<ViewTransform>,
}

impl TransformWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `current` and reports whether it differs from the last
    /// observed value. The first observation always reports a change.
    pub fn observe(&mut self, current: ViewTransform) -> bool {
        let changed = self.last_seen != Some(current);
        self.last_seen = Some(current);
        changed
    }

    /// Forgets the last observation, forcing the next one to report change.
    pub fn reset(&mut self) {
        self.last_seen = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{SharedTransform, TransformProvider, TransformWatcher, ViewTransform};
    use crate::model::geometry::{ViewPoint, WorldPoint};

    #[test]
    fn world_to_view_applies_offset_then_scale() {
        let transform = ViewTransform::new(2.0, 10.0, -5.0);
        let view = transform.to_view(WorldPoint::new(100.0, 100.0));
        assert_eq!(view, ViewPoint::new(220.0, 190.0));
    }

    #[test]
    fn roundtrip_is_identity_within_tolerance() {
        let transform = ViewTransform::new(0.6180339887, 123.456, -987.654);
        let original = WorldPoint::new(-42.5, 3333.125);
        let roundtrip = transform.to_world(transform.to_view(original));
        assert!((roundtrip.x - original.x).abs() < 1e-9);
        assert!((roundtrip.y - original.y).abs() < 1e-9);
    }

    #[test]
    fn watcher_reports_first_observation_and_real_changes_only() {
        let mut watcher = TransformWatcher::new();
        let first = ViewTransform::identity();
        assert!(watcher.observe(first));
        assert!(!watcher.observe(first));
        assert!(watcher.observe(ViewTransform::new(2.0, 0.0, 0.0)));
        assert!(!watcher.observe(ViewTransform::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn shared_transform_clones_share_one_slot() {
        let writer = SharedTransform::new();
        let reader = writer.clone();
        assert!(reader.current().is_none());
        writer.set(ViewTransform::new(1.5, 4.0, 8.0));
        assert_eq!(reader.current(), Some(ViewTransform::new(1.5, 4.0, 8.0)));
        writer.clear();
        assert!(reader.current().is_none());
    }
}
