//! Floating-origin rebasing.
//!
//! Terrain positions are emitted as `f32` relative to a movable origin. Once
//! the viewer wanders further than [`FloatingOrigin::threshold`] from it, the
//! origin jumps to the viewer and everything local shifts back toward zero.

use glam::DVec3;

/// Default rebase distance in world units.
pub const DEFAULT_REBASE_THRESHOLD: f64 = 10_000.0;

/// Tracks the floating origin and decides when to move it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloatingOrigin {
    /// Accumulated origin in absolute world space.
    pub origin: DVec3,
    /// Distance from the origin beyond which a rebase is triggered.
    pub threshold: f64,
}

impl FloatingOrigin {
    /// Origin at zero with the given threshold.
    pub fn new(threshold: f64) -> Self {
        Self {
            origin: DVec3::ZERO,
            threshold,
        }
    }

    /// Check the viewer position (relative to the current origin).
    ///
    /// Returns `Some(offset)` when the origin moved; the caller subtracts
    /// `offset` from its own viewer state and passes it to
    /// [`QuadtreeRoot::rebase`](crate::QuadtreeRoot::rebase).
    pub fn update(&mut self, viewer_local: DVec3) -> Option<DVec3> {
        if viewer_local.length_squared() > self.threshold * self.threshold {
            self.origin += viewer_local;
            Some(viewer_local)
        } else {
            None
        }
    }

    /// Absolute world position of a point given relative to the origin.
    pub fn to_world(&self, local: DVec3) -> DVec3 {
        self.origin + local
    }
}

impl Default for FloatingOrigin {
    fn default() -> Self {
        Self::new(DEFAULT_REBASE_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_movement_no_rebase() {
        let mut origin = FloatingOrigin::default();
        assert!(origin.update(DVec3::new(5000.0, 0.0, 5000.0)).is_none());
        assert_eq!(origin.origin, DVec3::ZERO);
    }

    #[test]
    fn test_large_movement_returns_viewer_offset() {
        let mut origin = FloatingOrigin::default();
        let viewer = DVec3::new(12_000.0, 10.0, 0.0);
        assert_eq!(origin.update(viewer), Some(viewer));
        assert_eq!(origin.origin, viewer);
    }

    #[test]
    fn test_successive_rebases_accumulate() {
        let mut origin = FloatingOrigin::new(100.0);
        origin.update(DVec3::new(150.0, 0.0, 0.0));
        // Local positions are relative to the new origin.
        assert!(origin.update(DVec3::new(50.0, 0.0, 0.0)).is_none());
        let offset = origin.update(DVec3::new(0.0, 0.0, -120.0)).unwrap();
        assert_eq!(offset, DVec3::new(0.0, 0.0, -120.0));
        assert_eq!(origin.origin, DVec3::new(150.0, 0.0, -120.0));
        assert_eq!(origin.to_world(DVec3::X), DVec3::new(151.0, 0.0, -120.0));
    }
}
