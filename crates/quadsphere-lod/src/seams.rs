//! Boundary traits between the quadtree and the rest of the application:
//! the height function it samples, the scene it feeds, and the viewer it follows.

use glam::DVec3;

use crate::mesh::PatchMesh;

/// Identity of a live quadtree node.
///
/// `id` is unique for the lifetime of one [`crate::QuadtreeRoot`], so a node
/// that is discarded and later recreated at the same path gets a new key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    /// Session-unique node id.
    pub id: u64,
    /// Quadrant path from the root (see [`crate::path`]).
    pub path_hash: u64,
    /// Subdivision level; the root is 0.
    pub depth: u32,
}

/// Deterministic displacement of terrain-space positions.
///
/// Called from worker threads, so implementations must be `Send + Sync` and
/// must not depend on mutable global state.
pub trait HeightField: Send + Sync {
    /// Displace a point of the undisplaced patch surface.
    fn evaluate(&self, position: DVec3) -> DVec3;
}

impl<F> HeightField for F
where
    F: Fn(DVec3) -> DVec3 + Send + Sync,
{
    fn evaluate(&self, position: DVec3) -> DVec3 {
        self(position)
    }
}

/// Leaves every position where it is.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatHeightField;

impl HeightField for FlatHeightField {
    fn evaluate(&self, position: DVec3) -> DVec3 {
        position
    }
}

/// Receives finished patches so the application can upload geometry and
/// physics, and frees them again when the quadtree stops showing them.
pub trait SceneAdapter {
    /// A node has a new mesh. A second call for the same key replaces the first.
    fn on_patch_ready(&mut self, key: NodeKey, mesh: &PatchMesh);

    /// The node's mesh is no longer shown (split superseded it, or it merged away).
    fn on_patch_retired(&mut self, key: NodeKey);
}

impl SceneAdapter for () {
    fn on_patch_ready(&mut self, _key: NodeKey, _mesh: &PatchMesh) {}

    fn on_patch_retired(&mut self, _key: NodeKey) {}
}

/// Supplies the viewer position each frame, in the same (rebased) frame as
/// the meshes the quadtree emits.
pub trait ViewerPositionProvider {
    /// Current viewer position.
    fn viewer_position(&self) -> DVec3;
}

impl ViewerPositionProvider for DVec3 {
    fn viewer_position(&self) -> DVec3 {
        *self
    }
}

impl<F> ViewerPositionProvider for F
where
    F: Fn() -> DVec3,
{
    fn viewer_position(&self) -> DVec3 {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_height_field() {
        let field = |p: DVec3| p + DVec3::Y * 3.0;
        assert_eq!(field.evaluate(DVec3::ZERO), DVec3::new(0.0, 3.0, 0.0));
    }

    #[test]
    fn test_flat_height_field_is_identity() {
        let p = DVec3::new(1.0, -2.0, 3.5);
        assert_eq!(FlatHeightField.evaluate(p), p);
    }

    #[test]
    fn test_viewer_providers() {
        let fixed = DVec3::new(4.0, 5.0, 6.0);
        assert_eq!(fixed.viewer_position(), fixed);
        let moving = || DVec3::X;
        assert_eq!(moving.viewer_position(), DVec3::X);
    }
}
