//! Stand-in for a renderer: remembers which patches are shown.

use std::collections::HashMap;

use quadsphere_lod::{NodeKey, PatchMesh, SceneAdapter};

/// Tracks the patches the quadtree currently shows and their triangle counts.
#[derive(Debug, Default)]
pub struct MeshTally {
    shown: HashMap<NodeKey, usize>,
    /// Every `on_patch_ready` call, replacements included.
    pub uploads: u64,
    /// Every `on_patch_retired` call.
    pub retirements: u64,
}

impl MeshTally {
    /// Patches currently shown.
    pub fn shown_count(&self) -> usize {
        self.shown.len()
    }

    /// Triangles across every shown patch, skirts included.
    pub fn triangle_count(&self) -> usize {
        self.shown.values().sum()
    }
}

impl SceneAdapter for MeshTally {
    fn on_patch_ready(&mut self, key: NodeKey, mesh: &PatchMesh) {
        self.uploads += 1;
        self.shown.insert(key, mesh.triangle_count());
    }

    fn on_patch_retired(&mut self, key: NodeKey) {
        self.retirements += 1;
        self.shown.remove(&key);
    }
}
