//! Quadtree entry point: owns the root node, the generation scheduler and the
//! scene adapter, and drives the per-frame `check` / `update` cycle.

use std::sync::Arc;

use glam::DVec3;
use tracing::{debug, trace, warn};

use crate::basis::{CubeFace, PatchBasis};
use crate::error::TerrainError;
use crate::node::{ChunkNode, Delivery, NodeSpawner, Plan, PlanAction, PlanContext};
use crate::scheduler::{GenerationResult, GenerationScheduler, GenerationTask};
use crate::seams::{HeightField, NodeKey, SceneAdapter, ViewerPositionProvider};
use crate::settings::TerrainSettings;

/// Placement of the depth-0 patch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RootPatch {
    /// Tangent frame inherited by every node.
    pub basis: PatchBasis,
    /// Undisplaced center.
    pub center: DVec3,
    /// Edge length.
    pub size: f64,
}

impl RootPatch {
    /// A flat square of edge length `size` centred on the origin.
    pub fn flat(size: f64) -> Self {
        Self {
            basis: PatchBasis::FLAT,
            center: DVec3::ZERO,
            size,
        }
    }

    /// One face of a cube of half-extent `radius` around the origin.
    pub fn cube_face(face: CubeFace, radius: f64) -> Self {
        Self {
            basis: PatchBasis::from_cube_face(face),
            center: face.normal() * radius,
            size: radius * 2.0,
        }
    }
}

/// Counters for one [`QuadtreeRoot::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Generations accepted by the scheduler.
    pub submitted: usize,
    /// Generations refused because the budget was full.
    pub refused: usize,
    /// Meshes installed.
    pub completed: usize,
    /// Results dropped because their node was gone or already covered.
    pub stale: usize,
    /// Generations that failed.
    pub failed: usize,
    /// Merging nodes that dropped their children this frame.
    pub collapsed: usize,
    /// Nodes without children.
    pub leaves: usize,
    /// Nodes currently showing a mesh.
    pub resident: usize,
    /// Generations queued or running after this frame.
    pub in_flight: usize,
}

/// A continuous-LOD terrain quadtree.
pub struct QuadtreeRoot<S: SceneAdapter = ()> {
    settings: TerrainSettings,
    root: ChunkNode,
    height: Arc<dyn HeightField>,
    scheduler: GenerationScheduler,
    scene: S,
    origin: DVec3,
    viewer: DVec3,
    next_id: u64,
    frame: u64,
    last_stats: FrameStats,
}

impl<S: SceneAdapter> QuadtreeRoot<S> {
    /// Validate `settings` and create the tree with a single empty root leaf.
    pub fn new(
        settings: TerrainSettings,
        root_patch: RootPatch,
        height: Arc<dyn HeightField>,
        scene: S,
    ) -> Result<Self, TerrainError> {
        settings.validate()?;
        if !(root_patch.size > 0.0 && root_patch.size.is_finite()) {
            return Err(TerrainError::InvalidRootSize(root_patch.size));
        }

        let mut next_id = 0;
        let root = NodeSpawner {
            height: height.as_ref(),
            origin: DVec3::ZERO,
            next_id: &mut next_id,
        }
        .root(root_patch.basis, root_patch.center, root_patch.size);
        let scheduler = GenerationScheduler::new(settings.scheduler, Arc::clone(&height));

        debug!(
            size = root_patch.size,
            detail = settings.detail,
            workers = scheduler.worker_count(),
            "Created terrain quadtree"
        );
        Ok(Self {
            settings,
            root,
            height,
            scheduler,
            scene,
            origin: DVec3::ZERO,
            viewer: DVec3::ZERO,
            next_id,
            frame: 0,
            last_stats: FrameStats::default(),
        })
    }

    /// Decide which nodes should subdivide for a viewer at `viewer`
    /// (in the current rebased frame). Returns the number of new splits.
    pub fn check(&mut self, viewer: DVec3) -> usize {
        self.viewer = viewer;
        let mut spawner = NodeSpawner {
            height: self.height.as_ref(),
            origin: self.origin,
            next_id: &mut self.next_id,
        };
        self.root.check(viewer, &self.settings, &mut spawner)
    }

    /// Apply finished generations, then request the meshes the tree now needs.
    pub fn update(&mut self) -> FrameStats {
        self.frame += 1;
        let mut stats = FrameStats {
            frame: self.frame,
            ..FrameStats::default()
        };

        for result in self.scheduler.drain_results() {
            self.apply_result(result, &mut stats);
        }

        let mut plans = Vec::new();
        let ctx = PlanContext {
            settings: &self.settings,
            viewer: self.viewer,
            origin: self.origin,
            frame: self.frame,
        };
        self.root.plan(&self.root, &ctx, &mut plans);
        // Collapses first, then nearest first.
        plans.sort_by(|a, b| {
            let rank = |p: &Plan| matches!(p.action, PlanAction::Generate(_));
            rank(a)
                .cmp(&rank(b))
                .then(a.priority.total_cmp(&b.priority))
                .then(a.key.cmp(&b.key))
        });

        for plan in plans {
            self.apply_plan(plan, &mut stats);
        }

        self.root.visit(&mut |node| {
            if node.is_leaf() {
                stats.leaves += 1;
            }
            if node.mesh().is_some() {
                stats.resident += 1;
            }
        });
        stats.in_flight = self.scheduler.in_flight_count();
        self.last_stats = stats;
        stats
    }

    /// `check` followed by `update` for the provider's current position.
    pub fn frame(&mut self, viewer: &impl ViewerPositionProvider) -> FrameStats {
        self.check(viewer.viewer_position());
        self.update()
    }

    /// Shift everything the tree caches by `-offset` after the caller moved
    /// its floating origin by `offset`. Meshes still being built are
    /// translated when they arrive.
    pub fn rebase(&mut self, offset: DVec3) {
        debug!(x = offset.x, y = offset.y, z = offset.z, "Rebasing terrain");
        self.origin += offset;
        self.viewer -= offset;
        self.root.rebase(offset);
    }

    fn apply_result(&mut self, result: GenerationResult, stats: &mut FrameStats) {
        let GenerationResult {
            key,
            skirts,
            origin,
            elapsed_us,
            outcome,
        } = result;
        match outcome {
            Ok(mut mesh) => {
                let drift = self.origin - origin;
                if drift != DVec3::ZERO {
                    mesh.translate(drift);
                }
                match self.root.deliver(key, mesh, &mut self.scene) {
                    Delivery::Installed { .. } => {
                        trace!(
                            depth = key.depth,
                            path_hash = key.path_hash,
                            skirts = skirts.0,
                            elapsed_us,
                            "Installed patch"
                        );
                        stats.completed += 1;
                    }
                    Delivery::Stale => {
                        trace!(depth = key.depth, path_hash = key.path_hash, "Dropped stale patch");
                        stats.stale += 1;
                    }
                }
            }
            Err(err) => {
                warn!(depth = key.depth, path_hash = key.path_hash, %err, "Patch generation failed");
                stats.failed += 1;
                if let Some(node) = self.root.find_mut(key) {
                    node.mark_failed(self.frame + 1);
                }
            }
        }
    }

    fn apply_plan(&mut self, plan: Plan, stats: &mut FrameStats) {
        let Some(node) = self.root.find_mut(plan.key) else {
            return;
        };
        match plan.action {
            PlanAction::Collapse => {
                debug!(depth = plan.key.depth, path_hash = plan.key.path_hash, "Collapsing children");
                node.discard_children(&mut self.scene);
                stats.collapsed += 1;
            }
            PlanAction::Generate(request) => {
                let task = GenerationTask {
                    key: plan.key,
                    request,
                };
                match self.scheduler.submit(task) {
                    Ok(()) => {
                        node.mark_in_flight();
                        stats.submitted += 1;
                    }
                    Err(_) => stats.refused += 1,
                }
            }
        }
    }

    /// Current leaves, in depth-first order.
    pub fn leaves(&self) -> Vec<&ChunkNode> {
        let mut leaves = Vec::new();
        self.root.visit(&mut |node| {
            if node.is_leaf() {
                leaves.push(node);
            }
        });
        leaves
    }

    /// The live node with this key.
    pub fn node(&self, key: NodeKey) -> Option<&ChunkNode> {
        self.root.find(key)
    }

    /// The root node.
    pub fn root(&self) -> &ChunkNode {
        &self.root
    }

    /// Generations queued or running.
    pub fn in_flight_count(&self) -> usize {
        self.scheduler.in_flight_count()
    }

    /// Whether the last update had nothing left to do: no work in flight, no
    /// request submitted or refused, and no node waiting to retry.
    pub fn is_settled(&self) -> bool {
        let last = &self.last_stats;
        if self.frame == 0
            || self.in_flight_count() > 0
            || last.submitted > 0
            || last.refused > 0
            || last.collapsed > 0
        {
            return false;
        }
        let mut pending = false;
        self.root.visit(&mut |node| {
            pending |= node.awaiting_retry();
        });
        !pending
    }

    /// Accumulated floating-origin offset.
    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    /// Number of completed `update` calls.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Counters from the last `update`.
    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Session settings.
    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    /// The scene adapter.
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Mutable access to the scene adapter.
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }
}
