//! Quadtree node and its split/merge state machine.
//!
//! Children are owned inline (`Box<[ChunkNode; 4]>`) and never point back at
//! their parent. Upward notifications (a child becoming ready) travel as the
//! return value of the recursive descent that delivered the child's mesh.

use glam::DVec3;
use tracing::{debug, trace};

use crate::basis::PatchBasis;
use crate::builder::PatchRequest;
use crate::mesh::PatchMesh;
use crate::neighbor::resolve_skirt_edges;
use crate::path::{self, MAX_DEPTH, Quadrant};
use crate::seams::{HeightField, NodeKey, SceneAdapter};
use crate::settings::TerrainSettings;

/// All four `child_ready` bits.
const ALL_CHILDREN: u8 = 0b1111;

/// Observable lifecycle state of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Leaf with no mesh and nothing requested yet.
    Empty,
    /// Waiting for a mesh: a leaf whose first build is in flight or awaiting
    /// retry, or a merging node whose children stay visible until its own
    /// mesh arrives.
    Generating,
    /// Leaf showing its mesh.
    Resident,
    /// Has children that are still generating; keeps showing its own mesh.
    Splitting,
    /// Fully delegated to its children.
    Interior,
}

/// A node of the terrain quadtree.
#[derive(Debug)]
pub struct ChunkNode {
    key: NodeKey,
    quadrant: Option<Quadrant>,
    basis: PatchBasis,
    center_local: DVec3,
    center_evaluated: DVec3,
    size: f64,
    children: Option<Box<[ChunkNode; 4]>>,
    mesh: Option<PatchMesh>,
    wants_subdivide: bool,
    child_ready: u8,
    in_flight: bool,
    failed: bool,
    retry_after: u64,
}

/// Creates nodes with fresh ids and their displaced centers.
pub(crate) struct NodeSpawner<'a> {
    pub(crate) height: &'a dyn HeightField,
    /// Current floating origin; `center_evaluated` is stored relative to it.
    pub(crate) origin: DVec3,
    pub(crate) next_id: &'a mut u64,
}

impl NodeSpawner<'_> {
    fn allocate(&mut self) -> u64 {
        let id = *self.next_id;
        *self.next_id += 1;
        id
    }

    fn node(
        &mut self,
        key: NodeKey,
        quadrant: Option<Quadrant>,
        basis: PatchBasis,
        center_local: DVec3,
        size: f64,
    ) -> ChunkNode {
        ChunkNode {
            key,
            quadrant,
            basis,
            center_local,
            center_evaluated: self.height.evaluate(center_local) - self.origin,
            size,
            children: None,
            mesh: None,
            wants_subdivide: false,
            child_ready: 0,
            in_flight: false,
            failed: false,
            retry_after: 0,
        }
    }

    /// The depth-0 node.
    pub(crate) fn root(&mut self, basis: PatchBasis, center: DVec3, size: f64) -> ChunkNode {
        let key = NodeKey {
            id: self.allocate(),
            path_hash: 0,
            depth: 0,
        };
        self.node(key, None, basis, center, size)
    }

    fn child(&mut self, parent: &ChunkNode, quadrant: Quadrant) -> ChunkNode {
        let key = NodeKey {
            id: self.allocate(),
            path_hash: path::child_hash(parent.key.path_hash, quadrant),
            depth: parent.key.depth + 1,
        };
        let (east, north) = quadrant.offset_signs();
        let quarter = parent.size * 0.25;
        let center = parent
            .basis
            .point(parent.center_local, east * quarter, north * quarter);
        self.node(key, Some(quadrant), parent.basis, center, parent.size * 0.5)
    }
}

/// Result of delivering a finished mesh down the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// The target node is gone, was recreated, or no longer needs the mesh.
    Stale,
    /// The mesh was installed. `covered` reports that the node at this level
    /// just became fully covered by resident geometry.
    Installed { covered: bool },
}

/// What the planning pass wants done to one node.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum PlanAction {
    /// Merging node that still shows its own mesh: drop the children now.
    Collapse,
    /// (Re)build the node's mesh.
    Generate(PatchRequest),
}

/// One planned action, ordered by `priority` (squared viewer distance).
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Plan {
    pub(crate) key: NodeKey,
    pub(crate) priority: f64,
    pub(crate) action: PlanAction,
}

/// Read-only inputs of the planning pass.
pub(crate) struct PlanContext<'a> {
    pub(crate) settings: &'a TerrainSettings,
    pub(crate) viewer: DVec3,
    pub(crate) origin: DVec3,
    pub(crate) frame: u64,
}

impl ChunkNode {
    /// Identity of this node.
    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// Subdivision level; the root is 0.
    pub fn depth(&self) -> u32 {
        self.key.depth
    }

    /// Quadrant path from the root.
    pub fn path_hash(&self) -> u64 {
        self.key.path_hash
    }

    /// Position among siblings; `None` for the root.
    pub fn quadrant(&self) -> Option<Quadrant> {
        self.quadrant
    }

    /// Tangent frame, shared by the whole tree.
    pub fn basis(&self) -> &PatchBasis {
        &self.basis
    }

    /// Undisplaced center in terrain space.
    pub fn center_local(&self) -> DVec3 {
        self.center_local
    }

    /// Displaced center relative to the current floating origin.
    pub fn center_evaluated(&self) -> DVec3 {
        self.center_evaluated
    }

    /// Edge length.
    pub fn size(&self) -> f64 {
        self.size
    }

    /// The four children, if the node has been subdivided.
    pub fn children(&self) -> Option<&[ChunkNode; 4]> {
        self.children.as_deref()
    }

    /// The mesh currently shown for this node.
    pub fn mesh(&self) -> Option<&PatchMesh> {
        self.mesh.as_ref()
    }

    /// Whether the last `check` asked this node to subdivide.
    pub fn wants_subdivide(&self) -> bool {
        self.wants_subdivide
    }

    /// Whether the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Whether a generation for this node is queued or running.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Whether all four children have produced their first mesh.
    pub fn children_ready(&self) -> bool {
        self.child_ready == ALL_CHILDREN
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChunkState {
        match (&self.children, self.wants_subdivide) {
            (Some(_), true) if self.mesh.is_some() => ChunkState::Splitting,
            (Some(_), true) => ChunkState::Interior,
            (Some(_), false) => ChunkState::Generating,
            (None, _) if self.mesh.is_some() => ChunkState::Resident,
            (None, _) if self.in_flight || self.failed => ChunkState::Generating,
            (None, _) => ChunkState::Empty,
        }
    }

    /// Decide, top-down, which nodes should subdivide for this viewer and
    /// create missing children. Returns the number of nodes that split.
    ///
    /// A node that stops wanting to subdivide keeps its children until its
    /// own replacement mesh is installed.
    pub(crate) fn check(
        &mut self,
        viewer: DVec3,
        settings: &TerrainSettings,
        spawner: &mut NodeSpawner<'_>,
    ) -> usize {
        let distance_sq = viewer.distance_squared(self.center_evaluated);
        self.wants_subdivide = distance_sq <= settings.split_distance_sq(self.size)
            && self.size > settings.min_patch_size
            && self.key.depth < MAX_DEPTH;
        if !self.wants_subdivide {
            return 0;
        }
        // A subdividing node is not planned, so a pending retry would never run.
        self.failed = false;

        let mut splits = 0;
        if self.children.is_none() {
            debug!(
                depth = self.key.depth,
                path_hash = self.key.path_hash,
                size = self.size,
                "Subdividing patch"
            );
            let children = Quadrant::ALL.map(|q| spawner.child(self, q));
            self.children = Some(Box::new(children));
            self.child_ready = 0;
            splits += 1;
        }
        if let Some(children) = self.children.as_deref_mut() {
            for child in children {
                splits += child.check(viewer, settings, spawner);
            }
        }
        splits
    }

    /// Collect the work this subtree needs. `root` is the whole tree, used to
    /// resolve neighbor depths.
    pub(crate) fn plan(&self, root: &ChunkNode, ctx: &PlanContext<'_>, out: &mut Vec<Plan>) {
        if self.wants_subdivide {
            if let Some(children) = self.children() {
                for child in children {
                    child.plan(root, ctx, out);
                }
                return;
            }
        }

        let priority = ctx.viewer.distance_squared(self.center_evaluated);
        if self.children.is_some() && self.mesh.is_some() {
            out.push(Plan {
                key: self.key,
                priority,
                action: PlanAction::Collapse,
            });
        }
        if self.in_flight || ctx.frame < self.retry_after {
            return;
        }

        let skirts = resolve_skirt_edges(root, self);
        let current = self.mesh.as_ref().map(|m| m.skirts);
        if current == Some(skirts) {
            return;
        }
        out.push(Plan {
            key: self.key,
            priority,
            action: PlanAction::Generate(PatchRequest {
                basis: self.basis,
                center_local: self.center_local,
                size: self.size,
                detail: ctx.settings.detail,
                skirts,
                origin: ctx.origin,
                with_collision: self.size <= ctx.settings.collision_patch_size,
            }),
        });
    }

    /// The node at `path_hash`/`depth`, if the tree reaches that far.
    pub(crate) fn node_at(&self, path_hash: u64, depth: u32) -> Option<&ChunkNode> {
        let mut node = self;
        while node.key.depth < depth {
            let q = path::quadrant_at(path_hash, depth, node.key.depth + 1);
            node = &node.children.as_deref()?[q.index()];
        }
        (node.key.depth == depth).then_some(node)
    }

    /// Mutable variant of [`node_at`](Self::node_at).
    pub(crate) fn node_at_mut(&mut self, path_hash: u64, depth: u32) -> Option<&mut ChunkNode> {
        let mut node = self;
        while node.key.depth < depth {
            let q = path::quadrant_at(path_hash, depth, node.key.depth + 1);
            node = &mut node.children.as_deref_mut()?[q.index()];
        }
        (node.key.depth == depth).then_some(node)
    }

    /// The live node identified by `key`.
    pub(crate) fn find(&self, key: NodeKey) -> Option<&ChunkNode> {
        self.node_at(key.path_hash, key.depth)
            .filter(|node| node.key.id == key.id)
    }

    /// Mutable variant of [`find`](Self::find).
    pub(crate) fn find_mut(&mut self, key: NodeKey) -> Option<&mut ChunkNode> {
        self.node_at_mut(key.path_hash, key.depth)
            .filter(|node| node.key.id == key.id)
    }

    /// Whether the last generation failed and has not been resubmitted yet.
    pub(crate) fn awaiting_retry(&self) -> bool {
        self.failed
    }

    /// Record that a generation was accepted by the scheduler.
    pub(crate) fn mark_in_flight(&mut self) {
        self.in_flight = true;
        self.failed = false;
    }

    /// Record a failed generation; the node is not resubmitted before `retry_after`.
    ///
    /// A node that has split since the task was submitted needs no retry: its
    /// children cover it, and it is planned again only once it merges.
    pub(crate) fn mark_failed(&mut self, retry_after: u64) {
        self.in_flight = false;
        if self.wants_subdivide && self.children.is_some() {
            return;
        }
        self.failed = true;
        self.retry_after = retry_after;
    }

    /// Deliver a finished mesh to the node `key`, descending from `self`.
    pub(crate) fn deliver(
        &mut self,
        key: NodeKey,
        mesh: PatchMesh,
        scene: &mut dyn SceneAdapter,
    ) -> Delivery {
        if self.key.depth == key.depth {
            if self.key.id != key.id {
                return Delivery::Stale;
            }
            return self.install(mesh, scene);
        }

        let q = path::quadrant_at(key.path_hash, key.depth, self.key.depth + 1);
        let Some(children) = self.children.as_deref_mut() else {
            return Delivery::Stale;
        };
        match children[q.index()].deliver(key, mesh, scene) {
            Delivery::Installed { covered: true } => Delivery::Installed {
                covered: self.on_child_ready(q, scene),
            },
            other => other,
        }
    }

    fn install(&mut self, mesh: PatchMesh, scene: &mut dyn SceneAdapter) -> Delivery {
        self.in_flight = false;
        self.failed = false;

        let merging = self.children.is_some() && !self.wants_subdivide;
        if self.children.is_some() && self.wants_subdivide && self.children_ready() {
            trace!(
                depth = self.key.depth,
                path_hash = self.key.path_hash,
                "Dropping mesh for a node already covered by its children"
            );
            return Delivery::Stale;
        }

        scene.on_patch_ready(self.key, &mesh);
        self.mesh = Some(mesh);
        if merging {
            debug!(
                depth = self.key.depth,
                path_hash = self.key.path_hash,
                "Merging children"
            );
            self.discard_children(scene);
        }
        Delivery::Installed { covered: true }
    }

    /// Set one readiness bit. Returns `true` if this completed the set, in
    /// which case a splitting node releases its own mesh.
    fn on_child_ready(&mut self, quadrant: Quadrant, scene: &mut dyn SceneAdapter) -> bool {
        let was_ready = self.children_ready();
        self.child_ready |= 1 << quadrant.index();
        if was_ready || !self.children_ready() {
            return false;
        }
        if self.wants_subdivide && self.mesh.take().is_some() {
            debug!(
                depth = self.key.depth,
                path_hash = self.key.path_hash,
                "Split complete, retiring parent patch"
            );
            scene.on_patch_retired(self.key);
        }
        true
    }

    /// Drop all descendants, retiring every mesh among them.
    pub(crate) fn discard_children(&mut self, scene: &mut dyn SceneAdapter) {
        if let Some(children) = self.children.take() {
            for mut child in *children {
                child.discard_children(scene);
                if child.mesh.take().is_some() {
                    scene.on_patch_retired(child.key);
                }
            }
        }
        self.child_ready = 0;
    }

    /// Shift cached positions after a floating-origin rebase.
    pub(crate) fn rebase(&mut self, offset: DVec3) {
        self.center_evaluated -= offset;
        if let Some(mesh) = &mut self.mesh {
            mesh.translate(offset);
        }
        if let Some(children) = self.children.as_deref_mut() {
            for child in children {
                child.rebase(offset);
            }
        }
    }

    /// Depth-first walk over the subtree.
    pub(crate) fn visit<'a>(&'a self, f: &mut impl FnMut(&'a ChunkNode)) {
        f(self);
        if let Some(children) = self.children() {
            for child in children {
                child.visit(f);
            }
        }
    }
}
