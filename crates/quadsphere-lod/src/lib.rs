//! Continuous level-of-detail terrain quadtree.
//!
//! A [`QuadtreeRoot`] refines a square patch (flat ground or one cube face of
//! a planet) around a moving viewer. Leaves are meshed off-thread by a
//! [`GenerationScheduler`]; edges that border a coarser leaf get skirts, found
//! through bit-packed quadrant paths instead of neighbor pointers.
//!
//! Each frame:
//!
//! 1. [`QuadtreeRoot::check`] decides top-down which nodes subdivide.
//! 2. [`QuadtreeRoot::update`] installs finished meshes, resolves skirts and
//!    submits the generations still needed, nearest first.
//!
//! Finished and released meshes are reported through a [`SceneAdapter`].

mod basis;
mod builder;
mod error;
mod mesh;
pub mod neighbor;
mod node;
mod origin;
pub mod path;
mod quadtree;
mod scheduler;
mod seams;
mod settings;

pub use basis::{CubeFace, PatchBasis};
pub use builder::{PatchRequest, build_patch_mesh};
pub use error::{GenerationError, TerrainError};
pub use mesh::{PatchMesh, SkirtEdges};
pub use neighbor::{NeighborTarget, resolve_neighbor_depth, resolve_skirt_edges};
pub use node::{ChunkNode, ChunkState};
pub use origin::{DEFAULT_REBASE_THRESHOLD, FloatingOrigin};
pub use path::{Direction, MAX_DEPTH, Quadrant};
pub use quadtree::{FrameStats, QuadtreeRoot, RootPatch};
pub use scheduler::{GenerationResult, GenerationScheduler, GenerationTask};
pub use seams::{FlatHeightField, HeightField, NodeKey, SceneAdapter, ViewerPositionProvider};
pub use settings::{MAX_DETAIL, SchedulerSettings, TerrainSettings};
