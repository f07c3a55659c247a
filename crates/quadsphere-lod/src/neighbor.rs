//! Neighbor detail-level resolution without neighbor pointers.
//!
//! Phase one is pure bit arithmetic on `(path_hash, depth)`: mirror the
//! trailing quadrant groups across the queried edge until reaching the first
//! ancestor level whose quadrant lies on the near side of that edge. Phase two
//! walks the live tree from the root along the resulting target path and
//! reports the depth of whatever currently covers that spot.

use crate::mesh::SkirtEdges;
use crate::node::ChunkNode;
use crate::path::{Direction, Quadrant, quadrant_at};

/// Path of the same-depth cell across one edge of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NeighborTarget {
    /// Hash of the neighboring cell.
    pub path_hash: u64,
    /// Depth of both the querying node and the target cell.
    pub depth: u32,
    /// Depth of the deepest common ancestor of the node and its neighbor.
    pub shared_depth: u32,
}

/// Phase one: mirror the path across the edge in `direction`.
///
/// Returns `None` when every level already touches that edge, i.e. the edge
/// lies on the root's own boundary and there is nothing beyond it.
#[must_use]
pub fn neighbor_target(path_hash: u64, depth: u32, direction: Direction) -> Option<NeighborTarget> {
    let pattern = direction.flip_pattern();
    let mut mask = 0u64;
    for walked in 0..depth {
        mask = (mask << 2) | pattern;
        let quadrant = Quadrant::from_bits(path_hash >> (2 * walked));
        if !quadrant.touches(direction) {
            return Some(NeighborTarget {
                path_hash: path_hash ^ mask,
                depth,
                shared_depth: depth - walked - 1,
            });
        }
    }
    None
}

/// Hash-only form of [`neighbor_target`].
#[must_use]
pub fn neighbor_target_hash(path_hash: u64, depth: u32, direction: Direction) -> Option<u64> {
    neighbor_target(path_hash, depth, direction).map(|t| t.path_hash)
}

/// Phase two: walk from `root` toward `target` and return the depth of the
/// node that answers for it.
///
/// The walk stops at the target depth, at a leaf, or at a node below the
/// common ancestor that still shows its own mesh (a split in progress).
/// Ancestors shared with the querying node are skipped over even if they show
/// a mesh, since that mesh covers the querying node too.
#[must_use]
pub fn descend_to_neighbor(root: &ChunkNode, target: &NeighborTarget) -> u32 {
    let mut node = root;
    loop {
        let depth = node.depth();
        if depth >= target.depth {
            return depth;
        }
        if depth > target.shared_depth && node.mesh().is_some() {
            return depth;
        }
        let Some(children) = node.children() else {
            return depth;
        };
        node = &children[quadrant_at(target.path_hash, target.depth, depth + 1).index()];
    }
}

/// Depth of the patch covering the far side of `node`'s edge in `direction`,
/// or `None` if the edge is on the outer boundary.
#[must_use]
pub fn resolve_neighbor_depth(root: &ChunkNode, node: &ChunkNode, direction: Direction) -> Option<u32> {
    let target = neighbor_target(node.path_hash(), node.depth(), direction)?;
    Some(descend_to_neighbor(root, &target))
}

/// Edges of `node` that border a coarser patch and therefore need skirts.
#[must_use]
pub fn resolve_skirt_edges(root: &ChunkNode, node: &ChunkNode) -> SkirtEdges {
    Direction::ALL
        .into_iter()
        .filter(|&direction| {
            resolve_neighbor_depth(root, node, direction).is_some_and(|d| d < node.depth())
        })
        .collect()
}
