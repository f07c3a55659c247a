//! Grid mesh builder for a single patch: displaced vertex grid, consistent
//! triangulation, smooth normals, and skirts along edges that border a
//! coarser neighbor.
//!
//! The builder is a pure function of its [`PatchRequest`] and the height
//! field, so rebuilding an unchanged patch yields byte-identical buffers.

use glam::DVec3;

use crate::basis::PatchBasis;
use crate::error::GenerationError;
use crate::mesh::{PatchMesh, SkirtEdges};
use crate::path::Direction;
use crate::seams::HeightField;
use crate::settings::MAX_DETAIL;

/// Everything needed to build one patch, detached from the tree so it can be
/// moved to a worker thread.
#[derive(Clone, Debug, PartialEq)]
pub struct PatchRequest {
    /// Tangent frame of the patch.
    pub basis: PatchBasis,
    /// Undisplaced patch center in terrain space.
    pub center_local: DVec3,
    /// Edge length.
    pub size: f64,
    /// Quads per edge.
    pub detail: u32,
    /// Edges that need skirts.
    pub skirts: SkirtEdges,
    /// Floating origin subtracted from every emitted position.
    pub origin: DVec3,
    /// Also emit a skirt-free collision index list.
    pub with_collision: bool,
}

/// Grid vertex indices along one edge, ordered so that walking direction ×
/// outward direction = up (keeps skirt winding facing out).
fn edge_vertices(direction: Direction, detail: usize) -> Vec<u32> {
    let row = detail + 1;
    let idx = |u: usize, v: usize| (v * row + u) as u32;
    match direction {
        Direction::North => (0..=detail).map(|u| idx(u, detail)).collect(),
        Direction::East => (0..=detail).rev().map(|v| idx(detail, v)).collect(),
        Direction::South => (0..=detail).rev().map(|u| idx(u, 0)).collect(),
        Direction::West => (0..=detail).map(|v| idx(0, v)).collect(),
    }
}

/// Outward tangent for the edge in `direction`.
fn outward(basis: &PatchBasis, direction: Direction) -> DVec3 {
    match direction {
        Direction::North => basis.forward,
        Direction::East => basis.right,
        Direction::South => -basis.forward,
        Direction::West => -basis.right,
    }
}

/// Build the mesh for one patch.
///
/// Fails if the height field yields a non-finite position, or if `detail`
/// exceeds [`MAX_DETAIL`]; the whole patch is then discarded.
pub fn build_patch_mesh(
    request: &PatchRequest,
    height: &dyn HeightField,
) -> Result<PatchMesh, GenerationError> {
    if request.detail > MAX_DETAIL {
        return Err(GenerationError::DetailTooLarge(request.detail));
    }
    let detail = request.detail.max(1) as usize;
    let row = detail + 1;
    let quad = request.size / detail as f64;
    let half = request.size * 0.5;
    let basis = &request.basis;

    let skirt_count = request.skirts.count() as usize;
    let vertex_count = row * row + skirt_count * detail * 2;
    let surface_index_count = detail * detail * 6;
    let index_count = surface_index_count + skirt_count * detail * 6;

    // Displaced grid.
    let mut world: Vec<DVec3> = Vec::with_capacity(vertex_count);
    for v in 0..row {
        for u in 0..row {
            let local = basis.point(
                request.center_local,
                -half + u as f64 * quad,
                -half + v as f64 * quad,
            );
            let displaced = height.evaluate(local);
            if !displaced.is_finite() {
                return Err(GenerationError::NonFinitePosition { index: world.len() });
            }
            world.push(displaced);
        }
    }

    // Surface: same a-d diagonal in every quad.
    let mut indices: Vec<u32> = Vec::with_capacity(index_count);
    for v in 0..detail {
        for u in 0..detail {
            let a = (v * row + u) as u32;
            let b = a + 1;
            let c = a + row as u32;
            let d = c + 1;
            indices.extend_from_slice(&[a, b, d, a, d, c]);
        }
    }

    let mut normals = vec![DVec3::ZERO; row * row];
    for tri in indices.chunks_exact(3) {
        let (ia, ib, ic) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let face = (world[ib] - world[ia]).cross(world[ic] - world[ia]);
        normals[ia] += face;
        normals[ib] += face;
        normals[ic] += face;
    }
    for n in &mut normals {
        *n = n.try_normalize().unwrap_or(basis.up);
    }

    // Skirts hang one quad outward and one quad down from each edge segment
    // and reuse the normal of the vertex they hang from.
    let drop_by = |direction: Direction| (outward(basis, direction) - basis.up) * quad;
    for direction in request.skirts.iter() {
        let edge = edge_vertices(direction, detail);
        let offset = drop_by(direction);
        for pair in edge.windows(2) {
            let (e0, e1) = (pair[0], pair[1]);
            let s0 = world.len() as u32;
            world.push(world[e0 as usize] + offset);
            normals.push(normals[e0 as usize]);
            let s1 = world.len() as u32;
            world.push(world[e1 as usize] + offset);
            normals.push(normals[e1 as usize]);
            indices.extend_from_slice(&[e0, e1, s0, e1, s1, s0]);
        }
    }

    let positions = world
        .iter()
        .map(|p| (*p - request.origin).as_vec3().to_array())
        .collect();
    let normals = normals.iter().map(|n| n.as_vec3().to_array()).collect();
    let collision_indices = request
        .with_collision
        .then(|| indices[..surface_index_count].to_vec());

    Ok(PatchMesh {
        positions,
        normals,
        indices,
        skirts: request.skirts,
        surface_index_count,
        collision_indices,
        detail: detail as u32,
    })
}
