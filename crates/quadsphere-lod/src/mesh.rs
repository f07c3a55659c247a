//! Generated patch geometry and the edge set that carries skirts.

use glam::DVec3;

use crate::path::Direction;

/// Bitmask of patch edges that carry skirt geometry.
///
/// Bit 0 = north, bit 1 = east, bit 2 = south, bit 3 = west.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SkirtEdges(pub u8);

impl SkirtEdges {
    /// No skirts.
    pub const NONE: Self = Self(0);
    /// Skirts on all four edges.
    pub const ALL: Self = Self(0b1111);

    /// Returns `true` if the edge in `direction` carries a skirt.
    pub fn contains(self, direction: Direction) -> bool {
        self.0 & (1 << direction as u8) != 0
    }

    /// Marks the edge in `direction` as skirted.
    pub fn insert(&mut self, direction: Direction) {
        self.0 |= 1 << direction as u8;
    }

    /// Number of skirted edges (0–4).
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Skirted edges in `Direction::ALL` order.
    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |&d| self.contains(d))
    }
}

impl FromIterator<Direction> for SkirtEdges {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        let mut edges = SkirtEdges::NONE;
        for direction in iter {
            edges.insert(direction);
        }
        edges
    }
}

/// Geometry of one leaf patch, ready for upload.
///
/// Surface vertices come first as an `(N+1)²` grid (`v * (N+1) + u`, `u` east,
/// `v` north), followed by skirt vertices. The index buffer likewise lists all
/// surface triangles before any skirt triangle, so the skirt-free surface is
/// the prefix [`surface_indices`](Self::surface_indices).
#[derive(Clone, Debug, PartialEq)]
pub struct PatchMesh {
    /// Displaced positions relative to the current floating origin.
    pub positions: Vec<[f32; 3]>,
    /// Unit vertex normals, parallel to `positions`.
    pub normals: Vec<[f32; 3]>,
    /// Triangle list.
    pub indices: Vec<u32>,
    /// Edges that received skirts.
    pub skirts: SkirtEdges,
    /// Number of leading entries of `indices` that belong to the surface.
    pub surface_index_count: usize,
    /// Skirt-free triangle list for collision, when requested.
    pub collision_indices: Option<Vec<u32>>,
    /// Grid resolution the mesh was built with.
    pub detail: u32,
}

impl PatchMesh {
    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Total number of triangles, skirts included.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Triangles of the surface alone (`2 · detail²`).
    pub fn surface_triangle_count(&self) -> usize {
        self.surface_index_count / 3
    }

    /// Triangles belonging to skirts.
    pub fn skirt_triangle_count(&self) -> usize {
        self.triangle_count() - self.surface_triangle_count()
    }

    /// The skirt-free index list.
    pub fn surface_indices(&self) -> &[u32] {
        &self.indices[..self.surface_index_count]
    }

    /// Index of the first skirt vertex (equals the vertex count when there are none).
    pub fn skirt_vertex_start(&self) -> usize {
        let n = self.detail as usize + 1;
        n * n
    }

    /// Position buffer as raw bytes.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Normal buffer as raw bytes.
    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    /// Index buffer as raw bytes.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Shift every position by `-offset` (floating-origin rebase).
    pub fn translate(&mut self, offset: DVec3) {
        for p in &mut self.positions {
            let moved = DVec3::new(p[0] as f64, p[1] as f64, p[2] as f64) - offset;
            *p = moved.as_vec3().to_array();
        }
    }
}
