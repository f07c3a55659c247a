//! Tangent-plane frames for terrain patches and the six cube faces they can be
//! oriented along.

use glam::DVec3;

use crate::error::TerrainError;

/// One face of the cube a planet's six quadtrees are laid out on, named after
/// the axis its outward normal points along.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CubeFace {
    /// +X face
    PosX = 0,
    /// −X face
    NegX = 1,
    /// +Y face
    PosY = 2,
    /// −Y face
    NegY = 3,
    /// +Z face
    PosZ = 4,
    /// −Z face
    NegZ = 5,
}

impl CubeFace {
    /// Every face, one quadtree each.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PosX,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
        CubeFace::PosZ,
        CubeFace::NegZ,
    ];

    /// Face across the planet.
    #[must_use]
    pub fn opposite(self) -> CubeFace {
        match self {
            CubeFace::PosX => CubeFace::NegX,
            CubeFace::NegX => CubeFace::PosX,
            CubeFace::PosY => CubeFace::NegY,
            CubeFace::NegY => CubeFace::PosY,
            CubeFace::PosZ => CubeFace::NegZ,
            CubeFace::NegZ => CubeFace::PosZ,
        }
    }

    /// Outward normal; also the root patch's `up`.
    #[must_use]
    pub fn normal(self) -> DVec3 {
        match self {
            CubeFace::PosX => DVec3::X,
            CubeFace::NegX => DVec3::NEG_X,
            CubeFace::PosY => DVec3::Y,
            CubeFace::NegY => DVec3::NEG_Y,
            CubeFace::PosZ => DVec3::Z,
            CubeFace::NegZ => DVec3::NEG_Z,
        }
    }

    /// Tangent vector: the patch "east" direction on this face.
    #[must_use]
    pub fn tangent(self) -> DVec3 {
        match self {
            CubeFace::PosX => DVec3::NEG_Z,
            CubeFace::NegX => DVec3::Z,
            CubeFace::PosY => DVec3::X,
            CubeFace::NegY => DVec3::X,
            CubeFace::PosZ => DVec3::X,
            CubeFace::NegZ => DVec3::NEG_X,
        }
    }

    /// Bitangent vector: the patch "north" direction on this face.
    #[must_use]
    pub fn bitangent(self) -> DVec3 {
        match self {
            CubeFace::PosX => DVec3::Y,
            CubeFace::NegX => DVec3::Y,
            CubeFace::PosY => DVec3::NEG_Z,
            CubeFace::NegY => DVec3::Z,
            CubeFace::PosZ => DVec3::Y,
            CubeFace::NegZ => DVec3::Y,
        }
    }
}

/// Orthonormal frame spanning a patch's tangent plane.
///
/// `right` points east, `forward` points north and `up` is the outward surface
/// normal, with `right × forward = up`. Children inherit their parent's basis
/// unchanged.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatchBasis {
    /// East.
    pub right: DVec3,
    /// Outward normal.
    pub up: DVec3,
    /// North.
    pub forward: DVec3,
}

impl PatchBasis {
    /// Flat ground: east = +X, up = +Y, north = −Z.
    pub const FLAT: Self = Self {
        right: DVec3::X,
        up: DVec3::Y,
        forward: DVec3::NEG_Z,
    };

    /// Build a basis from explicit axes.
    ///
    /// Rejects axes that are not unit length, not mutually perpendicular, or
    /// whose handedness disagrees with `right × forward = up`.
    pub fn new(right: DVec3, up: DVec3, forward: DVec3) -> Result<Self, TerrainError> {
        const EPS: f64 = 1e-9;
        let unit = |v: DVec3| (v.length() - 1.0).abs() < EPS;
        let orthogonal =
            right.dot(up).abs() < EPS && right.dot(forward).abs() < EPS && up.dot(forward).abs() < EPS;
        let handed = (right.cross(forward) - up).length() < EPS;
        if unit(right) && unit(up) && unit(forward) && orthogonal && handed {
            Ok(Self { right, up, forward })
        } else {
            Err(TerrainError::InvalidBasis)
        }
    }

    /// The frame of one cube face, for planetary layouts.
    #[must_use]
    pub fn from_cube_face(face: CubeFace) -> Self {
        Self {
            right: face.tangent(),
            up: face.normal(),
            forward: face.bitangent(),
        }
    }

    /// Point in the tangent plane at `east` / `north` offsets from `center`.
    #[inline]
    #[must_use]
    pub fn point(&self, center: DVec3, east: f64, north: f64) -> DVec3 {
        center + self.right * east + self.forward * north
    }
}

impl Default for PatchBasis {
    fn default() -> Self {
        Self::FLAT
    }
}
