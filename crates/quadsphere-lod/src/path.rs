//! Quadrant addressing: quadrants, cardinal directions, and the bit-packed
//! path hash that identifies a node's position in the quadtree.
//!
//! A path hash stores one 2-bit quadrant per level, the root's child choice
//! in the most significant occupied pair: `child = parent * 4 + quadrant`.
//! The root is hash `0` at depth `0`. A hash is only meaningful together with
//! its depth, since every all-north-west path also hashes to `0`.

/// Deepest level a node can reach. A `u64` holds 32 pairs; one is kept spare
/// so `hash * 4` never overflows.
pub const MAX_DEPTH: u32 = 31;

/// Position of a child inside its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Quadrant {
    /// West half, north half.
    NorthWest = 0,
    /// East half, north half.
    NorthEast = 1,
    /// East half, south half.
    SouthEast = 2,
    /// West half, south half.
    SouthWest = 3,
}

impl Quadrant {
    /// All quadrants in index order.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::NorthWest,
        Quadrant::NorthEast,
        Quadrant::SouthEast,
        Quadrant::SouthWest,
    ];

    /// Decode the low two bits of `bits`.
    #[inline]
    #[must_use]
    pub fn from_bits(bits: u64) -> Self {
        match bits & 0b11 {
            0 => Quadrant::NorthWest,
            1 => Quadrant::NorthEast,
            2 => Quadrant::SouthEast,
            _ => Quadrant::SouthWest,
        }
    }

    /// Array index (0..4).
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// `(east, north)` signs of this quadrant's center relative to the parent center.
    #[must_use]
    pub fn offset_signs(self) -> (f64, f64) {
        match self {
            Quadrant::NorthWest => (-1.0, 1.0),
            Quadrant::NorthEast => (1.0, 1.0),
            Quadrant::SouthEast => (1.0, -1.0),
            Quadrant::SouthWest => (-1.0, -1.0),
        }
    }

    /// Whether this quadrant touches its parent's edge in `direction`.
    #[must_use]
    pub fn touches(self, direction: Direction) -> bool {
        match direction {
            Direction::North => matches!(self, Quadrant::NorthWest | Quadrant::NorthEast),
            Direction::South => matches!(self, Quadrant::SouthWest | Quadrant::SouthEast),
            Direction::East => matches!(self, Quadrant::NorthEast | Quadrant::SouthEast),
            Direction::West => matches!(self, Quadrant::NorthWest | Quadrant::SouthWest),
        }
    }
}

/// Cardinal direction in a patch's tangent plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Direction {
    /// Along `forward`.
    North = 0,
    /// Along `right`.
    East = 1,
    /// Against `forward`.
    South = 2,
    /// Against `right`.
    West = 3,
}

impl Direction {
    /// All directions, clockwise from north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// The direction pointing the other way.
    #[must_use]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// XOR pattern that mirrors a quadrant across the edge in this direction.
    ///
    /// North/south flip both bits (NW ↔ SW, NE ↔ SE); east/west flip only
    /// the low bit (NW ↔ NE, SW ↔ SE).
    #[inline]
    #[must_use]
    pub fn flip_pattern(self) -> u64 {
        match self {
            Direction::North | Direction::South => 0b11,
            Direction::East | Direction::West => 0b01,
        }
    }

    /// `(east, north)` unit step of this direction.
    #[must_use]
    pub fn step(self) -> (i64, i64) {
        match self {
            Direction::North => (0, 1),
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::West => (-1, 0),
        }
    }
}

/// Hash of the child in `quadrant` of the node with `parent` hash.
#[inline]
#[must_use]
pub fn child_hash(parent: u64, quadrant: Quadrant) -> u64 {
    (parent << 2) | quadrant as u64
}

/// Hash of the parent of a node. Only meaningful for depth ≥ 1.
#[inline]
#[must_use]
pub fn parent_hash(hash: u64) -> u64 {
    hash >> 2
}

/// Quadrant chosen at `level` (1 = the root's child) on the path of a node at `depth`.
///
/// Levels are read most-significant pair first.
#[inline]
#[must_use]
pub fn quadrant_at(hash: u64, depth: u32, level: u32) -> Quadrant {
    debug_assert!(level >= 1 && level <= depth, "level {level} outside 1..={depth}");
    Quadrant::from_bits(hash >> (2 * (depth - level)))
}

/// Integer grid cell `(x, y)` of a node at `depth`; `x` grows east, `y` grows north.
///
/// The grid is `2^depth` cells on a side.
#[must_use]
pub fn cell(hash: u64, depth: u32) -> (u64, u64) {
    let mut x = 0;
    let mut y = 0;
    for level in 1..=depth {
        let q = quadrant_at(hash, depth, level);
        let (east, north) = q.offset_signs();
        x = (x << 1) | u64::from(east > 0.0);
        y = (y << 1) | u64::from(north > 0.0);
    }
    (x, y)
}

/// Inverse of [`cell`].
#[must_use]
pub fn hash_from_cell(x: u64, y: u64, depth: u32) -> u64 {
    let mut hash = 0;
    for level in 1..=depth {
        let shift = depth - level;
        let east = (x >> shift) & 1 == 1;
        let north = (y >> shift) & 1 == 1;
        let quadrant = match (east, north) {
            (false, true) => Quadrant::NorthWest,
            (true, true) => Quadrant::NorthEast,
            (true, false) => Quadrant::SouthEast,
            (false, false) => Quadrant::SouthWest,
        };
        hash = child_hash(hash, quadrant);
    }
    hash
}
