//! Block faces.
//!
//! Axis convention: north is -z, south is +z, east is +x, west is -x, up is +y.

use serde::{Deserialize, Serialize};

/// One of the six faces of a unit block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum BlockFace {
    /// Face pointing toward -z.
    North = 0,
    /// Face pointing toward +z.
    South = 1,
    /// Face pointing toward +x.
    East = 2,
    /// Face pointing toward -x.
    West = 3,
    /// Face pointing toward +y.
    Up = 4,
    /// Face pointing toward -y.
    Down = 5,
}

impl BlockFace {
    /// All faces in stable order.
    pub const ALL: [BlockFace; 6] = [
        BlockFace::North,
        BlockFace::South,
        BlockFace::East,
        BlockFace::West,
        BlockFace::Up,
        BlockFace::Down,
    ];

    /// Outward unit normal as an integer offset `(dx, dy, dz)`.
    pub const fn normal(self) -> (i32, i32, i32) {
        match self {
            Self::North => (0, 0, -1),
            Self::South => (0, 0, 1),
            Self::East => (1, 0, 0),
            Self::West => (-1, 0, 0),
            Self::Up => (0, 1, 0),
            Self::Down => (0, -1, 0),
        }
    }

    /// The face on the opposite side of the block.
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }

    /// Face crossed when a ray enters a block by stepping one cell along an axis.
    ///
    /// `axis` is 0 for x, 1 for y, 2 for z; `step` is the sign of the move.
    /// Moving +x enters through the west face, moving -x through the east face,
    /// and so on for the other axes.
    pub const fn entered_by_step(axis: usize, step: i32) -> Self {
        match (axis, step > 0) {
            (0, true) => Self::West,
            (0, false) => Self::East,
            (1, true) => Self::Down,
            (1, false) => Self::Up,
            (_, true) => Self::North,
            (_, false) => Self::South,
        }
    }

    /// Canonical string key used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}
