//! Block type tags.
//!
//! The world stores one [`BlockType`] per voxel. The set is closed: every
//! stored value is one of the variants below, and [`BlockType::Air`] is the
//! universal empty value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of block tags stored in chunk grids.
///
/// The numeric representation is stable and used for compact storage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BlockType {
    /// Empty space.
    #[default]
    Air = 0,
    /// Deep filler rock.
    Stone = 1,
    /// Subsurface soil.
    Dirt = 2,
    /// Grass-topped soil.
    Grass = 3,
    /// Desert surface and subsurface.
    Sand = 4,
    /// Loose rock layer.
    Gravel = 5,
    /// Mountain caps.
    Snow = 6,
    /// Unbreakable world floor.
    Bedrock = 7,
    /// Common ore found in stone.
    CoalOre = 8,
    /// Deep ore found in stone.
    IronOre = 9,
    /// Tree trunk.
    Wood = 10,
    /// Tree canopy.
    Leaves = 11,
    /// Crafted planks.
    Planks = 12,
    /// Liquid, transparent to picking.
    Water = 13,
}

impl BlockType {
    /// Every block type in id order.
    pub const ALL: [BlockType; 14] = [
        BlockType::Air,
        BlockType::Stone,
        BlockType::Dirt,
        BlockType::Grass,
        BlockType::Sand,
        BlockType::Gravel,
        BlockType::Snow,
        BlockType::Bedrock,
        BlockType::CoalOre,
        BlockType::IronOre,
        BlockType::Wood,
        BlockType::Leaves,
        BlockType::Planks,
        BlockType::Water,
    ];

    /// Stable numeric id.
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Convert from the stable numeric id.
    pub const fn from_id(id: u8) -> Option<Self> {
        if (id as usize) < Self::ALL.len() {
            Some(Self::ALL[id as usize])
        } else {
            None
        }
    }

    /// Canonical lowercase name used in configs and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Air => "air",
            Self::Stone => "stone",
            Self::Dirt => "dirt",
            Self::Grass => "grass",
            Self::Sand => "sand",
            Self::Gravel => "gravel",
            Self::Snow => "snow",
            Self::Bedrock => "bedrock",
            Self::CoalOre => "coal_ore",
            Self::IronOre => "iron_ore",
            Self::Wood => "wood",
            Self::Leaves => "leaves",
            Self::Planks => "planks",
            Self::Water => "water",
        }
    }

    /// True only for [`BlockType::Air`].
    #[inline]
    pub const fn is_air(self) -> bool {
        matches!(self, Self::Air)
    }

    /// Whether the block occupies its cell for generation and picking.
    ///
    /// Air and water are not solid; a pick ray passes through them.
    #[inline]
    pub const fn is_solid(self) -> bool {
        !matches!(self, Self::Air | Self::Water)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
