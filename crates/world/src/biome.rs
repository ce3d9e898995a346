//! Biome table for terrain generation.
//!
//! A biome is chosen per column from the normalised biome noise by fixed
//! thresholds; each biome fixes its surface layers and its height profile.

use serde::{Deserialize, Serialize};
use std::fmt;
use stratavox_core::BlockType;

use crate::trees::TreeKind;

/// Mountains columns whose surface reaches this Y are capped with snow.
pub const SNOW_LINE: i32 = 96;

/// Biome identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Biome {
    Desert,
    Plains,
    Forest,
    Taiga,
    Mountains,
}

/// Upper bounds (exclusive) on normalised biome noise, in ascending order.
/// Values at or above the last bound select [`Biome::Mountains`].
const THRESHOLDS: [(f64, Biome); 4] = [
    (0.35, Biome::Desert),
    (0.45, Biome::Plains),
    (0.55, Biome::Forest),
    (0.65, Biome::Taiga),
];

impl Biome {
    /// Every biome in threshold order.
    pub const ALL: [Biome; 5] = [
        Biome::Desert,
        Biome::Plains,
        Biome::Forest,
        Biome::Taiga,
        Biome::Mountains,
    ];

    /// Select the biome for a normalised noise value in `[0, 1]`.
    pub fn from_noise(value: f64) -> Self {
        THRESHOLDS
            .iter()
            .find(|(bound, _)| value < *bound)
            .map(|(_, biome)| *biome)
            .unwrap_or(Biome::Mountains)
    }

    pub fn profile(self) -> BiomeProfile {
        match self {
            Biome::Desert => BiomeProfile {
                surface: BlockType::Sand,
                subsurface: BlockType::Sand,
                subsurface_depth: 4,
                base_height: 58.0,
                height_variation: 8.0,
                tree_density: 0.0,
                tree: None,
            },
            Biome::Plains => BiomeProfile {
                surface: BlockType::Grass,
                subsurface: BlockType::Dirt,
                subsurface_depth: 3,
                base_height: 60.0,
                height_variation: 12.0,
                tree_density: 0.1,
                tree: Some(TreeKind::Oak),
            },
            Biome::Forest => BiomeProfile {
                surface: BlockType::Grass,
                subsurface: BlockType::Dirt,
                subsurface_depth: 4,
                base_height: 62.0,
                height_variation: 18.0,
                tree_density: 0.4,
                tree: Some(TreeKind::Oak),
            },
            Biome::Taiga => BiomeProfile {
                surface: BlockType::Grass,
                subsurface: BlockType::Dirt,
                subsurface_depth: 3,
                base_height: 62.0,
                height_variation: 16.0,
                tree_density: 0.3,
                tree: Some(TreeKind::Spruce),
            },
            Biome::Mountains => BiomeProfile {
                surface: BlockType::Stone,
                subsurface: BlockType::Stone,
                subsurface_depth: 1,
                base_height: 66.0,
                height_variation: 48.0,
                tree_density: 0.0,
                tree: None,
            },
        }
    }

    /// Surface block for a column whose top sits at `surface_y`.
    pub fn surface_block(self, surface_y: i32) -> BlockType {
        if self == Biome::Mountains && surface_y >= SNOW_LINE {
            BlockType::Snow
        } else {
            self.profile().surface
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Biome::Desert => "desert",
            Biome::Plains => "plains",
            Biome::Forest => "forest",
            Biome::Taiga => "taiga",
            Biome::Mountains => "mountains",
        }
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-biome generation properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiomeProfile {
    /// Top block of the column.
    pub surface: BlockType,
    /// Layer directly beneath the surface.
    pub subsurface: BlockType,
    /// Thickness of the subsurface layer; stone continues below it.
    pub subsurface_depth: i32,
    /// Surface height when the height noise is 0.
    pub base_height: f64,
    /// Added to `base_height` at height noise 1.
    pub height_variation: f64,
    /// Chance that one tree attempt landing in this biome grows a tree.
    pub tree_density: f64,
    /// Tree grown here, if any.
    pub tree: Option<TreeKind>,
}

impl BiomeProfile {
    /// Surface Y for a normalised height noise value.
    pub fn surface_height(&self, height_noise: f64) -> f64 {
        self.base_height + height_noise * self.height_variation
    }
}
