//! Tree decoration for grassy biomes.
//!
//! Each chunk draws its trees from a generator seeded by the world seed and
//! the chunk coordinate. Trunks keep clear of the chunk edge so every trunk
//! and leaf block lands inside the chunk that planted it; decoration never
//! reads or writes a neighbour.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use stratavox_core::{derive_seed, BlockType, WorldSeed};

use crate::chunk::{Chunk, ChunkPos, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z};
use crate::heightmap::Heightmap;

/// Seed stream for tree placement, apart from the noise layer streams.
const TREE_STREAM: u64 = 0x7EE5;

/// Placement attempts per chunk. Each lands on a random column and grows
/// with that column's biome tree density.
pub const TREE_ATTEMPTS: usize = 8;

/// Trunks stay at least this far from the chunk edge.
pub const TREE_EDGE_MARGIN: usize = 2;

/// Tree shape grown by a biome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeKind {
    /// 4-5 block trunk under a 3×3×2 canopy.
    Oak,
    /// 6-7 block trunk under a three-layer cone.
    Spruce,
}

impl TreeKind {
    fn min_trunk(self) -> usize {
        match self {
            TreeKind::Oak => 4,
            TreeKind::Spruce => 6,
        }
    }

    /// Leaf layers stacked on the trunk.
    pub fn canopy_height(self) -> usize {
        match self {
            TreeKind::Oak => 2,
            TreeKind::Spruce => 3,
        }
    }

    /// Widest horizontal reach of the canopy from the trunk.
    pub fn canopy_radius(self) -> usize {
        match self {
            TreeKind::Oak => 1,
            TreeKind::Spruce => 2,
        }
    }

    /// Whether canopy layer `layer` has a leaf at offset (`dx`, `dz`).
    fn has_leaf(self, layer: usize, dx: i32, dz: i32) -> bool {
        match self {
            TreeKind::Oak => dx.abs() <= 1 && dz.abs() <= 1,
            TreeKind::Spruce => {
                let radius = 2 - layer.min(2) as i32;
                dx.abs() + dz.abs() <= radius
            }
        }
    }
}

/// A tree rooted on the surface block of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tree {
    pub x: usize,
    pub z: usize,
    /// Lowest trunk block; the ground block is just below.
    pub base_y: usize,
    pub trunk_height: usize,
    pub kind: TreeKind,
}

impl Tree {
    /// One past the highest leaf layer.
    pub fn top_y(&self) -> usize {
        self.base_y + self.trunk_height + self.kind.canopy_height()
    }

    fn fits(&self, chunk: &Chunk) -> bool {
        let reach = self.kind.canopy_radius();
        let inside = self.x >= reach
            && self.z >= reach
            && self.x + reach < CHUNK_SIZE_X
            && self.z + reach < CHUNK_SIZE_Z
            && self.top_y() <= CHUNK_SIZE_Y;
        inside
            && (self.base_y..self.base_y + self.trunk_height)
                .all(|y| chunk.block(self.x, y, self.z).is_air())
    }

    /// Write trunk and leaves. Leaves only fill air.
    fn grow(&self, chunk: &mut Chunk) {
        let canopy_y = self.base_y + self.trunk_height;
        chunk.fill_column(self.x, self.z, self.base_y, canopy_y, BlockType::Wood);

        let reach = self.kind.canopy_radius() as i32;
        for layer in 0..self.kind.canopy_height() {
            for dz in -reach..=reach {
                for dx in -reach..=reach {
                    if !self.kind.has_leaf(layer, dx, dz) {
                        continue;
                    }
                    let x = (self.x as i32 + dx) as usize;
                    let z = (self.z as i32 + dz) as usize;
                    if chunk.block(x, canopy_y + layer, z).is_air() {
                        chunk.set_block(x, canopy_y + layer, z, BlockType::Leaves);
                    }
                }
            }
        }
    }
}

/// Per-chunk tree generator seed.
pub fn tree_seed(world_seed: WorldSeed, pos: ChunkPos) -> u64 {
    let key = ((pos.x as u32 as u64) << 32) | pos.z as u32 as u64;
    derive_seed(derive_seed(world_seed, TREE_STREAM), key)
}

/// Trees the chunk at `pos` would plant, in attempt order.
///
/// Only columns whose biome grows trees and whose ground is grass qualify.
/// Overlap with earlier trees is resolved when planting.
pub fn plan_trees(world_seed: WorldSeed, pos: ChunkPos, heightmap: &Heightmap) -> Vec<Tree> {
    let mut rng = StdRng::seed_from_u64(tree_seed(world_seed, pos));
    let mut trees = Vec::new();

    for _ in 0..TREE_ATTEMPTS {
        // Fixed draws per attempt keep later attempts independent of biome.
        let x = rng.gen_range(TREE_EDGE_MARGIN..CHUNK_SIZE_X - TREE_EDGE_MARGIN);
        let z = rng.gen_range(TREE_EDGE_MARGIN..CHUNK_SIZE_Z - TREE_EDGE_MARGIN);
        let roll: f64 = rng.gen();
        let extra = rng.gen_range(0..=1usize);

        let column = heightmap.get(x, z);
        let profile = column.biome.profile();
        let Some(kind) = profile.tree else {
            continue;
        };
        if roll >= profile.tree_density
            || column.biome.surface_block(column.surface_y) != BlockType::Grass
        {
            continue;
        }
        trees.push(Tree {
            x,
            z,
            base_y: column.surface_y as usize + 1,
            trunk_height: kind.min_trunk() + extra,
            kind,
        });
    }
    trees
}

/// Plant the planned trees that fit. Returns how many were planted.
pub fn plant_trees(chunk: &mut Chunk, world_seed: WorldSeed, heightmap: &Heightmap) -> usize {
    let mut planted = 0;
    for tree in plan_trees(world_seed, chunk.position(), heightmap) {
        if chunk.block(tree.x, tree.base_y - 1, tree.z) == BlockType::Grass && tree.fits(chunk) {
            tree.grow(chunk);
            planted += 1;
        }
    }
    planted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::NoiseField;

    fn heightmap(seed: WorldSeed, pos: ChunkPos) -> Heightmap {
        Heightmap::generate(
            &NoiseField::for_heightmap(seed),
            &NoiseField::for_biomes(seed),
            pos,
        )
    }

    fn tree(kind: TreeKind) -> Tree {
        Tree {
            x: 8,
            z: 8,
            base_y: 65,
            trunk_height: kind.min_trunk(),
            kind,
        }
    }

    fn grassy_chunk() -> Chunk {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0));
        for z in 0..CHUNK_SIZE_Z {
            for x in 0..CHUNK_SIZE_X {
                chunk.set_block(x, 64, z, BlockType::Grass);
            }
        }
        chunk
    }

    #[test]
    fn oak_has_full_square_canopy() {
        let mut chunk = grassy_chunk();
        let oak = tree(TreeKind::Oak);
        assert!(oak.fits(&chunk));
        oak.grow(&mut chunk);

        assert_eq!(chunk.count(BlockType::Wood), 4);
        assert_eq!(chunk.count(BlockType::Leaves), 18);
        assert_eq!(chunk.block(8, 69, 8), BlockType::Leaves);
        assert_eq!(chunk.block(9, 70, 9), BlockType::Leaves);
        assert_eq!(chunk.block(8, 71, 8), BlockType::Air);
        assert_eq!(oak.top_y(), 71);
    }

    #[test]
    fn spruce_canopy_narrows_upward() {
        let mut chunk = grassy_chunk();
        let spruce = tree(TreeKind::Spruce);
        spruce.grow(&mut chunk);

        let canopy_y = 65 + 6;
        assert_eq!(chunk.count(BlockType::Wood), 6);
        // Diamond layers of radius 2, 1 and 0.
        assert_eq!(chunk.count(BlockType::Leaves), 13 + 5 + 1);
        assert_eq!(chunk.block(10, canopy_y, 8), BlockType::Leaves);
        assert_eq!(chunk.block(10, canopy_y + 1, 8), BlockType::Air);
        assert_eq!(chunk.block(8, canopy_y + 2, 8), BlockType::Leaves);
    }

    #[test]
    fn trunk_blocked_by_terrain_does_not_fit() {
        let mut chunk = grassy_chunk();
        let oak = tree(TreeKind::Oak);
        chunk.set_block(8, 67, 8, BlockType::Stone);
        assert!(!oak.fits(&chunk));
    }

    #[test]
    fn tree_reaching_past_world_top_does_not_fit() {
        let chunk = Chunk::new(ChunkPos::new(0, 0));
        let tall = Tree {
            base_y: CHUNK_SIZE_Y - 5,
            ..tree(TreeKind::Spruce)
        };
        assert!(!tall.fits(&chunk));
    }

    #[test]
    fn leaves_never_replace_trunks() {
        let mut chunk = grassy_chunk();
        chunk.fill_column(9, 8, 69, 72, BlockType::Wood);
        tree(TreeKind::Oak).grow(&mut chunk);
        assert_eq!(chunk.block(9, 69, 8), BlockType::Wood);
        assert_eq!(chunk.block(9, 70, 8), BlockType::Wood);
    }

    #[test]
    fn planned_trees_stay_inside_the_chunk() {
        let mut planned = 0;
        // Spread out so the sample crosses several biomes.
        for pos in ChunkPos::new(0, 0).square_around(6) {
            let pos = ChunkPos::new(pos.x * 11, pos.z * 13);
            for tree in plan_trees(77, pos, &heightmap(77, pos)) {
                let reach = tree.kind.canopy_radius();
                assert!(tree.x >= reach && tree.x + reach < CHUNK_SIZE_X);
                assert!(tree.z >= reach && tree.z + reach < CHUNK_SIZE_Z);
                planned += 1;
            }
        }
        assert!(planned > 0, "no trees planned in 169 chunks");
    }

    #[test]
    fn plans_depend_on_seed_and_chunk_only() {
        let pos = ChunkPos::new(-3, 9);
        let hm = heightmap(5, pos);
        assert_eq!(plan_trees(5, pos, &hm), plan_trees(5, pos, &hm));
        assert_ne!(tree_seed(5, pos), tree_seed(5, ChunkPos::new(9, -3)));
        assert_ne!(tree_seed(5, pos), tree_seed(6, pos));
    }

    #[test]
    fn plant_trees_only_on_grass() {
        let pos = ChunkPos::new(0, 0);
        let hm = heightmap(1, pos);
        // An empty chunk has no ground, so nothing can root.
        let mut bare = Chunk::new(pos);
        assert_eq!(plant_trees(&mut bare, 1, &hm), 0);
        assert_eq!(bare.count(BlockType::Wood), 0);
    }
}
