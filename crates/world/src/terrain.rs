//! Terrain generation integrating heightmap and biome systems.
//!
//! A chunk is synthesised from its coordinate and the world seed alone:
//! column fill, then an ore pass, then cave carving, then trees. Nothing here
//! reads or writes another chunk, so any number of workers can generate in
//! parallel.

use crate::biome::Biome;
use crate::chunk::{Chunk, ChunkPos, CHUNK_SIZE_X, CHUNK_SIZE_Z};
use crate::heightmap::{sample_column, ColumnSample, Heightmap};
use crate::noise::NoiseField;
use crate::trees::plant_trees;
use stratavox_core::{BlockType, WorldSeed};
use thiserror::Error;
use tracing::{debug, instrument};

/// Caves never carve below this Y.
pub const CAVE_FLOOR_Y: i32 = 5;

/// Raw cave noise above this value becomes air.
pub const CAVE_THRESHOLD: f64 = 0.3;

/// Raw ore noise above this value turns deep stone into coal.
///
/// Two-octave ore noise rarely leaves ±0.7; both thresholds must sit inside it.
pub const COAL_THRESHOLD: f64 = 0.45;

/// Raw ore noise below this value turns deep stone into iron.
pub const IRON_THRESHOLD: f64 = -0.5;

/// Iron only forms below this Y.
pub const IRON_MAX_Y: i32 = 40;

/// Failure to produce a chunk. Delivered to every requester of that chunk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The generator panicked; the chunk stays absent.
    #[error("generation of chunk {pos} panicked: {message}")]
    Panicked { pos: ChunkPos, message: String },
    /// The generator reported a failure.
    #[error("generation of chunk {pos} failed: {reason}")]
    Failed { pos: ChunkPos, reason: String },
}

/// Produces the initial contents of a chunk.
///
/// Implementations must be pure functions of `pos` (plus whatever immutable
/// state they were built with): the store may regenerate an evicted chunk at
/// any time and expects identical contents.
pub trait ChunkGenerator: Send + Sync {
    fn generate(&self, pos: ChunkPos) -> Result<Chunk, GenerationError>;
}

/// Terrain generator that fills chunks with blocks.
pub struct TerrainGenerator {
    world_seed: WorldSeed,
    height_noise: NoiseField,
    biome_noise: NoiseField,
    cave_noise: NoiseField,
    ore_noise: NoiseField,
}

impl TerrainGenerator {
    /// Build every noise layer for `world_seed`.
    pub fn new(world_seed: WorldSeed) -> Self {
        Self {
            world_seed,
            height_noise: NoiseField::for_heightmap(world_seed),
            biome_noise: NoiseField::for_biomes(world_seed),
            cave_noise: NoiseField::for_caves(world_seed),
            ore_noise: NoiseField::for_ores(world_seed),
        }
    }

    pub fn world_seed(&self) -> WorldSeed {
        self.world_seed
    }

    /// Surface Y of a world column, before caves are carved.
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        self.column(x, z).surface_y
    }

    pub fn biome_at(&self, x: i32, z: i32) -> Biome {
        self.column(x, z).biome
    }

    pub fn column(&self, x: i32, z: i32) -> ColumnSample {
        sample_column(&self.height_noise, &self.biome_noise, x, z)
    }

    /// Generate terrain for a chunk at the given position.
    #[instrument(skip(self), fields(chunk = %chunk_pos, world_seed = self.world_seed))]
    pub fn generate_chunk(&self, chunk_pos: ChunkPos) -> Chunk {
        debug!("Starting terrain generation");
        let mut chunk = Chunk::new(chunk_pos);
        let heightmap = Heightmap::generate(&self.height_noise, &self.biome_noise, chunk_pos);
        let (origin_x, origin_z) = chunk_pos.origin();

        for local_z in 0..CHUNK_SIZE_Z {
            for local_x in 0..CHUNK_SIZE_X {
                let column = heightmap.get(local_x, local_z);
                let world_x = origin_x + local_x as i32;
                let world_z = origin_z + local_z as i32;

                self.generate_column(&mut chunk, local_x, local_z, column);
                self.generate_ores(&mut chunk, local_x, local_z, world_x, world_z, column);
                self.carve_caves(&mut chunk, local_x, local_z, world_x, world_z, column);
            }
        }
        let trees = plant_trees(&mut chunk, self.world_seed, &heightmap);

        debug!(
            min_height = heightmap.min_height(),
            max_height = heightmap.max_height(),
            trees,
            "Terrain generation complete"
        );
        chunk
    }

    /// Bedrock, stone, subsurface layer, then the surface block; air above.
    fn generate_column(&self, chunk: &mut Chunk, x: usize, z: usize, column: ColumnSample) {
        let surface = column.surface_y;
        let profile = column.biome.profile();
        let stone_top = (surface - profile.subsurface_depth).max(1);

        chunk.set_block(x, 0, z, BlockType::Bedrock);
        chunk.fill_column(x, z, 1, stone_top as usize, BlockType::Stone);
        chunk.fill_column(x, z, stone_top as usize, surface as usize, profile.subsurface);
        chunk.set_block(x, surface as usize, z, column.biome.surface_block(surface));
    }

    /// Replace deep stone with ore where the ore noise peaks.
    fn generate_ores(
        &self,
        chunk: &mut Chunk,
        x: usize,
        z: usize,
        world_x: i32,
        world_z: i32,
        column: ColumnSample,
    ) {
        let stone_top = column.surface_y - column.biome.profile().subsurface_depth;
        for y in 1..stone_top.max(1) {
            if chunk.block(x, y as usize, z) != BlockType::Stone {
                continue;
            }
            let value = self
                .ore_noise
                .sample_3d_raw(world_x as f64, y as f64, world_z as f64);
            let ore = if value > COAL_THRESHOLD {
                BlockType::CoalOre
            } else if value < IRON_THRESHOLD && y < IRON_MAX_Y {
                BlockType::IronOre
            } else {
                continue;
            };
            chunk.set_block(x, y as usize, z, ore);
        }
    }

    /// Carve caves below the surface, leaving the protected floor intact.
    fn carve_caves(
        &self,
        chunk: &mut Chunk,
        x: usize,
        z: usize,
        world_x: i32,
        world_z: i32,
        column: ColumnSample,
    ) {
        for y in CAVE_FLOOR_Y..column.surface_y {
            let value = self
                .cave_noise
                .sample_3d_raw(world_x as f64, y as f64, world_z as f64);
            if value > CAVE_THRESHOLD {
                chunk.set_block(x, y as usize, z, BlockType::Air);
            }
        }
    }
}

impl ChunkGenerator for TerrainGenerator {
    fn generate(&self, pos: ChunkPos) -> Result<Chunk, GenerationError> {
        Ok(self.generate_chunk(pos))
    }
}
