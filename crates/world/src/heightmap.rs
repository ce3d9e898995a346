//! Heightmap generation for terrain.
//!
//! Converts the height and biome noise layers into a surface Y and a biome
//! for every column of a chunk.

use crate::biome::Biome;
use crate::chunk::{ChunkPos, CHUNK_SIZE_X, CHUNK_SIZE_Z, WORLD_MAX_Y};
use crate::noise::NoiseField;

/// Lowest surface Y a column can have; keeps bedrock and the cave floor covered.
pub const MIN_SURFACE_Y: i32 = 1;

/// Highest surface Y a column can have; leaves room above for snow and edits.
pub const MAX_SURFACE_Y: i32 = WORLD_MAX_Y - 2;

/// Surface height and biome of one world column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSample {
    /// Y of the topmost terrain block before caves are carved.
    pub surface_y: i32,
    pub biome: Biome,
}

/// Sample one world column. Pure function of the noise fields and `(x, z)`,
/// so neighbouring chunks agree on their shared edges.
pub fn sample_column(height_noise: &NoiseField, biome_noise: &NoiseField, x: i32, z: i32) -> ColumnSample {
    let (wx, wz) = (x as f64, z as f64);
    let biome = Biome::from_noise(biome_noise.sample_2d(wx, wz));
    let height = biome.profile().surface_height(height_noise.sample_2d(wx, wz));
    ColumnSample {
        surface_y: (height.floor() as i32).clamp(MIN_SURFACE_Y, MAX_SURFACE_Y),
        biome,
    }
}

/// Column samples for a single chunk (16x16).
pub struct Heightmap {
    /// Indexed as columns[z][x] for cache-friendly iteration.
    columns: [[ColumnSample; CHUNK_SIZE_X]; CHUNK_SIZE_Z],
}

impl Heightmap {
    /// Sample every column of the chunk at `pos`.
    pub fn generate(height_noise: &NoiseField, biome_noise: &NoiseField, pos: ChunkPos) -> Self {
        let (origin_x, origin_z) = pos.origin();
        let placeholder = ColumnSample {
            surface_y: MIN_SURFACE_Y,
            biome: Biome::Plains,
        };
        let mut columns = [[placeholder; CHUNK_SIZE_X]; CHUNK_SIZE_Z];

        for (local_z, row) in columns.iter_mut().enumerate() {
            for (local_x, cell) in row.iter_mut().enumerate() {
                *cell = sample_column(
                    height_noise,
                    biome_noise,
                    origin_x + local_x as i32,
                    origin_z + local_z as i32,
                );
            }
        }

        Self { columns }
    }

    /// Column at a local (x, z) coordinate.
    ///
    /// # Panics
    /// Panics if coordinates are out of bounds.
    pub fn get(&self, local_x: usize, local_z: usize) -> ColumnSample {
        self.columns[local_z][local_x]
    }

    pub fn height(&self, local_x: usize, local_z: usize) -> i32 {
        self.get(local_x, local_z).surface_y
    }

    pub fn min_height(&self) -> i32 {
        self.iter().map(|c| c.surface_y).min().unwrap_or(MIN_SURFACE_Y)
    }

    pub fn max_height(&self) -> i32 {
        self.iter().map(|c| c.surface_y).max().unwrap_or(MAX_SURFACE_Y)
    }

    fn iter(&self) -> impl Iterator<Item = &ColumnSample> {
        self.columns.iter().flat_map(|row| row.iter())
    }
}
