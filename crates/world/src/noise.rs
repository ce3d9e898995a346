//! Fractal noise sampling for terrain generation.
//!
//! A [`NoiseField`] sums several octaves of OpenSimplex gradient noise. Each
//! octave is driven by its own sub-seed derived with a SplitMix64 mix of the
//! field seed and the octave index, so octaves never share lattice structure.
//! Fields are immutable after construction and safe to share across threads.

use noise::{NoiseFn, OpenSimplex};
use stratavox_core::{derive_seed, WorldSeed};
use thiserror::Error;

/// Stream tags separating the preset fields of one world seed.
const HEIGHTMAP_STREAM: u64 = 0x4845_4947_4854;
const BIOME_STREAM: u64 = 0x4249_4f4d_45;
const CAVE_STREAM: u64 = 0x4341_5645;
const ORE_STREAM: u64 = 0x4f52_45;

/// 1 / sqrt(3), used by the xz-preferring 3D rotation.
const ROOT3_OVER_3: f64 = 0.577_350_269_189_626;
/// (1/sqrt(3) - 1) / 2, the skew that keeps the xz plane on a lattice plane.
const XZ_SKEW: f64 = -0.211_324_865_405_187;

/// Rejected noise parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NoiseConfigError {
    #[error("octave count must be at least 1")]
    ZeroOctaves,
    #[error("base scale must be a positive finite number, got {0}")]
    InvalidScale(f64),
    #[error("lacunarity must be a positive finite number, got {0}")]
    InvalidLacunarity(f64),
    #[error("persistence must be a positive finite number, got {0}")]
    InvalidPersistence(f64),
}

/// Immutable parameters of a fractal noise field.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseParams {
    seed: u64,
    octaves: u32,
    persistence: f64,
    lacunarity: f64,
    base_scale: f64,
}

impl NoiseParams {
    /// Validate and build a parameter set.
    ///
    /// Invalid values are rejected rather than clamped.
    pub fn new(
        seed: u64,
        octaves: u32,
        persistence: f64,
        lacunarity: f64,
        base_scale: f64,
    ) -> Result<Self, NoiseConfigError> {
        if octaves == 0 {
            return Err(NoiseConfigError::ZeroOctaves);
        }
        if !(base_scale.is_finite() && base_scale > 0.0) {
            return Err(NoiseConfigError::InvalidScale(base_scale));
        }
        if !(lacunarity.is_finite() && lacunarity > 0.0) {
            return Err(NoiseConfigError::InvalidLacunarity(lacunarity));
        }
        if !(persistence.is_finite() && persistence > 0.0) {
            return Err(NoiseConfigError::InvalidPersistence(persistence));
        }
        Ok(Self {
            seed,
            octaves,
            persistence,
            lacunarity,
            base_scale,
        })
    }

    /// Terrain height: 4 octaves at a small scale.
    pub fn heightmap(world_seed: WorldSeed) -> Self {
        Self::preset(derive_seed(world_seed, HEIGHTMAP_STREAM), 4, 0.01)
    }

    /// Biome regions: 3 octaves at a very small scale.
    pub fn biome(world_seed: WorldSeed) -> Self {
        Self::preset(derive_seed(world_seed, BIOME_STREAM), 3, 0.005)
    }

    /// Cave carving: 2 octaves at a medium scale.
    pub fn caves(world_seed: WorldSeed) -> Self {
        Self::preset(derive_seed(world_seed, CAVE_STREAM), 2, 0.05)
    }

    /// Ore veins: 2 octaves at a fine scale.
    pub fn ores(world_seed: WorldSeed) -> Self {
        Self::preset(derive_seed(world_seed, ORE_STREAM), 2, 0.08)
    }

    const fn preset(seed: u64, octaves: u32, base_scale: f64) -> Self {
        Self {
            seed,
            octaves,
            persistence: 0.5,
            lacunarity: 2.0,
            base_scale,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn octaves(&self) -> u32 {
        self.octaves
    }

    pub fn persistence(&self) -> f64 {
        self.persistence
    }

    pub fn lacunarity(&self) -> f64 {
        self.lacunarity
    }

    pub fn base_scale(&self) -> f64 {
        self.base_scale
    }

    /// Sum of all octave amplitudes; the bound on the raw output magnitude.
    pub fn amplitude_sum(&self) -> f64 {
        let mut amplitude = 1.0;
        let mut sum = 0.0;
        for _ in 0..self.octaves {
            sum += amplitude;
            amplitude *= self.persistence;
        }
        sum
    }
}

/// Sub-seed for one octave of a field.
fn octave_seed(seed: u64, octave: u32) -> u32 {
    (derive_seed(seed, u64::from(octave)) >> 32) as u32
}

/// Deterministic multi-octave noise field.
pub struct NoiseField {
    params: NoiseParams,
    octaves: Vec<OpenSimplex>,
}

impl NoiseField {
    /// Build a field; one base noise source is seeded per octave.
    pub fn new(params: NoiseParams) -> Self {
        let octaves = (0..params.octaves)
            .map(|octave| OpenSimplex::new(octave_seed(params.seed, octave)))
            .collect();
        Self { params, octaves }
    }

    /// Heightmap preset for a world seed.
    pub fn for_heightmap(world_seed: WorldSeed) -> Self {
        Self::new(NoiseParams::heightmap(world_seed))
    }

    /// Biome preset for a world seed.
    pub fn for_biomes(world_seed: WorldSeed) -> Self {
        Self::new(NoiseParams::biome(world_seed))
    }

    /// Cave preset for a world seed.
    pub fn for_caves(world_seed: WorldSeed) -> Self {
        Self::new(NoiseParams::caves(world_seed))
    }

    /// Ore preset for a world seed.
    pub fn for_ores(world_seed: WorldSeed) -> Self {
        Self::new(NoiseParams::ores(world_seed))
    }

    pub fn params(&self) -> &NoiseParams {
        &self.params
    }

    /// Normalized 2D noise in `[0, 1]`.
    pub fn sample_2d(&self, x: f64, z: f64) -> f64 {
        let (total, max_value) = self.accumulate(|source, frequency| {
            source.get([x * frequency, z * frequency])
        });
        (total / max_value + 1.0) * 0.5
    }

    /// Signed 2D octave sum; within `[-1, 1]` for a single octave.
    pub fn sample_2d_raw(&self, x: f64, z: f64) -> f64 {
        self.accumulate(|source, frequency| source.get([x * frequency, z * frequency]))
            .0
    }

    /// Normalized 3D noise in `[0, 1]`, with `y` treated as height.
    pub fn sample_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        let (total, max_value) = self.accumulate(|source, frequency| {
            source.get(rotate_improve_xz(x * frequency, y * frequency, z * frequency))
        });
        (total / max_value + 1.0) * 0.5
    }

    /// Signed 3D octave sum; within `[-1, 1]` for a single octave.
    pub fn sample_3d_raw(&self, x: f64, y: f64, z: f64) -> f64 {
        self.accumulate(|source, frequency| {
            source.get(rotate_improve_xz(x * frequency, y * frequency, z * frequency))
        })
        .0
    }

    /// Returns `(sum, amplitude_sum)` over all octaves.
    fn accumulate<F>(&self, mut base: F) -> (f64, f64)
    where
        F: FnMut(&OpenSimplex, f64) -> f64,
    {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.params.base_scale;
        let mut max_value = 0.0;

        for source in &self.octaves {
            // The base function can overshoot its nominal range by a hair.
            total += base(source, frequency).clamp(-1.0, 1.0) * amplitude;
            max_value += amplitude;

            amplitude *= self.params.persistence;
            frequency *= self.params.lacunarity;
        }

        (total, max_value)
    }
}

/// Rotate 3D coordinates so the xz plane is sampled along a lattice plane.
///
/// With `y` as the vertical axis this keeps horizontal slices free of the
/// diagonal streaks plain 3D simplex noise shows, which suits cave systems.
fn rotate_improve_xz(x: f64, y: f64, z: f64) -> [f64; 3] {
    let xz = x + z;
    let s2 = xz * XZ_SKEW;
    let yy = y * ROOT3_OVER_3;
    [x + s2 + yy, xz * -ROOT3_OVER_3 + yy, z + s2 + yy]
}
