//! World configuration.
//!
//! Values normally come from a TOML file loaded by the host; every field has
//! a default so partial files are accepted.

use serde::{Deserialize, Serialize};
use stratavox_core::WorldSeed;
use thiserror::Error;

use crate::store::StoreSettings;

/// Default ray length for block picking, in blocks.
pub const DEFAULT_PICK_DISTANCE: f64 = 5.0;

/// Rejected configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("worker_threads must be at least 1")]
    NoWorkers,
    #[error("max_resident_chunks must be at least 1")]
    NoCapacity,
    #[error("load_radius must not be negative (got {0})")]
    NegativeLoadRadius(i32),
    #[error("unload_radius {unload} is smaller than load_radius {load}")]
    UnloadInsideLoad { load: i32, unload: i32 },
    #[error("max_resident_chunks {capacity} cannot hold the {required} chunks of one load area")]
    CapacityBelowLoadArea { capacity: usize, required: usize },
    #[error("pick_distance must be a positive finite number (got {0})")]
    InvalidPickDistance(f64),
    #[error("failed to start generation workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Immutable for the lifetime of a world.
    pub seed: WorldSeed,
    /// Threads in the generation pool.
    pub worker_threads: usize,
    /// Chunk radius prefetched around each point of interest.
    pub load_radius: i32,
    /// Chunks farther than this from every point of interest may be evicted.
    pub unload_radius: i32,
    /// Upper bound on READY chunks held in memory.
    pub max_resident_chunks: usize,
    /// Default maximum distance for block picking.
    pub pick_distance: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            worker_threads: 4,
            load_radius: 4,
            unload_radius: 6,
            // (2 * 6 + 1)^2 chunks around one point, with headroom.
            max_resident_chunks: 256,
            pick_distance: DEFAULT_PICK_DISTANCE,
        }
    }
}

impl WorldConfig {
    /// Default configuration with a specific seed.
    pub fn with_seed(seed: WorldSeed) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Chunks prefetched around one point of interest: `(2r + 1)^2`.
    pub fn load_area_chunks(&self) -> usize {
        let side = (self.load_radius.max(0) as usize)
            .saturating_mul(2)
            .saturating_add(1);
        side.saturating_mul(side)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_threads == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.max_resident_chunks == 0 {
            return Err(ConfigError::NoCapacity);
        }
        if self.load_radius < 0 {
            return Err(ConfigError::NegativeLoadRadius(self.load_radius));
        }
        if self.unload_radius < self.load_radius {
            return Err(ConfigError::UnloadInsideLoad {
                load: self.load_radius,
                unload: self.unload_radius,
            });
        }
        // Otherwise prefetched chunks are evicted by the next generation.
        if self.max_resident_chunks < self.load_area_chunks() {
            return Err(ConfigError::CapacityBelowLoadArea {
                capacity: self.max_resident_chunks,
                required: self.load_area_chunks(),
            });
        }
        if !(self.pick_distance.is_finite() && self.pick_distance > 0.0) {
            return Err(ConfigError::InvalidPickDistance(self.pick_distance));
        }
        Ok(())
    }

    /// Store settings derived from this configuration.
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            worker_threads: self.worker_threads,
            max_resident_chunks: self.max_resident_chunks,
            unload_radius: self.unload_radius,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        WorldConfig::default().validate().unwrap();
        assert_eq!(WorldConfig::default().pick_distance, 5.0);
    }

    #[test]
    fn rejects_inconsistent_values() {
        let mut cfg = WorldConfig::default();
        cfg.worker_threads = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::NoWorkers)));

        let mut cfg = WorldConfig::default();
        cfg.unload_radius = cfg.load_radius - 1;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::UnloadInsideLoad { .. })
        ));

        let mut cfg = WorldConfig::default();
        cfg.pick_distance = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidPickDistance(_))
        ));

        let mut cfg = WorldConfig::default();
        cfg.pick_distance = f64::NAN;
        assert!(cfg.validate().is_err());

        let mut cfg = WorldConfig::default();
        cfg.max_resident_chunks = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::NoCapacity)));
    }

    #[test]
    fn capacity_must_hold_one_load_area() {
        let cfg = WorldConfig {
            load_radius: 2,
            unload_radius: 2,
            max_resident_chunks: 24,
            ..WorldConfig::default()
        };
        assert_eq!(cfg.load_area_chunks(), 25);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::CapacityBelowLoadArea {
                capacity: 24,
                required: 25
            })
        ));

        let cfg = WorldConfig {
            max_resident_chunks: 25,
            ..cfg
        };
        cfg.validate().unwrap();

        let cfg = WorldConfig {
            load_radius: 0,
            max_resident_chunks: 1,
            ..WorldConfig::default()
        };
        assert_eq!(cfg.load_area_chunks(), 1);
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg: WorldConfig = toml::from_str("seed = 99\nload_radius = 2\n").unwrap();
        assert_eq!(cfg.seed, 99);
        assert_eq!(cfg.load_radius, 2);
        assert_eq!(cfg.worker_threads, WorldConfig::default().worker_threads);
        cfg.validate().unwrap();
    }

    #[test]
    fn store_settings_mirror_config() {
        let cfg = WorldConfig {
            worker_threads: 3,
            max_resident_chunks: 10,
            unload_radius: 7,
            ..WorldConfig::default()
        };
        let settings = cfg.store_settings();
        assert_eq!(settings.worker_threads, 3);
        assert_eq!(settings.max_resident_chunks, 10);
        assert_eq!(settings.unload_radius, 7);
    }
}
