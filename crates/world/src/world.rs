//! World facade: one seed, one catalog, one chunk store.

use std::sync::Arc;

use glam::DVec3;
use stratavox_core::{BlockCatalog, BlockType, WorldSeed};
use tracing::{debug, info, instrument};

use crate::chunk::{ChunkPos, ChunkState};
use crate::config::{ConfigError, WorldConfig};
use crate::raycast::{cast_ray, PickError, PickResult, VoxelRaycaster};
use crate::store::{ChunkStore, SetBlockOutcome, StoreStats};
use crate::terrain::{GenerationError, TerrainGenerator};

/// Summary of one [`World::update_interest`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterestUpdate {
    /// Chunks whose generation was started by this call.
    pub requested: usize,
    pub evicted: usize,
}

/// A generated world and the context it owns.
pub struct World {
    config: WorldConfig,
    catalog: BlockCatalog,
    generator: Arc<TerrainGenerator>,
    store: ChunkStore,
}

impl World {
    /// Validate `config` and start the generation workers.
    pub fn new(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let generator = Arc::new(TerrainGenerator::new(config.seed));
        let store = ChunkStore::new(generator.clone(), config.store_settings())?;
        info!(
            seed = config.seed,
            workers = config.worker_threads,
            "world created"
        );
        Ok(Self {
            config,
            catalog: BlockCatalog::standard(),
            generator,
            store,
        })
    }

    pub fn seed(&self) -> WorldSeed {
        self.config.seed
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn catalog(&self) -> &BlockCatalog {
        &self.catalog
    }

    pub fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Result<BlockType, GenerationError> {
        self.store.get_block(x, y, z)
    }

    pub fn set_block(&self, x: i32, y: i32, z: i32, block: BlockType) -> SetBlockOutcome {
        self.store.set_block(x, y, z, block)
    }

    /// Record the current points of interest, prefetch every chunk within
    /// `load_radius` of them and evict READY chunks beyond `unload_radius`.
    #[instrument(skip_all, fields(points = points.len()))]
    pub fn update_interest(&self, points: &[DVec3]) -> InterestUpdate {
        let centers: Vec<ChunkPos> = points
            .iter()
            .map(|p| ChunkPos::from_world_point(p.x, p.z))
            .collect();
        self.store.set_interest(&centers);

        let mut requested = 0;
        for center in &centers {
            for pos in center.square_around(self.config.load_radius) {
                if self.store.request(pos) == ChunkState::Absent {
                    requested += 1;
                }
            }
        }
        let evicted = self.store.evict_out_of_range();
        debug!(requested, evicted, "interest updated");
        InterestUpdate { requested, evicted }
    }

    /// Generate every chunk within `radius` of `center` and wait for them.
    /// Fails with the first generation error met.
    pub fn preload(&self, center: ChunkPos, radius: i32) -> Result<usize, GenerationError> {
        self.store.load_area(center, radius)
    }

    /// A picker over this world's store using the configured pick distance.
    pub fn raycaster(&self) -> Result<VoxelRaycaster<ChunkStore>, PickError> {
        let mut picker = VoxelRaycaster::new(self.store.clone());
        picker.set_max_distance(self.config.pick_distance)?;
        Ok(picker)
    }

    /// One-shot pick with the configured pick distance.
    pub fn pick(&self, origin: DVec3, direction: DVec3) -> Result<Option<PickResult>, PickError> {
        cast_ray(&self.store, origin, direction, self.config.pick_distance)
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }
}
