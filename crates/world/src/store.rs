//! Chunk arena with on-demand generation, compute-once semantics and
//! distance/LRU eviction.
//!
//! Every chunk coordinate moves through `Absent -> Generating -> Ready` and
//! back to `Absent` on eviction. The first requester of an absent coordinate
//! installs a pending marker and hands generation to the worker pool; later
//! requesters block on that marker, so each coordinate is generated at most
//! once per residency.
//!
//! Lock order: the slot map lock is never held while taking a chunk lock.

use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::{Condvar, Mutex, RwLock};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use stratavox_core::BlockType;
use tracing::{debug, warn};

use crate::chunk::{Chunk, ChunkPos, ChunkState, LocalPos};
use crate::config::ConfigError;
use crate::terrain::{ChunkGenerator, GenerationError};

/// Tuning for a [`ChunkStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSettings {
    /// Generation threads; `0` generates on the requesting thread.
    pub worker_threads: usize,
    /// Upper bound on READY chunks.
    pub max_resident_chunks: usize,
    /// Chebyshev radius around interest points that protects chunks from
    /// distance-based eviction.
    pub unload_radius: i32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            max_resident_chunks: 256,
            unload_radius: 6,
        }
    }
}

/// Result of [`ChunkStore::set_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetBlockOutcome {
    Applied,
    /// The owning chunk is absent, still generating, or was evicted
    /// concurrently. Nothing changed; re-resolve the chunk and retry.
    NotResident,
    /// Y lies outside the world.
    OutOfBounds,
}

impl SetBlockOutcome {
    pub fn is_applied(self) -> bool {
        self == SetBlockOutcome::Applied
    }
}

/// Result of [`ChunkStore::unload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadOutcome {
    Unloaded,
    /// Generation is in flight; the chunk is evicted on the first eviction
    /// pass after it becomes READY.
    Deferred,
    NotLoaded,
}

/// Counters reported by [`ChunkStore::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub resident: usize,
    pub generating: usize,
    /// Generator invocations since creation, including failed ones.
    pub generations: u64,
    pub evictions: u64,
    /// Unloads waiting for their chunk to finish generating.
    pub deferred_unloads: usize,
}

/// A READY chunk. Edits and eviction both take the write lock, so an edit
/// in flight always finishes before its chunk is marked evicted.
struct ResidentChunk {
    data: RwLock<Chunk>,
    evicted: AtomicBool,
}

impl ResidentChunk {
    fn new(chunk: Chunk) -> Self {
        Self {
            data: RwLock::new(chunk),
            evicted: AtomicBool::new(false),
        }
    }

    fn mark_evicted(&self) {
        let _guard = self.data.write();
        self.evicted.store(true, Ordering::Release);
    }
}

type GenerationResult = Result<Arc<ResidentChunk>, GenerationError>;

/// In-flight generation shared by every requester of one coordinate.
#[derive(Default)]
struct PendingChunk {
    result: Mutex<Option<GenerationResult>>,
    done: Condvar,
}

impl PendingChunk {
    fn wait(&self) -> GenerationResult {
        let mut result = self.result.lock();
        loop {
            if let Some(result) = result.as_ref() {
                return result.clone();
            }
            self.done.wait(&mut result);
        }
    }

    fn complete(&self, outcome: GenerationResult) {
        *self.result.lock() = Some(outcome);
        self.done.notify_all();
    }
}

enum Slot {
    Generating(Arc<PendingChunk>),
    Ready(Arc<ResidentChunk>),
}

struct Inner {
    slots: HashMap<ChunkPos, Slot>,
    /// READY chunks only, most recently used first.
    recency: LruCache<ChunkPos, ()>,
    interest: Vec<ChunkPos>,
    deferred_unloads: HashSet<ChunkPos>,
}

impl Inner {
    fn out_of_range(&self, pos: ChunkPos, radius: i32) -> bool {
        !self.interest.is_empty()
            && self
                .interest
                .iter()
                .all(|center| center.chebyshev_distance(pos) > radius)
    }

    fn remove_ready(&mut self, pos: ChunkPos) -> Option<Arc<ResidentChunk>> {
        match self.slots.get(&pos) {
            Some(Slot::Ready(_)) => {}
            _ => return None,
        }
        self.recency.pop(&pos);
        self.deferred_unloads.remove(&pos);
        match self.slots.remove(&pos) {
            Some(Slot::Ready(resident)) => Some(resident),
            _ => None,
        }
    }

    /// Evict until the READY count fits `capacity`. Out-of-range and
    /// deferred chunks go first, then plain LRU order. `keep` is never chosen.
    fn enforce_capacity(
        &mut self,
        capacity: usize,
        radius: i32,
        keep: ChunkPos,
    ) -> Vec<(ChunkPos, Arc<ResidentChunk>)> {
        let mut evicted = Vec::new();
        while self.recency.len() > capacity {
            let lru_order: Vec<ChunkPos> = self.recency.iter().rev().map(|(pos, _)| *pos).collect();
            let victim = lru_order
                .iter()
                .copied()
                .filter(|pos| *pos != keep)
                .find(|pos| self.deferred_unloads.contains(pos) || self.out_of_range(*pos, radius))
                .or_else(|| lru_order.iter().copied().find(|pos| *pos != keep));
            let Some(victim) = victim else { break };
            if let Some(resident) = self.remove_ready(victim) {
                evicted.push((victim, resident));
            }
        }
        evicted
    }
}

struct Shared {
    generator: Arc<dyn ChunkGenerator>,
    inner: Mutex<Inner>,
    capacity: usize,
    unload_radius: i32,
    generations: AtomicU64,
    evictions: AtomicU64,
}

impl Shared {
    fn new(generator: Arc<dyn ChunkGenerator>, capacity: usize, unload_radius: i32) -> Self {
        Self {
            generator,
            inner: Mutex::new(Inner {
                slots: HashMap::new(),
                recency: LruCache::unbounded(),
                interest: Vec::new(),
                deferred_unloads: HashSet::new(),
            }),
            capacity,
            unload_radius,
            generations: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Run the generator for `pos` and publish the outcome to every waiter.
    fn run_generation(&self, pos: ChunkPos, pending: &PendingChunk) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.generator.generate(pos)))
            .unwrap_or_else(|payload| {
                Err(GenerationError::Panicked {
                    pos,
                    message: panic_message(payload.as_ref()),
                })
            })
            .and_then(|chunk| {
                if chunk.position() == pos {
                    Ok(chunk)
                } else {
                    Err(GenerationError::Failed {
                        pos,
                        reason: format!("generator returned chunk {}", chunk.position()),
                    })
                }
            });
        self.generations.fetch_add(1, Ordering::Relaxed);

        let result = match outcome {
            Ok(chunk) => {
                let resident = Arc::new(ResidentChunk::new(chunk));
                let evicted = {
                    let mut inner = self.inner.lock();
                    inner.slots.insert(pos, Slot::Ready(Arc::clone(&resident)));
                    inner.recency.put(pos, ());
                    inner.enforce_capacity(self.capacity, self.unload_radius, pos)
                };
                self.finish_evictions(evicted);
                debug!(chunk = %pos, "chunk ready");
                Ok(resident)
            }
            Err(err) => {
                let mut inner = self.inner.lock();
                inner.slots.remove(&pos);
                inner.deferred_unloads.remove(&pos);
                drop(inner);
                warn!(chunk = %pos, error = %err, "chunk generation failed");
                Err(err)
            }
        };
        pending.complete(result);
    }

    fn finish_evictions(&self, evicted: Vec<(ChunkPos, Arc<ResidentChunk>)>) -> usize {
        let count = evicted.len();
        for (pos, resident) in evicted {
            resident.mark_evicted();
            debug!(chunk = %pos, "chunk evicted");
        }
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
        count
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

enum Claim {
    Resident(Arc<ResidentChunk>),
    Wait(Arc<PendingChunk>),
    Owner(Arc<PendingChunk>),
}

/// Owning cache of chunks keyed by [`ChunkPos`].
///
/// Cloning is cheap and yields another handle to the same store.
#[derive(Clone)]
pub struct ChunkStore {
    shared: Arc<Shared>,
    pool: Option<Arc<ThreadPool>>,
}

impl ChunkStore {
    /// Create a store. Starts a worker pool unless `worker_threads` is 0.
    pub fn new(
        generator: Arc<dyn ChunkGenerator>,
        settings: StoreSettings,
    ) -> Result<Self, ConfigError> {
        if settings.max_resident_chunks == 0 {
            return Err(ConfigError::NoCapacity);
        }
        let pool = if settings.worker_threads == 0 {
            None
        } else {
            let pool = ThreadPoolBuilder::new()
                .num_threads(settings.worker_threads)
                .thread_name(|index| format!("chunk-gen-{index}"))
                .build()?;
            Some(Arc::new(pool))
        };

        Ok(Self {
            shared: Arc::new(Shared::new(
                generator,
                settings.max_resident_chunks,
                settings.unload_radius,
            )),
            pool,
        })
    }

    /// A store without a worker pool: generation runs on the requesting thread.
    pub fn inline(
        generator: Arc<dyn ChunkGenerator>,
        max_resident_chunks: usize,
    ) -> Result<Self, ConfigError> {
        Self::new(
            generator,
            StoreSettings {
                worker_threads: 0,
                max_resident_chunks,
                ..StoreSettings::default()
            },
        )
    }

    fn claim(&self, pos: ChunkPos) -> Claim {
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;
        match inner.slots.get(&pos) {
            Some(Slot::Ready(resident)) => {
                let resident = Arc::clone(resident);
                inner.recency.promote(&pos);
                Claim::Resident(resident)
            }
            Some(Slot::Generating(pending)) => Claim::Wait(Arc::clone(pending)),
            None => {
                let pending = Arc::new(PendingChunk::default());
                inner.slots.insert(pos, Slot::Generating(Arc::clone(&pending)));
                debug!(chunk = %pos, "chunk generating");
                Claim::Owner(pending)
            }
        }
    }

    /// Start generation of a claimed coordinate. Runs inline when there is no
    /// pool or when already on one of the pool's workers.
    fn dispatch(&self, pos: ChunkPos, pending: Arc<PendingChunk>) {
        match &self.pool {
            Some(pool) if pool.current_thread_index().is_none() => {
                let shared = Arc::clone(&self.shared);
                pool.spawn(move || shared.run_generation(pos, &pending));
            }
            _ => self.shared.run_generation(pos, &pending),
        }
    }

    /// Resolve a chunk, generating it if absent and waiting if generating.
    fn resolve(&self, pos: ChunkPos) -> Result<Arc<ResidentChunk>, GenerationError> {
        match self.claim(pos) {
            Claim::Resident(resident) => Ok(resident),
            Claim::Wait(pending) => pending.wait(),
            Claim::Owner(pending) => {
                self.dispatch(pos, Arc::clone(&pending));
                pending.wait()
            }
        }
    }

    /// Block at a world position. Out-of-world Y reads as air.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Result<BlockType, GenerationError> {
        let Some(local) = LocalPos::from_world(x, y, z) else {
            return Ok(BlockType::Air);
        };
        let resident = self.resolve(ChunkPos::from_block(x, z))?;
        let chunk = resident.data.read();
        Ok(chunk.block(local.x, local.y, local.z))
    }

    /// Edit a block in a READY chunk. Never triggers generation.
    pub fn set_block(&self, x: i32, y: i32, z: i32, block: BlockType) -> SetBlockOutcome {
        let Some(local) = LocalPos::from_world(x, y, z) else {
            return SetBlockOutcome::OutOfBounds;
        };
        let pos = ChunkPos::from_block(x, z);
        let resident = {
            let mut guard = self.shared.inner.lock();
            let inner = &mut *guard;
            match inner.slots.get(&pos) {
                Some(Slot::Ready(resident)) => {
                    let resident = Arc::clone(resident);
                    inner.recency.promote(&pos);
                    resident
                }
                _ => return SetBlockOutcome::NotResident,
            }
        };

        let mut chunk = resident.data.write();
        if resident.evicted.load(Ordering::Acquire) {
            debug!(chunk = %pos, "edit dropped, chunk evicted");
            return SetBlockOutcome::NotResident;
        }
        chunk.set_block(local.x, local.y, local.z, block);
        SetBlockOutcome::Applied
    }

    /// Generate a chunk (or wait for it) and return a copy of its contents.
    pub fn chunk(&self, pos: ChunkPos) -> Result<Chunk, GenerationError> {
        let resident = self.resolve(pos)?;
        let chunk = resident.data.read().clone();
        Ok(chunk)
    }

    /// Schedule generation without waiting. Returns the state seen before
    /// the call; only `Absent` starts new work.
    pub fn request(&self, pos: ChunkPos) -> ChunkState {
        match self.claim(pos) {
            Claim::Resident(_) => ChunkState::Ready,
            Claim::Wait(_) => ChunkState::Generating,
            Claim::Owner(pending) => {
                self.dispatch(pos, pending);
                ChunkState::Absent
            }
        }
    }

    /// Block until `pos` has finished generating, without starting work.
    ///
    /// A generation that already failed has left the slot `Absent`, so this
    /// reports `Absent` rather than the error. Use [`ChunkStore::ensure_ready`]
    /// when the chunk must end up READY.
    pub fn wait_ready(&self, pos: ChunkPos) -> Result<ChunkState, GenerationError> {
        let pending = {
            let inner = self.shared.inner.lock();
            match inner.slots.get(&pos) {
                Some(Slot::Generating(pending)) => Arc::clone(pending),
                Some(Slot::Ready(_)) => return Ok(ChunkState::Ready),
                None => return Ok(ChunkState::Absent),
            }
        };
        pending.wait().map(|_| ChunkState::Ready)
    }

    /// Make `pos` READY, generating or retrying as needed, and report the
    /// generation error if it cannot be produced.
    pub fn ensure_ready(&self, pos: ChunkPos) -> Result<(), GenerationError> {
        self.resolve(pos).map(|_| ())
    }

    /// Schedule every chunk within `radius` of `center`, then wait until all
    /// of them are READY. Returns the number of chunks in the area.
    pub fn load_area(&self, center: ChunkPos, radius: i32) -> Result<usize, GenerationError> {
        let positions = center.square_around(radius);
        for pos in &positions {
            self.request(*pos);
        }
        for pos in &positions {
            self.ensure_ready(*pos)?;
        }
        Ok(positions.len())
    }

    pub fn state(&self, pos: ChunkPos) -> ChunkState {
        match self.shared.inner.lock().slots.get(&pos) {
            None => ChunkState::Absent,
            Some(Slot::Generating(_)) => ChunkState::Generating,
            Some(Slot::Ready(_)) => ChunkState::Ready,
        }
    }

    /// Evict a chunk now, or defer if it is still generating.
    pub fn unload(&self, pos: ChunkPos) -> UnloadOutcome {
        let resident = {
            let mut guard = self.shared.inner.lock();
            let inner = &mut *guard;
            match inner.slots.get(&pos) {
                None => return UnloadOutcome::NotLoaded,
                Some(Slot::Generating(_)) => {
                    inner.deferred_unloads.insert(pos);
                    debug!(chunk = %pos, "unload deferred");
                    return UnloadOutcome::Deferred;
                }
                Some(Slot::Ready(_)) => inner.remove_ready(pos),
            }
        };
        match resident {
            Some(resident) => {
                self.shared.finish_evictions(vec![(pos, resident)]);
                UnloadOutcome::Unloaded
            }
            None => UnloadOutcome::NotLoaded,
        }
    }

    /// Replace the points of interest used by distance-based eviction.
    pub fn set_interest(&self, points: &[ChunkPos]) {
        self.shared.inner.lock().interest = points.to_vec();
    }

    /// Evict READY chunks farther than the unload radius from every point of
    /// interest, plus deferred unloads that have become READY. Generating
    /// chunks are skipped and reconsidered on a later pass. Returns the
    /// number evicted.
    pub fn evict_out_of_range(&self) -> usize {
        let evicted = {
            let mut inner = self.shared.inner.lock();
            let radius = self.shared.unload_radius;
            let victims: Vec<ChunkPos> = inner
                .slots
                .iter()
                .filter(|(_, slot)| matches!(slot, Slot::Ready(_)))
                .map(|(pos, _)| *pos)
                .filter(|pos| inner.deferred_unloads.contains(pos) || inner.out_of_range(*pos, radius))
                .collect();
            victims
                .into_iter()
                .filter_map(|pos| inner.remove_ready(pos).map(|resident| (pos, resident)))
                .collect::<Vec<_>>()
        };
        self.shared.finish_evictions(evicted)
    }

    /// READY chunk positions in sorted order.
    pub fn resident_positions(&self) -> Vec<ChunkPos> {
        let inner = self.shared.inner.lock();
        let mut positions: Vec<ChunkPos> = inner
            .slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Ready(_)))
            .map(|(pos, _)| *pos)
            .collect();
        positions.sort();
        positions
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.shared.inner.lock();
        let generating = inner
            .slots
            .values()
            .filter(|slot| matches!(slot, Slot::Generating(_)))
            .count();
        StoreStats {
            resident: inner.slots.len() - generating,
            generating,
            generations: self.shared.generations.load(Ordering::Relaxed),
            evictions: self.shared.evictions.load(Ordering::Relaxed),
            deferred_unloads: inner.deferred_unloads.len(),
        }
    }
}
