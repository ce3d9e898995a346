use std::fmt;

use stratavox_core::BlockType;

/// Chunk width (X axis) in voxels.
pub const CHUNK_SIZE_X: usize = 16;
/// Chunk height (Y axis) in voxels; a chunk spans the whole world height.
pub const CHUNK_SIZE_Y: usize = 256;
/// Chunk depth (Z axis) in voxels.
pub const CHUNK_SIZE_Z: usize = 16;
/// Total voxel count per chunk.
pub const CHUNK_VOLUME: usize = CHUNK_SIZE_X * CHUNK_SIZE_Y * CHUNK_SIZE_Z;

/// Lowest valid world Y coordinate.
pub const WORLD_MIN_Y: i32 = 0;
/// One past the highest valid world Y coordinate.
pub const WORLD_MAX_Y: i32 = CHUNK_SIZE_Y as i32;

/// Whether a world Y coordinate lies inside the world height range.
#[inline]
pub fn y_in_world(y: i32) -> bool {
    (WORLD_MIN_Y..WORLD_MAX_Y).contains(&y)
}

/// Chunk-local position (X, Y, Z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalPos {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl LocalPos {
    /// Convert to a linear index into the block grid.
    pub fn index(self) -> usize {
        debug_assert!(self.x < CHUNK_SIZE_X);
        debug_assert!(self.y < CHUNK_SIZE_Y);
        debug_assert!(self.z < CHUNK_SIZE_Z);
        (self.y * CHUNK_SIZE_Z + self.z) * CHUNK_SIZE_X + self.x
    }

    /// Local position of a world block, or `None` when `y` is outside the world.
    pub fn from_world(x: i32, y: i32, z: i32) -> Option<Self> {
        if !y_in_world(y) {
            return None;
        }
        Some(Self {
            x: x.rem_euclid(CHUNK_SIZE_X as i32) as usize,
            y: (y - WORLD_MIN_Y) as usize,
            z: z.rem_euclid(CHUNK_SIZE_Z as i32) as usize,
        })
    }
}

/// Chunk coordinate (X,Z) in chunk space.
/// Implements Ord for deterministic iteration in BTreeMap/BTreeSet (sorts by x, then z).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk owning the world block column `(x, z)` (floor division).
    pub fn from_block(x: i32, z: i32) -> Self {
        Self {
            x: x.div_euclid(CHUNK_SIZE_X as i32),
            z: z.div_euclid(CHUNK_SIZE_Z as i32),
        }
    }

    /// Chunk owning a world-space point.
    pub fn from_world_point(x: f64, z: f64) -> Self {
        Self::from_block(x.floor() as i32, z.floor() as i32)
    }

    /// World coordinates of the chunk's minimum corner column.
    pub fn origin(self) -> (i32, i32) {
        (
            self.x * CHUNK_SIZE_X as i32,
            self.z * CHUNK_SIZE_Z as i32,
        )
    }

    /// Chessboard distance in chunks.
    pub fn chebyshev_distance(self, other: ChunkPos) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }

    /// All chunk positions within `radius` (square), sorted by distance then position.
    pub fn square_around(self, radius: i32) -> Vec<ChunkPos> {
        let radius = radius.max(0);
        let mut positions: Vec<ChunkPos> = (-radius..=radius)
            .flat_map(|dz| (-radius..=radius).map(move |dx| (dx, dz)))
            .map(|(dx, dz)| ChunkPos::new(self.x + dx, self.z + dz))
            .collect();
        positions.sort_by_key(|pos| (self.chebyshev_distance(*pos), *pos));
        positions
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Lifecycle state of a chunk coordinate inside the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Nothing resident; the next request starts generation.
    Absent,
    /// Generation in flight; requesters wait for it.
    Generating,
    /// Resident and readable/writable.
    Ready,
}

/// Dense block grid for one chunk column.
#[derive(Clone, PartialEq, Eq)]
pub struct Chunk {
    position: ChunkPos,
    blocks: Vec<BlockType>,
    revision: u64,
}

impl Chunk {
    /// Allocate a fresh chunk filled with air.
    pub fn new(position: ChunkPos) -> Self {
        Self {
            position,
            blocks: vec![BlockType::Air; CHUNK_VOLUME],
            revision: 0,
        }
    }

    #[inline]
    pub fn position(&self) -> ChunkPos {
        self.position
    }

    fn index(x: usize, y: usize, z: usize) -> usize {
        LocalPos { x, y, z }.index()
    }

    /// Block at a local position.
    pub fn block(&self, x: usize, y: usize, z: usize) -> BlockType {
        self.blocks[Self::index(x, y, z)]
    }

    /// Replace a block; returns true when the stored value changed.
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block: BlockType) -> bool {
        let idx = Self::index(x, y, z);
        if self.blocks[idx] != block {
            self.blocks[idx] = block;
            self.revision += 1;
            true
        } else {
            false
        }
    }

    /// Fill the local Y range `[y_start, y_end)` of one column.
    pub fn fill_column(&mut self, x: usize, z: usize, y_start: usize, y_end: usize, block: BlockType) {
        for y in y_start..y_end.min(CHUNK_SIZE_Y) {
            self.set_block(x, y, z, block);
        }
    }

    /// Number of in-place edits applied since allocation.
    ///
    /// Mesh builders compare revisions to decide whether a rebuild is needed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Borrow the raw grid in `(y, z, x)` order.
    pub fn blocks(&self) -> &[BlockType] {
        &self.blocks
    }

    /// Highest solid block in a column, if any.
    pub fn top_solid_y(&self, x: usize, z: usize) -> Option<usize> {
        (0..CHUNK_SIZE_Y).rev().find(|&y| self.block(x, y, z).is_solid())
    }

    /// Count blocks of one type (used by generation diagnostics and tests).
    pub fn count(&self, block: BlockType) -> usize {
        self.blocks.iter().filter(|b| **b == block).count()
    }

    /// Whether two chunks hold identical block grids, ignoring edit history.
    pub fn same_blocks(&self, other: &Chunk) -> bool {
        self.position == other.position && self.blocks == other.blocks
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("position", &self.position)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}
