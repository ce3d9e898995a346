//! Block picking: voxel raycasting using DDA (Amanatides–Woo traversal).
//!
//! The ray visits every block it passes through in order and stops at the
//! first solid one. When the ray crosses an edge or corner exactly, the axis
//! stepped is chosen in x, y, z priority, so the reported face is stable.

use std::sync::Arc;

use glam::{DVec3, IVec3};
use stratavox_core::{BlockFace, BlockType};
use thiserror::Error;

use crate::chunk::{y_in_world, WORLD_MAX_Y, WORLD_MIN_Y};
use crate::config::DEFAULT_PICK_DISTANCE;
use crate::store::ChunkStore;
use crate::terrain::GenerationError;

/// Read access to blocks by world position.
pub trait BlockSource {
    fn block_at(&self, pos: IVec3) -> Result<BlockType, GenerationError>;
}

impl BlockSource for ChunkStore {
    fn block_at(&self, pos: IVec3) -> Result<BlockType, GenerationError> {
        self.get_block(pos.x, pos.y, pos.z)
    }
}

impl<T: BlockSource + ?Sized> BlockSource for &T {
    fn block_at(&self, pos: IVec3) -> Result<BlockType, GenerationError> {
        (**self).block_at(pos)
    }
}

impl<T: BlockSource + ?Sized> BlockSource for Arc<T> {
    fn block_at(&self, pos: IVec3) -> Result<BlockType, GenerationError> {
        (**self).block_at(pos)
    }
}

/// Caller errors and world failures while picking. A miss is `Ok(None)`.
#[derive(Debug, Error)]
pub enum PickError {
    #[error("ray direction must be non-zero and finite")]
    ZeroDirection,
    #[error("ray origin must be finite")]
    NonFiniteOrigin,
    /// The origin lies outside the `i32` block grid.
    #[error("ray origin {0} lies outside the block grid")]
    OriginOutOfRange(DVec3),
    #[error("max distance must be positive and finite (got {0})")]
    InvalidMaxDistance(f64),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Result of a successful pick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickResult {
    /// The position of the block that was hit (in block coordinates).
    pub block: IVec3,
    /// Face the ray entered through; `None` when the origin is inside the block.
    pub face: Option<BlockFace>,
    /// Distance from the origin to the entry point.
    pub distance: f64,
}

impl PickResult {
    /// Where a block placed against the struck face would go.
    pub fn adjacent(&self) -> Option<IVec3> {
        self.face.map(|face| {
            let (dx, dy, dz) = face.normal();
            self.block + IVec3::new(dx, dy, dz)
        })
    }
}

/// Block containing `point`, if every coordinate fits the `i32` grid.
fn containing_block(point: DVec3) -> Option<IVec3> {
    let floor = point.floor();
    let fits = |v: f64| (i32::MIN as f64..=i32::MAX as f64).contains(&v);
    (fits(floor.x) && fits(floor.y) && fits(floor.z)).then_some(floor.as_ivec3())
}

/// Trace a ray through the block grid.
///
/// `direction` need not be normalised. Returns the first solid block whose
/// entry distance is at most `max_distance`.
pub fn cast_ray<S: BlockSource + ?Sized>(
    source: &S,
    origin: DVec3,
    direction: DVec3,
    max_distance: f64,
) -> Result<Option<PickResult>, PickError> {
    if !origin.is_finite() {
        return Err(PickError::NonFiniteOrigin);
    }
    let length = direction.length();
    if !(length.is_finite() && length > 0.0) {
        return Err(PickError::ZeroDirection);
    }
    if !(max_distance.is_finite() && max_distance > 0.0) {
        return Err(PickError::InvalidMaxDistance(max_distance));
    }
    let direction = direction / length;

    let Some(mut block) = containing_block(origin) else {
        return Err(PickError::OriginOutOfRange(origin));
    };
    if source.block_at(block)?.is_solid() {
        return Ok(Some(PickResult {
            block,
            face: None,
            distance: 0.0,
        }));
    }

    let mut step = IVec3::ZERO;
    let mut t_max = DVec3::splat(f64::INFINITY);
    let mut t_delta = DVec3::splat(f64::INFINITY);
    for axis in 0..3 {
        let d = direction[axis];
        if d > 0.0 {
            step[axis] = 1;
            t_delta[axis] = 1.0 / d;
            t_max[axis] = (block[axis] as f64 + 1.0 - origin[axis]) / d;
        } else if d < 0.0 {
            step[axis] = -1;
            t_delta[axis] = -1.0 / d;
            t_max[axis] = (block[axis] as f64 - origin[axis]) / d;
        }
    }

    loop {
        let axis = if t_max.x <= t_max.y && t_max.x <= t_max.z {
            0
        } else if t_max.y <= t_max.z {
            1
        } else {
            2
        };
        let distance = t_max[axis];
        if distance > max_distance {
            return Ok(None);
        }

        // The grid ends at the i32 limits; nothing lies beyond them.
        let Some(next) = block[axis].checked_add(step[axis]) else {
            return Ok(None);
        };
        block[axis] = next;
        t_max[axis] += t_delta[axis];

        // Outside the world height and not heading back: only air remains.
        let heading_back =
            (block.y < WORLD_MIN_Y && step.y > 0) || (block.y >= WORLD_MAX_Y && step.y < 0);
        if !y_in_world(block.y) && !heading_back {
            return Ok(None);
        }

        if source.block_at(block)?.is_solid() {
            return Ok(Some(PickResult {
                block,
                face: Some(BlockFace::entered_by_step(axis, step[axis])),
                distance,
            }));
        }
    }
}

/// Stateful picker driven by player interaction code.
pub struct VoxelRaycaster<S> {
    source: S,
    origin: DVec3,
    direction: DVec3,
    max_distance: f64,
}

impl<S: BlockSource> VoxelRaycaster<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            origin: DVec3::ZERO,
            direction: DVec3::NEG_Z,
            max_distance: DEFAULT_PICK_DISTANCE,
        }
    }

    pub fn update_origin(&mut self, origin: DVec3) {
        self.origin = origin;
    }

    /// Any non-zero vector; a zero vector is reported by [`Self::pick_block`].
    pub fn update_direction(&mut self, direction: DVec3) {
        self.direction = direction;
    }

    pub fn set_max_distance(&mut self, max_distance: f64) -> Result<(), PickError> {
        if !(max_distance.is_finite() && max_distance > 0.0) {
            return Err(PickError::InvalidMaxDistance(max_distance));
        }
        self.max_distance = max_distance;
        Ok(())
    }

    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    pub fn direction(&self) -> DVec3 {
        self.direction
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// First solid block along the current ray, if any.
    pub fn pick_block(&self) -> Result<Option<PickResult>, PickError> {
        cast_ray(&self.source, self.origin, self.direction, self.max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashSet;

    #[derive(Default)]
    struct Blocks(HashSet<IVec3>);

    impl Blocks {
        fn with(positions: impl IntoIterator<Item = IVec3>) -> Self {
            Self(positions.into_iter().collect())
        }
    }

    impl BlockSource for Blocks {
        fn block_at(&self, pos: IVec3) -> Result<BlockType, GenerationError> {
            Ok(if self.0.contains(&pos) {
                BlockType::Stone
            } else {
                BlockType::Air
            })
        }
    }

    /// Empty world that counts lookups.
    #[derive(Default)]
    struct Counting(Cell<usize>);

    impl BlockSource for Counting {
        fn block_at(&self, _pos: IVec3) -> Result<BlockType, GenerationError> {
            self.0.set(self.0.get() + 1);
            Ok(BlockType::Air)
        }
    }

    fn aimed(blocks: Blocks, origin: DVec3, direction: DVec3) -> VoxelRaycaster<Blocks> {
        let mut picker = VoxelRaycaster::new(blocks);
        picker.update_origin(origin);
        picker.update_direction(direction);
        picker
    }

    #[test]
    fn ray_along_negative_z_hits_south_face() {
        let picker = aimed(
            Blocks::with([IVec3::new(0, 64, 0)]),
            DVec3::new(0.5, 64.5, 5.0),
            DVec3::new(0.0, 0.0, -1.0),
        );
        let hit = picker.pick_block().unwrap().unwrap();
        assert_eq!(hit.block, IVec3::new(0, 64, 0));
        assert_eq!(hit.face, Some(BlockFace::South));
        assert!(hit.distance > 0.0);
        assert!((hit.distance - 4.0).abs() < 1e-9);
        assert_eq!(hit.adjacent(), Some(IVec3::new(0, 64, 1)));
    }

    #[test]
    fn ray_along_positive_x_hits_west_face() {
        let picker = aimed(
            Blocks::with([IVec3::new(0, 64, 0)]),
            DVec3::new(-1.0, 64.5, 0.5),
            DVec3::new(1.0, 0.0, 0.0),
        );
        let hit = picker.pick_block().unwrap().unwrap();
        assert_eq!(hit.block, IVec3::new(0, 64, 0));
        assert_eq!(hit.face, Some(BlockFace::West));
        assert_eq!(hit.adjacent(), Some(IVec3::new(-1, 64, 0)));
    }

    #[test]
    fn every_axis_reports_the_entered_face() {
        let target = IVec3::new(0, 64, 0);
        let center = DVec3::new(0.5, 64.5, 0.5);
        let cases = [
            (DVec3::X, BlockFace::West),
            (DVec3::NEG_X, BlockFace::East),
            (DVec3::Y, BlockFace::Down),
            (DVec3::NEG_Y, BlockFace::Up),
            (DVec3::Z, BlockFace::North),
            (DVec3::NEG_Z, BlockFace::South),
        ];
        for (direction, face) in cases {
            let picker = aimed(Blocks::with([target]), center - direction * 3.0, direction);
            let hit = picker.pick_block().unwrap().unwrap();
            assert_eq!(hit.block, target);
            assert_eq!(hit.face, Some(face), "direction {direction}");
        }
    }

    #[test]
    fn cluster_reports_outermost_block() {
        let mut cluster = Vec::new();
        for x in 0..3 {
            for y in 64..67 {
                for z in 0..3 {
                    cluster.push(IVec3::new(x, y, z));
                }
            }
        }
        let picker = aimed(
            Blocks::with(cluster),
            DVec3::new(-1.5, 65.5, 1.5),
            DVec3::new(1.0, 0.0, 0.0),
        );
        let hit = picker.pick_block().unwrap().unwrap();
        assert_eq!(hit.block, IVec3::new(0, 65, 1));
        assert_eq!(hit.face, Some(BlockFace::West));
    }

    #[test]
    fn empty_world_misses() {
        for direction in [DVec3::X, DVec3::new(1.0, -1.0, 0.3), DVec3::new(-0.2, 0.9, -1.0)] {
            let picker = aimed(Blocks::default(), DVec3::new(0.5, 64.5, 0.5), direction);
            assert_eq!(picker.pick_block().unwrap(), None);
        }
    }

    #[test]
    fn max_distance_is_enforced_both_ways() {
        // Entry face of x=5 is 4.5 blocks from the origin.
        let mut picker = aimed(
            Blocks::with([IVec3::new(5, 64, 0)]),
            DVec3::new(0.5, 64.5, 0.5),
            DVec3::X,
        );
        picker.set_max_distance(4.6).unwrap();
        let hit = picker.pick_block().unwrap().unwrap();
        assert!((hit.distance - 4.5).abs() < 1e-9);

        picker.set_max_distance(4.4).unwrap();
        assert_eq!(picker.pick_block().unwrap(), None);
    }

    #[test]
    fn default_max_distance_applies() {
        let picker = aimed(
            Blocks::with([IVec3::new(7, 64, 0)]),
            DVec3::new(0.5, 64.5, 0.5),
            DVec3::X,
        );
        assert_eq!(picker.max_distance(), DEFAULT_PICK_DISTANCE);
        assert_eq!(picker.pick_block().unwrap(), None);
    }

    #[test]
    fn direction_is_normalized_internally() {
        let blocks = [IVec3::new(0, 64, 0)];
        let unit = aimed(Blocks::with(blocks), DVec3::new(0.5, 64.5, 4.5), DVec3::NEG_Z);
        let long = aimed(
            Blocks::with(blocks),
            DVec3::new(0.5, 64.5, 4.5),
            DVec3::new(0.0, 0.0, -25.0),
        );
        assert_eq!(unit.pick_block().unwrap(), long.pick_block().unwrap());
    }

    #[test]
    fn corner_ties_prefer_x_then_y() {
        // Diagonal through the (1, 65) edge: x and y tie at t = sqrt(2)/2.
        let target = IVec3::new(1, 65, 0);
        let picker = aimed(
            Blocks::with([target, IVec3::new(1, 64, 0), IVec3::new(0, 65, 0)]),
            DVec3::new(0.5, 64.5, 0.5),
            DVec3::new(1.0, 1.0, 0.0),
        );
        let hit = picker.pick_block().unwrap().unwrap();
        // x steps first, so the block at x+1 is entered through its west face.
        assert_eq!(hit.block, IVec3::new(1, 64, 0));
        assert_eq!(hit.face, Some(BlockFace::West));

        // With only the diagonal target, y steps next and enters from below.
        let picker = aimed(
            Blocks::with([target]),
            DVec3::new(0.5, 64.5, 0.5),
            DVec3::new(1.0, 1.0, 0.0),
        );
        let hit = picker.pick_block().unwrap().unwrap();
        assert_eq!(hit.block, target);
        assert_eq!(hit.face, Some(BlockFace::Down));
    }

    #[test]
    fn origin_inside_solid_block_hits_without_face() {
        let picker = aimed(
            Blocks::with([IVec3::new(0, 64, 0)]),
            DVec3::new(0.5, 64.5, 0.5),
            DVec3::X,
        );
        let hit = picker.pick_block().unwrap().unwrap();
        assert_eq!(hit.block, IVec3::new(0, 64, 0));
        assert_eq!(hit.face, None);
        assert_eq!(hit.distance, 0.0);
        assert_eq!(hit.adjacent(), None);
    }

    #[test]
    fn zero_direction_is_a_caller_error() {
        let picker = aimed(Blocks::default(), DVec3::ZERO, DVec3::ZERO);
        assert!(matches!(picker.pick_block(), Err(PickError::ZeroDirection)));

        let picker = aimed(Blocks::default(), DVec3::ZERO, DVec3::new(f64::NAN, 0.0, 1.0));
        assert!(matches!(picker.pick_block(), Err(PickError::ZeroDirection)));
    }

    #[test]
    fn invalid_max_distance_is_rejected() {
        let mut picker = VoxelRaycaster::new(Blocks::default());
        assert!(matches!(
            picker.set_max_distance(0.0),
            Err(PickError::InvalidMaxDistance(_))
        ));
        assert!(picker.set_max_distance(-1.0).is_err());
        assert!(picker.set_max_distance(f64::INFINITY).is_err());
        assert_eq!(picker.max_distance(), DEFAULT_PICK_DISTANCE);
    }

    #[test]
    fn leaving_world_height_stops_early() {
        let source = Counting::default();
        let hit = cast_ray(&source, DVec3::new(0.5, 255.5, 0.5), DVec3::Y, 1000.0).unwrap();
        assert_eq!(hit, None);
        // Only the origin block is read.
        assert_eq!(source.0.get(), 1);

        let source = Counting::default();
        let hit = cast_ray(&source, DVec3::new(0.5, 300.5, 0.5), DVec3::NEG_Y, 1000.0).unwrap();
        assert_eq!(hit, None);
        // Descends through the whole column before leaving below y = 0.
        assert_eq!(source.0.get(), 301);
    }

    #[test]
    fn ray_stops_at_the_edge_of_the_grid() {
        let edge = i32::MAX as f64 + 0.5;
        let hit = cast_ray(&Blocks::default(), DVec3::new(edge, 64.5, 0.5), DVec3::X, 5.0).unwrap();
        assert_eq!(hit, None);

        let low = i32::MIN as f64 + 0.5;
        let hit = cast_ray(&Blocks::default(), DVec3::new(0.5, 64.5, low), DVec3::NEG_Z, 5.0).unwrap();
        assert_eq!(hit, None);

        // Blocks right at the edge are still reachable.
        let target = IVec3::new(i32::MAX, 64, 0);
        let origin = DVec3::new(i32::MAX as f64 - 2.5, 64.5, 0.5);
        let hit = cast_ray(&Blocks::with([target]), origin, DVec3::X, 5.0).unwrap().unwrap();
        assert_eq!(hit.block, target);
        assert_eq!(hit.face, Some(BlockFace::West));
    }

    #[test]
    fn origin_outside_the_grid_is_rejected() {
        for origin in [
            DVec3::new(1.0e12, 64.5, 0.5),
            DVec3::new(0.5, 64.5, i32::MIN as f64 - 1.0),
            DVec3::new(0.5, -1.0e10, 0.5),
        ] {
            let result = cast_ray(&Blocks::default(), origin, DVec3::X, 5.0);
            assert!(
                matches!(result, Err(PickError::OriginOutOfRange(_))),
                "origin {origin} gave {result:?}"
            );
        }
    }

    #[test]
    fn generation_errors_propagate() {
        struct Failing;
        impl BlockSource for Failing {
            fn block_at(&self, pos: IVec3) -> Result<BlockType, GenerationError> {
                Err(GenerationError::Failed {
                    pos: crate::chunk::ChunkPos::from_block(pos.x, pos.z),
                    reason: "offline".into(),
                })
            }
        }
        let err = cast_ray(&Failing, DVec3::ZERO, DVec3::X, 5.0).unwrap_err();
        assert!(matches!(err, PickError::Generation(_)));
    }
}
