//! Procedural voxel world: noise, terrain generation, chunk storage and
//! block picking.

mod biome;
mod chunk;
mod config;
mod heightmap;
mod noise;
mod raycast;
mod store;
mod terrain;
mod trees;
mod world;

pub use biome::*;
pub use chunk::*;
pub use config::*;
pub use heightmap::*;
pub use self::noise::*;
pub use raycast::*;
pub use store::*;
pub use terrain::*;
pub use trees::*;
pub use world::*;
