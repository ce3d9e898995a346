#![warn(missing_docs)]
//! Core primitives shared across the workspace.

mod block;
mod catalog;
mod face;

pub use block::BlockType;
pub use catalog::{BlockCatalog, BlockProperties, CatalogError, DEFAULT_NAMESPACE};
pub use face::BlockFace;

/// Seed shared by everything generated for one world.
pub type WorldSeed = u64;

/// SplitMix64 finalizer: a bijective avalanche mix of a 64-bit value.
#[inline]
pub const fn mix_seed(value: u64) -> u64 {
    let mut z = value.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Derive an uncorrelated sub-seed from a parent seed and a stream index.
///
/// Neighbouring `stream` values map to unrelated outputs, so sub-seeds for
/// octave 0, 1, 2... of the same parent do not share structure.
#[inline]
pub const fn derive_seed(parent: WorldSeed, stream: u64) -> u64 {
    mix_seed(parent ^ mix_seed(stream))
}
