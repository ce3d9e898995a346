//! Block catalog.
//!
//! The catalog is an explicitly constructed table of per-block properties.
//! A world owns one and hands it out by reference; nothing reaches it through
//! global state. Names may be written either bare (`stone`) or namespaced
//! (`stratavox:stone`).

use crate::BlockType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Namespace accepted in front of block names.
pub const DEFAULT_NAMESPACE: &str = "stratavox";

/// Error returned when a block name cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Blank input.
    #[error("block name cannot be empty")]
    Empty,
    /// A namespace other than [`DEFAULT_NAMESPACE`].
    #[error("unknown namespace `{0}` (expected `{DEFAULT_NAMESPACE}`)")]
    UnknownNamespace(String),
    /// No block carries this name.
    #[error("unknown block `{0}`")]
    UnknownBlock(String),
}

/// Static properties of one block type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockProperties {
    /// The tag these properties describe.
    pub block: BlockType,
    /// Human readable name.
    pub display_name: String,
    /// Seconds to break by hand; `None` means unbreakable.
    pub hardness: Option<f32>,
    /// Whether rays and collision stop at this block.
    pub solid: bool,
    /// Whether light and vision are blocked.
    pub opaque: bool,
}

/// Lookup table from [`BlockType`] to its [`BlockProperties`].
#[derive(Debug, Clone)]
pub struct BlockCatalog {
    entries: Vec<BlockProperties>,
    by_name: BTreeMap<&'static str, BlockType>,
}

impl BlockCatalog {
    /// The built-in table covering every [`BlockType`].
    pub fn standard() -> Self {
        let entries = BlockType::ALL
            .iter()
            .map(|&block| {
                let (display_name, hardness, opaque) = match block {
                    BlockType::Air => ("Air", Some(0.0), false),
                    BlockType::Stone => ("Stone", Some(2.5), true),
                    BlockType::Dirt => ("Dirt", Some(0.6), true),
                    BlockType::Grass => ("Grass", Some(0.6), true),
                    BlockType::Sand => ("Sand", Some(0.5), true),
                    BlockType::Gravel => ("Gravel", Some(0.8), true),
                    BlockType::Snow => ("Snow", Some(0.2), true),
                    BlockType::Bedrock => ("Bedrock", None, true),
                    BlockType::CoalOre => ("Coal Ore", Some(3.0), true),
                    BlockType::IronOre => ("Iron Ore", Some(4.0), true),
                    BlockType::Wood => ("Wood", Some(1.5), true),
                    BlockType::Leaves => ("Leaves", Some(0.2), false),
                    BlockType::Planks => ("Planks", Some(1.2), true),
                    BlockType::Water => ("Water", None, false),
                };
                BlockProperties {
                    block,
                    display_name: display_name.to_string(),
                    hardness,
                    solid: block.is_solid(),
                    opaque,
                }
            })
            .collect();

        let by_name = BlockType::ALL
            .iter()
            .map(|&block| (block.as_str(), block))
            .collect();

        Self { entries, by_name }
    }

    /// Properties for a block type.
    pub fn get(&self, block: BlockType) -> &BlockProperties {
        // `entries` is built from `BlockType::ALL`, which is indexed by id.
        &self.entries[block.id() as usize]
    }

    /// Resolve a bare or namespaced name to a block type.
    pub fn resolve(&self, name: &str) -> Result<BlockType, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::Empty);
        }
        let path = match name.split_once(':') {
            Some((ns, path)) if ns == DEFAULT_NAMESPACE => path,
            Some((ns, _)) => return Err(CatalogError::UnknownNamespace(ns.to_string())),
            None => name,
        };
        self.by_name
            .get(path)
            .copied()
            .ok_or_else(|| CatalogError::UnknownBlock(path.to_string()))
    }

    /// Iterate over every entry in id order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockProperties> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for BlockCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_covers_every_block() {
        let catalog = BlockCatalog::standard();
        assert_eq!(catalog.len(), BlockType::ALL.len());
        for block in BlockType::ALL {
            assert_eq!(catalog.get(block).block, block);
        }
    }

    #[test]
    fn resolves_bare_and_namespaced_names() {
        let catalog = BlockCatalog::standard();
        assert_eq!(catalog.resolve("stone"), Ok(BlockType::Stone));
        assert_eq!(catalog.resolve("stratavox:coal_ore"), Ok(BlockType::CoalOre));
        assert_eq!(catalog.resolve("  dirt "), Ok(BlockType::Dirt));
    }

    #[test]
    fn rejects_unknown_names() {
        let catalog = BlockCatalog::standard();
        assert_eq!(catalog.resolve(""), Err(CatalogError::Empty));
        assert_eq!(
            catalog.resolve("mdm:stone"),
            Err(CatalogError::UnknownNamespace("mdm".into()))
        );
        assert_eq!(
            catalog.resolve("obsidian"),
            Err(CatalogError::UnknownBlock("obsidian".into()))
        );
    }

    #[test]
    fn bedrock_is_unbreakable() {
        let catalog = BlockCatalog::standard();
        assert_eq!(catalog.get(BlockType::Bedrock).hardness, None);
        assert!(catalog.get(BlockType::Stone).hardness.is_some());
    }

    #[test]
    fn solid_flag_follows_block_predicate() {
        let catalog = BlockCatalog::standard();
        for entry in catalog.iter() {
            assert_eq!(entry.solid, entry.block.is_solid(), "{}", entry.block);
        }
        assert!(!catalog.get(BlockType::Water).solid);
        assert!(catalog.get(BlockType::Leaves).solid);
    }
}
