//! # Block Type Module
//!
//! Defines the block palette of the voxel world and the classification rules
//! (opaque / transparent / liquid) the mesher routes geometry by.

use num_derive::FromPrimitive;

use super::BlockId;

/// Enumerates all block types the pipeline knows about.
///
/// The `FromPrimitive` derive gives us the conversion from the raw block-type
/// bytes stored in chunk arrays and persisted blobs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockType {
    /// Air, the absence of a block. Non-solid, never meshed.
    AIR,

    /// Plain stone, the bulk of the underground.
    STONE,

    /// Dirt, found under grass surfaces.
    DIRT,

    /// A grass block; grassy on top, dirt below.
    GRASS,

    /// Sand, the shoreline surface block.
    SAND,

    /// Water. Liquid, rendered in its own vertex list.
    WATER,

    /// Glass. Solid but see-through, rendered in the transparent list.
    GLASS,

    /// Wood, a building block.
    WOOD,
}

impl BlockType {
    /// Converts a raw block-type byte to a `BlockType`.
    ///
    /// Returns `None` for bytes outside the palette, which protects the
    /// pipeline from corrupt persisted chunk blobs.
    pub fn from_id(id: BlockId) -> Option<Self> {
        num::FromPrimitive::from_u8(id)
    }

    /// The raw byte stored in chunk arrays for this block type.
    pub fn id(self) -> BlockId {
        self as BlockId
    }

    /// Whether this is the air block.
    pub fn is_air(self) -> bool {
        self == BlockType::AIR
    }

    /// Whether this block is a liquid.
    pub fn is_liquid(self) -> bool {
        self == BlockType::WATER
    }

    /// Whether light passes through this block.
    pub fn is_transparent(self) -> bool {
        matches!(self, BlockType::AIR | BlockType::WATER | BlockType::GLASS)
    }

    /// Whether this block fully hides the faces of its neighbors.
    pub fn is_opaque(self) -> bool {
        !self.is_transparent()
    }

    /// Picks a random non-air block type, for randomized test chunks.
    pub fn random_non_air() -> Self {
        let last = BlockType::WOOD.id();
        num::FromPrimitive::from_u8(fastrand::u8(1..=last)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_byte_round_trip() {
        for block in [
            BlockType::AIR,
            BlockType::STONE,
            BlockType::WATER,
            BlockType::WOOD,
        ] {
            assert_eq!(BlockType::from_id(block.id()), Some(block));
        }
        assert_eq!(BlockType::from_id(250), None);
    }

    #[test]
    fn classification_is_consistent() {
        assert!(BlockType::WATER.is_liquid());
        assert!(BlockType::WATER.is_transparent());
        assert!(BlockType::GLASS.is_transparent());
        assert!(!BlockType::GLASS.is_liquid());
        assert!(BlockType::STONE.is_opaque());
        assert!(!BlockType::AIR.is_opaque());
    }

    #[test]
    fn random_non_air_never_returns_air() {
        for _ in 0..64 {
            assert!(!BlockType::random_non_air().is_air());
        }
    }
}
