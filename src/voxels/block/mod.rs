//! # Block Module
//!
//! Block typing for the voxel world: the block palette, face definitions, and
//! the static lookup tables shared by the mesher and by tooling.

pub mod block_type;
pub mod face;

pub use block_type::BlockType;
pub use face::BlockFace;

/// The underlying integer type used to store block types in chunk arrays and
/// persisted blobs.
pub type BlockId = u8;

/// Compile-time map from block names to raw block ids.
///
/// Used by configuration palettes and tooling that refer to blocks by name
/// (for example a generator config naming its surface block).
pub static BLOCK_IDS_BY_NAME: phf::Map<&'static str, BlockId> = phf::phf_map! {
    "air" => 0,
    "stone" => 1,
    "dirt" => 2,
    "grass" => 3,
    "sand" => 4,
    "water" => 5,
    "glass" => 6,
    "wood" => 7,
};

/// Looks a block type up by its lowercase name.
pub fn block_by_name(name: &str) -> Option<BlockType> {
    BLOCK_IDS_BY_NAME
        .get(name)
        .and_then(|id| BlockType::from_id(*id))
}

/// Maps each block type to its texture-tile index for each face.
///
/// The outer array is indexed by `BlockType as usize`, the inner array by
/// `BlockFace::index()` in the order [West, East, Bottom, Top, South, North].
/// Tile indices address the texture atlas grid; the atlas itself is owned by
/// the renderer.
pub static BLOCK_FACE_TILES: [[u16; 6]; 8] = [
    [0, 0, 0, 0, 0, 0], // AIR (never meshed)
    [1, 1, 1, 1, 1, 1], // STONE
    [2, 2, 2, 2, 2, 2], // DIRT
    [3, 3, 2, 4, 3, 3], // GRASS (sides grassy-dirt, bottom dirt, top grass)
    [5, 5, 5, 5, 5, 5], // SAND
    [6, 6, 6, 6, 6, 6], // WATER
    [7, 7, 7, 7, 7, 7], // GLASS
    [8, 8, 9, 9, 8, 8], // WOOD (bark sides, ring ends)
];
