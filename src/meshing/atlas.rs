//! Texture-atlas mapping for mesh builds.
//!
//! The atlas image itself belongs to the renderer; the pipeline only needs to
//! know the grid layout so mesh builders can emit UV coordinates, and which
//! tile each block face uses (the static table in the block module).

use crate::voxels::block::{BlockFace, BlockType, BLOCK_FACE_TILES};

/// The UV grid of the block texture atlas.
#[derive(Debug, Clone, Copy)]
pub struct TextureAtlas {
    tiles_per_row: u32,
}

impl TextureAtlas {
    /// Creates an atlas description for a square grid of `tiles_per_row`².
    ///
    /// # Panics
    /// Panics if `tiles_per_row` is zero.
    pub fn new(tiles_per_row: u32) -> Self {
        assert!(tiles_per_row > 0, "atlas must have at least one tile");
        TextureAtlas { tiles_per_row }
    }

    /// The atlas tile used by `face` of `block`.
    pub fn tile_for(&self, block: BlockType, face: BlockFace) -> u16 {
        BLOCK_FACE_TILES[block as usize][face.index()]
    }

    /// The UV rectangle `[u0, v0, u1, v1]` of a tile, in normalized atlas
    /// coordinates.
    pub fn uv_rect(&self, tile: u16) -> [f32; 4] {
        let tile_size = 1.0 / self.tiles_per_row as f32;
        let column = (tile as u32 % self.tiles_per_row) as f32;
        let row = (tile as u32 / self.tiles_per_row) as f32;
        [
            column * tile_size,
            row * tile_size,
            (column + 1.0) * tile_size,
            (row + 1.0) * tile_size,
        ]
    }
}

impl Default for TextureAtlas {
    /// A 4×4 grid, enough for the built-in block palette.
    fn default() -> Self {
        TextureAtlas::new(4)
    }
}
