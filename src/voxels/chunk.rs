//! # Chunk Data Module
//!
//! The authoritative voxel payload for one chunk: a flat array of block-type
//! bytes with a bit mask of occluding blocks maintained in lockstep, plus the
//! dirty flag and edit-version counter the rest of the pipeline keys its
//! correctness on.
//!
//! ## Versioning
//!
//! `version` increments exactly once per accepted edit (and once per full
//! regeneration). Mesh jobs capture the version when they are scheduled; the
//! reconciler discards any finished mesh whose captured version no longer
//! matches. That comparison is the pipeline's entire "cancellation" story.
//!
//! ## Threading
//!
//! Only the main thread mutates a `ChunkData`. Worker threads receive cloned
//! `Shared<ChunkData>` handles and take read locks only.

use bitvec::prelude::BitVec;

use crate::error::GenerationError;

use super::block::BlockType;
use super::coords::ChunkPos;

/// Blocks per chunk along each axis.
pub const CHUNK_DIMENSION: usize = 16;
/// Blocks in one horizontal chunk slice.
pub const CHUNK_AREA: usize = CHUNK_DIMENSION * CHUNK_DIMENSION;
/// Total blocks in a chunk.
pub const CHUNK_VOLUME: usize = CHUNK_AREA * CHUNK_DIMENSION;

/// Flat index of a local block coordinate, row-major x, then z, then y.
#[inline]
pub fn block_index(x: usize, y: usize, z: usize) -> usize {
    x + z * CHUNK_DIMENSION + y * CHUNK_AREA
}

/// The voxel contents of one chunk.
pub struct ChunkData {
    position: ChunkPos,
    blocks: Vec<u8>,
    /// One bit per block, set when the block occludes its neighbors' faces.
    occlusion: BitVec,
    dirty: bool,
    version: u64,
}

impl ChunkData {
    /// Creates an all-air chunk at `position`.
    pub fn empty(position: ChunkPos) -> Self {
        ChunkData {
            position,
            blocks: vec![BlockType::AIR.id(); CHUNK_VOLUME],
            occlusion: BitVec::repeat(false, CHUNK_VOLUME),
            dirty: false,
            version: 0,
        }
    }

    /// Builds a chunk from a generator-produced block buffer.
    ///
    /// Rejects buffers of the wrong length; anything else would silently
    /// corrupt the index arithmetic every reader relies on.
    pub fn from_blocks(position: ChunkPos, blocks: Vec<u8>) -> Result<Self, GenerationError> {
        if blocks.len() != CHUNK_VOLUME {
            return Err(GenerationError::WrongLength {
                got: blocks.len(),
                expected: CHUNK_VOLUME,
            });
        }

        let mut occlusion = BitVec::repeat(false, CHUNK_VOLUME);
        for (index, id) in blocks.iter().enumerate() {
            let occludes = BlockType::from_id(*id).is_some_and(|b| b.is_opaque());
            occlusion.set(index, occludes);
        }

        Ok(ChunkData {
            position,
            blocks,
            occlusion,
            dirty: false,
            version: 0,
        })
    }

    /// The chunk coordinate this data belongs to.
    pub fn position(&self) -> ChunkPos {
        self.position
    }

    /// The block at a local coordinate.
    ///
    /// Unknown bytes (corrupt persisted data) read as air rather than
    /// panicking in the middle of a mesh build.
    pub fn get(&self, x: usize, y: usize, z: usize) -> BlockType {
        BlockType::from_id(self.blocks[block_index(x, y, z)]).unwrap_or(BlockType::AIR)
    }

    /// Whether the block at a local coordinate occludes neighboring faces.
    pub fn occludes(&self, x: usize, y: usize, z: usize) -> bool {
        self.occlusion[block_index(x, y, z)]
    }

    /// Applies a single-voxel edit.
    ///
    /// Returns `false` (and changes nothing) when the coordinate is out of
    /// bounds or the block already has that type. On success the chunk is
    /// marked dirty and the version is bumped exactly once.
    pub fn apply_edit(&mut self, x: usize, y: usize, z: usize, block: BlockType) -> bool {
        if x >= CHUNK_DIMENSION || y >= CHUNK_DIMENSION || z >= CHUNK_DIMENSION {
            return false;
        }

        let index = block_index(x, y, z);
        if self.blocks[index] == block.id() {
            return false;
        }

        self.blocks[index] = block.id();
        self.occlusion.set(index, block.is_opaque());
        self.dirty = true;
        self.version += 1;
        true
    }

    /// Replaces the entire block buffer, as a full regeneration does.
    ///
    /// Counts as one accepted edit: the version is bumped once.
    pub fn replace_blocks(&mut self, blocks: Vec<u8>) -> Result<(), GenerationError> {
        let replacement = ChunkData::from_blocks(self.position, blocks)?;
        self.blocks = replacement.blocks;
        self.occlusion = replacement.occlusion;
        self.dirty = true;
        self.version += 1;
        Ok(())
    }

    /// Marks the chunk as needing a remesh without changing its contents.
    ///
    /// Used for neighbor-triggered dirtying after a border edit next door;
    /// deliberately does not bump the version, because the chunk's own data
    /// is unchanged and an in-flight mesh for it is still valid.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Clears the dirty flag after a mesh for the current version landed.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Whether the chunk needs a remesh.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The edit-version counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The raw block bytes, for the persistence collaborator.
    pub fn block_bytes(&self) -> &[u8] {
        &self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point3;

    #[test]
    fn index_arithmetic_matches_layout() {
        assert_eq!(block_index(0, 0, 0), 0);
        assert_eq!(block_index(15, 0, 0), 15);
        assert_eq!(block_index(0, 0, 1), CHUNK_DIMENSION);
        assert_eq!(block_index(0, 1, 0), CHUNK_AREA);
        assert_eq!(block_index(15, 15, 15), CHUNK_VOLUME - 1);
    }

    #[test]
    fn edits_bump_version_exactly_once() {
        let mut chunk = ChunkData::empty(Point3::new(0, 0, 0));
        assert_eq!(chunk.version(), 0);
        assert!(!chunk.is_dirty());

        assert!(chunk.apply_edit(3, 4, 5, BlockType::STONE));
        assert_eq!(chunk.version(), 1);
        assert!(chunk.is_dirty());
        assert!(chunk.occludes(3, 4, 5));

        // Same block again: not an accepted edit.
        assert!(!chunk.apply_edit(3, 4, 5, BlockType::STONE));
        assert_eq!(chunk.version(), 1);

        // Out of bounds: rejected, no bump.
        assert!(!chunk.apply_edit(16, 0, 0, BlockType::DIRT));
        assert_eq!(chunk.version(), 1);
    }

    #[test]
    fn occlusion_tracks_transparency() {
        let mut chunk = ChunkData::empty(Point3::new(0, 0, 0));
        chunk.apply_edit(0, 0, 0, BlockType::GLASS);
        assert!(!chunk.occludes(0, 0, 0));

        chunk.apply_edit(0, 0, 0, BlockType::STONE);
        assert!(chunk.occludes(0, 0, 0));

        chunk.apply_edit(0, 0, 0, BlockType::WATER);
        assert!(!chunk.occludes(0, 0, 0));
    }

    #[test]
    fn from_blocks_rejects_malformed_buffers() {
        let result = ChunkData::from_blocks(Point3::new(0, 0, 0), vec![0u8; 17]);
        assert_eq!(
            result.err(),
            Some(GenerationError::WrongLength {
                got: 17,
                expected: CHUNK_VOLUME
            })
        );
    }

    #[test]
    fn neighbor_dirty_marking_does_not_bump_version() {
        let mut chunk = ChunkData::empty(Point3::new(0, 0, 0));
        chunk.mark_dirty();
        assert!(chunk.is_dirty());
        assert_eq!(chunk.version(), 0);
    }

    #[test]
    fn replace_blocks_counts_as_one_edit() {
        let mut chunk = ChunkData::empty(Point3::new(0, 0, 0));
        chunk
            .replace_blocks(vec![BlockType::STONE.id(); CHUNK_VOLUME])
            .unwrap();
        assert_eq!(chunk.version(), 1);
        assert!(chunk.is_dirty());
        assert!(chunk.occludes(7, 7, 7));
    }
}
