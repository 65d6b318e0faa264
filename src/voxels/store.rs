//! # Chunk Store Module
//!
//! The authoritative map from chunk coordinates to chunk data.
//!
//! ## Single-writer discipline
//!
//! Only the main thread calls mutating methods on the store or on the chunks
//! inside it. Background work that needs chunk contents receives cloned
//! [`Shared`] handles (a caller-owned snapshot) and takes read locks; the
//! live map itself is never touched from another thread.

use std::collections::{HashMap, HashSet};

use cgmath::Point3;

use crate::core::Shared;
use crate::error::GenerationError;
use crate::generation::WorldGenerator;

use super::block::{BlockFace, BlockType};
use super::chunk::ChunkData;
use super::coords::{block_to_chunk_local, ChunkPos};

/// The authoritative collection of resident chunks.
pub struct ChunkStore {
    chunks: HashMap<ChunkPos, Shared<ChunkData>>,
}

impl ChunkStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        ChunkStore {
            chunks: HashMap::new(),
        }
    }

    /// Number of resident chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the store holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Whether a chunk is resident at `position`.
    pub fn contains(&self, position: ChunkPos) -> bool {
        self.chunks.contains_key(&position)
    }

    /// A cloned handle to the chunk at `position`, if resident.
    pub fn try_get(&self, position: ChunkPos) -> Option<Shared<ChunkData>> {
        self.chunks.get(&position).cloned()
    }

    /// Inserts a freshly generated chunk.
    ///
    /// Insertion is idempotent per coordinate: when a chunk is already
    /// resident the new data is discarded and `false` is returned, so a
    /// straggling generation job can never clobber a chunk that has since
    /// been edited.
    pub fn insert(&mut self, chunk: ChunkData) -> bool {
        let position = chunk.position();
        if self.chunks.contains_key(&position) {
            return false;
        }
        self.chunks.insert(position, Shared::new(chunk));
        true
    }

    /// Returns the chunk at `position`, generating it synchronously if absent.
    ///
    /// This is the sparing fallback path (forced generation under an urgent
    /// edit); routine residency goes through the generation scheduler.
    pub fn get_or_create(
        &mut self,
        position: ChunkPos,
        generator: &dyn WorldGenerator,
    ) -> Result<Shared<ChunkData>, GenerationError> {
        if let Some(existing) = self.chunks.get(&position) {
            return Ok(existing.clone());
        }

        let chunk = ChunkData::from_blocks(position, generator.generate(position))?;
        let handle = Shared::new(chunk);
        self.chunks.insert(position, handle.clone());
        Ok(handle)
    }

    /// Applies a single-voxel edit at a world block coordinate.
    ///
    /// Returns `false` when no chunk owns the position or the edit was a
    /// no-op; on success the owning chunk is marked dirty and its version is
    /// bumped exactly once.
    pub fn set_block(&mut self, block_pos: Point3<i32>, block: BlockType) -> bool {
        let (chunk_pos, (x, y, z)) = block_to_chunk_local(block_pos);
        match self.chunks.get(&chunk_pos) {
            Some(chunk) => chunk.write().apply_edit(x, y, z, block),
            None => false,
        }
    }

    /// Caller-owned snapshot of the six face neighbors of `position`, in
    /// [`BlockFace::all`] order. Missing neighbors are `None`.
    pub fn neighbor_handles(&self, position: ChunkPos) -> [Option<Shared<ChunkData>>; 6] {
        BlockFace::all().map(|face| self.try_get(position + face.offset()))
    }

    /// Removes every chunk whose coordinate is not in `keep`, handing each
    /// evicted chunk's block bytes to `on_evict` first so the persistence
    /// collaborator can save them.
    ///
    /// Calling this twice with the same keep set on unchanged state is a
    /// no-op the second time.
    pub fn unload_outside(
        &mut self,
        keep: &HashSet<ChunkPos>,
        mut on_evict: impl FnMut(ChunkPos, &[u8]),
    ) -> Vec<ChunkPos> {
        let evicted: Vec<ChunkPos> = self
            .chunks
            .keys()
            .filter(|position| !keep.contains(*position))
            .copied()
            .collect();

        for position in &evicted {
            if let Some(chunk) = self.chunks.remove(position) {
                on_evict(*position, chunk.read().block_bytes());
            }
        }

        evicted
    }
}

impl Default for ChunkStore {
    fn default() -> Self {
        Self::new()
    }
}
