//! # Persistence
//!
//! Save and restore collaborators for the streaming pipeline.
//!
//! Eviction hands each departing chunk's block bytes to the persistence
//! layer; re-entry of the same coordinate restores those bytes instead of
//! regenerating, so player edits survive leaving the active region. Built
//! meshes can be stored too, which gives the prewarm gate its fast path: a
//! mesh that comes back from the cache makes its coordinate warm without
//! waiting on a build.
//!
//! Two implementations ship here. [`NullPersistence`] forgets everything and
//! is the default for throwaway worlds; [`MemoryPersistence`] keeps chunks in
//! a map and meshes in an LRU cache, which is also what the tests use.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use lru::LruCache;

use crate::meshing::ChunkMesh;
use crate::voxels::coords::ChunkPos;

/// Where evicted chunks and built meshes go, and where they come back from.
///
/// Methods take `&mut self`: persistence is called from the main thread only,
/// during eviction and reconciliation.
pub trait ChunkPersistence {
    /// Archives the block bytes of an evicted chunk.
    fn save_chunk(&mut self, position: ChunkPos, blocks: &[u8]);

    /// Restores previously saved block bytes, if any.
    fn load_chunk(&mut self, position: ChunkPos) -> Option<Vec<u8>>;

    /// Caches a built mesh.
    fn store_mesh(&mut self, mesh: &ChunkMesh);

    /// Returns a previously cached mesh, if any.
    fn load_mesh(&mut self, position: ChunkPos) -> Option<ChunkMesh>;
}

/// Persistence that forgets everything.
pub struct NullPersistence;

impl ChunkPersistence for NullPersistence {
    fn save_chunk(&mut self, _position: ChunkPos, _blocks: &[u8]) {}

    fn load_chunk(&mut self, _position: ChunkPos) -> Option<Vec<u8>> {
        None
    }

    fn store_mesh(&mut self, _mesh: &ChunkMesh) {}

    fn load_mesh(&mut self, _position: ChunkPos) -> Option<ChunkMesh> {
        None
    }
}

/// In-memory persistence: chunks in a map, meshes in an LRU cache.
pub struct MemoryPersistence {
    chunks: HashMap<ChunkPos, Vec<u8>>,
    meshes: LruCache<ChunkPos, ChunkMesh>,
}

impl MemoryPersistence {
    /// Creates a store caching at most `mesh_capacity` meshes.
    pub fn new(mesh_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(mesh_capacity.max(1)).unwrap();
        MemoryPersistence {
            chunks: HashMap::new(),
            meshes: LruCache::new(capacity),
        }
    }

    /// Number of archived chunks.
    pub fn saved_chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

impl Default for MemoryPersistence {
    fn default() -> Self {
        MemoryPersistence::new(512)
    }
}

impl ChunkPersistence for MemoryPersistence {
    fn save_chunk(&mut self, position: ChunkPos, blocks: &[u8]) {
        self.chunks.insert(position, blocks.to_vec());
    }

    fn load_chunk(&mut self, position: ChunkPos) -> Option<Vec<u8>> {
        self.chunks.get(&position).cloned()
    }

    fn store_mesh(&mut self, mesh: &ChunkMesh) {
        self.meshes.put(mesh.position, mesh.clone());
    }

    fn load_mesh(&mut self, position: ChunkPos) -> Option<ChunkMesh> {
        self.meshes.get(&position).cloned()
    }
}
