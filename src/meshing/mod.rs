//! # Meshing Module
//!
//! Everything between voxel data and renderable geometry: the vertex format,
//! the texture-atlas mapping, the mesh container, the face-culling builder
//! and the two-lane scheduler that runs builds on worker threads.

pub mod atlas;
pub mod culled;
pub mod mesh;
pub mod scheduler;
pub mod vertex;

pub use atlas::TextureAtlas;
pub use culled::CulledMesher;
pub use mesh::{Aabb, ChunkMesh};
pub use scheduler::{MeshScheduler, MeshSchedulerStats};
pub use vertex::Vertex;

use crate::core::Shared;
use crate::voxels::block::BlockFace;
use crate::voxels::chunk::ChunkData;

/// A caller-owned snapshot of the six face-adjacent chunks of a build,
/// captured on the main thread at dispatch time in [`BlockFace::all`] order.
///
/// Handles are cloned `Arc`s, so a neighbor evicted from the store mid-build
/// stays alive for the builder; the mesh simply comes out a frame stale at
/// that seam and the neighbor's own remesh fixes it.
pub struct NeighborChunks {
    handles: [Option<Shared<ChunkData>>; 6],
}

impl NeighborChunks {
    /// Wraps a neighbor snapshot taken from the chunk store.
    pub fn new(handles: [Option<Shared<ChunkData>>; 6]) -> Self {
        NeighborChunks { handles }
    }

    /// The neighbor across `face`, if it was resident at capture time.
    pub fn handle(&self, face: BlockFace) -> Option<&Shared<ChunkData>> {
        self.handles[face.index()].as_ref()
    }

    /// The neighbor at a raw [`BlockFace::index`] position.
    pub fn handle_by_index(&self, index: usize) -> Option<&Shared<ChunkData>> {
        self.handles[index].as_ref()
    }

    /// How many of the six neighbors were resident at capture time.
    pub fn resident_count(&self) -> usize {
        self.handles.iter().flatten().count()
    }
}

/// Builds renderable geometry from one chunk and its neighbor snapshot.
///
/// Implementations run on worker threads and must be pure with respect to
/// their inputs. `fast` requests the degraded variant used during prewarm and
/// under backlog pressure; builders without a cheaper mode may ignore it.
pub trait MeshBuilder: Send + Sync {
    /// Builds the mesh for `chunk`.
    fn build(
        &self,
        chunk: &ChunkData,
        neighbors: &NeighborChunks,
        atlas: &TextureAtlas,
        fast: bool,
    ) -> ChunkMesh;
}
