//! # Voxels Module
//!
//! The data model of the voxel world: block typing, chunk storage, and the
//! coordinate math everything else schedules by.

pub mod block;
pub mod chunk;
pub mod coords;
pub mod store;

pub use block::{BlockFace, BlockId, BlockType};
pub use chunk::{ChunkData, CHUNK_DIMENSION, CHUNK_VOLUME};
pub use coords::ChunkPos;
pub use store::ChunkStore;
