#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Streaming
//!
//! A chunk streaming and incremental mesh-build pipeline for voxel worlds.
//!
//! The crate keeps the terrain around a moving player resident and meshed
//! without ever blocking the render loop: chunk generation and mesh building
//! run on bounded worker pools, every hand-off back to the main thread is
//! budgeted per frame, and results that were overtaken by player edits are
//! detected by version and rebuilt rather than presented.
//!
//! ## Key Modules
//!
//! * `voxels` - Chunk data, the chunk store, block types and coordinate math
//! * `generation` - Terrain generators and the background generation scheduler
//! * `meshing` - Mesh building, the two-lane mesh scheduler and the vertex format
//! * `streaming` - The frame-driven pipeline: region management, reconciliation
//!   and the prewarm gate
//! * `core` - The worker pool and shared-state primitives the schedulers build on
//! * `persistence` - Save/restore collaborators for evicted chunks and built meshes
//!
//! ## Architecture
//!
//! Everything follows one discipline:
//! * The chunk store and mesh cache are written from the main thread only
//! * Background workers receive snapshots and hand results back through
//!   channels; nothing is cancelled, stale results are discarded at apply time
//! * Every queue is deduplicated and capped, with near-player work exempt from
//!   the caps so the terrain under the player always wins
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use voxel_streaming::{
//!     CulledMesher, PerlinGenerator, NullPersistence, StreamingConfig,
//!     StreamingPipeline, TextureAtlas,
//! };
//!
//! let mut pipeline = StreamingPipeline::new(
//!     StreamingConfig::detect(),
//!     Arc::new(PerlinGenerator::new(42)),
//!     Arc::new(CulledMesher),
//!     TextureAtlas::default(),
//!     Box::new(NullPersistence),
//! );
//!
//! // Once per render frame:
//! let report = pipeline.frame(cgmath::Point3::new(8.0, 40.0, 8.0), 8, 60.0);
//! if report.gate_open {
//!     for mesh in pipeline.meshes() {
//!         // hand mesh.opaque / mesh.transparent / mesh.liquid to the renderer
//!         let _ = mesh.vertex_count();
//!     }
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod generation;
pub mod meshing;
pub mod persistence;
pub mod streaming;
pub mod voxels;

pub use config::StreamingConfig;
pub use error::{GenerationError, MeshError};
pub use generation::{FlatGenerator, PerlinGenerator, WorldGenerator};
pub use meshing::{ChunkMesh, CulledMesher, MeshBuilder, TextureAtlas, Vertex};
pub use persistence::{ChunkPersistence, MemoryPersistence, NullPersistence};
pub use streaming::{FrameReport, GateState, StreamingPipeline};
pub use voxels::block::{BlockFace, BlockType};
pub use voxels::coords::ChunkPos;
