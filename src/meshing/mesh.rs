//! Mesh data structures for the render payload.
//!
//! A [`ChunkMesh`] is immutable once built: a worker produces it, the
//! reconciler installs it into the render-visible cache, and the renderer
//! reads it until eviction. The three vertex lists are disjoint so the
//! renderer can draw opaque geometry front-to-back and blended geometry in
//! its own passes.

use cgmath::Point3;

use crate::error::MeshError;
use crate::voxels::chunk::CHUNK_DIMENSION;
use crate::voxels::coords::ChunkPos;

use super::vertex::Vertex;

/// An axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f32>,
    /// Maximum corner.
    pub max: Point3<f32>,
}

impl Aabb {
    /// The world-space box of an entire chunk.
    pub fn of_chunk(position: ChunkPos) -> Self {
        let dimension = CHUNK_DIMENSION as f32;
        let min = Point3::new(
            position.x as f32 * dimension,
            position.y as f32 * dimension,
            position.z as f32 * dimension,
        );
        Aabb {
            min,
            max: Point3::new(min.x + dimension, min.y + dimension, min.z + dimension),
        }
    }
}

/// The renderable geometry built from one chunk's voxel data.
#[derive(Clone)]
pub struct ChunkMesh {
    /// The chunk this mesh was built from.
    pub position: ChunkPos,
    /// The `ChunkData` version the build captured; the reconciler compares
    /// this against the chunk's current version to detect stale results.
    pub source_version: u64,
    /// Opaque geometry, drawn in the main pass.
    pub opaque: Vec<Vertex>,
    /// See-through solid geometry (glass), drawn blended.
    pub transparent: Vec<Vertex>,
    /// Liquid surfaces, drawn in their own pass.
    pub liquid: Vec<Vertex>,
    /// World-space bounds for culling.
    pub bounds: Aabb,
}

impl ChunkMesh {
    /// Creates an empty mesh for `position` at `source_version`.
    pub fn empty(position: ChunkPos, source_version: u64) -> Self {
        ChunkMesh {
            position,
            source_version,
            opaque: Vec::new(),
            transparent: Vec::new(),
            liquid: Vec::new(),
            bounds: Aabb::of_chunk(position),
        }
    }

    /// Total vertices across all three lists.
    pub fn vertex_count(&self) -> usize {
        self.opaque.len() + self.transparent.len() + self.liquid.len()
    }

    /// Whether the mesh has no geometry at all (an air-only chunk).
    pub fn is_empty(&self) -> bool {
        self.vertex_count() == 0
    }

    /// Validates the mesh before it may leave a worker.
    ///
    /// Every list must contain a whole number of triangles and every
    /// coordinate must be finite; a mesh failing either check is discarded
    /// and the chunk is rebuilt rather than handed to the renderer.
    pub fn validate(&self) -> Result<(), MeshError> {
        for (category, vertices) in [
            ("opaque", &self.opaque),
            ("transparent", &self.transparent),
            ("liquid", &self.liquid),
        ] {
            if vertices.len() % 3 != 0 {
                return Err(MeshError::PartialTriangle {
                    category,
                    len: vertices.len(),
                });
            }
            if vertices.iter().any(|vertex| !vertex.is_finite()) {
                return Err(MeshError::NonFiniteVertex);
            }
        }
        Ok(())
    }
}
