//! # Generation Module
//!
//! Terrain generation: the collaborator trait the pipeline consumes, the
//! reference generators shipped with the crate, and the scheduler that runs
//! generation off the main thread.
//!
//! A generator is a pure function from chunk coordinate to block bytes, which
//! is what makes it safe to run on any worker without coordination.

pub mod scheduler;

use noise::{NoiseFn, Perlin};

use crate::voxels::block::BlockType;
use crate::voxels::chunk::{block_index, CHUNK_DIMENSION, CHUNK_VOLUME};
use crate::voxels::coords::ChunkPos;

pub use scheduler::{GenerationScheduler, GenerationSchedulerStats};

/// Produces the voxel contents of chunks.
///
/// Implementations must be pure with respect to the coordinate: the same
/// coordinate always yields the same bytes, and no shared state is mutated.
/// The buffer must be exactly [`CHUNK_VOLUME`] bytes of raw block ids.
pub trait WorldGenerator: Send + Sync {
    /// Generates the block bytes for the chunk at `position`.
    fn generate(&self, position: ChunkPos) -> Vec<u8>;
}

/// Perlin-noise heightmap terrain: stone depths, a dirt band, a grass or sand
/// surface, and water filling everything below sea level.
pub struct PerlinGenerator {
    perlin: Perlin,
    /// World-space scale applied to noise sampling coordinates.
    scale: f64,
    /// Half the vertical span of the terrain surface, in blocks.
    amplitude: f64,
    /// World Y of the mid-level terrain surface.
    base_height: i32,
    /// World Y at and below which air becomes water.
    sea_level: i32,
}

impl PerlinGenerator {
    /// Noise scale that gives hills roughly a few chunks across.
    const DEFAULT_SCALE: f64 = 0.02;

    /// Creates a generator with the default terrain shape for `seed`.
    pub fn new(seed: u32) -> Self {
        PerlinGenerator {
            perlin: Perlin::new(seed),
            scale: Self::DEFAULT_SCALE,
            amplitude: 20.0,
            base_height: 24,
            sea_level: 18,
        }
    }

    /// Surface height at a world XZ column.
    fn surface_height(&self, world_x: i32, world_z: i32) -> i32 {
        let sample = self.perlin.get([
            world_x as f64 * self.scale,
            world_z as f64 * self.scale,
        ]);
        self.base_height + (sample * self.amplitude) as i32
    }

    /// The block for one world-space position in a column of height `surface`.
    fn block_at(&self, world_y: i32, surface: i32) -> BlockType {
        if world_y > surface {
            if world_y <= self.sea_level {
                BlockType::WATER
            } else {
                BlockType::AIR
            }
        } else if world_y == surface {
            if surface <= self.sea_level + 1 {
                BlockType::SAND
            } else {
                BlockType::GRASS
            }
        } else if world_y >= surface - 3 {
            BlockType::DIRT
        } else {
            BlockType::STONE
        }
    }
}

impl WorldGenerator for PerlinGenerator {
    fn generate(&self, position: ChunkPos) -> Vec<u8> {
        let dimension = CHUNK_DIMENSION as i32;
        let mut blocks = vec![BlockType::AIR.id(); CHUNK_VOLUME];

        for z in 0..CHUNK_DIMENSION {
            for x in 0..CHUNK_DIMENSION {
                let world_x = position.x * dimension + x as i32;
                let world_z = position.z * dimension + z as i32;
                let surface = self.surface_height(world_x, world_z);

                for y in 0..CHUNK_DIMENSION {
                    let world_y = position.y * dimension + y as i32;
                    let block = self.block_at(world_y, surface);
                    blocks[block_index(x, y, z)] = block.id();
                }
            }
        }

        blocks
    }
}

/// A flat slab world: one block type filling everything at or below a world
/// height, air above. Used by tests and tooling.
pub struct FlatGenerator {
    surface_world_y: i32,
    block: BlockType,
}

impl FlatGenerator {
    /// Creates a generator whose surface is at world height `surface_world_y`.
    pub fn new(surface_world_y: i32, block: BlockType) -> Self {
        FlatGenerator {
            surface_world_y,
            block,
        }
    }
}

impl WorldGenerator for FlatGenerator {
    fn generate(&self, position: ChunkPos) -> Vec<u8> {
        let dimension = CHUNK_DIMENSION as i32;
        let mut blocks = vec![BlockType::AIR.id(); CHUNK_VOLUME];

        for y in 0..CHUNK_DIMENSION {
            let world_y = position.y * dimension + y as i32;
            if world_y > self.surface_world_y {
                continue;
            }
            for z in 0..CHUNK_DIMENSION {
                for x in 0..CHUNK_DIMENSION {
                    blocks[block_index(x, y, z)] = self.block.id();
                }
            }
        }

        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point3;

    #[test]
    fn perlin_output_has_chunk_volume() {
        let generator = PerlinGenerator::new(7);
        let blocks = generator.generate(Point3::new(0, 1, 0));
        assert_eq!(blocks.len(), CHUNK_VOLUME);
    }

    #[test]
    fn perlin_is_deterministic_per_coordinate() {
        let generator = PerlinGenerator::new(7);
        let position = Point3::new(3, 1, -2);
        assert_eq!(generator.generate(position), generator.generate(position));
    }

    #[test]
    fn deep_chunks_are_all_stone() {
        let generator = PerlinGenerator::new(7);
        let blocks = generator.generate(Point3::new(0, -4, 0));
        assert!(blocks.iter().all(|id| *id == BlockType::STONE.id()));
    }

    #[test]
    fn flat_generator_splits_at_the_surface() {
        let generator = FlatGenerator::new(7, BlockType::STONE);
        let blocks = generator.generate(Point3::new(0, 0, 0));

        assert_eq!(blocks[block_index(0, 7, 0)], BlockType::STONE.id());
        assert_eq!(blocks[block_index(0, 8, 0)], BlockType::AIR.id());

        let above = generator.generate(Point3::new(0, 1, 0));
        assert!(above.iter().all(|id| *id == BlockType::AIR.id()));
    }
}
