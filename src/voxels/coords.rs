//! Coordinate math for the chunk grid.
//!
//! Chunk coordinates are plain `Point3<i32>` values in chunk units. This
//! module owns the conversions between world space, block space and chunk
//! space, plus the Chebyshev-distance helpers the active-region manager
//! schedules by.

use cgmath::Point3;

use super::chunk::CHUNK_DIMENSION;

/// A chunk coordinate: the position of a 16³ block grid in chunk units.
pub type ChunkPos = Point3<i32>;

/// Floor division of a block coordinate by the chunk dimension.
#[inline]
fn floor_div(value: i32) -> i32 {
    value.div_euclid(CHUNK_DIMENSION as i32)
}

/// Converts a world-space position to the chunk that contains it.
pub fn world_to_chunk(world: Point3<f32>) -> ChunkPos {
    block_to_chunk(Point3::new(
        world.x.floor() as i32,
        world.y.floor() as i32,
        world.z.floor() as i32,
    ))
}

/// Converts an integer block coordinate to its owning chunk coordinate.
pub fn block_to_chunk(block: Point3<i32>) -> ChunkPos {
    Point3::new(floor_div(block.x), floor_div(block.y), floor_div(block.z))
}

/// Splits a block coordinate into its owning chunk and the local offset
/// within that chunk.
pub fn block_to_chunk_local(block: Point3<i32>) -> (ChunkPos, (usize, usize, usize)) {
    let dimension = CHUNK_DIMENSION as i32;
    let chunk = block_to_chunk(block);
    let local = (
        block.x.rem_euclid(dimension) as usize,
        block.y.rem_euclid(dimension) as usize,
        block.z.rem_euclid(dimension) as usize,
    );
    (chunk, local)
}

/// Chebyshev (ring) distance between two chunk coordinates in the XZ plane.
///
/// The vertical axis is excluded on purpose: rings are horizontal, and the
/// vertical extent is governed separately by the region manager's band.
pub fn ring_distance(a: ChunkPos, b: ChunkPos) -> i32 {
    (a.x - b.x).abs().max((a.z - b.z).abs())
}

/// All XZ offsets at exactly Chebyshev distance `radius` from the origin.
///
/// Radius 0 yields the single origin offset; radius r > 0 yields the 8r
/// offsets of the ring's perimeter. Iterating radii 0, 1, 2, … visits
/// coordinates in exactly the near-first order the scheduler wants.
pub fn ring_offsets(radius: i32) -> Vec<(i32, i32)> {
    if radius <= 0 {
        return vec![(0, 0)];
    }

    let mut offsets = Vec::with_capacity((radius as usize) * 8);
    for dx in -radius..=radius {
        offsets.push((dx, -radius));
        offsets.push((dx, radius));
    }
    for dz in (-radius + 1)..radius {
        offsets.push((-radius, dz));
        offsets.push((radius, dz));
    }
    offsets
}
