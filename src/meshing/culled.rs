//! Face-culling mesh builder.
//!
//! The reference [`MeshBuilder`]: walks every block of the chunk and emits a
//! quad for each face not hidden by its neighbor, routing geometry into the
//! opaque, transparent or liquid list by block classification. Border faces
//! consult the face-adjacent neighbor chunks through their shared handles.
//!
//! The `fast` variant skips the neighbor reads entirely and emits border
//! faces unconditionally. It overdraws at chunk seams but never misses
//! geometry, which is the right trade during prewarm and under backlog
//! pressure.

use std::sync::RwLockReadGuard;

use cgmath::Point3;

use crate::voxels::block::{BlockFace, BlockType};
use crate::voxels::chunk::{ChunkData, CHUNK_DIMENSION};

use super::atlas::TextureAtlas;
use super::mesh::ChunkMesh;
use super::vertex::Vertex;
use super::{MeshBuilder, NeighborChunks};

/// Corner offsets of each face's quad within the unit cube, in
/// `BlockFace::index()` order. Corners wind counter-clockwise seen from
/// outside the block.
const FACE_CORNERS: [[[f32; 3]; 4]; 6] = [
    // WEST (-X)
    [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0]],
    // EAST (+X)
    [[1.0, 0.0, 1.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0]],
    // BOTTOM (-Y)
    [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
    // TOP (+Y)
    [[0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
    // SOUTH (-Z)
    [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
    // NORTH (+Z)
    [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]],
];

/// Triangulation of a quad's four corners.
const QUAD_TRIANGLES: [usize; 6] = [0, 1, 2, 0, 2, 3];

/// The default face-culling mesh builder.
pub struct CulledMesher;

type NeighborGuards<'a> = [Option<RwLockReadGuard<'a, ChunkData>>; 6];

impl CulledMesher {
    /// The block on the far side of `face` from local position `(x, y, z)`.
    ///
    /// `None` means "nothing known there": outside the chunk with the
    /// neighbor unloaded, or any border at all in fast mode. Unknown space is
    /// treated as visible so geometry is never missing, only overdrawn.
    fn neighbor_block(
        chunk: &ChunkData,
        guards: &NeighborGuards<'_>,
        x: usize,
        y: usize,
        z: usize,
        face: BlockFace,
        fast: bool,
    ) -> Option<BlockType> {
        let dimension = CHUNK_DIMENSION as i32;
        let offset = face.offset();
        let nx = x as i32 + offset.x;
        let ny = y as i32 + offset.y;
        let nz = z as i32 + offset.z;

        let inside = (0..dimension).contains(&nx)
            && (0..dimension).contains(&ny)
            && (0..dimension).contains(&nz);
        if inside {
            return Some(chunk.get(nx as usize, ny as usize, nz as usize));
        }
        if fast {
            return None;
        }

        guards[face.index()].as_ref().map(|neighbor| {
            neighbor.get(
                nx.rem_euclid(dimension) as usize,
                ny.rem_euclid(dimension) as usize,
                nz.rem_euclid(dimension) as usize,
            )
        })
    }

    /// Whether a face of `block` against `neighbor` must be drawn.
    fn face_visible(block: BlockType, neighbor: Option<BlockType>) -> bool {
        match neighbor {
            None => true,
            // Hidden behind opaque blocks; merged away between like blocks
            // (water against water, glass against glass).
            Some(neighbor) => !neighbor.is_opaque() && neighbor != block,
        }
    }

    /// Appends the six vertices of one face quad to `target`.
    fn emit_face(
        target: &mut Vec<Vertex>,
        base: Point3<f32>,
        block: BlockType,
        face: BlockFace,
        atlas: &TextureAtlas,
    ) {
        let tile = atlas.tile_for(block, face);
        let [u0, v0, u1, v1] = atlas.uv_rect(tile);
        let corner_uvs = [[u0, v1], [u1, v1], [u1, v0], [u0, v0]];
        let corners = FACE_CORNERS[face.index()];

        for corner in QUAD_TRIANGLES {
            let offset = corners[corner];
            let position = Point3::new(
                base.x + offset[0],
                base.y + offset[1],
                base.z + offset[2],
            );
            target.push(Vertex::new(position, corner_uvs[corner], tile, face));
        }
    }
}

impl MeshBuilder for CulledMesher {
    fn build(
        &self,
        chunk: &ChunkData,
        neighbors: &NeighborChunks,
        atlas: &TextureAtlas,
        fast: bool,
    ) -> ChunkMesh {
        let mut mesh = ChunkMesh::empty(chunk.position(), chunk.version());

        // One read lock per neighbor for the whole build, not per face.
        let guards: NeighborGuards<'_> = if fast {
            std::array::from_fn(|_| None)
        } else {
            std::array::from_fn(|index| neighbors.handle_by_index(index).map(|h| h.read()))
        };

        let dimension = CHUNK_DIMENSION as f32;
        let origin = Point3::new(
            chunk.position().x as f32 * dimension,
            chunk.position().y as f32 * dimension,
            chunk.position().z as f32 * dimension,
        );

        for y in 0..CHUNK_DIMENSION {
            for z in 0..CHUNK_DIMENSION {
                for x in 0..CHUNK_DIMENSION {
                    let block = chunk.get(x, y, z);
                    if block.is_air() {
                        continue;
                    }

                    let base =
                        Point3::new(origin.x + x as f32, origin.y + y as f32, origin.z + z as f32);
                    let target = if block.is_liquid() {
                        &mut mesh.liquid
                    } else if block.is_transparent() {
                        &mut mesh.transparent
                    } else {
                        &mut mesh.opaque
                    };

                    for face in BlockFace::all() {
                        let neighbor =
                            Self::neighbor_block(chunk, &guards, x, y, z, face, fast);
                        if Self::face_visible(block, neighbor) {
                            Self::emit_face(target, base, block, face, atlas);
                        }
                    }
                }
            }
        }

        mesh
    }
}
