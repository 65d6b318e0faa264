//! Vertex format of the render payload.
//!
//! Plain-old-data so the renderer can upload vertex lists to the GPU with a
//! single byte copy; the actual buffer layout wiring is the renderer's
//! concern.

use cgmath::Point3;

use crate::voxels::block::BlockFace;

/// One vertex of a chunk mesh.
///
/// # Memory Layout
/// - Position: `[f32; 3]` (12 bytes)
/// - Texture coordinates: `[f32; 2]` (8 bytes)
/// - Atlas tile index: `u32` (4 bytes)
/// - Face index: `u32` (4 bytes)
///
/// Total size: 28 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    position: [f32; 3],
    tex_coords: [f32; 2],
    tile_index: u32,
    face_index: u32,
}

impl Vertex {
    /// Creates a vertex at `position` with atlas coordinates `tex_coords`.
    pub fn new(position: Point3<f32>, tex_coords: [f32; 2], tile: u16, face: BlockFace) -> Self {
        Vertex {
            position: [position.x, position.y, position.z],
            tex_coords,
            tile_index: tile as u32,
            face_index: face.index() as u32,
        }
    }

    /// The vertex position.
    pub fn position(&self) -> [f32; 3] {
        self.position
    }

    /// Whether every coordinate of this vertex is finite.
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|c| c.is_finite())
            && self.tex_coords.iter().all(|c| c.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 28);
    }

    #[test]
    fn finiteness_check_catches_nan() {
        let good = Vertex::new(Point3::new(1.0, 2.0, 3.0), [0.0, 1.0], 0, BlockFace::TOP);
        assert!(good.is_finite());

        let bad = Vertex::new(
            Point3::new(f32::NAN, 2.0, 3.0),
            [0.0, 1.0],
            0,
            BlockFace::TOP,
        );
        assert!(!bad.is_finite());
    }
}
