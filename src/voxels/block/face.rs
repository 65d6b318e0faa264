//! # Block Face Module
//!
//! The six faces of a voxel block, with the offsets and normals used for
//! neighbor lookups, face culling, and mesh emission.

use cgmath::Vector3;

/// Represents the six faces of a voxel block.
///
/// Each variant carries a fixed integer value used to index per-face tables
/// (texture tiles, neighbor handles). The order is:
/// [WEST, EAST, BOTTOM, TOP, SOUTH, NORTH]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockFace {
    /// Facing negative X.
    WEST = 0,

    /// Facing positive X.
    EAST = 1,

    /// Facing negative Y.
    BOTTOM = 2,

    /// Facing positive Y.
    TOP = 3,

    /// Facing negative Z.
    SOUTH = 4,

    /// Facing positive Z.
    NORTH = 5,
}

impl BlockFace {
    /// All six faces, in table-index order.
    pub fn all() -> [BlockFace; 6] {
        [
            BlockFace::WEST,
            BlockFace::EAST,
            BlockFace::BOTTOM,
            BlockFace::TOP,
            BlockFace::SOUTH,
            BlockFace::NORTH,
        ]
    }

    /// The table index of this face.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Integer offset from a block to the neighbor this face looks at.
    pub fn offset(self) -> Vector3<i32> {
        match self {
            BlockFace::WEST => Vector3::new(-1, 0, 0),
            BlockFace::EAST => Vector3::new(1, 0, 0),
            BlockFace::BOTTOM => Vector3::new(0, -1, 0),
            BlockFace::TOP => Vector3::new(0, 1, 0),
            BlockFace::SOUTH => Vector3::new(0, 0, -1),
            BlockFace::NORTH => Vector3::new(0, 0, 1),
        }
    }

    /// Outward unit normal of this face.
    pub fn normal(self) -> Vector3<f32> {
        let offset = self.offset();
        Vector3::new(offset.x as f32, offset.y as f32, offset.z as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_match_table_order() {
        for (position, face) in BlockFace::all().into_iter().enumerate() {
            assert_eq!(face.index(), position);
        }
    }

    #[test]
    fn offsets_are_unit_axis_steps() {
        for face in BlockFace::all() {
            let offset = face.offset();
            assert_eq!(offset.x.abs() + offset.y.abs() + offset.z.abs(), 1);
        }
    }
}
