use bitflags::bitflags;

pub use crate::utils::Handle;

/// Vertex or index storage owned by a device.
#[derive(Debug, Clone, Copy)]
pub struct Buffer;

/// Fixed-function render state object bound before draws.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline;

#[derive(Debug, Clone, Copy)]
pub struct Sampler;

#[derive(Debug, Clone, Copy)]
pub struct Texture;

/// Backend effect (technique/pass state blocks), driven through extension commands.
#[derive(Debug, Clone, Copy)]
pub struct Effect;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    pub fn byte_size(self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }

    pub(crate) fn flag(self) -> IndexTypes {
        match self {
            IndexType::U16 => IndexTypes::U16,
            IndexType::U32 => IndexTypes::U32,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveType {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
    TriangleFan,
}

bitflags! {
    /// Flexible vertex layout. Components are stored interleaved in the
    /// order the flags are declared.
    #[repr(C)]
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VertexLayout: u32 {
        /// Untransformed position, three floats.
        const POSITION   = 0x1;
        /// Pre-transformed position (x, y, z, rhw), four floats.
        const POSITION_T = 0x2;
        const NORMAL     = 0x4;
        /// Packed ARGB diffuse color.
        const DIFFUSE    = 0x8;
        /// Packed ARGB specular color.
        const SPECULAR   = 0x10;
        /// One set of 2D texture coordinates.
        const TEX1       = 0x20;
        /// Two sets of 2D texture coordinates.
        const TEX2       = 0x40;
    }
}

impl VertexLayout {
    /// Exactly one position kind, and at most one texture-coordinate count.
    pub fn is_well_formed(&self) -> bool {
        let positions = self.intersection(Self::POSITION | Self::POSITION_T);
        let tex = self.intersection(Self::TEX1 | Self::TEX2);
        positions.bits().count_ones() == 1 && tex.bits().count_ones() <= 1
    }

    pub fn tex_coord_sets(&self) -> u32 {
        if self.contains(Self::TEX2) {
            2
        } else if self.contains(Self::TEX1) {
            1
        } else {
            0
        }
    }

    /// Size in bytes of one interleaved vertex.
    pub fn stride(&self) -> u32 {
        let mut size = 0;
        if self.contains(Self::POSITION) {
            size += 12;
        }
        if self.contains(Self::POSITION_T) {
            size += 16;
        }
        if self.contains(Self::NORMAL) {
            size += 12;
        }
        if self.contains(Self::DIFFUSE) {
            size += 4;
        }
        if self.contains(Self::SPECULAR) {
            size += 4;
        }
        size + self.tex_coord_sets() * 8
    }
}

bitflags! {
    #[repr(C)]
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        const COLOR   = 0x1;
        const DEPTH   = 0x2;
        const STENCIL = 0x4;
    }
}

bitflags! {
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IndexTypes: u8 {
        const U16 = 0x1;
        const U32 = 0x2;
    }
}

bitflags! {
    /// Optional backend extensions. Extension commands are only legal on a
    /// device advertising the matching bit.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Extensions: u32 {
        const SUBMESH_DRAW = 0x1;
        const IMMEDIATE_UI = 0x2;
        const EFFECTS      = 0x4;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_accounts_for_every_component() {
        assert_eq!(VertexLayout::POSITION.stride(), 12);
        assert_eq!((VertexLayout::POSITION | VertexLayout::DIFFUSE).stride(), 16);
        assert_eq!(
            (VertexLayout::POSITION | VertexLayout::NORMAL | VertexLayout::TEX1).stride(),
            32
        );
        assert_eq!((VertexLayout::POSITION_T | VertexLayout::TEX2).stride(), 32);
    }

    #[test]
    fn layout_needs_exactly_one_position() {
        assert!(VertexLayout::POSITION.is_well_formed());
        assert!(!VertexLayout::NORMAL.is_well_formed());
        assert!(!(VertexLayout::POSITION | VertexLayout::POSITION_T).is_well_formed());
        assert!(!(VertexLayout::POSITION | VertexLayout::TEX1 | VertexLayout::TEX2).is_well_formed());
    }
}
