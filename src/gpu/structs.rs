use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use super::driver::types::{Extensions, IndexType, IndexTypes, PrimitiveType, VertexLayout};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    pub fn from_array(c: [f32; 4]) -> Self {
        Self::rgba(c[0], c[1], c[2], c[3])
    }

    /// Packs into the `0xAARRGGBB` form used by vertex color components.
    pub fn to_argb(&self) -> u32 {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
        (q(self.a) << 24) | (q(self.r) << 16) | (q(self.g) << 8) | q(self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex(VertexLayout),
    Index(IndexType),
}

#[derive(Debug, Clone, Copy)]
pub struct BufferInfo<'a> {
    pub debug_name: &'a str,
    pub byte_size: u32,
    pub usage: BufferUsage,
}

impl Default for BufferInfo<'_> {
    fn default() -> Self {
        Self {
            debug_name: "",
            byte_size: 0,
            usage: BufferUsage::Vertex(VertexLayout::POSITION),
        }
    }
}

#[derive(Hash, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    None,
    Clockwise,
    #[default]
    CounterClockwise,
}

#[derive(Hash, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    Point,
    Wireframe,
    #[default]
    Solid,
}

#[derive(Hash, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadeMode {
    Flat,
    #[default]
    Gouraud,
}

#[derive(Hash, Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum BlendFactor {
    One,
    Zero,
    SrcColor,
    InvSrcColor,
    #[default]
    SrcAlpha,
    InvSrcAlpha,
    DstAlpha,
    InvDstAlpha,
    DstColor,
    InvDstColor,
}

#[derive(Hash, Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CompareFunc {
    Never,
    Less,
    Equal,
    #[default]
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DepthInfo {
    pub should_test: bool,
    pub should_write: bool,
    pub compare: CompareFunc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorBlendState {
    pub enable: bool,
    pub src_blend: BlendFactor,
    pub dst_blend: BlendFactor,
}

impl Default for ColorBlendState {
    fn default() -> Self {
        Self {
            enable: false,
            src_blend: BlendFactor::SrcAlpha,
            dst_blend: BlendFactor::InvSrcAlpha,
        }
    }
}

/// Fixed-function render state captured in one bindable object.
#[derive(Debug, Clone, Copy)]
pub struct PipelineInfo<'a> {
    pub debug_name: &'a str,
    pub primitive: PrimitiveType,
    pub vertex_layout: VertexLayout,
    pub culling: CullMode,
    pub fill: FillMode,
    pub shading: ShadeMode,
    pub depth: DepthInfo,
    pub blend: ColorBlendState,
    pub lighting: bool,
    pub specular: bool,
}

impl Default for PipelineInfo<'_> {
    fn default() -> Self {
        Self {
            debug_name: "",
            primitive: PrimitiveType::TriangleList,
            vertex_layout: VertexLayout::POSITION,
            culling: CullMode::CounterClockwise,
            fill: FillMode::Solid,
            shading: ShadeMode::Gouraud,
            depth: DepthInfo {
                should_test: true,
                should_write: true,
                compare: CompareFunc::LessEqual,
            },
            blend: ColorBlendState::default(),
            lighting: false,
            specular: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
    Anisotropic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerAddressMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerMipmapMode {
    None,
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerInfo {
    pub mag_filter: Filter,
    pub min_filter: Filter,
    pub mipmap_mode: SamplerMipmapMode,
    pub address_mode_u: SamplerAddressMode,
    pub address_mode_v: SamplerAddressMode,
    pub address_mode_w: SamplerAddressMode,
    pub max_anisotropy: u32,
    pub border_color: Color,
}

impl Default for SamplerInfo {
    fn default() -> Self {
        SamplerInfo {
            mag_filter: Filter::Linear,
            min_filter: Filter::Linear,
            mipmap_mode: SamplerMipmapMode::Linear,
            address_mode_u: SamplerAddressMode::Repeat,
            address_mode_v: SamplerAddressMode::Repeat,
            address_mode_w: SamplerAddressMode::Repeat,
            max_anisotropy: 1,
            border_color: Color::BLACK,
        }
    }
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    RGBA8,
    BGRA8,
    R8,
}

impl Format {
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            Format::RGBA8 | Format::BGRA8 => 4,
            Format::R8 => 1,
        }
    }
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TextureKind {
    #[default]
    D2,
    Cube,
    D3,
}

#[derive(Debug, Clone, Copy)]
pub struct TextureInfo<'a> {
    pub debug_name: &'a str,
    pub kind: TextureKind,
    /// Width, height and depth. Cube maps use depth 6, one layer per face.
    pub dim: [u32; 3],
    pub format: Format,
    pub mip_levels: u32,
}

impl Default for TextureInfo<'_> {
    fn default() -> Self {
        Self {
            debug_name: "",
            kind: TextureKind::D2,
            dim: [1, 1, 1],
            format: Format::RGBA8,
            mip_levels: 1,
        }
    }
}

impl TextureInfo<'_> {
    /// Bytes of texel data expected for the top mip level of every layer.
    pub fn byte_size(&self) -> u64 {
        self.dim.iter().map(|d| *d as u64).product::<u64>() * self.format.bytes_per_texel() as u64
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EffectInfo<'a> {
    pub debug_name: &'a str,
    pub source: &'a str,
}

/// Capabilities a backend reports truthfully. Validation and resource
/// creation check against these.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCaps {
    pub max_lights: u32,
    pub max_texture_stages: u32,
    pub index_types: IndexTypes,
    pub max_anisotropy: u32,
    pub extensions: Extensions,
}

impl Default for DeviceCaps {
    fn default() -> Self {
        Self {
            max_lights: 8,
            max_texture_stages: 8,
            index_types: IndexTypes::U16 | IndexTypes::U32,
            max_anisotropy: 16,
            extensions: Extensions::empty(),
        }
    }
}

impl DeviceCaps {
    pub fn supports_index_type(&self, ty: IndexType) -> bool {
        self.index_types.contains(ty.flag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformSlot {
    World,
    View,
    Projection,
    Texture(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightKind {
    #[default]
    Point,
    Spot,
    Directional,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub diffuse: Color,
    pub specular: Color,
    pub ambient: Color,
    pub position: Vec3,
    pub direction: Vec3,
    pub range: f32,
    pub falloff: f32,
    /// Constant, linear and quadratic attenuation.
    pub attenuation: [f32; 3],
    /// Inner cone angle in radians.
    pub theta: f32,
    /// Outer cone angle in radians.
    pub phi: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            kind: LightKind::Point,
            diffuse: Color::WHITE,
            specular: Color::BLACK,
            ambient: Color::BLACK,
            position: Vec3::ZERO,
            direction: Vec3::Z,
            range: 1000.0,
            falloff: 1.0,
            attenuation: [1.0, 0.0, 0.0],
            theta: 0.0,
            phi: 0.0,
        }
    }
}

impl Light {
    pub fn directional(direction: Vec3, diffuse: Color) -> Self {
        Self {
            kind: LightKind::Directional,
            direction,
            diffuse,
            ..Default::default()
        }
    }

    pub fn point(position: Vec3, diffuse: Color, range: f32) -> Self {
        Self {
            kind: LightKind::Point,
            position,
            diffuse,
            range,
            ..Default::default()
        }
    }
}

/// The per-draw material tuple of the fixed-function lighting model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialColors {
    pub diffuse: Color,
    pub ambient: Color,
    pub emissive: Color,
    pub specular: Color,
    pub power: f32,
}

impl Default for MaterialColors {
    fn default() -> Self {
        Self {
            diffuse: Color::WHITE,
            ambient: Color::WHITE,
            emissive: Color::BLACK,
            specular: Color::BLACK,
            power: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FogMode {
    #[default]
    None,
    Linear,
    Exp,
    Exp2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogParameters {
    pub mode: FogMode,
    pub color: Color,
    pub start: f32,
    pub end: f32,
    pub density: f32,
}

impl Default for FogParameters {
    fn default() -> Self {
        Self {
            mode: FogMode::None,
            color: Color::WHITE,
            start: 0.0,
            end: 1.0,
            density: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureOp {
    Disable,
    SelectArg1,
    SelectArg2,
    #[default]
    Modulate,
    Modulate2x,
    Add,
    BlendTextureAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureArg {
    Current,
    Diffuse,
    Texture,
    Specular,
}

/// Color and alpha combiner setup for one texture stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureStageState {
    pub color_op: TextureOp,
    pub color_arg1: TextureArg,
    pub color_arg2: TextureArg,
    pub alpha_op: TextureOp,
    pub alpha_arg1: TextureArg,
    pub alpha_arg2: TextureArg,
}

impl Default for TextureStageState {
    fn default() -> Self {
        Self {
            color_op: TextureOp::Modulate,
            color_arg1: TextureArg::Texture,
            color_arg2: TextureArg::Current,
            alpha_op: TextureOp::SelectArg1,
            alpha_arg1: TextureArg::Texture,
            alpha_arg2: TextureArg::Current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argb_packing() {
        assert_eq!(Color::WHITE.to_argb(), 0xFFFF_FFFF);
        assert_eq!(Color::rgba(1.0, 0.0, 0.0, 1.0).to_argb(), 0xFFFF_0000);
        assert_eq!(Color::rgba(0.0, 0.0, 1.0, 0.0).to_argb(), 0x0000_00FF);
    }

    #[test]
    fn texture_byte_size_covers_all_layers() {
        let info = TextureInfo {
            kind: TextureKind::Cube,
            dim: [4, 4, 6],
            ..Default::default()
        };
        assert_eq!(info.byte_size(), 4 * 4 * 6 * 4);
    }
}
