//! Model manifests.
//!
//! A model is a RON file listing submeshes with their vertex streams and an
//! embedded material:
//!
//! ```ron
//! (
//!     submeshes: [
//!         (
//!             name: Some("hull"),
//!             positions: [(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0)],
//!             normals: [(0.0, 0.0, -1.0), (0.0, 0.0, -1.0), (0.0, 0.0, -1.0)],
//!             tex_coords: [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)],
//!             indices: [0, 1, 2],
//!             material: (diffuse: (0.8, 0.8, 0.8, 1.0), texture: Some("hull.png")),
//!         ),
//!     ],
//! )
//! ```
//!
//! Texture paths are relative to the manifest.

use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use serde::Deserialize;

use super::IndexData;
use crate::gpu::driver::types::{IndexType, PrimitiveType, VertexLayout};
use crate::gpu::error::{GpuError, Result};
use crate::gpu::structs::{Color, DeviceCaps, MaterialColors};

#[derive(Debug, Clone, Deserialize)]
pub struct ModelManifest {
    pub submeshes: Vec<SubmeshManifest>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum ManifestPrimitive {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
    TriangleFan,
}

impl From<ManifestPrimitive> for PrimitiveType {
    fn from(p: ManifestPrimitive) -> Self {
        match p {
            ManifestPrimitive::PointList => PrimitiveType::PointList,
            ManifestPrimitive::LineList => PrimitiveType::LineList,
            ManifestPrimitive::LineStrip => PrimitiveType::LineStrip,
            ManifestPrimitive::TriangleList => PrimitiveType::TriangleList,
            ManifestPrimitive::TriangleStrip => PrimitiveType::TriangleStrip,
            ManifestPrimitive::TriangleFan => PrimitiveType::TriangleFan,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmeshManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub primitive: ManifestPrimitive,
    pub positions: Vec<[f32; 3]>,
    #[serde(default)]
    pub normals: Vec<[f32; 3]>,
    #[serde(default)]
    pub tex_coords: Vec<[f32; 2]>,
    #[serde(default)]
    pub indices: Vec<u32>,
    #[serde(default)]
    pub material: MaterialManifest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialManifest {
    #[serde(default = "white")]
    pub diffuse: [f32; 4],
    #[serde(default = "white")]
    pub ambient: [f32; 4],
    #[serde(default = "black")]
    pub specular: [f32; 4],
    #[serde(default = "black")]
    pub emissive: [f32; 4],
    #[serde(default)]
    pub power: f32,
    #[serde(default)]
    pub texture: Option<String>,
}

impl Default for MaterialManifest {
    fn default() -> Self {
        Self {
            diffuse: white(),
            ambient: white(),
            specular: black(),
            emissive: black(),
            power: 0.0,
            texture: None,
        }
    }
}

fn white() -> [f32; 4] {
    [1.0; 4]
}

fn black() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl MaterialManifest {
    pub fn colors(&self) -> MaterialColors {
        MaterialColors {
            diffuse: Color::from_array(self.diffuse),
            ambient: Color::from_array(self.ambient),
            emissive: Color::from_array(self.emissive),
            specular: Color::from_array(self.specular),
            power: self.power,
        }
    }

    pub fn texture_path(&self, manifest: &Path) -> Option<PathBuf> {
        let dir = manifest.parent().unwrap_or_else(|| Path::new(""));
        self.texture.as_ref().map(|t| dir.join(t))
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct PosNormalTex {
    position: [f32; 3],
    normal: [f32; 3],
    tex: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct PosNormal {
    position: [f32; 3],
    normal: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct PosTex {
    position: [f32; 3],
    tex: [f32; 2],
}

/// Interleaved vertex and index data ready for upload.
#[derive(Debug)]
pub struct SubmeshGeometry {
    pub layout: VertexLayout,
    pub vertices: Vec<u8>,
    pub indices: Option<PackedIndices>,
    pub primitive: PrimitiveType,
}

#[derive(Debug)]
pub enum PackedIndices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl PackedIndices {
    pub fn as_index_data(&self) -> IndexData<'_> {
        match self {
            PackedIndices::U16(i) => IndexData::U16(i),
            PackedIndices::U32(i) => IndexData::U32(i),
        }
    }
}

fn load_error(path: &Path, reason: String) -> GpuError {
    GpuError::ModelLoad {
        path: path.to_path_buf(),
        reason,
    }
}

impl ModelManifest {
    pub fn from_ron(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let manifest = Self::from_ron(&content)?;
        if manifest.submeshes.is_empty() {
            return Err(load_error(path, "model has no submeshes".into()));
        }
        Ok(manifest)
    }
}

impl SubmeshManifest {
    pub fn label(&self, index: usize) -> String {
        self.name.clone().unwrap_or_else(|| format!("submesh{}", index))
    }

    /// Builds the vertex stream and picks the narrowest index type `caps` allows.
    pub fn geometry(&self, path: &Path, caps: &DeviceCaps) -> Result<SubmeshGeometry> {
        let count = self.positions.len();
        if count == 0 {
            return Err(load_error(path, "submesh without positions".into()));
        }
        let has_normals = !self.normals.is_empty();
        let has_tex = !self.tex_coords.is_empty();
        if has_normals && self.normals.len() != count {
            return Err(load_error(path, "normal count differs from position count".into()));
        }
        if has_tex && self.tex_coords.len() != count {
            return Err(load_error(
                path,
                "tex_coord count differs from position count".into(),
            ));
        }

        let mut layout = VertexLayout::POSITION;
        let vertices = match (has_normals, has_tex) {
            (true, true) => {
                layout |= VertexLayout::NORMAL | VertexLayout::TEX1;
                let v: Vec<PosNormalTex> = (0..count)
                    .map(|i| PosNormalTex {
                        position: self.positions[i],
                        normal: self.normals[i],
                        tex: self.tex_coords[i],
                    })
                    .collect();
                bytemuck::cast_slice(&v).to_vec()
            }
            (true, false) => {
                layout |= VertexLayout::NORMAL;
                let v: Vec<PosNormal> = (0..count)
                    .map(|i| PosNormal {
                        position: self.positions[i],
                        normal: self.normals[i],
                    })
                    .collect();
                bytemuck::cast_slice(&v).to_vec()
            }
            (false, true) => {
                layout |= VertexLayout::TEX1;
                let v: Vec<PosTex> = (0..count)
                    .map(|i| PosTex {
                        position: self.positions[i],
                        tex: self.tex_coords[i],
                    })
                    .collect();
                bytemuck::cast_slice(&v).to_vec()
            }
            (false, false) => bytemuck::cast_slice(&self.positions).to_vec(),
        };

        let indices = if self.indices.is_empty() {
            None
        } else {
            if self.primitive == ManifestPrimitive::PointList {
                return Err(load_error(path, "point lists cannot be indexed".into()));
            }
            if let Some(bad) = self.indices.iter().find(|i| **i as usize >= count) {
                return Err(load_error(
                    path,
                    format!("index {} out of range for {} vertices", bad, count),
                ));
            }
            Some(pack_indices(&self.indices, count, caps)?)
        };

        Ok(SubmeshGeometry {
            layout,
            vertices,
            indices,
            primitive: self.primitive.into(),
        })
    }
}

fn pack_indices(
    indices: &[u32],
    vertex_count: usize,
    caps: &DeviceCaps,
) -> Result<PackedIndices> {
    let fits_u16 = vertex_count <= u16::MAX as usize + 1;
    if fits_u16 && caps.supports_index_type(IndexType::U16) {
        return Ok(PackedIndices::U16(
            indices.iter().map(|i| *i as u16).collect(),
        ));
    }
    if caps.supports_index_type(IndexType::U32) {
        return Ok(PackedIndices::U32(indices.to_vec()));
    }
    Err(GpuError::Unsupported(format!(
        "no index type can address {} vertices",
        vertex_count
    )))
}
