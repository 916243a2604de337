#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use sandgfx::*;

/// Headless device that keeps a copy of every submitted command before
/// handing the lists to a [`NullDevice`].
#[derive(Default)]
pub struct RecordingDevice {
    pub inner: NullDevice,
    pub submitted: Vec<Command>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(&self) -> Vec<Op> {
        self.submitted.iter().map(Command::kind).collect()
    }
}

impl Device for RecordingDevice {
    fn caps(&self) -> &DeviceCaps {
        self.inner.caps()
    }

    fn status(&self) -> DeviceStatus {
        self.inner.status()
    }

    fn reset(&mut self) -> Result<()> {
        self.inner.reset()
    }

    fn present(&mut self) -> Result<()> {
        self.inner.present()
    }

    fn create_buffer(&mut self, info: &BufferInfo) -> Result<Handle<Buffer>> {
        self.inner.create_buffer(info)
    }

    fn destroy_buffer(&mut self, handle: Handle<Buffer>) {
        self.inner.destroy_buffer(handle)
    }

    fn map_buffer(&mut self, handle: Handle<Buffer>) -> Result<&mut [u8]> {
        self.inner.map_buffer(handle)
    }

    fn unmap_buffer(&mut self, handle: Handle<Buffer>) -> Result<()> {
        self.inner.unmap_buffer(handle)
    }

    fn create_pipeline(&mut self, info: &PipelineInfo) -> Result<Handle<Pipeline>> {
        self.inner.create_pipeline(info)
    }

    fn destroy_pipeline(&mut self, handle: Handle<Pipeline>) {
        self.inner.destroy_pipeline(handle)
    }

    fn create_sampler(&mut self, info: &SamplerInfo) -> Result<Handle<Sampler>> {
        self.inner.create_sampler(info)
    }

    fn destroy_sampler(&mut self, handle: Handle<Sampler>) {
        self.inner.destroy_sampler(handle)
    }

    fn create_texture(
        &mut self,
        info: &TextureInfo,
        data: Option<&[u8]>,
    ) -> Result<Handle<Texture>> {
        self.inner.create_texture(info, data)
    }

    fn destroy_texture(&mut self, handle: Handle<Texture>) {
        self.inner.destroy_texture(handle)
    }

    fn create_effect(&mut self, info: &EffectInfo) -> Result<Handle<Effect>> {
        self.inner.create_effect(info)
    }

    fn destroy_effect(&mut self, handle: Handle<Effect>) {
        self.inner.destroy_effect(handle)
    }

    fn submit(&mut self, lists: &[CommandList]) -> Result<()> {
        for list in lists {
            self.submitted.extend(list.iter().cloned());
        }
        self.inner.submit(lists)
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ColoredVertex {
    position: [f32; 3],
    diffuse: u32,
}

/// One triangle in `POSITION | DIFFUSE` layout, wound clockwise.
pub fn triangle_vertices() -> Vec<u8> {
    let white = Color::WHITE.to_argb();
    let vertices = [
        ColoredVertex {
            position: [-0.5, -0.5, 0.5],
            diffuse: white,
        },
        ColoredVertex {
            position: [0.0, 0.5, 0.5],
            diffuse: white,
        },
        ColoredVertex {
            position: [0.5, -0.5, 0.5],
            diffuse: white,
        },
    ];
    bytemuck::cast_slice(&vertices).to_vec()
}

pub fn triangle_layout() -> VertexLayout {
    VertexLayout::POSITION | VertexLayout::DIFFUSE
}

/// Positions only, for meshes whose contents do not matter.
pub fn positions(count: usize) -> Vec<u8> {
    let v: Vec<[f32; 3]> = (0..count).map(|i| [i as f32, 0.0, 0.0]).collect();
    bytemuck::cast_slice(&v).to_vec()
}

/// Fresh directory under the system temp dir, unique per call.
pub fn scratch_dir(tag: &str) -> PathBuf {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let n = NEXT.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "sandgfx-{}-{}-{}",
        tag,
        std::process::id(),
        n
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Writes a solid RGBA PNG.
pub fn write_png(path: &Path, width: u32, height: u32, rgba: [u8; 4]) {
    image::RgbaImage::from_pixel(width, height, image::Rgba(rgba))
        .save(path)
        .unwrap();
}

/// Two textured quads sharing `shared.png`, plus an untextured triangle.
pub const THREE_PART_MODEL: &str = r#"(
    submeshes: [
        (
            name: Some("left"),
            positions: [(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (1.0, 1.0, 0.0), (0.0, 1.0, 0.0)],
            tex_coords: [(0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)],
            indices: [0, 1, 2, 0, 2, 3],
            material: (texture: Some("shared.png")),
        ),
        (
            name: Some("right"),
            positions: [(2.0, 0.0, 0.0), (3.0, 0.0, 0.0), (3.0, 1.0, 0.0), (2.0, 1.0, 0.0)],
            tex_coords: [(0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)],
            indices: [0, 1, 2, 0, 2, 3],
            material: (texture: Some("shared.png"), power: 16.0),
        ),
        (
            positions: [(0.0, 0.0, 1.0), (1.0, 0.0, 1.0), (0.0, 1.0, 1.0)],
            normals: [(0.0, 0.0, -1.0), (0.0, 0.0, -1.0), (0.0, 0.0, -1.0)],
            material: (diffuse: (1.0, 0.0, 0.0, 1.0)),
        ),
    ],
)"#;

/// Writes [`THREE_PART_MODEL`] and its texture into a scratch dir and
/// returns the manifest path.
pub fn write_three_part_model() -> PathBuf {
    let dir = scratch_dir("model");
    write_png(&dir.join("shared.png"), 2, 2, [0, 128, 255, 255]);
    let path = dir.join("three_part.ron");
    std::fs::write(&path, THREE_PART_MODEL).unwrap();
    path
}
