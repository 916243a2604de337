// Draws one colored triangle per frame through the configured device stack.
//
// SANDGFX_LOG=debug cargo run --example hello_triangle

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use sandgfx::logging::init_logging;
use sandgfx::*;

const FRAMES: usize = 3;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    diffuse: u32,
}

fn main() -> Result<()> {
    init_logging();
    let config = DeviceConfig::load_or_default("sandgfx.toml").with_env();
    tracing::info!("device config: {:?}", config);

    let mut cache = ResourceCache::new(make_device(NullDevice::default(), &config));

    let layout = VertexLayout::POSITION | VertexLayout::DIFFUSE;
    let vertices = [
        Vertex {
            position: [-0.5, -0.5, 0.5],
            diffuse: Color::rgb(1.0, 0.0, 0.0).to_argb(),
        },
        Vertex {
            position: [0.0, 0.5, 0.5],
            diffuse: Color::rgb(0.0, 1.0, 0.0).to_argb(),
        },
        Vertex {
            position: [0.5, -0.5, 0.5],
            diffuse: Color::rgb(0.0, 0.0, 1.0).to_argb(),
        },
    ];
    let mesh = cache.create_mesh(&MeshInfo {
        debug_name: "hello_triangle",
        layout,
        vertices: bytemuck::cast_slice(&vertices),
        ..Default::default()
    })?;
    let material = cache.create_material(&MaterialInfo {
        debug_name: "hello_triangle",
        pipeline: PipelineInfo {
            vertex_layout: layout,
            culling: CullMode::None,
            ..Default::default()
        },
        ..Default::default()
    })?;

    let projection = Mat4::perspective_lh(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 0.1, 10.0);
    for frame in 0..FRAMES {
        if let Err(err) = ensure_ready(cache.device_mut()) {
            tracing::warn!("skipping frame {}: {}", frame, err);
            continue;
        }

        let mut cmd = FilteringCommandList::new();
        cmd.clear(ClearAttachments {
            color: Color::rgb(0.1, 0.1, 0.2),
            ..Default::default()
        });
        cmd.set_transform(TransformSlot::View, Mat4::IDENTITY);
        cmd.set_transform(TransformSlot::Projection, projection);
        cache.record_draw(
            &mut cmd,
            &Drawable {
                world: Mat4::from_rotation_y(frame as f32 * 0.1),
                mesh,
                material,
            },
        )?;

        cache.device_mut().submit(&[cmd.finish()])?;
        cache.device_mut().present()?;
    }

    tracing::info!("presented {} frames, {:?}", FRAMES, cache.stats());
    Ok(())
}
