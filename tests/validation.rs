mod common;

use common::*;
use glam::{Mat4, Vec3};
use pretty_assertions::assert_eq;
use sandgfx::*;

type ValidatedCache = ResourceCache<ValidatingDevice<RecordingDevice>>;

fn cache() -> ValidatedCache {
    ResourceCache::new(ValidatingDevice::new(RecordingDevice::new()))
}

fn submit(cache: &mut ValidatedCache, build: impl FnOnce(&mut FilteringCommandList)) {
    let mut cmd = FilteringCommandList::new();
    build(&mut cmd);
    cache.device_mut().submit(&[cmd.finish()]).unwrap();
}

#[test]
fn valid_frame_passes_through_unchanged() {
    let mut cache = cache();
    let vertices = triangle_vertices();
    let vb = cache
        .create_vertex_buffer("tri", triangle_layout(), vertices.len() as u32, Some(&vertices))
        .unwrap();
    let ib = cache
        .create_index_buffer("tri", IndexType::U16, 6, Some(bytemuck::cast_slice(&[0u16, 1, 2])))
        .unwrap();
    let pipeline = cache
        .create_pipeline(&PipelineInfo {
            vertex_layout: triangle_layout(),
            lighting: true,
            ..Default::default()
        })
        .unwrap();
    let texture = cache.create_texture_2d("white", 1, 1, &[255; 4]).unwrap();
    let sampler = cache.create_sampler(&SamplerInfo::default()).unwrap();

    let projection = Mat4::perspective_lh(1.0, 1.5, 0.1, 50.0);
    let lights = [
        Light::directional(Vec3::new(0.0, -1.0, 1.0), Color::WHITE),
        Light::point(Vec3::new(0.0, 2.0, 0.0), Color::rgb(1.0, 0.5, 0.0), 10.0),
    ];
    submit(&mut cache, |cmd| {
        cmd.clear(ClearAttachments {
            depth: 0.0,
            ..Default::default()
        });
        cmd.set_transform(TransformSlot::Projection, projection);
        cmd.set_lights(&lights);
        cmd.set_ambient_light(Color::rgb(0.1, 0.1, 0.1));
        cmd.bind_pipeline(pipeline);
        cmd.bind_sampler(0, sampler);
        cmd.bind_texture(0, texture);
        cmd.bind_vertex_buffer(vb, 0);
        cmd.bind_index_buffer(ib);
        cmd.draw_indexed(DrawIndexed {
            num_vertices: 3,
            index_count: 3,
            ..Default::default()
        });
    });

    let device = cache.device();
    let native = |cmd: Command| match cmd {
        Command::BindPipeline(_) => Command::BindPipeline(BindPipeline {
            pipeline: device.native_pipeline(pipeline).unwrap(),
        }),
        Command::BindTexture(b) => Command::BindTexture(BindTexture {
            stage: b.stage,
            texture: device.native_texture(texture).unwrap(),
        }),
        Command::BindVertexBuffer(b) => Command::BindVertexBuffer(BindVertexBuffer {
            buffer: device.native_buffer(vb).unwrap(),
            offset: b.offset,
        }),
        Command::BindIndexBuffer(_) => Command::BindIndexBuffer(BindIndexBuffer {
            buffer: device.native_buffer(ib).unwrap(),
        }),
        other => other,
    };

    let recorded = &device.inner().submitted;
    assert_eq!(recorded.len(), 10);
    // Samplers are the only handle whose translation is not exposed; compare
    // everything else command by command.
    let mut expected = FilteringCommandList::new();
    expected.clear(ClearAttachments {
        depth: 0.0,
        ..Default::default()
    });
    expected.set_transform(TransformSlot::Projection, projection);
    expected.set_lights(&lights);
    expected.set_ambient_light(Color::rgb(0.1, 0.1, 0.1));
    expected.bind_pipeline(pipeline);
    expected.bind_sampler(0, sampler);
    expected.bind_texture(0, texture);
    expected.bind_vertex_buffer(vb, 0);
    expected.bind_index_buffer(ib);
    expected.draw_indexed(DrawIndexed {
        num_vertices: 3,
        index_count: 3,
        ..Default::default()
    });
    for (got, want) in recorded.iter().zip(expected.finish().iter()) {
        if want.kind() == Op::BindSampler {
            assert_eq!(got.kind(), Op::BindSampler);
            continue;
        }
        assert_eq!(got, &native(want.clone()));
    }
    assert!(device.is_bijective());
}

#[test]
fn destroyed_resources_are_released_natively() {
    let mut cache = cache();
    let vertices = positions(3);
    let mesh = cache
        .create_mesh(&MeshInfo {
            vertices: &vertices,
            ..Default::default()
        })
        .unwrap();
    let vb = cache.mesh(mesh).unwrap().vertex_buffer;
    let native = cache.device().native_buffer(vb).unwrap();

    cache.destroy_mesh(mesh);
    assert_eq!(cache.device().native_buffer(vb), None);
    assert!(!cache.device().inner().inner.is_buffer(native));
}

#[test]
#[should_panic(expected = "unknown_handle")]
fn stale_mesh_buffer_is_rejected() {
    let mut cache = cache();
    let vertices = positions(3);
    let mesh = cache
        .create_mesh(&MeshInfo {
            vertices: &vertices,
            ..Default::default()
        })
        .unwrap();
    let vb = cache.mesh(mesh).unwrap().vertex_buffer;
    cache.destroy_mesh(mesh);

    submit(&mut cache, |cmd| cmd.bind_vertex_buffer(vb, 0));
}

#[test]
#[should_panic(expected = "unknown_handle")]
fn recycled_slot_rejects_the_old_handle() {
    let mut cache = cache();
    let old = cache.create_pipeline(&PipelineInfo::default()).unwrap();
    cache.destroy_pipeline(old);
    let new = cache.create_pipeline(&PipelineInfo::default()).unwrap();
    assert_eq!(old.slot, new.slot);
    submit(&mut cache, |cmd| cmd.bind_pipeline(old));
}

#[test]
#[should_panic(expected = "vertex_buffer_range")]
fn binding_past_the_last_vertex_is_rejected() {
    let mut cache = cache();
    let vertices = positions(2);
    let vb = cache
        .create_vertex_buffer("vb", VertexLayout::POSITION, 24, Some(&vertices))
        .unwrap();
    submit(&mut cache, |cmd| cmd.bind_vertex_buffer(vb, 16));
}

#[test]
#[should_panic(expected = "index_buffer_usage")]
fn vertex_buffer_as_indices_is_rejected() {
    let mut cache = cache();
    let vb = cache
        .create_vertex_buffer("vb", VertexLayout::POSITION, 36, None)
        .unwrap();
    submit(&mut cache, |cmd| cmd.bind_index_buffer(vb));
}

#[test]
#[should_panic(expected = "indexed_point_list")]
fn point_list_stays_bound_across_submits() {
    let mut cache = cache();
    let vertices = positions(3);
    let vb = cache
        .create_vertex_buffer("points", VertexLayout::POSITION, 36, Some(&vertices))
        .unwrap();
    let ib = cache
        .create_index_buffer("points", IndexType::U16, 6, Some(bytemuck::cast_slice(&[0u16, 1, 2])))
        .unwrap();
    let points = cache
        .create_pipeline(&PipelineInfo {
            primitive: PrimitiveType::PointList,
            ..Default::default()
        })
        .unwrap();

    submit(&mut cache, |cmd| {
        cmd.bind_pipeline(points);
        cmd.bind_vertex_buffer(vb, 0);
        cmd.bind_index_buffer(ib);
    });
    submit(&mut cache, |cmd| {
        cmd.draw_indexed(DrawIndexed {
            num_vertices: 3,
            index_count: 3,
            ..Default::default()
        })
    });
}

#[test]
#[should_panic(expected = "projection_w")]
fn right_handed_projection_is_rejected() {
    let mut cache = cache();
    let projection = Mat4::perspective_rh(1.0, 1.5, 0.1, 50.0);
    submit(&mut cache, |cmd| {
        cmd.set_transform(TransformSlot::Projection, projection)
    });
}

#[test]
#[should_panic(expected = "light_count")]
fn too_many_lights_are_rejected() {
    let mut cache = cache();
    let max = cache.device().caps().max_lights as usize;
    let lights = vec![Light::default(); max + 1];
    submit(&mut cache, |cmd| cmd.set_lights(&lights));
}

#[test]
#[should_panic(expected = "clear_depth")]
fn clear_depth_above_one_is_rejected() {
    let mut cache = cache();
    submit(&mut cache, |cmd| {
        cmd.clear(ClearAttachments {
            depth: 1.5,
            ..Default::default()
        })
    });
}

#[test]
fn limits_are_inclusive() {
    let mut cache = cache();
    let max = cache.device().caps().max_lights as usize;
    let lights = vec![Light::default(); max];
    submit(&mut cache, |cmd| {
        cmd.set_lights(&lights);
        cmd.clear(ClearAttachments {
            attachments: ClearFlags::DEPTH,
            depth: 1.0,
            ..Default::default()
        });
    });
    assert_eq!(
        cache.device().inner().kinds(),
        vec![Op::SetLights, Op::ClearAttachments]
    );
}

#[test]
#[should_panic(expected = "texture_stage")]
fn texture_stage_past_the_limit_is_rejected() {
    let mut cache = cache();
    let texture = cache.create_texture_2d("t", 1, 1, &[0; 4]).unwrap();
    let stage = cache.device().caps().max_texture_stages;
    submit(&mut cache, |cmd| cmd.bind_texture(stage, texture));
}

#[test]
#[should_panic(expected = "extension_unsupported")]
fn unadvertised_extension_is_rejected() {
    let mut cache = ResourceCache::new(ValidatingDevice::new(NullDevice::with_caps(
        DeviceCaps::default(),
    )));
    let mut cmd = FilteringCommandList::new();
    cmd.extension(ExtensionCommand::RenderUi);
    cache.device_mut().submit(&[cmd.finish()]).unwrap();
}

#[test]
#[should_panic(expected = "vertex_layout")]
fn malformed_layout_is_rejected() {
    let mut cache = cache();
    let _ = cache.create_vertex_buffer(
        "vb",
        VertexLayout::POSITION | VertexLayout::POSITION_T,
        64,
        None,
    );
}

#[test]
fn backend_errors_are_returned_not_panicked() {
    let mut cache = cache();
    let err = cache
        .create_vertex_buffer("empty", VertexLayout::POSITION, 0, None)
        .unwrap_err();
    assert!(matches!(err, GpuError::InvalidInfo(_)));
    assert_eq!(cache.device().live_resources(), 0);
}
