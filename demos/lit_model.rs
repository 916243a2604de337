// Loads a model manifest and renders it under two lights with fog.
//
// cargo run --example lit_model -- [path/to/model.ron]

use glam::{Mat4, Vec3};
use sandgfx::logging::init_logging;
use sandgfx::*;

const DEFAULT_MODEL: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/assets/pyramid.ron");

fn main() -> Result<()> {
    init_logging();
    let config = DeviceConfig::load_or_default("sandgfx.toml").with_env();
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let mut cache = ResourceCache::new(make_device(NullDevice::default(), &config));
    let model = cache.load_model(&path, &[])?;

    let lights = [
        Light::directional(Vec3::new(-0.5, -1.0, 0.5).normalize(), Color::rgb(0.9, 0.9, 0.8)),
        Light::point(Vec3::new(0.0, 3.0, -2.0), Color::rgb(0.2, 0.3, 1.0), 25.0),
    ];
    let view = Mat4::look_at_lh(Vec3::new(0.0, 1.5, -4.0), Vec3::ZERO, Vec3::Y);
    let projection = Mat4::perspective_lh(std::f32::consts::FRAC_PI_3, 4.0 / 3.0, 0.1, 100.0);

    let mut cmd = FilteringCommandList::new();
    cmd.clear(ClearAttachments::default());
    cmd.set_transform(TransformSlot::View, view);
    cmd.set_transform(TransformSlot::Projection, projection);
    cmd.set_ambient_light(Color::rgb(0.15, 0.15, 0.15));
    cmd.set_lights(&lights);
    cmd.set_fog_parameters(FogParameters {
        mode: FogMode::Linear,
        color: Color::rgb(0.5, 0.5, 0.6),
        start: 5.0,
        end: 40.0,
        ..Default::default()
    });
    for x in [-1.5f32, 0.0, 1.5] {
        cache.record_model(&mut cmd, Mat4::from_translation(Vec3::new(x, 0.0, 0.0)), model)?;
    }
    tracing::info!("recorded {} commands, elided {}", cmd.len(), cmd.elided());

    cache.device_mut().submit(&[cmd.finish()])?;
    cache.device_mut().present()?;
    Ok(())
}
