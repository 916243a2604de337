use std::collections::HashMap;

use glam::Mat4;

use super::types::{Buffer, Handle, Pipeline, Sampler, Texture};
use crate::gpu::structs::{
    Color, FogParameters, MaterialColors, TextureStageState, TransformSlot,
};

/// Records `new` and reports whether it differed from what was tracked.
#[inline]
fn request<T: PartialEq>(current: &mut Option<T>, new: T) -> bool {
    if current.as_ref() == Some(&new) {
        return false;
    }
    *current = Some(new);
    true
}

#[inline]
fn request_keyed<K, T>(map: &mut HashMap<K, T>, key: K, new: T) -> bool
where
    K: std::hash::Hash + Eq,
    T: PartialEq,
{
    if map.get(&key) == Some(&new) {
        return false;
    }
    map.insert(key, new);
    true
}

/// Last device state recorded into a command stream.
///
/// Every `request_*` call returns `true` when the value differs from the
/// tracked one (and must be emitted), `false` when it is redundant. Unknown
/// state always counts as different.
#[derive(Default, Debug, Clone)]
pub struct StateTracker {
    pipeline: Option<Handle<Pipeline>>,
    vertex_buffer: Option<(Handle<Buffer>, u32)>,
    index_buffer: Option<Handle<Buffer>>,
    samplers: HashMap<u32, Handle<Sampler>>,
    textures: HashMap<u32, Handle<Texture>>,
    transforms: HashMap<TransformSlot, Mat4>,
    material: Option<MaterialColors>,
    ambient: Option<Color>,
    fog: Option<FogParameters>,
    stages: HashMap<u32, TextureStageState>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets everything, so the next request of any kind is emitted.
    pub fn reset(&mut self) {
        self.pipeline = None;
        self.vertex_buffer = None;
        self.index_buffer = None;
        self.samplers.clear();
        self.textures.clear();
        self.transforms.clear();
        self.material = None;
        self.ambient = None;
        self.fog = None;
        self.stages.clear();
    }

    pub fn request_pipeline(&mut self, pipeline: Handle<Pipeline>) -> bool {
        request(&mut self.pipeline, pipeline)
    }

    pub fn request_vertex_buffer(&mut self, buffer: Handle<Buffer>, offset: u32) -> bool {
        request(&mut self.vertex_buffer, (buffer, offset))
    }

    pub fn request_index_buffer(&mut self, buffer: Handle<Buffer>) -> bool {
        request(&mut self.index_buffer, buffer)
    }

    pub fn request_sampler(&mut self, stage: u32, sampler: Handle<Sampler>) -> bool {
        request_keyed(&mut self.samplers, stage, sampler)
    }

    pub fn request_texture(&mut self, stage: u32, texture: Handle<Texture>) -> bool {
        request_keyed(&mut self.textures, stage, texture)
    }

    pub fn request_transform(&mut self, slot: TransformSlot, matrix: Mat4) -> bool {
        request_keyed(&mut self.transforms, slot, matrix)
    }

    pub fn request_material(&mut self, material: MaterialColors) -> bool {
        request(&mut self.material, material)
    }

    pub fn request_ambient(&mut self, color: Color) -> bool {
        request(&mut self.ambient, color)
    }

    pub fn request_fog(&mut self, fog: FogParameters) -> bool {
        request(&mut self.fog, fog)
    }

    pub fn request_texture_stage(&mut self, stage: u32, state: TextureStageState) -> bool {
        request_keyed(&mut self.stages, stage, state)
    }

    pub fn current_pipeline(&self) -> Option<Handle<Pipeline>> {
        self.pipeline
    }

    pub fn current_transform(&self, slot: TransformSlot) -> Option<Mat4> {
        self.transforms.get(&slot).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_state_changes() {
        let mut tracker = StateTracker::new();
        let a = Handle::<Pipeline>::new(0, 1);
        let b = Handle::<Pipeline>::new(1, 2);
        assert!(tracker.request_pipeline(a));
        assert!(!tracker.request_pipeline(a));
        assert!(tracker.request_pipeline(b));
        assert_eq!(tracker.current_pipeline(), Some(b));
    }

    #[test]
    fn vertex_buffer_offset_is_part_of_state() {
        let mut tracker = StateTracker::new();
        let buf = Handle::<Buffer>::new(0, 1);
        assert!(tracker.request_vertex_buffer(buf, 0));
        assert!(!tracker.request_vertex_buffer(buf, 0));
        assert!(tracker.request_vertex_buffer(buf, 64));
    }

    #[test]
    fn stage_state_is_tracked_per_stage() {
        let mut tracker = StateTracker::new();
        let tex = Handle::<Texture>::new(3, 7);
        assert!(tracker.request_texture(0, tex));
        assert!(tracker.request_texture(1, tex));
        assert!(!tracker.request_texture(0, tex));
    }

    #[test]
    fn reset_forgets_everything() {
        let mut tracker = StateTracker::new();
        assert!(tracker.request_transform(TransformSlot::View, Mat4::IDENTITY));
        assert!(tracker.request_ambient(Color::WHITE));
        tracker.reset();
        assert!(tracker.request_transform(TransformSlot::View, Mat4::IDENTITY));
        assert!(tracker.request_ambient(Color::WHITE));
    }
}
