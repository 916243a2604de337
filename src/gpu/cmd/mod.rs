use glam::Mat4;

use crate::gpu::driver::command::{
    BindIndexBuffer, BindPipeline, BindSampler, BindTexture, BindVertexBuffer, ClearAttachments,
    Command, CommandList, CommandSink, Draw, DrawIndexed, ExtensionCommand, SetAmbientLight,
    SetLights, SetTextureStageState, SetTransform,
};
use crate::gpu::driver::state::StateTracker;
use crate::gpu::driver::types::{Buffer, Handle, Pipeline, Sampler, Texture};
use crate::gpu::structs::{
    Color, FogParameters, Light, MaterialColors, TextureStageState, TransformSlot,
};

/// Records commands while eliding "set" calls that would not change device
/// state.
///
/// The resulting list is order-preserving and equivalent to recording every
/// call: draws, clears, light lists and extension commands are always kept,
/// and an extension command forgets all shadowed state since backends may
/// change fixed-function state behind it.
#[derive(Default)]
pub struct FilteringCommandList {
    list: CommandList,
    state: StateTracker,
    elided: usize,
}

impl FilteringCommandList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs an already recorded list through the filter.
    pub fn filter(list: &CommandList) -> CommandList {
        let mut filtering = Self::new();
        list.replay(&mut filtering);
        filtering.finish()
    }

    fn keep(&mut self, changed: bool, cmd: Command) {
        if changed {
            self.list.push(cmd);
        } else {
            self.elided += 1;
        }
    }

    pub fn clear(&mut self, cmd: ClearAttachments) {
        self.list.push(Command::ClearAttachments(cmd));
    }

    pub fn draw(&mut self, first_vertex: u32, vertex_count: u32) {
        self.list.push(Command::Draw(Draw {
            first_vertex,
            vertex_count,
        }));
    }

    pub fn draw_indexed(&mut self, cmd: DrawIndexed) {
        self.list.push(Command::DrawIndexed(cmd));
    }

    pub fn bind_pipeline(&mut self, pipeline: Handle<Pipeline>) {
        let changed = self.state.request_pipeline(pipeline);
        self.keep(changed, Command::BindPipeline(BindPipeline { pipeline }));
    }

    pub fn bind_vertex_buffer(&mut self, buffer: Handle<Buffer>, offset: u32) {
        let changed = self.state.request_vertex_buffer(buffer, offset);
        self.keep(
            changed,
            Command::BindVertexBuffer(BindVertexBuffer { buffer, offset }),
        );
    }

    pub fn bind_index_buffer(&mut self, buffer: Handle<Buffer>) {
        let changed = self.state.request_index_buffer(buffer);
        self.keep(changed, Command::BindIndexBuffer(BindIndexBuffer { buffer }));
    }

    pub fn bind_sampler(&mut self, stage: u32, sampler: Handle<Sampler>) {
        let changed = self.state.request_sampler(stage, sampler);
        self.keep(changed, Command::BindSampler(BindSampler { stage, sampler }));
    }

    pub fn bind_texture(&mut self, stage: u32, texture: Handle<Texture>) {
        let changed = self.state.request_texture(stage, texture);
        self.keep(changed, Command::BindTexture(BindTexture { stage, texture }));
    }

    pub fn set_transform(&mut self, slot: TransformSlot, matrix: Mat4) {
        let changed = self.state.request_transform(slot, matrix);
        self.keep(changed, Command::SetTransform(SetTransform { slot, matrix }));
    }

    pub fn set_ambient_light(&mut self, color: Color) {
        let changed = self.state.request_ambient(color);
        self.keep(changed, Command::SetAmbientLight(SetAmbientLight { color }));
    }

    /// Replaces the light list. Never elided.
    pub fn set_lights(&mut self, lights: &[Light]) {
        self.list.push(Command::SetLights(SetLights {
            lights: lights.to_vec(),
        }));
    }

    pub fn set_material(&mut self, material: MaterialColors) {
        let changed = self.state.request_material(material);
        self.keep(changed, Command::SetMaterial(material));
    }

    pub fn set_fog_parameters(&mut self, fog: FogParameters) {
        let changed = self.state.request_fog(fog);
        self.keep(changed, Command::SetFogParameters(fog));
    }

    pub fn set_texture_stage_state(&mut self, stage: u32, state: TextureStageState) {
        let changed = self.state.request_texture_stage(stage, state);
        self.keep(
            changed,
            Command::SetTextureStageState(SetTextureStageState { stage, state }),
        );
    }

    pub fn extension(&mut self, cmd: ExtensionCommand) {
        self.list.push(Command::Extension(cmd));
        self.state.reset();
    }

    /// Number of calls dropped as redundant so far.
    pub fn elided(&self) -> usize {
        self.elided
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn commands(&self) -> &CommandList {
        &self.list
    }

    pub fn finish(self) -> CommandList {
        tracing::trace!(
            "recorded {} commands, elided {}",
            self.list.len(),
            self.elided
        );
        self.list
    }
}

impl CommandSink for FilteringCommandList {
    fn clear_attachments(&mut self, cmd: &ClearAttachments) {
        self.clear(*cmd);
    }

    fn draw(&mut self, cmd: &Draw) {
        FilteringCommandList::draw(self, cmd.first_vertex, cmd.vertex_count);
    }

    fn draw_indexed(&mut self, cmd: &DrawIndexed) {
        FilteringCommandList::draw_indexed(self, *cmd);
    }

    fn bind_pipeline(&mut self, cmd: &BindPipeline) {
        FilteringCommandList::bind_pipeline(self, cmd.pipeline);
    }

    fn bind_vertex_buffer(&mut self, cmd: &BindVertexBuffer) {
        FilteringCommandList::bind_vertex_buffer(self, cmd.buffer, cmd.offset);
    }

    fn bind_index_buffer(&mut self, cmd: &BindIndexBuffer) {
        FilteringCommandList::bind_index_buffer(self, cmd.buffer);
    }

    fn bind_sampler(&mut self, cmd: &BindSampler) {
        FilteringCommandList::bind_sampler(self, cmd.stage, cmd.sampler);
    }

    fn bind_texture(&mut self, cmd: &BindTexture) {
        FilteringCommandList::bind_texture(self, cmd.stage, cmd.texture);
    }

    fn set_transform(&mut self, cmd: &SetTransform) {
        FilteringCommandList::set_transform(self, cmd.slot, cmd.matrix);
    }

    fn set_ambient_light(&mut self, cmd: &SetAmbientLight) {
        FilteringCommandList::set_ambient_light(self, cmd.color);
    }

    fn set_lights(&mut self, cmd: &SetLights) {
        FilteringCommandList::set_lights(self, &cmd.lights);
    }

    fn set_material(&mut self, cmd: &MaterialColors) {
        FilteringCommandList::set_material(self, *cmd);
    }

    fn set_fog_parameters(&mut self, cmd: &FogParameters) {
        FilteringCommandList::set_fog_parameters(self, *cmd);
    }

    fn set_texture_stage_state(&mut self, cmd: &SetTextureStageState) {
        FilteringCommandList::set_texture_stage_state(self, cmd.stage, cmd.state);
    }

    fn extension(&mut self, cmd: &ExtensionCommand) {
        FilteringCommandList::extension(self, *cmd);
    }
}
