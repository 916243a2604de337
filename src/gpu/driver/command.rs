use std::fmt;

use glam::Mat4;

use super::types::{Buffer, ClearFlags, Effect, Extensions, Handle, Pipeline, Sampler, Texture};
use crate::gpu::structs::{
    Color, FogParameters, Light, MaterialColors, TextureStageState, TransformSlot,
};

//===----------------------------------------------------------------------===//
// Command definitions
//===----------------------------------------------------------------------===//

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    ClearAttachments,
    Draw,
    DrawIndexed,
    BindPipeline,
    BindVertexBuffer,
    BindIndexBuffer,
    BindSampler,
    BindTexture,
    SetTransform,
    SetAmbientLight,
    SetLights,
    SetMaterial,
    SetFogParameters,
    SetTextureStageState,
    Extension,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearAttachments {
    pub attachments: ClearFlags,
    pub color: Color,
    /// Depth clear value, `[0, 1]`.
    pub depth: f32,
    pub stencil: u32,
}

impl Default for ClearAttachments {
    fn default() -> Self {
        Self {
            attachments: ClearFlags::COLOR | ClearFlags::DEPTH,
            color: Color::BLACK,
            depth: 1.0,
            stencil: 0,
        }
    }
}

/// Non-indexed draw from the bound vertex buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Draw {
    pub first_vertex: u32,
    pub vertex_count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct DrawIndexed {
    /// Added to every index before fetching a vertex.
    pub vertex_offset: i32,
    /// Lowest vertex index referenced.
    pub min_index: u32,
    /// Number of vertices spanned starting at `min_index`.
    pub num_vertices: u32,
    pub first_index: u32,
    pub index_count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindPipeline {
    pub pipeline: Handle<Pipeline>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindVertexBuffer {
    pub buffer: Handle<Buffer>,
    /// Byte offset of the first vertex.
    pub offset: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindIndexBuffer {
    pub buffer: Handle<Buffer>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindSampler {
    pub stage: u32,
    pub sampler: Handle<Sampler>,
}

/// Binding a null texture clears the stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindTexture {
    pub stage: u32,
    pub texture: Handle<Texture>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SetTransform {
    pub slot: TransformSlot,
    pub matrix: Mat4,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SetAmbientLight {
    pub color: Color,
}

/// Replaces the whole enabled light list. Lights past the end are disabled.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SetLights {
    pub lights: Vec<Light>,
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct SetTextureStageState {
    pub stage: u32,
    pub state: TextureStageState,
}

/// Backend-specific operations. Only legal on a device advertising
/// [`ExtensionCommand::required`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtensionCommand {
    /// Draws one attribute range of the bound buffers as authored by the asset.
    DrawSubmesh { subset: u32 },
    /// Flushes the backend's immediate-mode UI draw data.
    RenderUi,
    BeginEffectPass { effect: Handle<Effect>, pass: u32 },
    EndEffectPass { effect: Handle<Effect> },
}

impl ExtensionCommand {
    pub fn required(&self) -> Extensions {
        match self {
            ExtensionCommand::DrawSubmesh { .. } => Extensions::SUBMESH_DRAW,
            ExtensionCommand::RenderUi => Extensions::IMMEDIATE_UI,
            ExtensionCommand::BeginEffectPass { .. } | ExtensionCommand::EndEffectPass { .. } => {
                Extensions::EFFECTS
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    ClearAttachments(ClearAttachments),
    Draw(Draw),
    DrawIndexed(DrawIndexed),
    BindPipeline(BindPipeline),
    BindVertexBuffer(BindVertexBuffer),
    BindIndexBuffer(BindIndexBuffer),
    BindSampler(BindSampler),
    BindTexture(BindTexture),
    SetTransform(SetTransform),
    SetAmbientLight(SetAmbientLight),
    SetLights(SetLights),
    SetMaterial(MaterialColors),
    SetFogParameters(FogParameters),
    SetTextureStageState(SetTextureStageState),
    Extension(ExtensionCommand),
}

impl Command {
    pub fn kind(&self) -> Op {
        match self {
            Command::ClearAttachments(_) => Op::ClearAttachments,
            Command::Draw(_) => Op::Draw,
            Command::DrawIndexed(_) => Op::DrawIndexed,
            Command::BindPipeline(_) => Op::BindPipeline,
            Command::BindVertexBuffer(_) => Op::BindVertexBuffer,
            Command::BindIndexBuffer(_) => Op::BindIndexBuffer,
            Command::BindSampler(_) => Op::BindSampler,
            Command::BindTexture(_) => Op::BindTexture,
            Command::SetTransform(_) => Op::SetTransform,
            Command::SetAmbientLight(_) => Op::SetAmbientLight,
            Command::SetLights(_) => Op::SetLights,
            Command::SetMaterial(_) => Op::SetMaterial,
            Command::SetFogParameters(_) => Op::SetFogParameters,
            Command::SetTextureStageState(_) => Op::SetTextureStageState,
            Command::Extension(_) => Op::Extension,
        }
    }

    /// Dispatches this command to the matching [`CommandSink`] method.
    pub fn visit<S: CommandSink + ?Sized>(&self, sink: &mut S) {
        match self {
            Command::ClearAttachments(cmd) => sink.clear_attachments(cmd),
            Command::Draw(cmd) => sink.draw(cmd),
            Command::DrawIndexed(cmd) => sink.draw_indexed(cmd),
            Command::BindPipeline(cmd) => sink.bind_pipeline(cmd),
            Command::BindVertexBuffer(cmd) => sink.bind_vertex_buffer(cmd),
            Command::BindIndexBuffer(cmd) => sink.bind_index_buffer(cmd),
            Command::BindSampler(cmd) => sink.bind_sampler(cmd),
            Command::BindTexture(cmd) => sink.bind_texture(cmd),
            Command::SetTransform(cmd) => sink.set_transform(cmd),
            Command::SetAmbientLight(cmd) => sink.set_ambient_light(cmd),
            Command::SetLights(cmd) => sink.set_lights(cmd),
            Command::SetMaterial(cmd) => sink.set_material(cmd),
            Command::SetFogParameters(cmd) => sink.set_fog_parameters(cmd),
            Command::SetTextureStageState(cmd) => sink.set_texture_stage_state(cmd),
            Command::Extension(cmd) => sink.extension(cmd),
        }
    }
}

fn fmt_color(c: &Color) -> String {
    format!("({:.3}, {:.3}, {:.3}, {:.3})", c.r, c.g, c.b, c.a)
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::ClearAttachments(c) => write!(
                f,
                "ClearAttachments {:?} color={} depth={} stencil={}",
                c.attachments,
                fmt_color(&c.color),
                c.depth,
                c.stencil
            ),
            Command::Draw(c) => write!(
                f,
                "Draw first_vertex={} vertex_count={}",
                c.first_vertex, c.vertex_count
            ),
            Command::DrawIndexed(c) => write!(
                f,
                "DrawIndexed vertex_offset={} min_index={} num_vertices={} first_index={} index_count={}",
                c.vertex_offset, c.min_index, c.num_vertices, c.first_index, c.index_count
            ),
            Command::BindPipeline(c) => write!(f, "BindPipeline {:?}", c.pipeline),
            Command::BindVertexBuffer(c) => {
                write!(f, "BindVertexBuffer {:?} offset={}", c.buffer, c.offset)
            }
            Command::BindIndexBuffer(c) => write!(f, "BindIndexBuffer {:?}", c.buffer),
            Command::BindSampler(c) => write!(f, "BindSampler stage={} {:?}", c.stage, c.sampler),
            Command::BindTexture(c) => write!(f, "BindTexture stage={} {:?}", c.stage, c.texture),
            Command::SetTransform(c) => write!(f, "SetTransform {:?}", c.slot),
            Command::SetAmbientLight(c) => write!(f, "SetAmbientLight {}", fmt_color(&c.color)),
            Command::SetLights(c) => write!(f, "SetLights count={}", c.lights.len()),
            Command::SetMaterial(m) => write!(
                f,
                "SetMaterial diffuse={} power={}",
                fmt_color(&m.diffuse),
                m.power
            ),
            Command::SetFogParameters(p) => write!(f, "SetFogParameters {:?}", p.mode),
            Command::SetTextureStageState(c) => write!(
                f,
                "SetTextureStageState stage={} color_op={:?} alpha_op={:?}",
                c.stage, c.state.color_op, c.state.alpha_op
            ),
            Command::Extension(e) => write!(f, "Extension {:?}", e),
        }
    }
}

//===----------------------------------------------------------------------===//
// Command list
//===----------------------------------------------------------------------===//

/// Ordered, append-only sequence of commands. Backends execute it front to back.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandList {
    commands: Vec<Command>,
}

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Moves every command of `other` onto the end of this list.
    pub fn append(&mut self, other: &mut CommandList) {
        self.commands.append(&mut other.commands);
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Visits every command in recorded order. Returns the number visited.
    pub fn replay<S: CommandSink + ?Sized>(&self, sink: &mut S) -> usize {
        for cmd in &self.commands {
            cmd.visit(sink);
        }
        self.commands.len()
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

impl FromIterator<Command> for CommandList {
    fn from_iter<I: IntoIterator<Item = Command>>(iter: I) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for CommandList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cmd) in self.commands.iter().enumerate() {
            writeln!(f, "{:4}: {}", i, cmd)?;
        }
        Ok(())
    }
}

/// Read-only visitor over recorded commands.
pub trait CommandSink {
    fn clear_attachments(&mut self, cmd: &ClearAttachments);
    fn draw(&mut self, cmd: &Draw);
    fn draw_indexed(&mut self, cmd: &DrawIndexed);
    fn bind_pipeline(&mut self, cmd: &BindPipeline);
    fn bind_vertex_buffer(&mut self, cmd: &BindVertexBuffer);
    fn bind_index_buffer(&mut self, cmd: &BindIndexBuffer);
    fn bind_sampler(&mut self, cmd: &BindSampler);
    fn bind_texture(&mut self, cmd: &BindTexture);
    fn set_transform(&mut self, cmd: &SetTransform);
    fn set_ambient_light(&mut self, cmd: &SetAmbientLight);
    fn set_lights(&mut self, cmd: &SetLights);
    fn set_material(&mut self, cmd: &MaterialColors);
    fn set_fog_parameters(&mut self, cmd: &FogParameters);
    fn set_texture_stage_state(&mut self, cmd: &SetTextureStageState);
    fn extension(&mut self, cmd: &ExtensionCommand);
}

/// Replaying into a list copies the commands verbatim.
impl CommandSink for CommandList {
    fn clear_attachments(&mut self, cmd: &ClearAttachments) {
        self.push(Command::ClearAttachments(*cmd));
    }

    fn draw(&mut self, cmd: &Draw) {
        self.push(Command::Draw(*cmd));
    }

    fn draw_indexed(&mut self, cmd: &DrawIndexed) {
        self.push(Command::DrawIndexed(*cmd));
    }

    fn bind_pipeline(&mut self, cmd: &BindPipeline) {
        self.push(Command::BindPipeline(*cmd));
    }

    fn bind_vertex_buffer(&mut self, cmd: &BindVertexBuffer) {
        self.push(Command::BindVertexBuffer(*cmd));
    }

    fn bind_index_buffer(&mut self, cmd: &BindIndexBuffer) {
        self.push(Command::BindIndexBuffer(*cmd));
    }

    fn bind_sampler(&mut self, cmd: &BindSampler) {
        self.push(Command::BindSampler(*cmd));
    }

    fn bind_texture(&mut self, cmd: &BindTexture) {
        self.push(Command::BindTexture(*cmd));
    }

    fn set_transform(&mut self, cmd: &SetTransform) {
        self.push(Command::SetTransform(*cmd));
    }

    fn set_ambient_light(&mut self, cmd: &SetAmbientLight) {
        self.push(Command::SetAmbientLight(*cmd));
    }

    fn set_lights(&mut self, cmd: &SetLights) {
        self.push(Command::SetLights(cmd.clone()));
    }

    fn set_material(&mut self, cmd: &MaterialColors) {
        self.push(Command::SetMaterial(*cmd));
    }

    fn set_fog_parameters(&mut self, cmd: &FogParameters) {
        self.push(Command::SetFogParameters(*cmd));
    }

    fn set_texture_stage_state(&mut self, cmd: &SetTextureStageState) {
        self.push(Command::SetTextureStageState(*cmd));
    }

    fn extension(&mut self, cmd: &ExtensionCommand) {
        self.push(Command::Extension(*cmd));
    }
}

//===----------------------------------------------------------------------===//
// Tests
//===----------------------------------------------------------------------===//

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Kinds(Vec<Op>);

    impl CommandSink for Kinds {
        fn clear_attachments(&mut self, _: &ClearAttachments) {
            self.0.push(Op::ClearAttachments);
        }
        fn draw(&mut self, _: &Draw) {
            self.0.push(Op::Draw);
        }
        fn draw_indexed(&mut self, _: &DrawIndexed) {
            self.0.push(Op::DrawIndexed);
        }
        fn bind_pipeline(&mut self, _: &BindPipeline) {
            self.0.push(Op::BindPipeline);
        }
        fn bind_vertex_buffer(&mut self, _: &BindVertexBuffer) {
            self.0.push(Op::BindVertexBuffer);
        }
        fn bind_index_buffer(&mut self, _: &BindIndexBuffer) {
            self.0.push(Op::BindIndexBuffer);
        }
        fn bind_sampler(&mut self, _: &BindSampler) {
            self.0.push(Op::BindSampler);
        }
        fn bind_texture(&mut self, _: &BindTexture) {
            self.0.push(Op::BindTexture);
        }
        fn set_transform(&mut self, _: &SetTransform) {
            self.0.push(Op::SetTransform);
        }
        fn set_ambient_light(&mut self, _: &SetAmbientLight) {
            self.0.push(Op::SetAmbientLight);
        }
        fn set_lights(&mut self, _: &SetLights) {
            self.0.push(Op::SetLights);
        }
        fn set_material(&mut self, _: &MaterialColors) {
            self.0.push(Op::SetMaterial);
        }
        fn set_fog_parameters(&mut self, _: &FogParameters) {
            self.0.push(Op::SetFogParameters);
        }
        fn set_texture_stage_state(&mut self, _: &SetTextureStageState) {
            self.0.push(Op::SetTextureStageState);
        }
        fn extension(&mut self, _: &ExtensionCommand) {
            self.0.push(Op::Extension);
        }
    }

    fn sample() -> CommandList {
        let mut list = CommandList::new();
        list.push(Command::ClearAttachments(ClearAttachments::default()));
        list.push(Command::BindPipeline(BindPipeline {
            pipeline: Handle::new(0, 1),
        }));
        list.push(Command::SetLights(SetLights {
            lights: vec![Light::default()],
        }));
        list.push(Command::Draw(Draw {
            first_vertex: 0,
            vertex_count: 3,
        }));
        list.push(Command::Extension(ExtensionCommand::RenderUi));
        list
    }

    #[test]
    fn replay_visits_in_recorded_order() {
        let list = sample();
        let mut kinds = Kinds::default();
        assert_eq!(list.replay(&mut kinds), 5);
        assert_eq!(
            kinds.0,
            vec![
                Op::ClearAttachments,
                Op::BindPipeline,
                Op::SetLights,
                Op::Draw,
                Op::Extension
            ]
        );
    }

    #[test]
    fn replay_into_list_copies_verbatim() {
        let list = sample();
        let mut copy = CommandList::new();
        list.replay(&mut copy);
        assert_eq!(copy, list);
    }

    #[test]
    fn append_moves_commands() {
        let mut a = sample();
        let mut b = sample();
        a.append(&mut b);
        assert_eq!(a.len(), 10);
        assert!(b.is_empty());
    }

    #[test]
    fn display_lists_one_command_per_line() {
        let text = sample().to_string();
        assert_eq!(text.lines().count(), 5);
        assert!(text.contains("Draw first_vertex=0 vertex_count=3"));
        assert!(text.contains("SetLights count=1"));
    }

    #[test]
    fn extension_requirements() {
        assert_eq!(
            ExtensionCommand::DrawSubmesh { subset: 2 }.required(),
            Extensions::SUBMESH_DRAW
        );
        assert_eq!(
            ExtensionCommand::EndEffectPass {
                effect: Handle::null()
            }
            .required(),
            Extensions::EFFECTS
        );
    }
}
