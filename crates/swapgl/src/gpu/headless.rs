//! A GPU-less [`GraphicsContext`] that records every call.
//!
//! Handles are sequential integers, shader sources are kept verbatim and
//! scanned for `uniform`/`attribute` declarations to answer location
//! queries. Failures (compile errors, incomplete framebuffers, missing
//! float support) can be injected so the error paths of the renderers are
//! reachable without a driver.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::{GpgpuError, Result, ShaderStage};
use crate::gpu::context::{Capabilities, FramebufferStatus, GraphicsContext, TextureDescriptor};
use crate::gpu::uniforms::Uniform;

macro_rules! handle {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);
    };
}

handle!(TextureId);
handle!(FramebufferId);
handle!(ProgramId);
handle!(BufferId);

/// Uniform location handed out by [`HeadlessContext`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniformSlot {
    pub program: ProgramId,
    pub name: String,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    CompileProgram {
        program: ProgramId,
    },
    DeleteProgram {
        program: ProgramId,
    },
    UseProgram {
        program: Option<ProgramId>,
    },
    SetUniform {
        program: Option<ProgramId>,
        name: String,
        value: Uniform,
    },
    SetSampler {
        program: Option<ProgramId>,
        name: String,
        unit: u32,
    },
    CreateTexture {
        texture: TextureId,
        descriptor: TextureDescriptor,
        initialized: bool,
    },
    DeleteTexture {
        texture: TextureId,
    },
    BindTexture {
        unit: u32,
        texture: TextureId,
    },
    CreateFramebuffer {
        framebuffer: FramebufferId,
    },
    DeleteFramebuffer {
        framebuffer: FramebufferId,
    },
    BindFramebuffer {
        framebuffer: Option<FramebufferId>,
    },
    AttachColorTexture {
        framebuffer: Option<FramebufferId>,
        texture: TextureId,
        status: u32,
    },
    Viewport {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    Clear {
        color: [f32; 4],
    },
    SetBlend {
        enabled: bool,
    },
    CreateVertexBuffer {
        buffer: BufferId,
        floats: usize,
    },
    DeleteBuffer {
        buffer: BufferId,
    },
    BindVertexAttribute {
        buffer: BufferId,
        location: u32,
        components: i32,
    },
    DrawTriangles {
        program: Option<ProgramId>,
        framebuffer: Option<FramebufferId>,
        first: i32,
        count: i32,
    },
}

#[derive(Debug, Clone)]
struct ProgramSource {
    vertex: String,
    fragment: String,
}

#[derive(Debug, Default)]
struct State {
    next_handle: u32,
    commands: Vec<Command>,
    programs: HashMap<ProgramId, ProgramSource>,
    textures: HashMap<TextureId, (TextureDescriptor, Option<Vec<u8>>)>,
    framebuffers: HashSet<FramebufferId>,
    buffers: HashSet<BufferId>,
    bound_framebuffer: Option<FramebufferId>,
    current_program: Option<ProgramId>,
    pending_compile_failure: Option<(ShaderStage, String)>,
    pending_attachment_failures: Vec<u32>,
}

impl State {
    fn next(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// Recording context; see the module docs.
#[derive(Debug)]
pub struct HeadlessContext {
    capabilities: Capabilities,
    state: RefCell<State>,
}

impl Default for HeadlessContext {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessContext {
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::default())
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            state: RefCell::new(State::default()),
        }
    }

    /// Makes the next `compile_program` call fail at `stage` with `log`.
    pub fn fail_next_compile(&self, stage: ShaderStage, log: impl Into<String>) {
        self.state.borrow_mut().pending_compile_failure = Some((stage, log.into()));
    }

    /// Makes the next `attach_color_texture` call report `status`.
    pub fn fail_next_attachment(&self, status: u32) {
        self.state
            .borrow_mut()
            .pending_attachment_failures
            .push(status);
    }

    pub fn commands(&self) -> Vec<Command> {
        self.state.borrow().commands.clone()
    }

    /// Returns and forgets everything recorded so far.
    pub fn take_commands(&self) -> Vec<Command> {
        std::mem::take(&mut self.state.borrow_mut().commands)
    }

    pub fn draw_calls(&self) -> Vec<Command> {
        self.state
            .borrow()
            .commands
            .iter()
            .filter(|command| matches!(command, Command::DrawTriangles { .. }))
            .cloned()
            .collect()
    }

    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.state.borrow().framebuffers.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn texture_descriptor(&self, texture: TextureId) -> Option<TextureDescriptor> {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .map(|(descriptor, _)| *descriptor)
    }

    /// Bytes uploaded when the texture was created, if any.
    pub fn texture_data(&self, texture: TextureId) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .and_then(|(_, data)| data.clone())
    }

    pub fn bound_framebuffer(&self) -> Option<FramebufferId> {
        self.state.borrow().bound_framebuffer
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.state.borrow().current_program
    }

    pub fn fragment_source(&self, program: ProgramId) -> Option<String> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|source| source.fragment.clone())
    }

    fn record(&self, command: Command) {
        tracing::trace!(?command, "headless gl call");
        self.state.borrow_mut().commands.push(command);
    }
}

/// Finds `name` as a whole identifier on a line opening with one of `qualifiers`.
fn declares(source: &str, qualifiers: &[&str], name: &str) -> bool {
    source.lines().any(|line| {
        let trimmed = line.trim_start();
        qualifiers
            .iter()
            .any(|qualifier| trimmed.starts_with(&format!("{qualifier} ")))
            && trimmed
                .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .any(|token| token == name)
    })
}

impl GraphicsContext for HeadlessContext {
    type Texture = TextureId;
    type Framebuffer = FramebufferId;
    type Program = ProgramId;
    type Buffer = BufferId;
    type UniformLocation = UniformSlot;

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn compile_program(&self, vertex: &str, fragment: &str) -> Result<ProgramId> {
        let program = {
            let mut state = self.state.borrow_mut();
            if let Some((stage, log)) = state.pending_compile_failure.take() {
                return Err(GpgpuError::ShaderCompile { stage, log });
            }
            if !fragment.contains("main") {
                return Err(GpgpuError::ShaderCompile {
                    stage: ShaderStage::Fragment,
                    log: "no main function".to_string(),
                });
            }
            let program = ProgramId(state.next());
            state.programs.insert(
                program,
                ProgramSource {
                    vertex: vertex.to_string(),
                    fragment: fragment.to_string(),
                },
            );
            program
        };
        self.record(Command::CompileProgram { program });
        Ok(program)
    }

    fn delete_program(&self, program: ProgramId) {
        {
            let mut state = self.state.borrow_mut();
            state.programs.remove(&program);
            if state.current_program == Some(program) {
                state.current_program = None;
            }
        }
        self.record(Command::DeleteProgram { program });
    }

    fn use_program(&self, program: Option<ProgramId>) {
        self.state.borrow_mut().current_program = program;
        self.record(Command::UseProgram { program });
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformSlot> {
        let state = self.state.borrow();
        let source = state.programs.get(&program)?;
        let declared = declares(&source.vertex, &["uniform"], name)
            || declares(&source.fragment, &["uniform"], name);
        declared.then(|| UniformSlot {
            program,
            name: name.to_string(),
        })
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        let state = self.state.borrow();
        let source = state.programs.get(&program)?;
        declares(&source.vertex, &["attribute", "in"], name).then_some(0)
    }

    fn set_uniform(&self, location: &UniformSlot, value: &Uniform) {
        let program = self.current_program();
        self.record(Command::SetUniform {
            program,
            name: location.name.clone(),
            value: *value,
        });
    }

    fn set_sampler(&self, location: &UniformSlot, unit: u32) {
        let program = self.current_program();
        self.record(Command::SetSampler {
            program,
            name: location.name.clone(),
            unit,
        });
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        pixels: Option<&[u8]>,
    ) -> Result<TextureId> {
        if !self.capabilities.supports(descriptor.format) {
            return Err(GpgpuError::UnsupportedTexelFormat {
                format: descriptor.format,
            });
        }
        let texture = {
            let mut state = self.state.borrow_mut();
            let texture = TextureId(state.next());
            state
                .textures
                .insert(texture, (*descriptor, pixels.map(<[u8]>::to_vec)));
            texture
        };
        self.record(Command::CreateTexture {
            texture,
            descriptor: *descriptor,
            initialized: pixels.is_some(),
        });
        Ok(texture)
    }

    fn delete_texture(&self, texture: TextureId) {
        self.state.borrow_mut().textures.remove(&texture);
        self.record(Command::DeleteTexture { texture });
    }

    fn bind_texture_unit(&self, unit: u32, texture: TextureId) {
        self.record(Command::BindTexture { unit, texture });
    }

    fn create_framebuffer(&self) -> Result<FramebufferId> {
        let framebuffer = {
            let mut state = self.state.borrow_mut();
            let framebuffer = FramebufferId(state.next());
            state.framebuffers.insert(framebuffer);
            framebuffer
        };
        self.record(Command::CreateFramebuffer { framebuffer });
        Ok(framebuffer)
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferId) {
        {
            let mut state = self.state.borrow_mut();
            state.framebuffers.remove(&framebuffer);
            if state.bound_framebuffer == Some(framebuffer) {
                state.bound_framebuffer = None;
            }
        }
        self.record(Command::DeleteFramebuffer { framebuffer });
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferId>) {
        self.state.borrow_mut().bound_framebuffer = framebuffer;
        self.record(Command::BindFramebuffer { framebuffer });
    }

    fn attach_color_texture(&self, texture: TextureId) -> FramebufferStatus {
        let (framebuffer, status) = {
            let mut state = self.state.borrow_mut();
            let status = if state.pending_attachment_failures.is_empty() {
                FramebufferStatus::COMPLETE
            } else {
                FramebufferStatus(state.pending_attachment_failures.remove(0))
            };
            (state.bound_framebuffer, status)
        };
        self.record(Command::AttachColorTexture {
            framebuffer,
            texture,
            status: status.0,
        });
        status
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(Command::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn clear(&self, color: [f32; 4]) {
        self.record(Command::Clear { color });
    }

    fn set_blend(&self, enabled: bool) {
        self.record(Command::SetBlend { enabled });
    }

    fn create_vertex_buffer(&self, data: &[f32]) -> Result<BufferId> {
        let buffer = {
            let mut state = self.state.borrow_mut();
            let buffer = BufferId(state.next());
            state.buffers.insert(buffer);
            buffer
        };
        self.record(Command::CreateVertexBuffer {
            buffer,
            floats: data.len(),
        });
        Ok(buffer)
    }

    fn delete_buffer(&self, buffer: BufferId) {
        self.state.borrow_mut().buffers.remove(&buffer);
        self.record(Command::DeleteBuffer { buffer });
    }

    fn bind_vertex_attribute(&self, buffer: BufferId, location: u32, components: i32) {
        self.record(Command::BindVertexAttribute {
            buffer,
            location,
            components,
        });
    }

    fn draw_triangles(&self, first: i32, count: i32) {
        let (program, framebuffer) = {
            let state = self.state.borrow();
            (state.current_program, state.bound_framebuffer)
        };
        self.record(Command::DrawTriangles {
            program,
            framebuffer,
            first,
            count,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TexelFormat, TextureFilter};

    #[test]
    fn declares_matches_whole_identifiers_only() {
        let source = "uniform sampler2D uTextureB;\nuniform float uTime;\n";
        assert!(declares(source, &["uniform"], "uTime"));
        assert!(!declares(source, &["uniform"], "uTexture"));
        assert!(!declares("float uTime;", &["uniform"], "uTime"));
    }

    #[test]
    fn unsupported_formats_are_refused() {
        let context = HeadlessContext::with_capabilities(Capabilities {
            float_textures: false,
            ..Capabilities::default()
        });
        let descriptor = TextureDescriptor {
            width: 4,
            height: 4,
            format: TexelFormat::Float,
            filter: TextureFilter::Nearest,
        };
        assert!(matches!(
            context.create_texture(&descriptor, None),
            Err(GpgpuError::UnsupportedTexelFormat { .. })
        ));
        let half = TextureDescriptor {
            format: TexelFormat::HalfFloat,
            ..descriptor
        };
        assert!(context.create_texture(&half, None).is_ok());
    }

    #[test]
    fn injected_attachment_failure_is_reported_once() {
        let context = HeadlessContext::new();
        let texture = context
            .create_texture(
                &TextureDescriptor {
                    width: 1,
                    height: 1,
                    format: TexelFormat::Float,
                    filter: TextureFilter::Nearest,
                },
                None,
            )
            .expect("texture");
        context.fail_next_attachment(0x8CD6);
        assert!(!context.attach_color_texture(texture).is_complete());
        assert!(context.attach_color_texture(texture).is_complete());
    }

    #[test]
    fn commands_serialize_with_op_tag() {
        let context = HeadlessContext::new();
        context.set_blend(false);
        let json = serde_json::to_string(&context.commands()).expect("json");
        assert_eq!(json, r#"[{"op":"set_blend","enabled":false}]"#);
    }
}
