use std::rc::Rc;

use crate::compile::{debug_fragment_shader, vertex_shader};
use crate::error::{GpgpuError, Result};
use crate::gpu::context::GraphicsContext;
use crate::gpu::geometry::GeometryBuffer;
use crate::gpu::program::{ProgramRegistry, ShaderProgram};
use crate::gpu::target::RenderTarget;
use crate::gpu::uniforms::{PassInputs, Uniform};
use crate::types::{
    window_rate, DebugViewport, GlslDialect, RendererConfig, PREVIOUS_TEXTURE_UNIFORM,
    WINDOW_RATE_UNIFORM,
};

/// Opaque black; every pass starts from it so no stale texels survive.
const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Program registry, shared geometry and debug preview common to both
/// renderer flavours. The renderers only decide which target is written and
/// which texture, if any, is fed back as `uTexture`.
pub(crate) struct PassCore<C: GraphicsContext> {
    context: Rc<C>,
    vertex_source: String,
    dialect: GlslDialect,
    programs: ProgramRegistry<C>,
    geometry: GeometryBuffer<C>,
    debug_program: Option<ShaderProgram<C>>,
    debug_viewport: DebugViewport,
    width: u32,
    height: u32,
}

impl<C: GraphicsContext> PassCore<C> {
    pub fn new(context: Rc<C>, config: &RendererConfig) -> Result<Self> {
        let geometry = GeometryBuffer::full_screen_triangle(Rc::clone(&context))?;
        let mut core = Self {
            vertex_source: vertex_shader(config.dialect, config.uv_orientation),
            dialect: config.dialect,
            programs: ProgramRegistry::default(),
            geometry,
            debug_program: None,
            debug_viewport: DebugViewport::default(),
            width: config.width,
            height: config.height,
            context,
        };

        if let Some(fragment) = config.fragment_shader.as_deref() {
            let name = config.initial_program_name();
            core.add_program(fragment, name)?;
            core.programs.activate(name);
        }

        if config.debug {
            let fragment = debug_fragment_shader(core.dialect);
            core.debug_program = Some(core.compile(&fragment)?);
        }

        Ok(core)
    }

    /// Compiles `fragment` against the shared vertex stage and pushes the
    /// current window rate into it.
    fn compile(&self, fragment: &str) -> Result<ShaderProgram<C>> {
        let mut program =
            ShaderProgram::new(Rc::clone(&self.context), &self.vertex_source, fragment)?;
        program.bind();
        program.set_uniform(WINDOW_RATE_UNIFORM, &Uniform::Float(self.window_rate()));
        Ok(program)
    }

    pub fn add_program(&mut self, fragment: &str, name: &str) -> Result<()> {
        let program = self.compile(fragment)?;
        tracing::debug!(program = name, "registered shader program");
        self.programs.insert(name, program);
        Ok(())
    }

    pub fn activate_program(&mut self, name: &str) -> bool {
        self.programs.activate(name)
    }

    pub fn programs(&self) -> &ProgramRegistry<C> {
        &self.programs
    }

    /// Runs one offscreen pass of the current program into `target`.
    ///
    /// The target is unbound again even when binding an input fails.
    pub fn draw(
        &mut self,
        target: &mut RenderTarget<C>,
        previous: Option<C::Texture>,
        inputs: &PassInputs<C::Texture>,
    ) -> Result<()> {
        let program_name = self
            .programs
            .current_name()
            .ok_or(GpgpuError::NoActiveProgram)?
            .to_string();
        let program = self
            .programs
            .current_mut()
            .ok_or(GpgpuError::NoActiveProgram)?;

        target.bind().update_viewport();
        program.bind();
        self.context.clear(CLEAR_COLOR);
        self.context.set_blend(false);

        let result = encode_pass(&self.geometry, program, previous, inputs);
        target.unbind();

        tracing::trace!(
            program = %program_name,
            textures = inputs.textures().count(),
            uniforms = inputs.uniforms().count(),
            feedback = previous.is_some(),
            "offscreen pass"
        );
        result
    }

    /// Draws `texture` into the debug rectangle of the current framebuffer.
    pub fn render_debug(&mut self, texture: C::Texture) -> Result<()> {
        let program = self
            .debug_program
            .as_mut()
            .ok_or(GpgpuError::DebugViewDisabled)?;
        let DebugViewport {
            x,
            y,
            width,
            height,
        } = self.debug_viewport;

        self.context.viewport(x, y, width, height);
        program.bind();
        program.set_uniform_texture(texture, PREVIOUS_TEXTURE_UNIFORM)?;
        self.geometry.bind(program);
        self.context.set_blend(false);
        self.geometry.draw();
        Ok(())
    }

    pub fn has_debug_view(&self) -> bool {
        self.debug_program.is_some()
    }

    pub fn debug_viewport(&self) -> DebugViewport {
        self.debug_viewport
    }

    pub fn set_debug_viewport(
        &mut self,
        x: Option<i32>,
        y: Option<i32>,
        width: Option<i32>,
        height: Option<i32>,
    ) {
        self.debug_viewport.merge(x, y, width, height);
    }

    /// Records new dimensions without touching any GPU resource.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn window_rate(&self) -> f32 {
        window_rate(self.width, self.height)
    }
}

fn encode_pass<C: GraphicsContext>(
    geometry: &GeometryBuffer<C>,
    program: &mut ShaderProgram<C>,
    previous: Option<C::Texture>,
    inputs: &PassInputs<C::Texture>,
) -> Result<()> {
    if let Some(previous) = previous {
        program.set_uniform_texture(previous, PREVIOUS_TEXTURE_UNIFORM)?;
    }
    for (name, texture) in inputs.textures() {
        program.set_uniform_texture(texture, name)?;
    }

    geometry.bind(program);

    for (name, value) in inputs.uniforms() {
        program.set_uniform(name, value);
    }

    geometry.draw();
    Ok(())
}
