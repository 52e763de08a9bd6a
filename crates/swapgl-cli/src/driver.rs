use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use scene::{PassKind, SceneConfig, ShaderSource, TIME_UNIFORM};
use serde::Serialize;
use swapgl::{FrameBufferRenderer, GraphicsContext, PassInputs, SwapRenderer, TexelFormat};

enum PassRenderer<C: GraphicsContext> {
    Swap(SwapRenderer<C>),
    Single(FrameBufferRenderer<C>),
}

impl<C: GraphicsContext> PassRenderer<C> {
    fn current_texture(&self) -> C::Texture {
        match self {
            PassRenderer::Swap(renderer) => renderer.current_texture(),
            PassRenderer::Single(renderer) => renderer.current_texture(),
        }
    }

    fn update(&mut self, inputs: &PassInputs<C::Texture>) -> swapgl::Result<()> {
        match self {
            PassRenderer::Swap(renderer) => renderer.update(inputs).map(|_| ()),
            PassRenderer::Single(renderer) => renderer.update(inputs).map(|_| ()),
        }
    }

    fn render_debug_view(&mut self) -> swapgl::Result<()> {
        match self {
            PassRenderer::Swap(renderer) => renderer.render_debug_view().map(|_| ()),
            PassRenderer::Single(renderer) => renderer.render_debug_view().map(|_| ()),
        }
    }

    fn has_debug_view(&self) -> bool {
        match self {
            PassRenderer::Swap(renderer) => renderer.has_debug_view(),
            PassRenderer::Single(renderer) => renderer.has_debug_view(),
        }
    }

    fn add_program(&mut self, fragment: &str, name: &str) -> swapgl::Result<()> {
        match self {
            PassRenderer::Swap(renderer) => renderer.add_program(fragment, name),
            PassRenderer::Single(renderer) => renderer.add_program(fragment, name),
        }
    }

    fn activate_program(&mut self, name: &str) -> bool {
        match self {
            PassRenderer::Swap(renderer) => renderer.activate_program(name),
            PassRenderer::Single(renderer) => renderer.activate_program(name),
        }
    }

    fn current_program_name(&self) -> Option<&str> {
        match self {
            PassRenderer::Swap(renderer) => renderer.current_program_name(),
            PassRenderer::Single(renderer) => renderer.current_program_name(),
        }
    }

    fn swap(&mut self) {
        if let PassRenderer::Swap(renderer) = self {
            renderer.swap();
        }
    }

    fn summary(&self, name: &str) -> PassSummary {
        let (kind, formats, programs, width, height) = match self {
            PassRenderer::Swap(renderer) => (
                PassKind::Swap,
                vec![renderer.front().format(), renderer.back().format()],
                renderer.programs().names(),
                renderer.front().width(),
                renderer.front().height(),
            ),
            PassRenderer::Single(renderer) => (
                PassKind::Single,
                vec![renderer.target().format()],
                renderer.programs().names(),
                renderer.target().width(),
                renderer.target().height(),
            ),
        };
        PassSummary {
            name: name.to_string(),
            kind,
            width,
            height,
            formats,
            programs: programs.into_iter().map(str::to_string).collect(),
            current_program: self.current_program_name().map(str::to_string),
            debug_view: self.has_debug_view(),
        }
    }
}

/// What one pass was built as.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassSummary {
    pub name: String,
    pub kind: PassKind,
    pub width: u32,
    pub height: u32,
    /// Target formats; front then back for swap passes.
    pub formats: Vec<TexelFormat>,
    pub programs: Vec<String>,
    pub current_program: Option<String>,
    pub debug_view: bool,
}

/// One pass as executed during a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassStep {
    pub name: String,
    pub program: Option<String>,
    pub debug_view: bool,
}

/// Runs every pass of a scene in order, once per [`SceneDriver::step`].
pub struct SceneDriver<C: GraphicsContext> {
    scene: SceneConfig,
    order: Vec<String>,
    renderers: Vec<PassRenderer<C>>,
    index: HashMap<String, usize>,
    frame: u32,
}

impl<C: GraphicsContext> SceneDriver<C> {
    pub fn new(context: Rc<C>, scene: SceneConfig) -> Result<Self> {
        let mut order = Vec::with_capacity(scene.order.len());
        let mut renderers = Vec::with_capacity(scene.order.len());
        let mut index = HashMap::new();
        let float_support = TexelFormat::negotiate(&context.capabilities())
            .context("context cannot render to float or half-float textures")?;

        for (name, pass) in scene.ordered_passes() {
            let mut config = pass.renderer_config();
            config.float_textures &= float_support;
            let mut renderer = match pass.kind {
                PassKind::Swap => PassRenderer::Swap(
                    SwapRenderer::new(Rc::clone(&context), config)
                        .with_context(|| format!("failed to build swap pass '{name}'"))?,
                ),
                PassKind::Single => PassRenderer::Single(
                    FrameBufferRenderer::new(Rc::clone(&context), config)
                        .with_context(|| format!("failed to build single pass '{name}'"))?,
                ),
            };

            for (program, source) in &pass.programs {
                let ShaderSource::Inline(fragment) = source else {
                    bail!("pass '{name}' program '{program}' was not loaded from disk");
                };
                renderer
                    .add_program(fragment, program)
                    .with_context(|| format!("failed to compile program '{program}' of '{name}'"))?;
            }

            tracing::debug!(pass = name, kind = ?pass.kind, "built pass");
            index.insert(name.to_string(), renderers.len());
            order.push(name.to_string());
            renderers.push(renderer);
        }

        Ok(Self {
            scene,
            order,
            renderers,
            index,
            frame: 0,
        })
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn scene(&self) -> &SceneConfig {
        &self.scene
    }

    pub fn summaries(&self) -> Vec<PassSummary> {
        self.order
            .iter()
            .zip(&self.renderers)
            .map(|(name, renderer)| renderer.summary(name))
            .collect()
    }

    /// Runs one frame: every pass in order, then swaps all ping-pong passes.
    ///
    /// Inputs resolve to the producing pass's current texture at the moment
    /// the consumer runs, so a pass earlier in `order` contributes this
    /// frame's output and a later one its previous output.
    pub fn step(&mut self, debug_view: bool) -> Result<Vec<PassStep>> {
        let time = self.scene.frame_time(self.frame);
        let mut steps = Vec::with_capacity(self.order.len());

        for position in 0..self.order.len() {
            let name = &self.order[position];
            let pass = self
                .scene
                .pass(name)
                .ok_or_else(|| anyhow!("pass '{name}' disappeared from the scene"))?;

            if let Some(program) = pass.scheduled_program(self.frame) {
                tracing::info!(pass = %name, program, frame = self.frame, "switching program");
                self.renderers[position].activate_program(program);
            }

            let mut inputs = PassInputs::new().include_previous(pass.include_previous);
            inputs.insert_uniform(TIME_UNIFORM, time);
            for (uniform, value) in &pass.uniforms {
                inputs.insert_uniform(uniform.as_str(), *value);
            }
            for (sampler, source) in &pass.inputs {
                let producer = self
                    .index
                    .get(source)
                    .ok_or_else(|| anyhow!("pass '{name}' reads unknown pass '{source}'"))?;
                inputs.insert_texture(
                    sampler.as_str(),
                    self.renderers[*producer].current_texture(),
                );
            }

            let renderer = &mut self.renderers[position];
            renderer
                .update(&inputs)
                .with_context(|| format!("pass '{name}' failed on frame {}", self.frame))?;

            let debugged = debug_view && renderer.has_debug_view();
            if debugged {
                renderer
                    .render_debug_view()
                    .with_context(|| format!("debug view of '{name}' failed"))?;
            }

            steps.push(PassStep {
                name: name.clone(),
                program: renderer.current_program_name().map(str::to_string),
                debug_view: debugged,
            });
        }

        for renderer in &mut self.renderers {
            renderer.swap();
        }
        self.frame += 1;
        Ok(steps)
    }
}
