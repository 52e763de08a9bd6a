use std::rc::Rc;

use crate::error::{GpgpuError, Result};
use crate::gpu::{GraphicsContext, PassCore, PassInputs, ProgramRegistry, RenderTarget};
use crate::types::{DebugViewport, RendererConfig, TexelFormat};

/// Single-target pass runner for passes that are a pure function of their
/// inputs. There is no previous frame, so `update` never binds `uTexture`
/// implicitly.
pub struct FrameBufferRenderer<C: GraphicsContext> {
    core: PassCore<C>,
    target: RenderTarget<C>,
}

impl<C: GraphicsContext> FrameBufferRenderer<C> {
    pub fn new(context: Rc<C>, config: RendererConfig) -> Result<Self> {
        let format = TexelFormat::from_float_support(config.float_textures);
        if !context.capabilities().supports(format) {
            return Err(GpgpuError::UnsupportedTexelFormat { format });
        }

        let core = PassCore::new(Rc::clone(&context), &config)?;
        let target = RenderTarget::new(
            context,
            config.width,
            config.height,
            format,
            config.filter,
            config.initial_data.as_deref(),
        )?;

        tracing::debug!(
            width = config.width,
            height = config.height,
            debug = config.debug,
            %format,
            "created framebuffer renderer"
        );
        Ok(Self { core, target })
    }

    pub fn update(&mut self, inputs: &PassInputs<C::Texture>) -> Result<&mut Self> {
        self.core.draw(&mut self.target, None, inputs)?;
        Ok(self)
    }

    pub fn render_debug_view(&mut self) -> Result<&mut Self> {
        let texture = self.target.texture();
        self.core.render_debug(texture)?;
        Ok(self)
    }

    pub fn set_debug_viewport(
        &mut self,
        x: Option<i32>,
        y: Option<i32>,
        width: Option<i32>,
        height: Option<i32>,
    ) -> &mut Self {
        self.core.set_debug_viewport(x, y, width, height);
        self
    }

    pub fn debug_viewport(&self) -> DebugViewport {
        self.core.debug_viewport()
    }

    pub fn has_debug_view(&self) -> bool {
        self.core.has_debug_view()
    }

    pub fn add_program(&mut self, fragment: &str, name: &str) -> Result<()> {
        self.core.add_program(fragment, name)
    }

    pub fn activate_program(&mut self, name: &str) -> bool {
        self.core.activate_program(name)
    }

    pub fn current_program_name(&self) -> Option<&str> {
        self.core.programs().current_name()
    }

    pub fn programs(&self) -> &ProgramRegistry<C> {
        self.core.programs()
    }

    pub fn texture(&self) -> C::Texture {
        self.target.texture()
    }

    /// Alias of [`texture`](Self::texture), so both renderers can be read
    /// the same way.
    pub fn current_texture(&self) -> C::Texture {
        self.texture()
    }

    pub fn target(&self) -> &RenderTarget<C> {
        &self.target
    }

    /// Swaps a fresh texture (optionally in another format) into the target
    /// and returns the previous one.
    pub fn update_texture(&mut self, format: Option<TexelFormat>) -> Result<C::Texture> {
        self.target.update_texture(format)
    }

    /// Stores new dimensions; the target keeps its allocation.
    pub fn resize(&mut self, width: u32, height: u32) -> &mut Self {
        self.core.resize(width, height);
        self
    }

    pub fn width(&self) -> u32 {
        self.core.width()
    }

    pub fn height(&self) -> u32 {
        self.core.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::{Command, HeadlessContext};
    use crate::types::TextureFilter;

    const GRADIENT: &str = r"precision highp float;
uniform sampler2D uTexture;
uniform sampler2D uSource;
uniform float uScale;
varying vec2 vUv;
void main() { gl_FragColor = texture2D(uSource, vUv) * uScale; }
";

    #[test]
    fn update_never_binds_previous_frame() {
        let context = Rc::new(HeadlessContext::new());
        let mut renderer = FrameBufferRenderer::new(
            Rc::clone(&context),
            RendererConfig::new(GRADIENT).with_filter(TextureFilter::Linear),
        )
        .expect("renderer");
        context.take_commands();

        renderer
            .update(&PassInputs::new().uniform("uScale", 2.0_f32))
            .expect("update");
        let commands = context.take_commands();
        assert!(!commands
            .iter()
            .any(|c| matches!(c, Command::BindTexture { .. })));
        assert!(commands
            .iter()
            .any(|c| matches!(c, Command::SetUniform { name, value: crate::Uniform::Float(v), .. } if name == "uScale" && *v == 2.0)));
        assert_eq!(context.draw_calls().len(), 1);
    }

    #[test]
    fn caller_textures_are_bound_by_name() {
        let context = Rc::new(HeadlessContext::new());
        let mut source = FrameBufferRenderer::new(
            Rc::clone(&context),
            RendererConfig::new(GRADIENT),
        )
        .expect("source");
        let mut renderer = FrameBufferRenderer::new(
            Rc::clone(&context),
            RendererConfig::new(GRADIENT),
        )
        .expect("renderer");
        source.update(&PassInputs::new()).expect("source pass");
        context.take_commands();

        renderer
            .update(&PassInputs::new().texture("uSource", source.texture()))
            .expect("update");
        assert!(context.take_commands().contains(&Command::BindTexture {
            unit: 0,
            texture: source.texture()
        }));
        assert_eq!(renderer.current_texture(), renderer.texture());
    }

    #[test]
    fn filter_reaches_the_texture() {
        let context = Rc::new(HeadlessContext::new());
        let renderer = FrameBufferRenderer::new(
            Rc::clone(&context),
            RendererConfig::new(GRADIENT).with_filter(TextureFilter::Linear),
        )
        .expect("renderer");
        assert_eq!(renderer.target().filter(), TextureFilter::Linear);
        assert_eq!(
            context
                .texture_descriptor(renderer.texture())
                .map(|d| d.filter),
            Some(TextureFilter::Linear)
        );
    }

    #[test]
    fn debug_view_requires_debug_mode() {
        let context = Rc::new(HeadlessContext::new());
        let mut renderer =
            FrameBufferRenderer::new(Rc::clone(&context), RendererConfig::new(GRADIENT))
                .expect("renderer");
        assert!(matches!(
            renderer.render_debug_view(),
            Err(GpgpuError::DebugViewDisabled)
        ));
    }
}
