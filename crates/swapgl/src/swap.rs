//! Ping-pong renderer: two targets, one written per pass while the other is
//! sampled as the previous frame.

use std::rc::Rc;

use crate::error::{GpgpuError, Result};
use crate::gpu::{GraphicsContext, PassCore, PassInputs, ProgramRegistry, RenderTarget};
use crate::types::{DebugViewport, RendererConfig, Role, Slot, TexelFormat};

/// Double-buffered GPGPU pass runner.
///
/// `front` and `back` are fixed for the renderer's lifetime; `swap` only
/// rotates which of them is read and which is written. After construction
/// the front target is read and the back target is written.
///
/// ```no_run
/// # use std::rc::Rc;
/// # use swapgl::{HeadlessContext, PassInputs, RendererConfig, SwapRenderer};
/// # fn main() -> swapgl::Result<()> {
/// let context = Rc::new(HeadlessContext::new());
/// let mut velocity = SwapRenderer::new(
///     Rc::clone(&context),
///     RendererConfig::new("void main() { gl_FragColor = vec4(0.0); }").with_size(64, 64),
/// )?;
/// velocity
///     .update(&PassInputs::new().uniform("uTime", 0.016_f32))?
///     .swap();
/// # Ok(())
/// # }
/// ```
pub struct SwapRenderer<C: GraphicsContext> {
    core: PassCore<C>,
    targets: [RenderTarget<C>; 2],
    read: Slot,
}

impl<C: GraphicsContext> SwapRenderer<C> {
    pub fn new(context: Rc<C>, config: RendererConfig) -> Result<Self> {
        let capabilities = context.capabilities();
        let front_format = if capabilities.float_textures {
            TexelFormat::Float
        } else if capabilities.half_float_textures {
            tracing::warn!(
                "float render targets unavailable; front target falls back to half float"
            );
            TexelFormat::HalfFloat
        } else {
            return Err(GpgpuError::NoFloatTextures);
        };
        let back_format = TexelFormat::from_float_support(config.float_textures);
        if !capabilities.supports(back_format) {
            return Err(GpgpuError::UnsupportedTexelFormat {
                format: back_format,
            });
        }

        let core = PassCore::new(Rc::clone(&context), &config)?;
        let data = config.initial_data.as_deref();
        let front = RenderTarget::new(
            Rc::clone(&context),
            config.width,
            config.height,
            front_format,
            config.filter,
            data,
        )?;
        let back = RenderTarget::new(
            context,
            config.width,
            config.height,
            back_format,
            config.filter,
            data,
        )?;

        tracing::debug!(
            width = config.width,
            height = config.height,
            debug = config.debug,
            front_format = %front_format,
            back_format = %back_format,
            program = ?core.programs().current_name(),
            "created swap renderer"
        );

        Ok(Self {
            core,
            targets: [front, back],
            read: Slot::Front,
        })
    }

    /// Exchanges the read and write roles. No GPU work is issued.
    pub fn swap(&mut self) -> &mut Self {
        self.read = self.read.other();
        self
    }

    /// Draws the current program into the write target.
    ///
    /// When `inputs` includes the previous frame, the read target's texture
    /// is bound as `uTexture` ahead of the caller's own samplers.
    pub fn update(&mut self, inputs: &PassInputs<C::Texture>) -> Result<&mut Self> {
        let previous = inputs
            .includes_previous()
            .then(|| self.read_target().texture());
        let write = self.write_slot().index();
        self.core.draw(&mut self.targets[write], previous, inputs)?;
        Ok(self)
    }

    /// Previews the write target (the frame just produced) in the debug
    /// rectangle of whatever framebuffer is currently bound.
    pub fn render_debug_view(&mut self) -> Result<&mut Self> {
        let texture = self.write_texture();
        self.core.render_debug(texture)?;
        Ok(self)
    }

    /// Overwrites the debug rectangle fields given as `Some`; `None` keeps
    /// the previous value.
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

    /// Compiles and registers another program. The current program is not
    /// changed; call [`activate_program`](Self::activate_program) for that.
    pub fn add_program(&mut self, fragment: &str, name: &str) -> Result<()> {
        self.core.add_program(fragment, name)
    }

    /// Selects the program `update` draws with. Unknown names are logged and
    /// leave the current program in place.
    pub fn activate_program(&mut self, name: &str) -> bool {
        self.core.activate_program(name)
    }

    pub fn current_program_name(&self) -> Option<&str> {
        self.core.programs().current_name()
    }

    pub fn programs(&self) -> &ProgramRegistry<C> {
        self.core.programs()
    }

    pub fn write_texture(&self) -> C::Texture {
        self.write_target().texture()
    }

    pub fn read_texture(&self) -> C::Texture {
        self.read_target().texture()
    }

    /// The most recently produced frame; always the write texture.
    pub fn current_texture(&self) -> C::Texture {
        self.write_texture()
    }

    /// Stores new dimensions. Both targets keep their current allocation.
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

    /// Swaps a fresh texture into the target playing `role` and returns the
    /// one it replaced.
    pub fn update_texture(&mut self, role: Role) -> Result<C::Texture> {
        let slot = match role {
            Role::Read => self.read,
            Role::Write => self.read.other(),
        };
        self.targets[slot.index()].update_texture(None)
    }

    pub fn front(&self) -> &RenderTarget<C> {
        &self.targets[Slot::Front.index()]
    }

    pub fn back(&self) -> &RenderTarget<C> {
        &self.targets[Slot::Back.index()]
    }

    pub fn target(&self, slot: Slot) -> &RenderTarget<C> {
        &self.targets[slot.index()]
    }

    pub fn read_target(&self) -> &RenderTarget<C> {
        self.target(self.read)
    }

    pub fn write_target(&self) -> &RenderTarget<C> {
        self.target(self.write_slot())
    }

    pub fn read_slot(&self) -> Slot {
        self.read
    }

    pub fn write_slot(&self) -> Slot {
        self.read.other()
    }
}
