use std::rc::Rc;

use crate::error::{GpgpuError, Result};
use crate::gpu::context::{GraphicsContext, TextureDescriptor};
use crate::types::{TexelFormat, TextureFilter};

/// An offscreen color buffer: one framebuffer object plus the texture it
/// renders into.
///
/// The framebuffer is validated as complete every time a texture is
/// attached, so a target that exists is always safe to bind. Dropping the
/// target releases the framebuffer and the currently attached texture;
/// textures handed out by [`RenderTarget::update_texture`] are the caller's.
pub struct RenderTarget<C: GraphicsContext> {
    context: Rc<C>,
    framebuffer: C::Framebuffer,
    texture: C::Texture,
    descriptor: TextureDescriptor,
    bound: bool,
}

impl<C: GraphicsContext> RenderTarget<C> {
    /// Allocates a target of `width`x`height` texels, optionally seeded with
    /// RGBA float data (`width * height * 4` values).
    pub fn new(
        context: Rc<C>,
        width: u32,
        height: u32,
        format: TexelFormat,
        filter: TextureFilter,
        initial_data: Option<&[f32]>,
    ) -> Result<Self> {
        let capabilities = context.capabilities();
        if width == 0
            || height == 0
            || width > capabilities.max_texture_size
            || height > capabilities.max_texture_size
        {
            return Err(GpgpuError::InvalidDimensions {
                width,
                height,
                max: capabilities.max_texture_size,
            });
        }

        let descriptor = TextureDescriptor {
            width,
            height,
            format,
            filter,
        };

        let pixels = match initial_data {
            Some(data) => {
                let expected = width as usize * height as usize * 4;
                if data.len() != expected {
                    return Err(GpgpuError::InitialDataLength {
                        expected,
                        actual: data.len(),
                    });
                }
                Some(format.encode(data))
            }
            None => None,
        };

        let texture = context.create_texture(&descriptor, pixels.as_deref())?;
        let framebuffer = match context.create_framebuffer() {
            Ok(framebuffer) => framebuffer,
            Err(err) => {
                context.delete_texture(texture);
                return Err(err);
            }
        };

        context.bind_framebuffer(Some(framebuffer));
        let status = context.attach_color_texture(texture);
        context.bind_framebuffer(None);
        if !status.is_complete() {
            context.delete_framebuffer(framebuffer);
            context.delete_texture(texture);
            return Err(GpgpuError::IncompleteFramebuffer { status: status.0 });
        }

        tracing::debug!(width, height, %format, ?filter, "allocated render target");

        Ok(Self {
            context,
            framebuffer,
            texture,
            descriptor,
            bound: false,
        })
    }

    /// Makes this target the active draw destination. Binding twice is the
    /// same as binding once.
    pub fn bind(&mut self) -> &mut Self {
        self.context.bind_framebuffer(Some(self.framebuffer));
        self.bound = true;
        self
    }

    /// Sets the viewport to cover exactly this target.
    pub fn update_viewport(&mut self) -> &mut Self {
        self.context.viewport(
            0,
            0,
            self.descriptor.width as i32,
            self.descriptor.height as i32,
        );
        self
    }

    /// Restores the default draw destination.
    pub fn unbind(&mut self) -> &mut Self {
        self.context.bind_framebuffer(None);
        self.bound = false;
        self
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Swaps in a freshly allocated texture (same size, optionally a new
    /// format) and returns the one previously attached. The returned texture
    /// is no longer owned by the target.
    ///
    /// Refused with [`GpgpuError::TargetBound`] while the target is the
    /// active draw destination. If the new attachment leaves the framebuffer
    /// incomplete, the previous texture is re-attached and kept.
    pub fn update_texture(&mut self, format: Option<TexelFormat>) -> Result<C::Texture> {
        if self.bound {
            return Err(GpgpuError::TargetBound);
        }

        let descriptor = TextureDescriptor {
            format: format.unwrap_or(self.descriptor.format),
            ..self.descriptor
        };
        let previous = self.replace_texture(descriptor)?;
        tracing::debug!(
            format = %descriptor.format,
            ?previous,
            "replaced render target texture"
        );
        Ok(previous)
    }

    /// Reallocates the backing texture at a new size, releasing the old one.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if self.bound {
            return Err(GpgpuError::TargetBound);
        }
        let max = self.context.capabilities().max_texture_size;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(GpgpuError::InvalidDimensions { width, height, max });
        }
        let descriptor = TextureDescriptor {
            width,
            height,
            ..self.descriptor
        };
        let previous = self.replace_texture(descriptor)?;
        self.context.delete_texture(previous);
        Ok(())
    }

    fn replace_texture(&mut self, descriptor: TextureDescriptor) -> Result<C::Texture> {
        let texture = self.context.create_texture(&descriptor, None)?;

        self.context.bind_framebuffer(Some(self.framebuffer));
        let status = self.context.attach_color_texture(texture);
        if !status.is_complete() {
            // Put the framebuffer back into a working state before bailing.
            self.context.attach_color_texture(self.texture);
            self.context.bind_framebuffer(None);
            self.context.delete_texture(texture);
            return Err(GpgpuError::IncompleteFramebuffer { status: status.0 });
        }
        self.context.bind_framebuffer(None);

        let previous = std::mem::replace(&mut self.texture, texture);
        self.descriptor = descriptor;
        Ok(previous)
    }

    pub fn texture(&self) -> C::Texture {
        self.texture
    }

    pub fn framebuffer(&self) -> C::Framebuffer {
        self.framebuffer
    }

    pub fn width(&self) -> u32 {
        self.descriptor.width
    }

    pub fn height(&self) -> u32 {
        self.descriptor.height
    }

    pub fn format(&self) -> TexelFormat {
        self.descriptor.format
    }

    pub fn filter(&self) -> TextureFilter {
        self.descriptor.filter
    }
}

impl<C: GraphicsContext> Drop for RenderTarget<C> {
    fn drop(&mut self) {
        if self.bound {
            self.context.bind_framebuffer(None);
        }
        self.context.delete_framebuffer(self.framebuffer);
        self.context.delete_texture(self.texture);
    }
}

impl<C: GraphicsContext> std::fmt::Debug for RenderTarget<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTarget")
            .field("framebuffer", &self.framebuffer)
            .field("texture", &self.texture)
            .field("descriptor", &self.descriptor)
            .field("bound", &self.bound)
            .finish()
    }
}
