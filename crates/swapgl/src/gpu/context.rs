use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gpu::uniforms::Uniform;
use crate::types::{TexelFormat, TextureFilter};

/// `GL_FRAMEBUFFER_COMPLETE`.
pub const FRAMEBUFFER_COMPLETE: u32 = 0x8CD5;

/// Limits and texture formats a context can honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Float textures usable as render targets.
    pub float_textures: bool,
    /// Half-float textures usable as render targets.
    pub half_float_textures: bool,
    /// Combined texture image units available to a fragment shader.
    pub max_texture_units: u32,
    /// Largest edge of a 2D texture.
    pub max_texture_size: u32,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            float_textures: true,
            half_float_textures: true,
            max_texture_units: 8,
            max_texture_size: 4096,
        }
    }
}

impl Capabilities {
    pub fn supports(&self, format: TexelFormat) -> bool {
        match format {
            TexelFormat::Float => self.float_textures,
            TexelFormat::HalfFloat => self.half_float_textures,
        }
    }
}

/// Storage request for an RGBA render-target texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: TexelFormat,
    pub filter: TextureFilter,
}

/// Completeness status reported after attaching a texture to a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramebufferStatus(pub u32);

impl FramebufferStatus {
    pub const COMPLETE: Self = Self(FRAMEBUFFER_COMPLETE);

    pub fn is_complete(self) -> bool {
        self == Self::COMPLETE
    }
}

/// The slice of a GL-style graphics binding the renderers drive.
///
/// Handles are plain copyable values; ownership is tracked by the wrappers
/// in this crate (`RenderTarget`, `ShaderProgram`, `GeometryBuffer`), which
/// release what they created on drop. Every call is synchronous from the
/// caller's point of view and is assumed to succeed once issued unless it
/// returns an error.
pub trait GraphicsContext {
    type Texture: Copy + Eq + Hash + Debug;
    type Framebuffer: Copy + Eq + Debug;
    type Program: Copy + Eq + Debug;
    type Buffer: Copy + Eq + Debug;
    type UniformLocation: Clone + Debug;

    fn capabilities(&self) -> Capabilities;

    /// Compiles both stages and links them into a program.
    fn compile_program(&self, vertex: &str, fragment: &str) -> Result<Self::Program>;
    fn delete_program(&self, program: Self::Program);
    fn use_program(&self, program: Option<Self::Program>);
    fn uniform_location(&self, program: Self::Program, name: &str)
        -> Option<Self::UniformLocation>;
    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    /// Uploads a value into the currently bound program.
    fn set_uniform(&self, location: &Self::UniformLocation, value: &Uniform);
    /// Points a sampler uniform of the bound program at a texture unit.
    fn set_sampler(&self, location: &Self::UniformLocation, unit: u32);

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        pixels: Option<&[u8]>,
    ) -> Result<Self::Texture>;
    fn delete_texture(&self, texture: Self::Texture);
    fn bind_texture_unit(&self, unit: u32, texture: Self::Texture);

    fn create_framebuffer(&self) -> Result<Self::Framebuffer>;
    fn delete_framebuffer(&self, framebuffer: Self::Framebuffer);
    /// `None` restores the default (canvas) draw destination.
    fn bind_framebuffer(&self, framebuffer: Option<Self::Framebuffer>);
    /// Attaches `texture` as color attachment 0 of the bound framebuffer.
    fn attach_color_texture(&self, texture: Self::Texture) -> FramebufferStatus;

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    /// Clears the color buffer of the current draw destination.
    fn clear(&self, color: [f32; 4]);
    fn set_blend(&self, enabled: bool);

    fn create_vertex_buffer(&self, data: &[f32]) -> Result<Self::Buffer>;
    fn delete_buffer(&self, buffer: Self::Buffer);
    fn bind_vertex_attribute(&self, buffer: Self::Buffer, location: u32, components: i32);
    fn draw_triangles(&self, first: i32, count: i32);
}
