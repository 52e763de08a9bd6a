//! [`GraphicsContext`] over a live OpenGL / GLES / WebGL context via `glow`.

use glow::HasContext;

use crate::error::{GpgpuError, Result, ShaderStage};
use crate::gpu::context::{Capabilities, FramebufferStatus, GraphicsContext, TextureDescriptor};
use crate::gpu::uniforms::Uniform;
use crate::types::{TexelFormat, TextureFilter};

/// `HALF_FLOAT_OES` from `OES_texture_half_float`; differs from the core
/// `HALF_FLOAT` enum used by GLES3 and desktop GL.
const HALF_FLOAT_OES: u32 = 0x8D61;

type GlTexture = <glow::Context as HasContext>::Texture;
type GlFramebuffer = <glow::Context as HasContext>::Framebuffer;
type GlProgram = <glow::Context as HasContext>::Program;
type GlBuffer = <glow::Context as HasContext>::Buffer;
type GlUniformLocation = <glow::Context as HasContext>::UniformLocation;
type GlVertexArray = <glow::Context as HasContext>::VertexArray;

/// Owns a `glow::Context` and translates renderer calls into GL.
pub struct GlowContext {
    gl: glow::Context,
    capabilities: Capabilities,
    /// WebGL1 / GLES2: unsized `RGBA` internal formats and `HALF_FLOAT_OES`.
    legacy_storage: bool,
    vertex_array: Option<GlVertexArray>,
}

impl GlowContext {
    /// Wraps `gl`, probing float render-target support from the version and
    /// extension list.
    ///
    /// # Safety
    ///
    /// The GL context behind `gl` must be current on the calling thread for
    /// as long as the returned value, and anything built on it, is used.
    pub unsafe fn new(gl: glow::Context) -> Self {
        let version = gl.version();
        let legacy_storage = version.is_embedded && version.major < 3;
        let embedded = version.is_embedded;

        let extensions = gl.supported_extensions();
        let has = |name: &str| {
            extensions.contains(name) || extensions.contains(&format!("GL_{name}"))
        };
        let (float_textures, half_float_textures) = if legacy_storage {
            (has("OES_texture_float"), has("OES_texture_half_float"))
        } else if embedded {
            let color_float = has("EXT_color_buffer_float");
            (
                color_float,
                color_float || has("EXT_color_buffer_half_float"),
            )
        } else {
            (true, true)
        };

        let capabilities = Capabilities {
            float_textures,
            half_float_textures,
            max_texture_units: gl.get_parameter_i32(glow::MAX_TEXTURE_IMAGE_UNITS).max(0) as u32,
            max_texture_size: gl.get_parameter_i32(glow::MAX_TEXTURE_SIZE).max(0) as u32,
        };

        // Core profiles refuse to draw without a vertex array object bound.
        let vertex_array = if legacy_storage {
            None
        } else {
            match gl.create_vertex_array() {
                Ok(vao) => {
                    gl.bind_vertex_array(Some(vao));
                    Some(vao)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "could not create a vertex array object");
                    None
                }
            }
        };

        tracing::debug!(
            ?capabilities,
            legacy_storage,
            embedded,
            "initialised glow context"
        );

        Self {
            gl,
            capabilities,
            legacy_storage,
            vertex_array,
        }
    }

    /// The wrapped context, for drawing the rest of the frame.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    fn texel_storage(&self, format: TexelFormat) -> (u32, u32) {
        match (format, self.legacy_storage) {
            (TexelFormat::Float, true) => (glow::RGBA, glow::FLOAT),
            (TexelFormat::HalfFloat, true) => (glow::RGBA, HALF_FLOAT_OES),
            (TexelFormat::Float, false) => (glow::RGBA32F, glow::FLOAT),
            (TexelFormat::HalfFloat, false) => (glow::RGBA16F, glow::HALF_FLOAT),
        }
    }

    unsafe fn compile_stage(
        &self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<<glow::Context as HasContext>::Shader> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        let shader = self.gl.create_shader(kind).map_err(GpgpuError::Resource)?;
        self.gl.shader_source(shader, source);
        self.gl.compile_shader(shader);
        if !self.gl.get_shader_compile_status(shader) {
            let log = self.gl.get_shader_info_log(shader);
            self.gl.delete_shader(shader);
            return Err(GpgpuError::ShaderCompile { stage, log });
        }
        Ok(shader)
    }
}

impl Drop for GlowContext {
    fn drop(&mut self) {
        if let Some(vao) = self.vertex_array.take() {
            unsafe { self.gl.delete_vertex_array(vao) };
        }
    }
}

impl std::fmt::Debug for GlowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlowContext")
            .field("capabilities", &self.capabilities)
            .field("legacy_storage", &self.legacy_storage)
            .finish_non_exhaustive()
    }
}

impl GraphicsContext for GlowContext {
    type Texture = GlTexture;
    type Framebuffer = GlFramebuffer;
    type Program = GlProgram;
    type Buffer = GlBuffer;
    type UniformLocation = GlUniformLocation;

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn compile_program(&self, vertex: &str, fragment: &str) -> Result<GlProgram> {
        unsafe {
            let vs = self.compile_stage(ShaderStage::Vertex, vertex)?;
            let fs = match self.compile_stage(ShaderStage::Fragment, fragment) {
                Ok(fs) => fs,
                Err(err) => {
                    self.gl.delete_shader(vs);
                    return Err(err);
                }
            };

            let program = match self.gl.create_program() {
                Ok(program) => program,
                Err(err) => {
                    self.gl.delete_shader(vs);
                    self.gl.delete_shader(fs);
                    return Err(GpgpuError::Resource(err));
                }
            };
            self.gl.attach_shader(program, vs);
            self.gl.attach_shader(program, fs);
            self.gl.link_program(program);
            self.gl.detach_shader(program, vs);
            self.gl.detach_shader(program, fs);
            self.gl.delete_shader(vs);
            self.gl.delete_shader(fs);

            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(GpgpuError::ProgramLink(log));
            }
            Ok(program)
        }
    }

    fn delete_program(&self, program: GlProgram) {
        unsafe { self.gl.delete_program(program) }
    }

    fn use_program(&self, program: Option<GlProgram>) {
        unsafe { self.gl.use_program(program) }
    }

    fn uniform_location(&self, program: GlProgram, name: &str) -> Option<GlUniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn attrib_location(&self, program: GlProgram, name: &str) -> Option<u32> {
        unsafe { self.gl.get_attrib_location(program, name) }
    }

    fn set_uniform(&self, location: &GlUniformLocation, value: &Uniform) {
        let location = Some(location);
        unsafe {
            match value {
                Uniform::Bool(v) => {
                    self.gl
                        .uniform_1_f32(location, if *v { 1.0 } else { 0.0 })
                }
                Uniform::Float(v) => self.gl.uniform_1_f32(location, *v),
                Uniform::Vec2(v) => self.gl.uniform_2_f32(location, v[0], v[1]),
                Uniform::Vec3(v) => self.gl.uniform_3_f32(location, v[0], v[1], v[2]),
                Uniform::Vec4(v) => self.gl.uniform_4_f32(location, v[0], v[1], v[2], v[3]),
                Uniform::Mat2(m) => self.gl.uniform_matrix_2_f32_slice(location, false, m),
                Uniform::Mat3(m) => self.gl.uniform_matrix_3_f32_slice(location, false, m),
                Uniform::Mat4(m) => self.gl.uniform_matrix_4_f32_slice(location, false, m),
            }
        }
    }

    fn set_sampler(&self, location: &GlUniformLocation, unit: u32) {
        unsafe { self.gl.uniform_1_i32(Some(location), unit as i32) }
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        pixels: Option<&[u8]>,
    ) -> Result<GlTexture> {
        let (internal_format, texel_type) = self.texel_storage(descriptor.format);
        let filter = match descriptor.filter {
            TextureFilter::Nearest => glow::NEAREST,
            TextureFilter::Linear => glow::LINEAR,
        } as i32;

        unsafe {
            let texture = self.gl.create_texture().map_err(GpgpuError::Resource)?;
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter);
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal_format as i32,
                descriptor.width as i32,
                descriptor.height as i32,
                0,
                glow::RGBA,
                texel_type,
                pixels,
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
            Ok(texture)
        }
    }

    fn delete_texture(&self, texture: GlTexture) {
        unsafe { self.gl.delete_texture(texture) }
    }

    fn bind_texture_unit(&self, unit: u32, texture: GlTexture) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
        }
    }

    fn create_framebuffer(&self) -> Result<GlFramebuffer> {
        unsafe { self.gl.create_framebuffer().map_err(GpgpuError::Resource) }
    }

    fn delete_framebuffer(&self, framebuffer: GlFramebuffer) {
        unsafe { self.gl.delete_framebuffer(framebuffer) }
    }

    fn bind_framebuffer(&self, framebuffer: Option<GlFramebuffer>) {
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer) }
    }

    fn attach_color_texture(&self, texture: GlTexture) -> FramebufferStatus {
        unsafe {
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(texture),
                0,
            );
            FramebufferStatus(self.gl.check_framebuffer_status(glow::FRAMEBUFFER))
        }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn clear(&self, [r, g, b, a]: [f32; 4]) {
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    fn set_blend(&self, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(glow::BLEND);
            } else {
                self.gl.disable(glow::BLEND);
            }
        }
    }

    fn create_vertex_buffer(&self, data: &[f32]) -> Result<GlBuffer> {
        unsafe {
            let buffer = self.gl.create_buffer().map_err(GpgpuError::Resource)?;
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(data),
                glow::STATIC_DRAW,
            );
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
            Ok(buffer)
        }
    }

    fn delete_buffer(&self, buffer: GlBuffer) {
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn bind_vertex_attribute(&self, buffer: GlBuffer, location: u32, components: i32) {
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl.enable_vertex_attrib_array(location);
            self.gl
                .vertex_attrib_pointer_f32(location, components, glow::FLOAT, false, 0, 0);
        }
    }

    fn draw_triangles(&self, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(glow::TRIANGLES, first, count) }
    }
}
