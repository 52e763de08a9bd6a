use serde::{Deserialize, Serialize};

use crate::error::{GpgpuError, Result};
use crate::gpu::Capabilities;

/// Default edge length of a render target when the caller does not pick one.
pub const DEFAULT_TARGET_SIZE: u32 = 128;

/// Name under which the first program is registered when none is supplied.
pub const DEFAULT_PROGRAM_NAME: &str = "main";

/// Sampler name carrying the previous frame into feedback passes and the
/// produced frame into the debug view.
pub const PREVIOUS_TEXTURE_UNIFORM: &str = "uTexture";

/// Uniform consumed by the fixed vertex shader (`height / width`).
pub const WINDOW_RATE_UNIFORM: &str = "uWindowRate";

/// Texel storage of a render target. Both formats hold four channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TexelFormat {
    /// 32-bit float per channel.
    Float,
    /// 16-bit IEEE binary16 per channel.
    HalfFloat,
}

impl TexelFormat {
    /// Picks the back-buffer precision the way the simulation apps probe for
    /// it: full float when available, half float as the fallback, fatal when
    /// neither exists. Returns `true` for full float support.
    pub fn negotiate(capabilities: &Capabilities) -> Result<bool> {
        if capabilities.float_textures {
            Ok(true)
        } else if capabilities.half_float_textures {
            tracing::info!("float textures unavailable; falling back to half float");
            Ok(false)
        } else {
            Err(GpgpuError::NoFloatTextures)
        }
    }

    pub fn from_float_support(float_textures: bool) -> Self {
        if float_textures {
            TexelFormat::Float
        } else {
            TexelFormat::HalfFloat
        }
    }

    pub fn bytes_per_channel(self) -> usize {
        match self {
            TexelFormat::Float => 4,
            TexelFormat::HalfFloat => 2,
        }
    }

    /// Converts RGBA float data into the byte layout expected for upload.
    pub fn encode(self, data: &[f32]) -> Vec<u8> {
        match self {
            TexelFormat::Float => bytemuck::cast_slice(data).to_vec(),
            TexelFormat::HalfFloat => {
                let halves: Vec<u16> = data
                    .iter()
                    .map(|value| half::f16::from_f32(*value).to_bits())
                    .collect();
                bytemuck::cast_slice(&halves).to_vec()
            }
        }
    }
}

impl std::fmt::Display for TexelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TexelFormat::Float => f.write_str("float"),
            TexelFormat::HalfFloat => f.write_str("half-float"),
        }
    }
}

/// Sampling filter applied to render target textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureFilter {
    /// Exact texel fetches; what GPGPU state textures want.
    #[default]
    Nearest,
    Linear,
}

/// Vertical convention of the `vUv` varying produced by the fixed vertex
/// shader. Main and debug programs always share one convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UvOrientation {
    /// `vUv.y` grows upwards, matching GL texture space (`vec2(uvX, 1.0 - uvY)`).
    #[default]
    BottomUp,
    /// `vUv.y` grows downwards (`vec2(uvX, uvY)`).
    TopDown,
}

/// GLSL flavour used for the fixed vertex and debug shaders. Caller fragment
/// sources must be written in the same flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlslDialect {
    /// GLSL ES 1.00 (WebGL 1, GLES 2).
    #[default]
    Gles100,
    /// GLSL ES 3.00 (WebGL 2, GLES 3).
    Gles300,
    /// Desktop GLSL 3.30 core.
    Glsl330,
}

/// Screen-space rectangle the debug preview is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugViewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Default for DebugViewport {
    fn default() -> Self {
        Self {
            x: 30,
            y: 30,
            width: 64,
            height: 64,
        }
    }
}

impl DebugViewport {
    /// Overwrites only the fields that were supplied. A negative width or
    /// height is not a valid viewport size and leaves that field unchanged.
    pub fn merge(
        &mut self,
        x: Option<i32>,
        y: Option<i32>,
        width: Option<i32>,
        height: Option<i32>,
    ) {
        if let Some(x) = x {
            self.x = x;
        }
        if let Some(y) = y {
            self.y = y;
        }
        if let Some(width) = width {
            if width < 0 {
                tracing::warn!(width, "ignoring negative debug viewport width");
            } else {
                self.width = width;
            }
        }
        if let Some(height) = height {
            if height < 0 {
                tracing::warn!(height, "ignoring negative debug viewport height");
            } else {
                self.height = height;
            }
        }
    }
}

/// Which half of a buffer pair an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Read,
    Write,
}

/// Stable identity of a target inside a buffer pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Front,
    Back,
}

impl Slot {
    pub fn other(self) -> Self {
        match self {
            Slot::Front => Slot::Back,
            Slot::Back => Slot::Front,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Slot::Front => 0,
            Slot::Back => 1,
        }
    }
}

/// Construction parameters shared by [`SwapRenderer`](crate::SwapRenderer)
/// and [`FrameBufferRenderer`](crate::FrameBufferRenderer).
///
/// `fragment_shader` may be left empty on a swap renderer when programs are
/// registered later through `add_program`; `update` refuses to draw until a
/// program has been activated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Target width in texels.
    pub width: u32,
    /// Target height in texels.
    pub height: u32,
    /// Fragment source of the initial program.
    pub fragment_shader: Option<String>,
    /// Compile the debug preview program.
    pub debug: bool,
    /// Full float precision for the back target. The front is float whenever
    /// the context can render to it.
    pub float_textures: bool,
    /// RGBA floats uploaded into every target at creation.
    pub initial_data: Option<Vec<f32>>,
    /// Registry key of the initial program; `"main"` when absent.
    pub program_name: Option<String>,
    pub filter: TextureFilter,
    pub uv_orientation: UvOrientation,
    pub dialect: GlslDialect,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_TARGET_SIZE,
            height: DEFAULT_TARGET_SIZE,
            fragment_shader: None,
            debug: false,
            float_textures: true,
            initial_data: None,
            program_name: None,
            filter: TextureFilter::default(),
            uv_orientation: UvOrientation::default(),
            dialect: GlslDialect::default(),
        }
    }
}

impl RendererConfig {
    pub fn new(fragment_shader: impl Into<String>) -> Self {
        Self {
            fragment_shader: Some(fragment_shader.into()),
            ..Self::default()
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_float_textures(mut self, float_textures: bool) -> Self {
        self.float_textures = float_textures;
        self
    }

    pub fn with_initial_data(mut self, data: Vec<f32>) -> Self {
        self.initial_data = Some(data);
        self
    }

    pub fn with_program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = Some(name.into());
        self
    }

    pub fn with_filter(mut self, filter: TextureFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_uv_orientation(mut self, orientation: UvOrientation) -> Self {
        self.uv_orientation = orientation;
        self
    }

    pub fn with_dialect(mut self, dialect: GlslDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub(crate) fn initial_program_name(&self) -> &str {
        self.program_name.as_deref().unwrap_or(DEFAULT_PROGRAM_NAME)
    }
}

pub(crate) fn window_rate(width: u32, height: u32) -> f32 {
    height.max(1) as f32 / width.max(1) as f32
}
