use crate::types::TexelFormat;

/// Shader stage reported alongside compile failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GpgpuError {
    #[error("failed to compile {stage} shader: {log}")]
    ShaderCompile { stage: ShaderStage, log: String },
    #[error("failed to link shader program: {0}")]
    ProgramLink(String),
    #[error("failed to create GPU resource: {0}")]
    Resource(String),
    #[error("framebuffer incomplete: status 0x{status:04X}")]
    IncompleteFramebuffer { status: u32 },
    #[error("render target is bound as the active draw destination")]
    TargetBound,
    #[error("debug view requested but the renderer was built without debug mode")]
    DebugViewDisabled,
    #[error("no shader program is active")]
    NoActiveProgram,
    #[error("shader program does not declare the `{0}` attribute")]
    MissingAttribute(&'static str),
    #[error("{format} textures are not supported by this context")]
    UnsupportedTexelFormat { format: TexelFormat },
    #[error("neither float nor half-float textures are supported by this context")]
    NoFloatTextures,
    #[error("invalid render target dimensions {width}x{height} (max {max})")]
    InvalidDimensions { width: u32, height: u32, max: u32 },
    #[error("initial pixel data holds {actual} floats, expected {expected}")]
    InitialDataLength { expected: usize, actual: usize },
    #[error("sampler `{name}` needs texture unit {unit} but only {max} are available")]
    TextureUnitsExhausted { name: String, unit: u32, max: u32 },
}

pub type Result<T, E = GpgpuError> = std::result::Result<T, E>;
