//! Ping-pong GPGPU passes over a GL-style graphics context.
//!
//! A [`SwapRenderer`] owns two offscreen targets. Each `update` runs the
//! active fragment program over a full-screen triangle into the *write*
//! target while the *read* target is sampled as `uTexture`; `swap` then
//! exchanges the roles for the next frame. [`FrameBufferRenderer`] is the
//! single-target variant for passes without feedback.
//!
//! ```text
//!   app tick ──▶ update(PassInputs) ──▶ bind write FBO ─▶ clear ─▶ draw
//!        │                                   ▲
//!        │             read texture ─────────┘ (uTexture)
//!        ├─▶ render_debug_view()  (optional corner preview)
//!        └─▶ swap()               (read ⇄ write, no GPU work)
//! ```
//!
//! Renderers are chained by handing one renderer's `current_texture()` to
//! another as a named input. All GPU access goes through [`GraphicsContext`];
//! [`GlowContext`] drives a real GL/WebGL context and [`HeadlessContext`]
//! records calls for tests and tooling.

mod compile;
mod error;
pub mod gpu;
mod single;
mod swap;
mod types;

pub use compile::{debug_fragment_shader, project_vertex, vertex_shader};
pub use error::{GpgpuError, Result, ShaderStage};
#[cfg(feature = "glow")]
pub use gpu::GlowContext;
pub use gpu::{
    Capabilities, GeometryBuffer, GraphicsContext, HeadlessContext, PassInputs, ProgramRegistry,
    RenderTarget, ShaderProgram, Uniform,
};
pub use single::FrameBufferRenderer;
pub use swap::SwapRenderer;
pub use types::{
    DebugViewport, GlslDialect, RendererConfig, Role, Slot, TexelFormat, TextureFilter,
    UvOrientation, DEFAULT_PROGRAM_NAME, DEFAULT_TARGET_SIZE, PREVIOUS_TEXTURE_UNIFORM,
    WINDOW_RATE_UNIFORM,
};
