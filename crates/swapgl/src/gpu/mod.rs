//! Building blocks shared by the renderers.
//!
//! Everything here is generic over [`GraphicsContext`], the thin slice of a
//! GL-style binding the renderers need:
//! - `context` defines the seam plus capability and texture descriptors.
//! - `target` wraps a framebuffer and its color texture, including the
//!   swap-out of the backing texture.
//! - `program` owns linked programs, caches uniform locations, hands out
//!   texture units per sampler, and keeps the named program registry.
//! - `geometry` is the shared full-screen proxy triangle.
//! - `uniforms` carries typed uniform values and per-pass inputs.
//! - `pass` runs one offscreen pass and the debug preview; both renderers
//!   delegate to it.
//! - `headless` records calls instead of issuing them; `glow_backend` talks
//!   to a real GL context.

mod context;
mod geometry;
#[cfg(feature = "glow")]
mod glow_backend;
pub mod headless;
mod pass;
mod program;
mod target;
mod uniforms;

pub use context::{
    Capabilities, FramebufferStatus, GraphicsContext, TextureDescriptor, FRAMEBUFFER_COMPLETE,
};
pub use geometry::GeometryBuffer;
#[cfg(feature = "glow")]
pub use glow_backend::GlowContext;
pub use headless::HeadlessContext;
pub(crate) use pass::PassCore;
pub use program::{ProgramRegistry, ShaderProgram, POSITION_ATTRIBUTE};
pub use target::RenderTarget;
pub use uniforms::{PassInputs, Uniform};
