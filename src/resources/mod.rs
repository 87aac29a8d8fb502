//! CPU-side texture resources
//!
//! Data structures describing what should end up on the GPU, independent of
//! any backend:
//! - Texture: shared, versioned texture handle
//! - TextureSource: decoded image, raw buffer, or still-loading placeholder
//! - PixelLayout: format / component type / premultiply
//! - SamplerState: wrap and filter state derived from a texture

pub mod format;
pub mod sampler;
pub mod source;
pub mod texture;

// Re-export common types
pub use format::{PixelFormat, PixelLayout, PixelType};
pub use sampler::{MinFilter, SamplerState, ScaleMode, WrapMode};
pub use source::{BufferSource, TextureSource};
pub use texture::{CubeFace, ListenerId, Texture, TextureContent, TextureId, TextureKind};
