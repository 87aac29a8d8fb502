//! Error Types
//!
//! This module defines the error types used by the texture unit manager.
//!
//! # Overview
//!
//! The main error type [`TextureError`] covers the failure modes that can
//! escape a bind or upload:
//! - Texture unit indices outside the hardware range
//! - Device handles that no longer refer to live storage
//! - Pixel layouts the backend cannot express
//! - Source data that does not match the declared dimensions
//!
//! Progressive-loading situations (binding a texture that is still loading,
//! disposing an unregistered texture, unbinding a texture that is not bound)
//! are *not* errors; they degrade to placeholder binds or no-ops.
//!
//! # Usage
//!
//! ```rust,ignore
//! use myth_texture_units::errors::{TextureError, Result};
//!
//! fn bind_albedo(manager: &mut TextureManager<impl TextureDevice>, tex: &Texture) -> Result<()> {
//!     manager.bind(Some(tex), 0)
//! }
//! ```

use thiserror::Error;

use crate::device::DeviceTexture;
use crate::resources::format::{PixelFormat, PixelType};

/// The main error type for texture unit management.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    // ========================================================================
    // Binding Errors
    // ========================================================================
    /// The requested texture unit is not below the hardware maximum.
    #[error("Texture unit {slot} out of range (max texture units: {max})")]
    SlotOutOfRange {
        /// The requested unit
        slot: u32,
        /// Number of available units
        max: u32,
    },

    // ========================================================================
    // Device Errors
    // ========================================================================
    /// The device does not know the given handle (destroyed or never created).
    #[error("Unknown device texture: {0:?}")]
    UnknownTexture(DeviceTexture),

    /// The backend cannot represent this format/type combination.
    #[error("Unsupported pixel layout: {format:?} / {pixel_type:?}")]
    UnsupportedFormat {
        /// Requested channel layout
        format: PixelFormat,
        /// Requested component type
        pixel_type: PixelType,
    },

    /// Generic device failure reported by the backend.
    #[error("Device error: {0}")]
    Device(String),

    // ========================================================================
    // Upload Errors
    // ========================================================================
    /// Raw buffer length does not match `width * height * bytes_per_pixel`.
    #[error("Pixel data size mismatch: expected {expected} bytes, got {actual}")]
    DataSizeMismatch {
        /// Byte count implied by the upload extent
        expected: usize,
        /// Byte count actually supplied
        actual: usize,
    },

    /// A decoded RGBA8 image was uploaded into storage of a different layout.
    #[error("Image source is RGBA8 but target layout is {format:?} / {pixel_type:?}")]
    SourceFormatMismatch {
        /// Target channel layout
        format: PixelFormat,
        /// Target component type
        pixel_type: PixelType,
    },

    /// Layer write past the allocated array depth.
    #[error("Layer {layer} out of range (allocated layers: {layers})")]
    LayerOutOfRange {
        /// Requested layer
        layer: u32,
        /// Allocated depth
        layers: u32,
    },
}

/// Alias for `Result<T, TextureError>`.
pub type Result<T> = std::result::Result<T, TextureError>;
