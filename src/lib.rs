#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Texture unit binding, lazy GPU storage and dirty-driven upload.
//!
//! ```rust,ignore
//! use myth_texture_units::{RecordingDevice, Texture, TextureManager, TextureSettings};
//!
//! let mut manager = TextureManager::new(RecordingDevice::default(), TextureSettings::default())?;
//! let albedo = Texture::new_2d("albedo", 4, 4, None);
//!
//! manager.bind(Some(&albedo), 0)?; // creates + uploads
//! manager.bind(Some(&albedo), 0)?; // no upload, no activation
//!
//! albedo.dispose(); // storage released on the next bind
//! ```

pub mod device;
pub mod errors;
pub mod manager;
pub mod resources;
pub mod settings;

pub use device::{
    ContextId, DeviceCall, DeviceTexture, ImageTarget, RecordingDevice, TextureDescriptor,
    TextureDevice, WgpuDevice,
};
pub use errors::{Result, TextureError};
pub use manager::{GpuTexture, TextureManager, UNSYNCED_VERSION};
pub use resources::{
    BufferSource, CubeFace, PixelFormat, PixelLayout, PixelType, SamplerState, ScaleMode,
    Texture, TextureContent, TextureId, TextureKind, TextureSource, WrapMode,
};
pub use settings::TextureSettings;
