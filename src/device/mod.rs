//! Host rendering context
//!
//! [`TextureDevice`] is the narrow set of driver primitives the texture unit
//! manager issues: capability query, storage create/destroy, unit
//! activation and binding, content upload and sampler state. Upload calls
//! name their target storage explicitly so they do not depend on which unit
//! happens to be active.
//!
//! Two implementations ship with the crate:
//! - [`RecordingDevice`]: headless, records every call (tests, call-stream debugging)
//! - [`WgpuDevice`]: wgpu backend exposing per-unit views/samplers for bind groups

mod recording;
mod wgpu_backend;

use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;

use crate::errors::Result;
use crate::resources::format::PixelLayout;
use crate::resources::sampler::SamplerState;
use crate::resources::texture::{CubeFace, TextureKind};

pub use self::recording::{DeviceCall, RecordingDevice};
pub use self::wgpu_backend::WgpuDevice;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one rendering context instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Opaque handle to device-side texture storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceTexture(pub u64);

/// Creation parameters for device storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor<'a> {
    pub label: Option<&'a str>,
    pub kind: TextureKind,
    pub layout: PixelLayout,
    pub width: u32,
    pub height: u32,
}

/// 2D image destination within a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageTarget {
    Flat,
    CubeFace(CubeFace),
}

impl ImageTarget {
    /// Array layer the image lands in.
    #[inline]
    #[must_use]
    pub fn layer(self) -> u32 {
        match self {
            Self::Flat => 0,
            Self::CubeFace(face) => face.index() as u32,
        }
    }
}

/// Driver primitives consumed by [`TextureManager`](crate::manager::TextureManager).
///
/// All calls happen on the thread that owns the graphics context. Fatal
/// driver conditions are returned as errors and never retried.
pub trait TextureDevice {
    /// Number of texture units a draw call can read from.
    fn max_texture_units(&self) -> u32;

    /// Creates storage of the given kind. Content is allocated later by the
    /// upload primitives.
    fn create_texture(&mut self, desc: &TextureDescriptor<'_>) -> Result<DeviceTexture>;

    fn destroy_texture(&mut self, texture: DeviceTexture);

    /// Makes `unit` the target of subsequent [`bind_texture`](Self::bind_texture) calls.
    fn activate_unit(&mut self, unit: u32);

    /// Binds `texture` to the active unit for the given kind.
    fn bind_texture(&mut self, kind: TextureKind, texture: DeviceTexture);

    /// Uploads a decoded image; the extent is the image's own.
    fn upload_image(
        &mut self,
        texture: DeviceTexture,
        target: ImageTarget,
        layout: &PixelLayout,
        image: &RgbaImage,
    ) -> Result<()>;

    /// Uploads raw bytes with an explicit extent. `None` allocates storage
    /// without content.
    fn upload_data(
        &mut self,
        texture: DeviceTexture,
        target: ImageTarget,
        layout: &PixelLayout,
        width: u32,
        height: u32,
        data: Option<&[u8]>,
    ) -> Result<()>;

    /// Allocates layered storage without content.
    fn allocate_layers(
        &mut self,
        texture: DeviceTexture,
        layout: &PixelLayout,
        width: u32,
        height: u32,
        layers: u32,
    ) -> Result<()>;

    /// Writes one layer of layered storage (sub-region at origin).
    fn upload_layer(
        &mut self,
        texture: DeviceTexture,
        layout: &PixelLayout,
        layer: u32,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> Result<()>;

    /// Writes a decoded image into one layer of layered storage, honoring
    /// `layout.premultiply_alpha` like [`upload_image`](Self::upload_image).
    fn upload_image_layer(
        &mut self,
        texture: DeviceTexture,
        layout: &PixelLayout,
        layer: u32,
        image: &RgbaImage,
    ) -> Result<()>;

    fn apply_sampler(
        &mut self,
        texture: DeviceTexture,
        kind: TextureKind,
        sampler: &SamplerState,
    ) -> Result<()>;
}
