//! Pixel layout description
//!
//! The upload target format and component type are decided upstream; this
//! module only names them and maps them onto backend formats.

use crate::errors::{Result, TextureError};

/// Channel layout of texel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    #[default]
    Rgba,
    /// RGBA with sRGB-encoded color channels
    Srgba,
    Rgb,
    Rg,
    Red,
}

impl PixelFormat {
    #[must_use]
    pub fn components(self) -> u32 {
        match self {
            Self::Rgba | Self::Srgba => 4,
            Self::Rgb => 3,
            Self::Rg => 2,
            Self::Red => 1,
        }
    }
}

/// Component type of texel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelType {
    #[default]
    UnsignedByte,
    HalfFloat,
    Float,
}

impl PixelType {
    #[must_use]
    pub fn size(self) -> u32 {
        match self {
            Self::UnsignedByte => 1,
            Self::HalfFloat => 2,
            Self::Float => 4,
        }
    }
}

/// Everything a backend needs to interpret uploaded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelLayout {
    pub format: PixelFormat,
    pub pixel_type: PixelType,
    /// Multiply color channels by alpha while unpacking decoded images
    pub premultiply_alpha: bool,
}

impl PixelLayout {
    #[inline]
    #[must_use]
    pub fn new(format: PixelFormat, pixel_type: PixelType) -> Self {
        Self {
            format,
            pixel_type,
            premultiply_alpha: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn bytes_per_pixel(&self) -> u32 {
        self.format.components() * self.pixel_type.size()
    }

    /// Byte length of a tightly packed `width × height` image in this layout.
    #[inline]
    #[must_use]
    pub fn image_size(&self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bytes_per_pixel() as usize
    }

    /// Whether decoded RGBA8 images can be copied into this layout unchanged.
    #[inline]
    #[must_use]
    pub fn accepts_rgba8(&self) -> bool {
        matches!(self.format, PixelFormat::Rgba | PixelFormat::Srgba)
            && self.pixel_type == PixelType::UnsignedByte
    }

    /// Maps the layout onto a wgpu texture format.
    ///
    /// Three-channel layouts have no wgpu equivalent and are rejected.
    pub fn to_wgpu(&self) -> Result<wgpu::TextureFormat> {
        use wgpu::TextureFormat as F;
        let format = match (self.format, self.pixel_type) {
            (PixelFormat::Rgba, PixelType::UnsignedByte) => F::Rgba8Unorm,
            (PixelFormat::Rgba, PixelType::HalfFloat) => F::Rgba16Float,
            (PixelFormat::Rgba, PixelType::Float) => F::Rgba32Float,
            (PixelFormat::Srgba, PixelType::UnsignedByte) => F::Rgba8UnormSrgb,
            (PixelFormat::Rg, PixelType::UnsignedByte) => F::Rg8Unorm,
            (PixelFormat::Rg, PixelType::HalfFloat) => F::Rg16Float,
            (PixelFormat::Rg, PixelType::Float) => F::Rg32Float,
            (PixelFormat::Red, PixelType::UnsignedByte) => F::R8Unorm,
            (PixelFormat::Red, PixelType::HalfFloat) => F::R16Float,
            (PixelFormat::Red, PixelType::Float) => F::R32Float,
            (format @ (PixelFormat::Srgba | PixelFormat::Rgb), pixel_type) => {
                return Err(TextureError::UnsupportedFormat { format, pixel_type });
            }
        };
        Ok(format)
    }
}
