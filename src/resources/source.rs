//! Pixel sources
//!
//! A source is either directly uploadable (a decoded image whose dimensions
//! travel with it), a raw buffer that must be uploaded with an explicit
//! extent, or a placeholder for data that is still loading.

use image::RgbaImage;

/// Raw texel bytes with the extent they describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSource {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl BufferSource {
    #[must_use]
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self { data, width, height }
    }

    /// Copies a typed slice (e.g. `&[f32]`) into a byte buffer.
    #[must_use]
    pub fn from_pod<T: bytemuck::Pod>(data: &[T], width: u32, height: u32) -> Self {
        Self::new(bytemuck::cast_slice(data).to_vec(), width, height)
    }
}

#[derive(Debug, Clone)]
pub enum TextureSource {
    /// Decoded RGBA8 image; uploaded without manual extent bookkeeping.
    Image(RgbaImage),
    /// Raw texel buffer; uploaded with explicit width/height/format.
    Buffer(BufferSource),
    /// Asset still loading. Carries the expected extent if known.
    Pending { width: u32, height: u32 },
}

impl TextureSource {
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        match self {
            Self::Image(image) => image.width(),
            Self::Buffer(buffer) => buffer.width,
            Self::Pending { width, .. } => *width,
        }
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        match self {
            Self::Image(image) => image.height(),
            Self::Buffer(buffer) => buffer.height,
            Self::Pending { height, .. } => *height,
        }
    }
}

impl From<RgbaImage> for TextureSource {
    fn from(image: RgbaImage) -> Self {
        Self::Image(image)
    }
}

impl From<BufferSource> for TextureSource {
    fn from(buffer: BufferSource) -> Self {
        Self::Buffer(buffer)
    }
}
