//! Sampler state
//!
//! Wrap and filter settings are derived from texture state on every sync
//! pass. Deriving them is a pure function; no dirty tracking is kept here.

/// Texture coordinate wrapping, applied identically on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

impl From<WrapMode> for wgpu::AddressMode {
    fn from(mode: WrapMode) -> Self {
        match mode {
            WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            WrapMode::Repeat => wgpu::AddressMode::Repeat,
            WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

/// Magnification/minification style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScaleMode {
    #[default]
    Nearest,
    Linear,
}

impl From<ScaleMode> for wgpu::FilterMode {
    fn from(mode: ScaleMode) -> Self {
        match mode {
            ScaleMode::Nearest => wgpu::FilterMode::Nearest,
            ScaleMode::Linear => wgpu::FilterMode::Linear,
        }
    }
}

/// Minification filter including the mipmapped variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapLinear,
}

impl MinFilter {
    #[must_use]
    pub fn uses_mipmaps(self) -> bool {
        matches!(self, Self::NearestMipmapNearest | Self::LinearMipmapLinear)
    }
}

/// Resolved sampler parameters for one texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerState {
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub min_filter: MinFilter,
    pub mag_filter: ScaleMode,
}

impl Default for SamplerState {
    fn default() -> Self {
        Self::new(WrapMode::default(), ScaleMode::default(), false)
    }
}

impl SamplerState {
    /// Derives sampler parameters from wrap mode, scale mode and mipmap usage.
    #[must_use]
    pub fn new(wrap: WrapMode, scale: ScaleMode, mipmap: bool) -> Self {
        let min_filter = match (scale, mipmap) {
            (ScaleMode::Nearest, false) => MinFilter::Nearest,
            (ScaleMode::Linear, false) => MinFilter::Linear,
            (ScaleMode::Nearest, true) => MinFilter::NearestMipmapNearest,
            (ScaleMode::Linear, true) => MinFilter::LinearMipmapLinear,
        };
        Self {
            wrap_s: wrap,
            wrap_t: wrap,
            min_filter,
            mag_filter: scale,
        }
    }

    #[must_use]
    pub fn for_texture(texture: &crate::resources::texture::Texture) -> Self {
        Self::new(texture.wrap_mode(), texture.scale_mode(), texture.mipmap())
    }

    /// Builds the equivalent wgpu sampler descriptor.
    #[must_use]
    pub fn to_descriptor<'a>(&self, label: Option<&'a str>) -> wgpu::SamplerDescriptor<'a> {
        let (min_filter, mipmap_filter) = match self.min_filter {
            MinFilter::Nearest | MinFilter::NearestMipmapNearest => {
                (wgpu::FilterMode::Nearest, wgpu::MipmapFilterMode::Nearest)
            }
            MinFilter::Linear | MinFilter::LinearMipmapLinear => {
                (wgpu::FilterMode::Linear, wgpu::MipmapFilterMode::Linear)
            }
        };
        // Without mipmaps the sampler must never leave level 0.
        let lod_max_clamp = if self.min_filter.uses_mipmaps() { 32.0 } else { 0.0 };

        wgpu::SamplerDescriptor {
            label,
            address_mode_u: self.wrap_s.into(),
            address_mode_v: self.wrap_t.into(),
            address_mode_w: self.wrap_t.into(),
            mag_filter: self.mag_filter.into(),
            min_filter,
            mipmap_filter,
            lod_min_clamp: 0.0,
            lod_max_clamp,
            ..Default::default()
        }
    }
}
