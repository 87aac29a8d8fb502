//! Headless recording device
//!
//! Records every primitive as a [`DeviceCall`] and tracks which handles are
//! alive. No pixel data is kept, only extents and whether content was given.

use image::RgbaImage;
use rustc_hash::FxHashSet;

use super::{DeviceTexture, ImageTarget, TextureDescriptor, TextureDevice};
use crate::errors::{Result, TextureError};
use crate::resources::format::PixelLayout;
use crate::resources::sampler::SamplerState;
use crate::resources::texture::TextureKind;

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    CreateTexture {
        texture: DeviceTexture,
        kind: TextureKind,
        width: u32,
        height: u32,
    },
    DestroyTexture(DeviceTexture),
    ActivateUnit(u32),
    BindTexture {
        kind: TextureKind,
        texture: DeviceTexture,
    },
    UploadImage {
        texture: DeviceTexture,
        target: ImageTarget,
        width: u32,
        height: u32,
        premultiply_alpha: bool,
    },
    UploadData {
        texture: DeviceTexture,
        target: ImageTarget,
        width: u32,
        height: u32,
        has_data: bool,
    },
    AllocateLayers {
        texture: DeviceTexture,
        width: u32,
        height: u32,
        layers: u32,
    },
    UploadLayer {
        texture: DeviceTexture,
        layer: u32,
        width: u32,
        height: u32,
    },
    UploadImageLayer {
        texture: DeviceTexture,
        layer: u32,
        width: u32,
        height: u32,
        premultiply_alpha: bool,
    },
    ApplySampler {
        texture: DeviceTexture,
        kind: TextureKind,
        sampler: SamplerState,
    },
}

impl DeviceCall {
    /// Whether this call writes or allocates texel storage.
    #[must_use]
    pub fn is_upload(&self) -> bool {
        matches!(
            self,
            Self::UploadImage { .. }
                | Self::UploadData { .. }
                | Self::AllocateLayers { .. }
                | Self::UploadLayer { .. }
                | Self::UploadImageLayer { .. }
        )
    }
}

#[derive(Debug)]
pub struct RecordingDevice {
    max_units: u32,
    next_handle: u64,
    live: FxHashSet<DeviceTexture>,
    calls: Vec<DeviceCall>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new(16)
    }
}

impl RecordingDevice {
    #[must_use]
    pub fn new(max_units: u32) -> Self {
        Self {
            max_units,
            next_handle: 1,
            live: FxHashSet::default(),
            calls: Vec::new(),
        }
    }

    #[must_use]
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Counts recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    #[must_use]
    pub fn upload_count(&self) -> usize {
        self.count(DeviceCall::is_upload)
    }

    #[must_use]
    pub fn activation_count(&self) -> usize {
        self.count(|call| matches!(call, DeviceCall::ActivateUnit(_)))
    }

    #[must_use]
    pub fn is_live(&self, texture: DeviceTexture) -> bool {
        self.live.contains(&texture)
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    fn check_live(&self, texture: DeviceTexture) -> Result<()> {
        if self.live.contains(&texture) {
            Ok(())
        } else {
            Err(TextureError::UnknownTexture(texture))
        }
    }
}

impl TextureDevice for RecordingDevice {
    fn max_texture_units(&self) -> u32 {
        self.max_units
    }

    fn create_texture(&mut self, desc: &TextureDescriptor<'_>) -> Result<DeviceTexture> {
        let texture = DeviceTexture(self.next_handle);
        self.next_handle += 1;
        self.live.insert(texture);
        self.calls.push(DeviceCall::CreateTexture {
            texture,
            kind: desc.kind,
            width: desc.width,
            height: desc.height,
        });
        Ok(texture)
    }

    fn destroy_texture(&mut self, texture: DeviceTexture) {
        self.live.remove(&texture);
        self.calls.push(DeviceCall::DestroyTexture(texture));
    }

    fn activate_unit(&mut self, unit: u32) {
        self.calls.push(DeviceCall::ActivateUnit(unit));
    }

    fn bind_texture(&mut self, kind: TextureKind, texture: DeviceTexture) {
        self.calls.push(DeviceCall::BindTexture { kind, texture });
    }

    fn upload_image(
        &mut self,
        texture: DeviceTexture,
        target: ImageTarget,
        layout: &PixelLayout,
        image: &RgbaImage,
    ) -> Result<()> {
        self.check_live(texture)?;
        self.calls.push(DeviceCall::UploadImage {
            texture,
            target,
            width: image.width(),
            height: image.height(),
            premultiply_alpha: layout.premultiply_alpha,
        });
        Ok(())
    }

    fn upload_data(
        &mut self,
        texture: DeviceTexture,
        target: ImageTarget,
        _layout: &PixelLayout,
        width: u32,
        height: u32,
        data: Option<&[u8]>,
    ) -> Result<()> {
        self.check_live(texture)?;
        self.calls.push(DeviceCall::UploadData {
            texture,
            target,
            width,
            height,
            has_data: data.is_some(),
        });
        Ok(())
    }

    fn allocate_layers(
        &mut self,
        texture: DeviceTexture,
        _layout: &PixelLayout,
        width: u32,
        height: u32,
        layers: u32,
    ) -> Result<()> {
        self.check_live(texture)?;
        self.calls.push(DeviceCall::AllocateLayers {
            texture,
            width,
            height,
            layers,
        });
        Ok(())
    }

    fn upload_layer(
        &mut self,
        texture: DeviceTexture,
        _layout: &PixelLayout,
        layer: u32,
        width: u32,
        height: u32,
        _data: &[u8],
    ) -> Result<()> {
        self.check_live(texture)?;
        self.calls.push(DeviceCall::UploadLayer {
            texture,
            layer,
            width,
            height,
        });
        Ok(())
    }

    fn upload_image_layer(
        &mut self,
        texture: DeviceTexture,
        layout: &PixelLayout,
        layer: u32,
        image: &RgbaImage,
    ) -> Result<()> {
        self.check_live(texture)?;
        self.calls.push(DeviceCall::UploadImageLayer {
            texture,
            layer,
            width: image.width(),
            height: image.height(),
            premultiply_alpha: layout.premultiply_alpha,
        });
        Ok(())
    }

    fn apply_sampler(
        &mut self,
        texture: DeviceTexture,
        kind: TextureKind,
        sampler: &SamplerState,
    ) -> Result<()> {
        self.check_live(texture)?;
        self.calls.push(DeviceCall::ApplySampler {
            texture,
            kind,
            sampler: *sampler,
        });
        Ok(())
    }
}
