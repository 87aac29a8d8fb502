//! Placeholder textures
//!
//! One pre-allocated 1×1 texture per kind, bound whenever no valid texture
//! is supplied. Owned by the manager and only destroyed on teardown.

use crate::device::{DeviceTexture, ImageTarget, TextureDescriptor, TextureDevice};
use crate::errors::Result;
use crate::resources::format::PixelLayout;
use crate::resources::sampler::SamplerState;
use crate::resources::texture::{CubeFace, TextureKind};
use crate::settings::TextureSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholders {
    flat: DeviceTexture,
    cube: DeviceTexture,
    array: DeviceTexture,
}

impl Placeholders {
    pub fn create(device: &mut impl TextureDevice, settings: &TextureSettings) -> Result<Self> {
        let layout = PixelLayout::default();
        let color = settings.placeholder_color;
        let sampler = SamplerState::default();

        let flat = create_unit(device, settings, TextureKind::Flat2D, "Empty Texture 2D")?;
        device.upload_data(flat, ImageTarget::Flat, &layout, 1, 1, Some(&color))?;
        device.apply_sampler(flat, TextureKind::Flat2D, &sampler)?;

        let cube = create_unit(device, settings, TextureKind::Cube, "Empty Texture Cube")?;
        for face in CubeFace::ALL {
            device.upload_data(cube, ImageTarget::CubeFace(face), &layout, 1, 1, Some(&color))?;
        }
        device.apply_sampler(cube, TextureKind::Cube, &sampler)?;

        let array = create_unit(device, settings, TextureKind::Array2D, "Empty Texture Array")?;
        device.allocate_layers(array, &layout, 1, 1, 1)?;
        device.upload_layer(array, &layout, 0, 1, 1, &color)?;
        device.apply_sampler(array, TextureKind::Array2D, &sampler)?;

        log::debug!("Created placeholder textures {flat:?} / {cube:?} / {array:?}");
        Ok(Self { flat, cube, array })
    }

    #[inline]
    #[must_use]
    pub fn get(&self, kind: TextureKind) -> DeviceTexture {
        match kind {
            TextureKind::Flat2D => self.flat,
            TextureKind::Cube => self.cube,
            TextureKind::Array2D => self.array,
        }
    }

    pub fn destroy(&self, device: &mut impl TextureDevice) {
        for kind in TextureKind::ALL {
            device.destroy_texture(self.get(kind));
        }
    }
}

fn create_unit(
    device: &mut impl TextureDevice,
    settings: &TextureSettings,
    kind: TextureKind,
    name: &str,
) -> Result<DeviceTexture> {
    let label = settings.device_label(name);
    device.create_texture(&TextureDescriptor {
        label: Some(&label),
        kind,
        layout: PixelLayout::default(),
        width: 1,
        height: 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCall, RecordingDevice};

    #[test]
    fn test_one_placeholder_per_kind() {
        let mut device = RecordingDevice::default();
        let placeholders = Placeholders::create(&mut device, &TextureSettings::default()).unwrap();

        assert_eq!(device.live_count(), 3);
        assert_ne!(placeholders.get(TextureKind::Flat2D), placeholders.get(TextureKind::Cube));
        assert_ne!(placeholders.get(TextureKind::Cube), placeholders.get(TextureKind::Array2D));
        assert_eq!(
            device.count(|c| matches!(c, DeviceCall::UploadData { has_data: true, .. })),
            7
        );

        placeholders.destroy(&mut device);
        assert_eq!(device.live_count(), 0);
    }
}
