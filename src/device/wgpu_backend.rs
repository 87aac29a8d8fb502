//! wgpu backend
//!
//! Each device handle owns at most one `wgpu::Texture` plus its default view.
//! Storage is created lazily by the first upload and re-created whenever the
//! requested extent or format differs from what is allocated. Binding a unit
//! only records the handle; render passes read [`WgpuDevice::unit_view`] and
//! [`WgpuDevice::unit_sampler`] when assembling bind groups.

use std::borrow::Cow;

use image::RgbaImage;
use rustc_hash::FxHashMap;

use super::{DeviceTexture, ImageTarget, TextureDescriptor, TextureDevice};
use crate::errors::{Result, TextureError};
use crate::resources::format::PixelLayout;
use crate::resources::sampler::SamplerState;
use crate::resources::texture::TextureKind;

struct GpuStorage {
    label: String,
    kind: TextureKind,
    texture: Option<wgpu::Texture>,
    view: Option<wgpu::TextureView>,
    sampler: SamplerState,
}

impl GpuStorage {
    fn view_dimension(&self) -> wgpu::TextureViewDimension {
        match self.kind {
            TextureKind::Flat2D => wgpu::TextureViewDimension::D2,
            TextureKind::Cube => wgpu::TextureViewDimension::Cube,
            TextureKind::Array2D => wgpu::TextureViewDimension::D2Array,
        }
    }

    fn layers_for(&self, target: ImageTarget) -> u32 {
        match (self.kind, target) {
            (TextureKind::Cube, _) | (_, ImageTarget::CubeFace(_)) => 6,
            _ => 1,
        }
    }

    /// Returns storage of exactly this extent and format, re-creating it if needed.
    fn ensure(
        &mut self,
        device: &wgpu::Device,
        layout: &PixelLayout,
        width: u32,
        height: u32,
        layers: u32,
    ) -> Result<&wgpu::Texture> {
        let format = layout.to_wgpu()?;
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: layers.max(1),
        };

        let reusable = self
            .texture
            .as_ref()
            .is_some_and(|t| t.size() == size && t.format() == format);

        if !reusable {
            if let Some(old) = self.texture.take() {
                old.destroy();
            }
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(&self.label),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some(&self.label),
                format: Some(format),
                dimension: Some(self.view_dimension()),
                ..Default::default()
            });
            log::debug!(
                "Allocated '{}' {}x{}x{} {format:?}",
                self.label,
                size.width,
                size.height,
                size.depth_or_array_layers
            );
            self.view = Some(view);
            self.texture = Some(texture);
        }

        self.texture
            .as_ref()
            .ok_or_else(|| TextureError::Device(format!("storage for '{}' missing", self.label)))
    }
}

fn write_layer(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    layout: &PixelLayout,
    layer: u32,
    width: u32,
    height: u32,
    data: &[u8],
) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * layout.bytes_per_pixel()),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

fn premultiplied(rgba: &[u8]) -> Vec<u8> {
    let mut out = rgba.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * a + 127) / 255) as u8;
        }
    }
    out
}

/// Texels of a decoded image as they should reach storage of `layout`.
fn image_bytes<'a>(layout: &PixelLayout, image: &'a RgbaImage) -> Result<Cow<'a, [u8]>> {
    if !layout.accepts_rgba8() {
        return Err(TextureError::SourceFormatMismatch {
            format: layout.format,
            pixel_type: layout.pixel_type,
        });
    }
    Ok(if layout.premultiply_alpha {
        Cow::Owned(premultiplied(image.as_raw()))
    } else {
        Cow::Borrowed(image.as_raw().as_slice())
    })
}

fn check_size(layout: &PixelLayout, width: u32, height: u32, data: &[u8]) -> Result<()> {
    let expected = layout.image_size(width, height);
    if data.len() == expected {
        Ok(())
    } else {
        Err(TextureError::DataSizeMismatch {
            expected,
            actual: data.len(),
        })
    }
}

/// Top-left `clip_width × clip_height` region of a tightly packed image
/// `width` texels wide.
fn clip_rows(
    data: &[u8],
    bytes_per_pixel: usize,
    width: u32,
    clip_width: u32,
    clip_height: u32,
) -> Vec<u8> {
    let src_row = width as usize * bytes_per_pixel;
    let dst_row = clip_width as usize * bytes_per_pixel;
    if src_row == 0 {
        return Vec::new();
    }
    data.chunks_exact(src_row)
        .take(clip_height as usize)
        .flat_map(|row| row[..dst_row].iter().copied())
        .collect()
}

/// wgpu-backed [`TextureDevice`].
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    max_units: u32,
    next_handle: u64,
    textures: FxHashMap<DeviceTexture, GpuStorage>,
    units: Vec<Option<DeviceTexture>>,
    active_unit: u32,
    sampler_cache: FxHashMap<SamplerState, wgpu::Sampler>,
}

impl WgpuDevice {
    #[must_use]
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let max_units = device.limits().max_sampled_textures_per_shader_stage;
        Self {
            device,
            queue,
            max_units,
            next_handle: 1,
            textures: FxHashMap::default(),
            units: vec![None; max_units as usize],
            active_unit: 0,
            sampler_cache: FxHashMap::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Allocated storage behind a handle, if any upload has happened.
    #[must_use]
    pub fn texture(&self, texture: DeviceTexture) -> Option<&wgpu::Texture> {
        self.textures.get(&texture)?.texture.as_ref()
    }

    /// Default view of whatever is bound to `unit`.
    #[must_use]
    pub fn unit_view(&self, unit: u32) -> Option<&wgpu::TextureView> {
        let handle = (*self.units.get(unit as usize)?)?;
        self.textures.get(&handle)?.view.as_ref()
    }

    /// Sampler last applied to whatever is bound to `unit`.
    #[must_use]
    pub fn unit_sampler(&self, unit: u32) -> Option<&wgpu::Sampler> {
        let handle = (*self.units.get(unit as usize)?)?;
        let state = self.textures.get(&handle)?.sampler;
        self.sampler_cache.get(&state)
    }

    fn storage(&mut self, texture: DeviceTexture) -> Result<&mut GpuStorage> {
        self.textures
            .get_mut(&texture)
            .ok_or(TextureError::UnknownTexture(texture))
    }

    /// Sub-region write at the origin of `layer`, clipped to the allocated
    /// extent. Storage must already be allocated.
    fn write_sub_layer(
        &self,
        texture: DeviceTexture,
        layout: &PixelLayout,
        layer: u32,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }

        let storage = self
            .textures
            .get(&texture)
            .ok_or(TextureError::UnknownTexture(texture))?;
        let Some(gpu_texture) = storage.texture.as_ref() else {
            return Err(TextureError::Device(format!(
                "layer upload into unallocated '{}'",
                storage.label
            )));
        };
        let size = gpu_texture.size();
        if layer >= size.depth_or_array_layers {
            return Err(TextureError::LayerOutOfRange {
                layer,
                layers: size.depth_or_array_layers,
            });
        }

        let clip_width = width.min(size.width);
        let clip_height = height.min(size.height);
        if (clip_width, clip_height) == (width, height) {
            write_layer(&self.queue, gpu_texture, layout, layer, width, height, data);
        } else {
            let bpp = layout.bytes_per_pixel() as usize;
            let clipped = clip_rows(data, bpp, width, clip_width, clip_height);
            write_layer(
                &self.queue,
                gpu_texture,
                layout,
                layer,
                clip_width,
                clip_height,
                &clipped,
            );
        }
        Ok(())
    }
}

impl TextureDevice for WgpuDevice {
    fn max_texture_units(&self) -> u32 {
        self.max_units
    }

    fn create_texture(&mut self, desc: &TextureDescriptor<'_>) -> Result<DeviceTexture> {
        // Reject unrepresentable layouts up front rather than at first upload.
        desc.layout.to_wgpu()?;

        let handle = DeviceTexture(self.next_handle);
        self.next_handle += 1;
        self.textures.insert(
            handle,
            GpuStorage {
                label: desc.label.unwrap_or("Texture").to_string(),
                kind: desc.kind,
                texture: None,
                view: None,
                sampler: SamplerState::default(),
            },
        );
        Ok(handle)
    }

    fn destroy_texture(&mut self, texture: DeviceTexture) {
        if let Some(storage) = self.textures.remove(&texture)
            && let Some(t) = storage.texture
        {
            t.destroy();
        }
        for unit in &mut self.units {
            if *unit == Some(texture) {
                *unit = None;
            }
        }
    }

    fn activate_unit(&mut self, unit: u32) {
        self.active_unit = unit;
    }

    fn bind_texture(&mut self, kind: TextureKind, texture: DeviceTexture) {
        if let Some(unit) = self.units.get_mut(self.active_unit as usize) {
            *unit = Some(texture);
        } else {
            log::warn!(
                "bind {kind:?} to unit {} beyond device limit {}",
                self.active_unit,
                self.max_units
            );
        }
    }

    fn upload_image(
        &mut self,
        texture: DeviceTexture,
        target: ImageTarget,
        layout: &PixelLayout,
        image: &RgbaImage,
    ) -> Result<()> {
        let data = image_bytes(layout, image)?;
        let (width, height) = image.dimensions();

        let device = &self.device;
        let storage = self
            .textures
            .get_mut(&texture)
            .ok_or(TextureError::UnknownTexture(texture))?;
        let layers = storage.layers_for(target);
        let gpu_texture = storage.ensure(device, layout, width, height, layers)?;
        write_layer(&self.queue, gpu_texture, layout, target.layer(), width, height, &data);
        Ok(())
    }

    fn upload_data(
        &mut self,
        texture: DeviceTexture,
        target: ImageTarget,
        layout: &PixelLayout,
        width: u32,
        height: u32,
        data: Option<&[u8]>,
    ) -> Result<()> {
        if let Some(bytes) = data {
            check_size(layout, width, height, bytes)?;
        }

        let device = &self.device;
        let storage = self
            .textures
            .get_mut(&texture)
            .ok_or(TextureError::UnknownTexture(texture))?;
        let layers = storage.layers_for(target);
        let gpu_texture = storage.ensure(device, layout, width, height, layers)?;
        if let Some(bytes) = data {
            write_layer(&self.queue, gpu_texture, layout, target.layer(), width, height, bytes);
        }
        Ok(())
    }

    fn allocate_layers(
        &mut self,
        texture: DeviceTexture,
        layout: &PixelLayout,
        width: u32,
        height: u32,
        layers: u32,
    ) -> Result<()> {
        let device = &self.device;
        let storage = self
            .textures
            .get_mut(&texture)
            .ok_or(TextureError::UnknownTexture(texture))?;
        storage.ensure(device, layout, width, height, layers)?;
        Ok(())
    }

    fn upload_layer(
        &mut self,
        texture: DeviceTexture,
        layout: &PixelLayout,
        layer: u32,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> Result<()> {
        check_size(layout, width, height, data)?;
        self.write_sub_layer(texture, layout, layer, width, height, data)
    }

    fn upload_image_layer(
        &mut self,
        texture: DeviceTexture,
        layout: &PixelLayout,
        layer: u32,
        image: &RgbaImage,
    ) -> Result<()> {
        let data = image_bytes(layout, image)?;
        let (width, height) = image.dimensions();
        self.write_sub_layer(texture, layout, layer, width, height, &data)
    }

    fn apply_sampler(
        &mut self,
        texture: DeviceTexture,
        _kind: TextureKind,
        sampler: &SamplerState,
    ) -> Result<()> {
        self.storage(texture)?.sampler = *sampler;
        let device = &self.device;
        self.sampler_cache.entry(*sampler).or_insert_with(|| {
            device.create_sampler(&sampler.to_descriptor(Some("Cached Sampler")))
        });
        Ok(())
    }
}
