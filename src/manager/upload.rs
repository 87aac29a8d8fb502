//! Upload strategy
//!
//! Per-kind allocate/upload sequences. Dispatch is an exhaustive match on
//! [`TextureContent`], so a new kind cannot be added without an upload path.
//!
//! | Kind    | Per image                                   | Storage                 |
//! |---------|---------------------------------------------|-------------------------|
//! | Flat2D  | image / buffer with extent / empty          | the image itself        |
//! | Cube    | same three-way branch for each of six faces | six faces, all uploaded |
//! | Array2D | sub-region write for loaded layers only     | allocated once per sync |

use crate::device::{DeviceTexture, ImageTarget, TextureDevice};
use crate::errors::Result;
use crate::manager::registry::GpuTexture;
use crate::resources::format::PixelLayout;
use crate::resources::sampler::SamplerState;
use crate::resources::source::TextureSource;
use crate::resources::texture::{CubeFace, Texture, TextureContent, TextureKind};

/// Uploads the current content of `texture` into `gpu` and reapplies its
/// sampler. Does not touch `gpu.last_synced_version`.
pub fn upload_texture(
    device: &mut impl TextureDevice,
    texture: &Texture,
    gpu: &mut GpuTexture,
) -> Result<()> {
    // Snapshot scalar state before holding the content lock
    let layout = texture.layout();
    let (width, height) = (texture.width(), texture.height());
    let sampler = SamplerState::for_texture(texture);
    let handle = gpu.handle;

    let layers = {
        let content = texture.content();
        match &*content {
            TextureContent::Flat(source) => {
                upload_image(
                    device,
                    handle,
                    ImageTarget::Flat,
                    &layout,
                    width,
                    height,
                    source.as_ref(),
                )?;
                1
            }
            TextureContent::Cube(faces) => {
                // No per-face dirty tracking: every face goes up on every sync
                for face in CubeFace::ALL {
                    upload_image(
                        device,
                        handle,
                        ImageTarget::CubeFace(face),
                        &layout,
                        width,
                        height,
                        faces[face.index()].as_ref(),
                    )?;
                }
                6
            }
            TextureContent::Array(sources) => {
                let layers = sources.len() as u32;
                device.allocate_layers(handle, &layout, width, height, layers)?;
                for (layer, source) in sources.iter().enumerate() {
                    let layer = layer as u32;
                    match source {
                        Some(TextureSource::Image(image)) => {
                            device.upload_image_layer(handle, &layout, layer, image)?;
                        }
                        Some(TextureSource::Buffer(buffer)) => {
                            device.upload_layer(
                                handle,
                                &layout,
                                layer,
                                buffer.width,
                                buffer.height,
                                &buffer.data,
                            )?;
                        }
                        // Not ready: the layer keeps its previous texels
                        Some(TextureSource::Pending { .. }) | None => {}
                    }
                }
                layers
            }
        }
    };

    log::trace!(
        "Uploaded {:?} {handle:?} ({width}x{height}x{layers})",
        gpu.kind
    );

    gpu.layout = layout;
    gpu.width = width;
    gpu.height = height;
    gpu.layers = layers;

    apply_sampler(device, handle, gpu.kind, &sampler)
}

/// Three-way branch shared by flat textures and cube faces.
fn upload_image(
    device: &mut impl TextureDevice,
    handle: DeviceTexture,
    target: ImageTarget,
    layout: &PixelLayout,
    width: u32,
    height: u32,
    source: Option<&TextureSource>,
) -> Result<()> {
    match source {
        Some(TextureSource::Image(image)) => device.upload_image(handle, target, layout, image),
        Some(TextureSource::Buffer(buffer)) => {
            device.upload_data(handle, target, layout, width, height, Some(&buffer.data))
        }
        Some(TextureSource::Pending { .. }) | None => {
            device.upload_data(handle, target, layout, width, height, None)
        }
    }
}

#[inline]
pub fn apply_sampler(
    device: &mut impl TextureDevice,
    handle: DeviceTexture,
    kind: TextureKind,
    sampler: &SamplerState,
) -> Result<()> {
    device.apply_sampler(handle, kind, sampler)
}
