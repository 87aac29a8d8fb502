//! Texture Manager Tests
//!
//! Tests for:
//! - Bind flow: lazy registration, dirty-driven upload, activation discipline
//! - Per-kind upload sequences (flat, cube, array)
//! - Placeholder fallback for missing or still-loading textures
//! - Lifecycle: unbind, destroy_texture, dispose notifications, destroy_all
//! - Multiple contexts sharing one texture

use image::RgbaImage;

use myth_texture_units::{
    BufferSource, CubeFace, DeviceCall, DeviceTexture, ImageTarget, PixelLayout, RecordingDevice,
    SamplerState, ScaleMode, Texture, TextureError, TextureKind, TextureManager, TextureSettings,
    TextureSource, UNSYNCED_VERSION, WrapMode,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Manager over a recording device with the placeholder setup calls cleared.
fn manager_with_units(units: u32) -> TextureManager<RecordingDevice> {
    init_logging();
    let mut manager =
        TextureManager::new(RecordingDevice::new(units), TextureSettings::default()).unwrap();
    manager.device_mut().clear_calls();
    manager
}

fn manager() -> TextureManager<RecordingDevice> {
    manager_with_units(16)
}

fn handle_of(manager: &TextureManager<RecordingDevice>, texture: &Texture) -> DeviceTexture {
    manager.gpu_texture(texture).unwrap().handle
}

fn image_source(size: u32) -> TextureSource {
    TextureSource::Image(RgbaImage::new(size, size))
}

fn cube_faces(size: u32) -> [Option<TextureSource>; 6] {
    std::array::from_fn(|_| Some(image_source(size)))
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn new_allocates_one_placeholder_per_kind() {
    init_logging();
    let manager =
        TextureManager::new(RecordingDevice::new(8), TextureSettings::default()).unwrap();

    assert_eq!(manager.max_texture_units(), 8);
    assert_eq!(manager.device().live_count(), 3);
    for kind in TextureKind::ALL {
        let placeholder = manager.placeholder(kind).unwrap();
        assert!(manager.device().is_live(placeholder));
    }
    assert_eq!(manager.active_slot(), None);
    assert_eq!(manager.managed_count(), 0);
}

#[test]
fn settings_cap_the_slot_count() {
    let settings = TextureSettings {
        max_texture_units: Some(4),
        ..Default::default()
    };
    let manager = TextureManager::new(RecordingDevice::new(16), settings).unwrap();
    assert_eq!(manager.max_texture_units(), 4);
}

#[test]
fn each_manager_gets_its_own_context_id() {
    let a = manager();
    let b = manager();
    assert_ne!(a.context_id(), b.context_id());
}

// ============================================================================
// Bind: sync + bookkeeping
// ============================================================================

#[test]
fn bind_leaves_resource_synced_with_texture_version() {
    let mut manager = manager();
    let texture = Texture::from_image("albedo", RgbaImage::new(8, 8));
    texture.needs_update();

    manager.bind(Some(&texture), 0).unwrap();

    let gpu = manager.gpu_texture(&texture).unwrap();
    assert_eq!(gpu.last_synced_version, texture.version());
    assert_ne!(gpu.last_synced_version, UNSYNCED_VERSION);
    assert_eq!(manager.slot(0), Some(texture.id()));
}

#[test]
fn flat_texture_without_source_is_allocated_empty() {
    let mut manager = manager();
    let texture = Texture::new_2d("target", 4, 4, None);

    manager.bind(Some(&texture), 0).unwrap();

    let handle = handle_of(&manager, &texture);
    assert_eq!(
        manager.device().calls(),
        &[
            DeviceCall::ActivateUnit(0),
            DeviceCall::CreateTexture {
                texture: handle,
                kind: TextureKind::Flat2D,
                width: 1,
                height: 1,
            },
            DeviceCall::UploadData {
                texture: handle,
                target: ImageTarget::Flat,
                width: 4,
                height: 4,
                has_data: false,
            },
            DeviceCall::ApplySampler {
                texture: handle,
                kind: TextureKind::Flat2D,
                sampler: SamplerState::new(WrapMode::ClampToEdge, ScaleMode::Nearest, false),
            },
            DeviceCall::BindTexture {
                kind: TextureKind::Flat2D,
                texture: handle,
            },
        ]
    );

    let gpu = manager.gpu_texture(&texture).unwrap();
    assert_eq!((gpu.width, gpu.height), (4, 4));
    assert_eq!(manager.slot(0), Some(texture.id()));
    assert_eq!(texture.resident_in(manager.context_id()), Some(handle));
}

#[test]
fn buffer_source_is_uploaded_with_explicit_extent() {
    let mut manager = manager();
    let pixels: Vec<f32> = vec![0.5; 2 * 2 * 4];
    let texture = Texture::from_buffer(
        "lut",
        BufferSource::from_pod(&pixels, 2, 2),
        PixelLayout::new(
            myth_texture_units::PixelFormat::Rgba,
            myth_texture_units::PixelType::Float,
        ),
    );

    manager.bind(Some(&texture), 0).unwrap();

    let handle = handle_of(&manager, &texture);
    assert_eq!(
        manager
            .device()
            .count(|call| *call
                == DeviceCall::UploadData {
                    texture: handle,
                    target: ImageTarget::Flat,
                    width: 2,
                    height: 2,
                    has_data: true,
                }),
        1
    );
    assert_eq!(
        manager.gpu_texture(&texture).unwrap().layout.pixel_type,
        myth_texture_units::PixelType::Float
    );
}

#[test]
fn rebinding_unchanged_texture_issues_no_uploads() {
    let mut manager = manager();
    let texture = Texture::from_image("albedo", RgbaImage::new(4, 4));
    manager.bind(Some(&texture), 0).unwrap();
    manager.device_mut().clear_calls();

    manager.bind(Some(&texture), 0).unwrap();
    assert_eq!(manager.device().upload_count(), 0);
    assert_eq!(manager.device().activation_count(), 0);
    assert_eq!(
        manager.device().calls(),
        &[DeviceCall::BindTexture {
            kind: TextureKind::Flat2D,
            texture: handle_of(&manager, &texture),
        }]
    );

    // Different slot: activation only
    manager.bind(Some(&texture), 1).unwrap();
    assert_eq!(manager.device().upload_count(), 0);
    assert_eq!(manager.device().activation_count(), 1);
    assert_eq!(manager.slots_of(&texture).as_slice(), &[0, 1]);
}

#[test]
fn version_bump_triggers_reupload() {
    let mut manager = manager();
    let texture = Texture::from_image("albedo", RgbaImage::new(4, 4));
    manager.bind(Some(&texture), 0).unwrap();
    manager.device_mut().clear_calls();

    texture.set_source(Some(image_source(8)));
    manager.bind(Some(&texture), 0).unwrap();

    assert_eq!(
        manager
            .device()
            .count(|call| matches!(call, DeviceCall::UploadImage { width: 8, height: 8, .. })),
        1
    );
    assert_eq!(
        manager.gpu_texture(&texture).unwrap().last_synced_version,
        texture.version()
    );
}

#[test]
fn two_textures_into_active_slot_activate_once() {
    let mut manager = manager();
    let a = Texture::new_2d("a", 2, 2, None);
    let b = Texture::new_2d("b", 2, 2, None);

    manager.bind(Some(&a), 3).unwrap();
    manager.bind(Some(&b), 3).unwrap();

    assert_eq!(manager.device().activation_count(), 1);
    assert_eq!(manager.active_slot(), Some(3));
    assert_eq!(manager.slot(3), Some(b.id()));
    assert!(manager.slots_of(&a).is_empty());
}

#[test]
fn bind_out_of_range_slot_fails() {
    let mut manager = manager_with_units(4);
    let texture = Texture::new_2d("a", 2, 2, None);

    let err = manager.bind(Some(&texture), 4).unwrap_err();
    assert_eq!(err, TextureError::SlotOutOfRange { slot: 4, max: 4 });
    assert!(manager.device().calls().is_empty());
    assert!(!manager.is_managed(&texture));
}

#[test]
fn sampler_change_reapplies_sampler() {
    let mut manager = manager();
    let texture = Texture::new_2d("a", 2, 2, None);
    manager.bind(Some(&texture), 0).unwrap();
    manager.device_mut().clear_calls();

    texture.set_wrap_mode(WrapMode::Repeat);
    texture.set_scale_mode(ScaleMode::Linear);
    texture.set_mipmap(true);
    manager.bind(Some(&texture), 0).unwrap();

    let expected = SamplerState::new(WrapMode::Repeat, ScaleMode::Linear, true);
    assert_eq!(
        manager.device().count(|call| matches!(
            call,
            DeviceCall::ApplySampler { sampler, .. } if *sampler == expected
        )),
        1
    );
}

// ============================================================================
// Placeholder fallback
// ============================================================================

#[test]
fn binding_none_binds_flat_placeholder() {
    let mut manager = manager();
    manager.bind(None, 2).unwrap();

    let placeholder = manager.placeholder(TextureKind::Flat2D).unwrap();
    assert_eq!(
        manager.device().calls(),
        &[
            DeviceCall::ActivateUnit(2),
            DeviceCall::BindTexture {
                kind: TextureKind::Flat2D,
                texture: placeholder,
            },
        ]
    );
    assert_eq!(manager.slot(2), None);
}

#[test]
fn loading_texture_binds_placeholder_until_ready() {
    let mut manager = manager();
    let texture = Texture::new_2d(
        "streamed",
        0,
        0,
        Some(TextureSource::Pending {
            width: 0,
            height: 0,
        }),
    );

    manager.bind(Some(&texture), 0).unwrap();
    assert!(!manager.is_managed(&texture));
    assert_eq!(manager.slot(0), None);
    assert_eq!(manager.device().upload_count(), 0);

    texture.set_source(Some(image_source(16)));
    assert!(texture.is_valid());
    manager.bind(Some(&texture), 0).unwrap();
    assert!(manager.is_managed(&texture));
    assert_eq!(manager.slot(0), Some(texture.id()));
}

#[test]
fn loading_cube_binds_cube_placeholder() {
    let mut manager = manager();
    let texture = Texture::new_cube("sky", 4, cube_faces(4));
    texture.set_loading(true);

    manager.bind(Some(&texture), 1).unwrap();
    let placeholder = manager.placeholder(TextureKind::Cube).unwrap();
    assert_eq!(
        manager.device().calls().last(),
        Some(&DeviceCall::BindTexture {
            kind: TextureKind::Cube,
            texture: placeholder,
        })
    );

    texture.set_loading(false);
    manager.bind(Some(&texture), 1).unwrap();
    assert_eq!(manager.slot(1), Some(texture.id()));
}

// ============================================================================
// Per-kind uploads
// ============================================================================

#[test]
fn cube_face_change_reuploads_all_six_faces() {
    let mut manager = manager();
    let texture = Texture::new_cube("sky", 4, cube_faces(4));
    manager.bind(Some(&texture), 0).unwrap();
    assert_eq!(manager.device().upload_count(), 6);
    manager.device_mut().clear_calls();

    let before = texture.version();
    texture.set_face(CubeFace::NegativeY, Some(image_source(4)));
    assert!(texture.version() > before);

    manager.bind(Some(&texture), 0).unwrap();
    let faces: Vec<_> = manager
        .device()
        .calls()
        .iter()
        .filter_map(|call| match call {
            DeviceCall::UploadImage {
                target: ImageTarget::CubeFace(face),
                ..
            } => Some(*face),
            _ => None,
        })
        .collect();
    assert_eq!(faces, CubeFace::ALL.to_vec());

    let gpu = manager.gpu_texture(&texture).unwrap();
    assert_eq!(gpu.last_synced_version, texture.version());
    assert_eq!(gpu.layers, 6);
}

#[test]
fn cube_missing_faces_are_allocated_empty() {
    let mut manager = manager();
    let mut faces = cube_faces(2);
    faces[CubeFace::PositiveZ.index()] = None;
    let texture = Texture::new_cube("sky", 2, faces);

    manager.bind(Some(&texture), 0).unwrap();
    assert_eq!(
        manager.device().count(|call| matches!(
            call,
            DeviceCall::UploadData {
                target: ImageTarget::CubeFace(CubeFace::PositiveZ),
                has_data: false,
                ..
            }
        )),
        1
    );
    assert_eq!(
        manager
            .device()
            .count(|call| matches!(call, DeviceCall::UploadImage { .. })),
        5
    );
}

#[test]
fn array_uploads_only_loaded_layers() {
    let mut manager = manager();
    let texture = Texture::new_array(
        "atlas",
        4,
        4,
        vec![
            Some(image_source(4)),
            Some(TextureSource::Pending { width: 4, height: 4 }),
            None,
        ],
    );

    manager.bind(Some(&texture), 0).unwrap();
    let handle = handle_of(&manager, &texture);
    assert!(manager.device().calls().contains(&DeviceCall::AllocateLayers {
        texture: handle,
        width: 4,
        height: 4,
        layers: 3,
    }));
    assert_eq!(
        manager
            .device()
            .count(|call| matches!(call, DeviceCall::UploadImageLayer { .. })),
        1
    );
    manager.device_mut().clear_calls();

    texture.set_layer(1, Some(image_source(4)));
    manager.bind(Some(&texture), 0).unwrap();
    let layers: Vec<_> = manager
        .device()
        .calls()
        .iter()
        .filter_map(|call| match call {
            DeviceCall::UploadImageLayer { layer, .. } => Some(*layer),
            _ => None,
        })
        .collect();
    assert_eq!(layers, vec![0, 1]);
}

// ============================================================================
// Explicit registration and sync
// ============================================================================

#[test]
fn register_creates_without_upload() {
    let mut manager = manager();
    let texture = Texture::new_2d("a", 2, 2, None);

    let handle = manager.register(&texture).unwrap();
    assert_eq!(manager.register(&texture).unwrap(), handle);
    assert_eq!(manager.device().upload_count(), 0);
    assert_eq!(
        manager.gpu_texture(&texture).unwrap().last_synced_version,
        UNSYNCED_VERSION
    );
    assert_eq!(texture.listener_count(), 1);
}

#[test]
fn sync_reports_whether_upload_ran() {
    let mut manager = manager();
    let texture = Texture::new_2d("a", 2, 2, None);

    assert!(manager.sync(&texture).unwrap());
    assert!(!manager.sync(&texture).unwrap());
    texture.needs_update();
    assert!(manager.sync(&texture).unwrap());
    assert_eq!(manager.device().activation_count(), 0);
}

// ============================================================================
// Unbind / destroy
// ============================================================================

#[test]
fn unbind_releases_every_occupied_slot() {
    let mut manager = manager();
    let texture = Texture::new_2d("a", 2, 2, None);
    let other = Texture::new_2d("b", 2, 2, None);
    manager.bind(Some(&texture), 1).unwrap();
    manager.bind(Some(&other), 2).unwrap();
    manager.bind(Some(&texture), 4).unwrap();
    manager.device_mut().clear_calls();

    assert_eq!(manager.unbind(&texture), 2);

    let placeholder = manager.placeholder(TextureKind::Flat2D).unwrap();
    assert_eq!(
        manager.device().count(|call| *call
            == DeviceCall::BindTexture {
                kind: TextureKind::Flat2D,
                texture: placeholder,
            }),
        2
    );
    assert!(manager.slots_of(&texture).is_empty());
    assert_eq!(manager.slot(2), Some(other.id()));
    // Storage survives an unbind
    assert!(manager.is_managed(&texture));
    assert!(manager.device().is_live(handle_of(&manager, &texture)));
}

#[test]
fn unbind_of_unbound_texture_is_noop() {
    let mut manager = manager();
    let texture = Texture::new_2d("a", 2, 2, None);
    assert_eq!(manager.unbind(&texture), 0);
    assert!(manager.device().calls().is_empty());
}

#[test]
fn destroy_texture_is_idempotent() {
    let mut manager = manager();
    let texture = Texture::new_2d("a", 2, 2, None);
    manager.bind(Some(&texture), 0).unwrap();
    let handle = handle_of(&manager, &texture);
    manager.device_mut().clear_calls();

    manager.destroy_texture(&texture, false);
    let after_first = manager.device().calls().to_vec();
    assert!(after_first.contains(&DeviceCall::DestroyTexture(handle)));
    assert!(!manager.is_managed(&texture));
    assert_eq!(manager.slot(0), None);
    assert_eq!(texture.listener_count(), 0);
    assert_eq!(texture.resident_in(manager.context_id()), None);

    manager.destroy_texture(&texture, false);
    assert_eq!(manager.device().calls(), after_first.as_slice());
    assert_eq!(manager.managed_count(), 0);
}

#[test]
fn destroy_with_skip_remove_keeps_managed_entry() {
    let mut manager = manager();
    let texture = Texture::new_2d("a", 2, 2, None);
    manager.bind(Some(&texture), 0).unwrap();
    let first = handle_of(&manager, &texture);

    manager.destroy_texture(&texture, true);
    assert!(manager.is_managed(&texture));
    assert!(manager.gpu_texture(&texture).is_none());

    manager.bind(Some(&texture), 0).unwrap();
    assert_ne!(handle_of(&manager, &texture), first);
    assert_eq!(manager.managed_count(), 1);
}

// ============================================================================
// Dispose notifications
// ============================================================================

#[test]
fn dispose_releases_slots_and_destroys_resource() {
    let mut manager = manager();
    let texture = Texture::new_2d("a", 2, 2, None);
    let other = Texture::new_2d("b", 2, 2, None);
    manager.bind(Some(&texture), 2).unwrap();
    manager.bind(Some(&other), 3).unwrap();
    manager.bind(Some(&texture), 5).unwrap();
    let handle = handle_of(&manager, &texture);
    manager.device_mut().clear_calls();

    assert_eq!(texture.dispose(), 1);
    assert_eq!(manager.process_disposed(), 1);

    assert_eq!(manager.slot(2), None);
    assert_eq!(manager.slot(5), None);
    assert_eq!(manager.slot(3), Some(other.id()));
    assert!(!manager.device().is_live(handle));
    assert!(!manager.is_managed(&texture));
    assert!(manager.gpu_texture(&texture).is_none());

    let placeholder = manager.placeholder(TextureKind::Flat2D).unwrap();
    assert_eq!(
        manager.device().count(|call| *call
            == DeviceCall::BindTexture {
                kind: TextureKind::Flat2D,
                texture: placeholder,
            }),
        2
    );

    // Binding again registers it as a fresh resource
    manager.bind(Some(&texture), 2).unwrap();
    let fresh = handle_of(&manager, &texture);
    assert_ne!(fresh, handle);
    assert!(manager.is_managed(&texture));
    assert_eq!(texture.listener_count(), 1);
    assert_eq!(
        manager.gpu_texture(&texture).unwrap().last_synced_version,
        texture.version()
    );
}

#[test]
fn bind_drains_pending_disposals() {
    let mut manager = manager();
    let texture = Texture::new_2d("a", 2, 2, None);
    manager.bind(Some(&texture), 0).unwrap();
    let handle = handle_of(&manager, &texture);

    texture.dispose();
    manager.bind(None, 1).unwrap();

    assert!(!manager.device().is_live(handle));
    assert_eq!(manager.managed_count(), 0);
}

#[test]
fn unbind_and_destroy_drain_pending_disposals() {
    let mut manager = manager();
    let disposed = Texture::new_2d("a", 2, 2, None);
    let other = Texture::new_2d("b", 2, 2, None);
    manager.bind(Some(&disposed), 0).unwrap();

    disposed.dispose();
    // Read-only queries do not drain the channel
    assert_eq!(manager.slot(0), Some(disposed.id()));
    manager.unbind(&other);
    assert_eq!(manager.slot(0), None);
    assert!(!manager.is_managed(&disposed));

    manager.bind(Some(&disposed), 1).unwrap();
    disposed.dispose();
    manager.destroy_texture(&other, false);
    assert_eq!(manager.slot(1), None);
    assert!(manager.gpu_texture(&disposed).is_none());
}

#[test]
fn dispose_after_destroy_is_noop() {
    let mut manager = manager();
    let texture = Texture::new_2d("a", 2, 2, None);
    manager.bind(Some(&texture), 0).unwrap();

    // Notification queued, then the texture is evicted before it is handled
    texture.dispose();
    manager.destroy_texture(&texture, false);
    manager.device_mut().clear_calls();

    assert_eq!(manager.process_disposed(), 0);
    assert!(manager.device().calls().is_empty());
}

#[test]
fn dispose_without_registration_notifies_nobody() {
    let mut manager = manager();
    let texture = Texture::new_2d("a", 2, 2, None);
    assert_eq!(texture.dispose(), 0);
    assert_eq!(manager.process_disposed(), 0);
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn destroy_all_releases_everything() {
    let mut manager = manager();
    let a = Texture::new_2d("a", 2, 2, None);
    let b = Texture::new_cube("b", 2, cube_faces(2));
    manager.bind(Some(&a), 0).unwrap();
    manager.bind(Some(&b), 1).unwrap();

    manager.destroy_all();

    assert_eq!(manager.managed_count(), 0);
    assert_eq!(manager.device().live_count(), 0);
    assert_eq!(manager.placeholder(TextureKind::Flat2D), None);
    assert_eq!(manager.active_slot(), None);
    assert_eq!(a.listener_count(), 0);
    assert_eq!(b.residency_count(), 0);

    // Usable again: placeholders and storage come back on demand
    manager.device_mut().clear_calls();
    manager.bind(None, 0).unwrap();
    assert_eq!(manager.device().activation_count(), 1);
    assert!(manager.placeholder(TextureKind::Cube).is_some());
    manager.bind(Some(&a), 0).unwrap();
    assert!(manager.is_managed(&a));
}

#[test]
fn slots_are_released_after_destroy_all() {
    let mut manager = manager();
    let texture = Texture::new_2d("a", 2, 2, None);
    manager.destroy_all();

    manager.bind(Some(&texture), 0).unwrap();
    assert!(manager.placeholder(TextureKind::Flat2D).is_some());
    assert_eq!(manager.unbind(&texture), 1);
    assert!(manager.slots_of(&texture).is_empty());

    manager.bind(Some(&texture), 1).unwrap();
    manager.destroy_texture(&texture, false);
    assert!(manager.slots_of(&texture).is_empty());
    assert!(manager.gpu_texture(&texture).is_none());
    assert!(!manager.is_managed(&texture));
}

#[test]
fn dropping_manager_unsubscribes_textures() {
    let texture = Texture::new_2d("a", 2, 2, None);
    {
        let mut manager = manager();
        manager.bind(Some(&texture), 0).unwrap();
        assert_eq!(texture.listener_count(), 1);
        assert_eq!(texture.residency_count(), 1);
    }
    assert_eq!(texture.listener_count(), 0);
    assert_eq!(texture.residency_count(), 0);
}

// ============================================================================
// Multiple contexts
// ============================================================================

#[test]
fn contexts_hold_independent_resources() {
    let mut first = manager();
    let mut second = manager();
    let texture = Texture::new_2d("shared", 2, 2, None);

    first.bind(Some(&texture), 0).unwrap();
    second.bind(Some(&texture), 0).unwrap();

    assert_eq!(texture.residency_count(), 2);
    assert_eq!(texture.listener_count(), 2);
    assert_eq!(
        texture.resident_in(first.context_id()),
        Some(handle_of(&first, &texture))
    );

    // Re-upload in one context does not affect the other
    texture.needs_update();
    first.bind(Some(&texture), 0).unwrap();
    assert_eq!(
        first.gpu_texture(&texture).unwrap().last_synced_version,
        texture.version()
    );
    assert_ne!(
        second.gpu_texture(&texture).unwrap().last_synced_version,
        texture.version()
    );

    assert_eq!(texture.dispose(), 2);
    assert_eq!(first.process_disposed(), 1);
    assert_eq!(second.process_disposed(), 1);
    assert_eq!(texture.residency_count(), 0);
}
