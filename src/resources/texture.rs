//! Logical textures
//!
//! A [`Texture`] is the CPU-side description of a texture: its kind, extent,
//! pixel layout, sampler style and the pixel sources that feed it. It is a
//! shared handle; producers mutate it through `&self` and every content or
//! style change bumps the dirty version that GPU resources are synced
//! against.
//!
//! Textures never own GPU storage. Each rendering context keeps its own
//! resource and only records the resulting device handle here, keyed by
//! [`ContextId`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use image::RgbaImage;
use parking_lot::{MappedRwLockReadGuard, Mutex, RwLock, RwLockReadGuard};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::device::{ContextId, DeviceTexture};
use crate::resources::format::{PixelFormat, PixelLayout, PixelType};
use crate::resources::sampler::{ScaleMode, WrapMode};
use crate::resources::source::{BufferSource, TextureSource};

// Global texture ID generator
static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique texture identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

/// Identifies one dispose subscription on one texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Texture binding target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Flat2D,
    Cube,
    Array2D,
}

impl TextureKind {
    pub const ALL: [TextureKind; 3] = [Self::Flat2D, Self::Cube, Self::Array2D];
}

/// The six faces of a cube map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    /// Canonical upload order (+X, -X, +Y, -Y, +Z, -Z).
    pub const ALL: [CubeFace; 6] = [
        Self::PositiveX,
        Self::NegativeX,
        Self::PositiveY,
        Self::NegativeY,
        Self::PositiveZ,
        Self::NegativeZ,
    ];

    /// Array layer index of this face.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Pixel sources, shaped by texture kind.
#[derive(Debug, Clone)]
pub enum TextureContent {
    Flat(Option<TextureSource>),
    /// One optional source per face, indexed by [`CubeFace::index`]
    Cube([Option<TextureSource>; 6]),
    /// One optional source per layer; the length is the layer count
    Array(Vec<Option<TextureSource>>),
}

impl TextureContent {
    #[must_use]
    pub fn kind(&self) -> TextureKind {
        match self {
            Self::Flat(_) => TextureKind::Flat2D,
            Self::Cube(_) => TextureKind::Cube,
            Self::Array(_) => TextureKind::Array2D,
        }
    }
}

#[derive(Debug)]
struct TextureState {
    label: String,
    content: TextureContent,
    width: u32,
    height: u32,
    format: PixelFormat,
    pixel_type: PixelType,
    wrap_mode: WrapMode,
    scale_mode: ScaleMode,
    mipmap: bool,
    premultiply_alpha: bool,
}

#[derive(Debug)]
struct DisposeListener {
    id: ListenerId,
    sender: flume::Sender<TextureId>,
}

#[derive(Debug)]
pub struct TextureInner {
    id: TextureId,
    state: RwLock<TextureState>,
    // Content version (bumped on every CPU-side change)
    version: AtomicU64,
    loading: AtomicBool,
    listeners: Mutex<SmallVec<[DisposeListener; 2]>>,
    residency: RwLock<FxHashMap<ContextId, DeviceTexture>>,
}

#[derive(Debug, Clone)]
pub struct Texture(Arc<TextureInner>);

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for Texture {}
impl std::hash::Hash for Texture {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl Texture {
    /// Base constructor. The kind is taken from `content`.
    #[must_use]
    pub fn new(label: &str, content: TextureContent, width: u32, height: u32) -> Self {
        Self(Arc::new(TextureInner {
            id: TextureId(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed)),
            state: RwLock::new(TextureState {
                label: label.to_string(),
                content,
                width,
                height,
                format: PixelFormat::default(),
                pixel_type: PixelType::default(),
                wrap_mode: WrapMode::default(),
                scale_mode: ScaleMode::default(),
                mipmap: false,
                premultiply_alpha: false,
            }),
            version: AtomicU64::new(1),
            loading: AtomicBool::new(false),
            listeners: Mutex::new(SmallVec::new()),
            residency: RwLock::new(FxHashMap::default()),
        }))
    }

    /// Flat 2D texture. Without a source the storage is allocated empty,
    /// which is what render targets want.
    #[must_use]
    pub fn new_2d(label: &str, width: u32, height: u32, source: Option<TextureSource>) -> Self {
        Self::new(label, TextureContent::Flat(source), width, height)
    }

    #[must_use]
    pub fn new_cube(label: &str, size: u32, faces: [Option<TextureSource>; 6]) -> Self {
        Self::new(label, TextureContent::Cube(faces), size, size)
    }

    /// Layered texture; the layer count is `layers.len()`.
    #[must_use]
    pub fn new_array(
        label: &str,
        width: u32,
        height: u32,
        layers: Vec<Option<TextureSource>>,
    ) -> Self {
        Self::new(label, TextureContent::Array(layers), width, height)
    }

    #[must_use]
    pub fn from_image(label: &str, image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new_2d(label, width, height, Some(TextureSource::Image(image)))
    }

    #[must_use]
    pub fn from_buffer(label: &str, buffer: BufferSource, layout: PixelLayout) -> Self {
        let (width, height) = (buffer.width, buffer.height);
        Self::new_2d(label, width, height, Some(TextureSource::Buffer(buffer)))
            .with_layout(layout)
    }

    // ========================================================================
    // Construction-time configuration (no version bump)
    // ========================================================================

    #[must_use]
    pub fn with_layout(self, layout: PixelLayout) -> Self {
        {
            let mut state = self.0.state.write();
            state.format = layout.format;
            state.pixel_type = layout.pixel_type;
            state.premultiply_alpha = layout.premultiply_alpha;
        }
        self
    }

    #[must_use]
    pub fn with_wrap_mode(self, wrap_mode: WrapMode) -> Self {
        self.0.state.write().wrap_mode = wrap_mode;
        self
    }

    #[must_use]
    pub fn with_scale_mode(self, scale_mode: ScaleMode) -> Self {
        self.0.state.write().scale_mode = scale_mode;
        self
    }

    #[must_use]
    pub fn with_mipmap(self, mipmap: bool) -> Self {
        self.0.state.write().mipmap = mipmap;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn id(&self) -> TextureId {
        self.0.id
    }

    #[must_use]
    pub fn label(&self) -> String {
        self.0.state.read().label.clone()
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.0.version.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn kind(&self) -> TextureKind {
        self.0.state.read().content.kind()
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.state.read().width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.state.read().height
    }

    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.0.state.read().format
    }

    #[must_use]
    pub fn pixel_type(&self) -> PixelType {
        self.0.state.read().pixel_type
    }

    #[must_use]
    pub fn premultiply_alpha(&self) -> bool {
        self.0.state.read().premultiply_alpha
    }

    #[must_use]
    pub fn layout(&self) -> PixelLayout {
        let state = self.0.state.read();
        PixelLayout {
            format: state.format,
            pixel_type: state.pixel_type,
            premultiply_alpha: state.premultiply_alpha,
        }
    }

    #[must_use]
    pub fn wrap_mode(&self) -> WrapMode {
        self.0.state.read().wrap_mode
    }

    #[must_use]
    pub fn scale_mode(&self) -> ScaleMode {
        self.0.state.read().scale_mode
    }

    #[must_use]
    pub fn mipmap(&self) -> bool {
        self.0.state.read().mipmap
    }

    /// Number of array layers (6 for cubes, 1 for flat textures).
    #[must_use]
    pub fn layer_count(&self) -> u32 {
        match &self.0.state.read().content {
            TextureContent::Flat(_) => 1,
            TextureContent::Cube(_) => 6,
            TextureContent::Array(layers) => layers.len() as u32,
        }
    }

    /// Read access to the pixel sources. Hold only for the duration of an upload.
    pub fn content(&self) -> MappedRwLockReadGuard<'_, TextureContent> {
        RwLockReadGuard::map(self.0.state.read(), |state| &state.content)
    }

    /// Whether the texture can be sampled yet.
    ///
    /// A texture is invalid while it has no extent, while it is marked as
    /// loading, or while a flat texture's only source is still pending.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        if self.0.loading.load(Ordering::Relaxed) {
            return false;
        }
        let state = self.0.state.read();
        if state.width == 0 || state.height == 0 {
            return false;
        }
        !matches!(&state.content, TextureContent::Flat(Some(source)) if !source.is_loaded())
    }

    // ========================================================================
    // Mutation (bumps the version)
    // ========================================================================

    /// Marks the CPU-side content as changed.
    pub fn needs_update(&self) {
        self.0.version.fetch_add(1, Ordering::Relaxed);
    }

    /// Replaces the source of a flat texture. Loaded sources also set the extent.
    pub fn set_source(&self, source: Option<TextureSource>) {
        {
            let mut guard = self.0.state.write();
            let state = &mut *guard;
            let TextureContent::Flat(slot) = &mut state.content else {
                log::warn!("set_source on non-flat texture '{}' ignored", state.label);
                return;
            };
            let extent = source
                .as_ref()
                .map(|s| (s.width(), s.height()))
                .filter(|&(w, h)| w > 0 && h > 0);
            *slot = source;
            if let Some((width, height)) = extent {
                state.width = width;
                state.height = height;
            }
        }
        self.needs_update();
    }

    pub fn set_face(&self, face: CubeFace, source: Option<TextureSource>) {
        {
            let mut guard = self.0.state.write();
            let state = &mut *guard;
            let TextureContent::Cube(faces) = &mut state.content else {
                log::warn!("set_face on non-cube texture '{}' ignored", state.label);
                return;
            };
            faces[face.index()] = source;
        }
        self.needs_update();
    }

    pub fn set_layer(&self, layer: usize, source: Option<TextureSource>) {
        {
            let mut guard = self.0.state.write();
            let state = &mut *guard;
            let TextureContent::Array(layers) = &mut state.content else {
                log::warn!("set_layer on non-array texture '{}' ignored", state.label);
                return;
            };
            let count = layers.len();
            let Some(slot) = layers.get_mut(layer) else {
                log::warn!(
                    "set_layer({layer}) out of range for texture '{}' ({count} layers)",
                    state.label
                );
                return;
            };
            *slot = source;
        }
        self.needs_update();
    }

    pub fn resize(&self, width: u32, height: u32) {
        {
            let mut state = self.0.state.write();
            if state.width == width && state.height == height {
                return;
            }
            state.width = width;
            state.height = height;
        }
        self.needs_update();
    }

    pub fn set_layout(&self, layout: PixelLayout) {
        {
            let mut state = self.0.state.write();
            state.format = layout.format;
            state.pixel_type = layout.pixel_type;
            state.premultiply_alpha = layout.premultiply_alpha;
        }
        self.needs_update();
    }

    pub fn set_wrap_mode(&self, wrap_mode: WrapMode) {
        self.0.state.write().wrap_mode = wrap_mode;
        self.needs_update();
    }

    pub fn set_scale_mode(&self, scale_mode: ScaleMode) {
        self.0.state.write().scale_mode = scale_mode;
        self.needs_update();
    }

    pub fn set_mipmap(&self, mipmap: bool) {
        self.0.state.write().mipmap = mipmap;
        self.needs_update();
    }

    /// Marks the texture as loading (invalid) or finished loading.
    pub fn set_loading(&self, loading: bool) {
        let was_loading = self.0.loading.swap(loading, Ordering::Relaxed);
        if was_loading && !loading {
            self.needs_update();
        }
    }

    // ========================================================================
    // Dispose notification
    // ========================================================================

    /// Subscribes `sender` to this texture's dispose notification.
    pub fn on_dispose(&self, sender: flume::Sender<TextureId>) -> ListenerId {
        let id = ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed));
        self.0.listeners.lock().push(DisposeListener { id, sender });
        id
    }

    /// Removes a subscription. Returns `false` if it was not present.
    pub fn off_dispose(&self, listener: ListenerId) -> bool {
        let mut listeners = self.0.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| l.id != listener);
        listeners.len() != before
    }

    /// Releases this texture's GPU resources in every context that holds one.
    ///
    /// Each current subscriber is notified once and then dropped. Returns the
    /// number of subscribers that were reachable.
    ///
    /// Release is deferred: a manager frees the storage and its units on its
    /// next call that touches slots or storage, or on
    /// [`TextureManager::process_disposed`](crate::TextureManager::process_disposed).
    /// Until then its read-only queries still report this texture.
    pub fn dispose(&self) -> usize {
        let listeners = std::mem::take(&mut *self.0.listeners.lock());
        let id = self.0.id;
        let notified = listeners
            .into_iter()
            .filter(|listener| listener.sender.send(id).is_ok())
            .count();
        log::debug!("Texture {id:?} disposed ({notified} listeners notified)");
        notified
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.0.listeners.lock().len()
    }

    // ========================================================================
    // Per-context residency
    // ========================================================================

    /// Device handle held by the given context, if any.
    #[must_use]
    pub fn resident_in(&self, context: ContextId) -> Option<DeviceTexture> {
        self.0.residency.read().get(&context).copied()
    }

    /// Number of contexts currently holding a resource for this texture.
    #[must_use]
    pub fn residency_count(&self) -> usize {
        self.0.residency.read().len()
    }

    pub(crate) fn set_resident(&self, context: ContextId, handle: DeviceTexture) {
        self.0.residency.write().insert(context, handle);
    }

    pub(crate) fn clear_resident(&self, context: ContextId) {
        self.0.residency.write().remove(&context);
    }
}
