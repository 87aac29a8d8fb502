//! Resource registry
//!
//! One [`GpuTexture`] per managed texture for the owning context, plus the
//! managed set used for teardown. A texture may stay in the managed set
//! after its resource has been destroyed (`skip_remove` eviction).

use rustc_hash::FxHashMap;

use crate::device::DeviceTexture;
use crate::resources::format::PixelLayout;
use crate::resources::texture::{ListenerId, Texture, TextureId, TextureKind};

/// `last_synced_version` of a resource that has never been uploaded.
/// Texture versions start at 1 and only grow, so this never matches.
pub const UNSYNCED_VERSION: u64 = u64::MAX;

/// Device-side state of one texture in one context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuTexture {
    pub handle: DeviceTexture,
    pub kind: TextureKind,
    /// Layout of the last upload (format, type, premultiply).
    pub layout: PixelLayout,
    /// Allocated extent.
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    pub last_synced_version: u64,
    /// Dispose subscription held on the texture.
    pub listener: ListenerId,
}

impl GpuTexture {
    /// A freshly created resource: 1×1, never synced.
    #[must_use]
    pub fn new(
        handle: DeviceTexture,
        kind: TextureKind,
        layout: PixelLayout,
        listener: ListenerId,
    ) -> Self {
        Self {
            handle,
            kind,
            layout,
            width: 1,
            height: 1,
            layers: 1,
            last_synced_version: UNSYNCED_VERSION,
            listener,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_synced(&self, version: u64) -> bool {
        self.last_synced_version == version
    }
}

#[derive(Debug, Default)]
pub struct TextureRegistry {
    resources: FxHashMap<TextureId, GpuTexture>,
    managed: FxHashMap<TextureId, Texture>,
}

impl TextureRegistry {
    #[must_use]
    pub fn get(&self, id: TextureId) -> Option<&GpuTexture> {
        self.resources.get(&id)
    }

    pub fn get_mut(&mut self, id: TextureId) -> Option<&mut GpuTexture> {
        self.resources.get_mut(&id)
    }

    /// Registers a new resource for `texture` and adds it to the managed set.
    pub fn insert(&mut self, texture: &Texture, gpu: GpuTexture) {
        let id = texture.id();
        self.resources.insert(id, gpu);
        self.managed.entry(id).or_insert_with(|| texture.clone());
    }

    /// Detaches the resource, leaving the managed set untouched.
    pub fn take_resource(&mut self, id: TextureId) -> Option<GpuTexture> {
        self.resources.remove(&id)
    }

    pub fn unmanage(&mut self, id: TextureId) -> Option<Texture> {
        self.managed.remove(&id)
    }

    #[must_use]
    pub fn managed(&self, id: TextureId) -> Option<&Texture> {
        self.managed.get(&id)
    }

    #[must_use]
    pub fn is_managed(&self, id: TextureId) -> bool {
        self.managed.contains_key(&id)
    }

    #[must_use]
    pub fn managed_count(&self) -> usize {
        self.managed.len()
    }

    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Ids of every managed texture, in no particular order.
    #[must_use]
    pub fn managed_ids(&self) -> Vec<TextureId> {
        self.managed.keys().copied().collect()
    }

    pub fn clear_managed(&mut self) {
        self.managed.clear();
    }

    /// Empties the registry, yielding every managed texture with its resource.
    pub fn drain(&mut self) -> impl Iterator<Item = (Texture, Option<GpuTexture>)> + '_ {
        let resources = &mut self.resources;
        self.managed.drain().map(move |(id, texture)| {
            let gpu = resources.remove(&id);
            (texture, gpu)
        })
    }
}
