//! Texture Unit Manager
//!
//! [`TextureManager`] keeps three layers consistent for one rendering
//! context:
//!
//! - CPU-side [`Texture`] state, versioned by its producers
//! - the binding-slot table, bounded by the device's unit count
//! - device storage, created lazily and re-uploaded only when the texture
//!   version moves past the last synced one
//!
//! # Bind flow
//!
//! ```text
//! bind(texture, slot)
//!   ├─ drain dispose notifications
//!   ├─ activate slot (skipped if already active)
//!   ├─ resolve: registry hit, or create + subscribe to dispose
//!   ├─ sync: upload + sampler if last_synced_version != version
//!   └─ bind handle, record occupant
//! ```
//!
//! Disposal runs the other way: the texture sends its id over the dispose
//! channel, and the next manager call that touches slots or storage (or an
//! explicit [`TextureManager::process_disposed`]) releases it from every
//! slot, destroys the storage and drops it from the managed set. Read-only
//! queries do not drain the channel.

pub mod placeholder;
pub mod registry;
pub mod slots;
pub mod upload;

use smallvec::SmallVec;

use crate::device::{ContextId, DeviceTexture, TextureDescriptor, TextureDevice};
use crate::errors::{Result, TextureError};
use crate::resources::texture::{Texture, TextureId, TextureKind};
use crate::settings::TextureSettings;

use self::placeholder::Placeholders;
use self::registry::TextureRegistry;
use self::slots::BindingSlots;

pub use self::registry::{GpuTexture, UNSYNCED_VERSION};

pub struct TextureManager<D: TextureDevice> {
    device: D,
    context: ContextId,
    settings: TextureSettings,
    slots: BindingSlots,
    registry: TextureRegistry,
    /// `None` after [`destroy_all`](Self::destroy_all) until next needed
    placeholders: Option<Placeholders>,
    dispose_tx: flume::Sender<TextureId>,
    dispose_rx: flume::Receiver<TextureId>,
}

impl<D: TextureDevice> TextureManager<D> {
    /// Queries the unit count and allocates the per-kind placeholders.
    pub fn new(mut device: D, settings: TextureSettings) -> Result<Self> {
        let device_max = device.max_texture_units();
        let slot_count = settings.slot_count(device_max);
        let placeholders = Placeholders::create(&mut device, &settings)?;
        let (dispose_tx, dispose_rx) = flume::unbounded();
        let context = ContextId::next();

        log::debug!(
            "TextureManager {context:?} created with {slot_count} texture units \
             (device reports {device_max})"
        );

        Ok(Self {
            device,
            context,
            settings,
            slots: BindingSlots::new(slot_count),
            registry: TextureRegistry::default(),
            placeholders: Some(placeholders),
            dispose_tx,
            dispose_rx,
        })
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// Binds `texture` into `slot`, creating and uploading its storage first
    /// if needed.
    ///
    /// `None`, or a texture that is not yet valid, binds the placeholder
    /// instead and leaves the slot recorded as empty.
    pub fn bind(&mut self, texture: Option<&Texture>, slot: u32) -> Result<()> {
        self.process_disposed();

        let max = self.slots.count();
        if slot >= max {
            return Err(TextureError::SlotOutOfRange { slot, max });
        }

        // Every occupied unit must be releasable back to a placeholder
        let placeholders = self.ensure_placeholders()?;
        self.slots.activate(&mut self.device, slot);

        match texture {
            Some(texture) if texture.is_valid() => {
                self.sync(texture)?;
                if let Some(gpu) = self.registry.get(texture.id()) {
                    self.device.bind_texture(gpu.kind, gpu.handle);
                    self.slots.set(slot, Some(texture.id()));
                }
            }
            _ => {
                let kind = texture.map_or(TextureKind::Flat2D, Texture::kind);
                if let Some(texture) = texture {
                    log::debug!(
                        "Texture '{}' is not ready, binding placeholder to unit {slot}",
                        texture.label()
                    );
                }
                self.device.bind_texture(kind, placeholders.get(kind));
                self.slots.set(slot, None);
            }
        }
        Ok(())
    }

    /// Rebinds the placeholder into every unit holding `texture`.
    ///
    /// Returns the number of units released; unbinding a texture that is
    /// not bound anywhere is a no-op.
    pub fn unbind(&mut self, texture: &Texture) -> usize {
        self.process_disposed();
        self.release(texture.id(), texture.kind())
    }

    fn release(&mut self, id: TextureId, kind: TextureKind) -> usize {
        match self.placeholders {
            Some(placeholders) => {
                self.slots
                    .release_all(&mut self.device, id, kind, placeholders.get(kind))
            }
            None => self.slots.forget(id),
        }
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Creates storage for `texture` without uploading or binding it.
    pub fn register(&mut self, texture: &Texture) -> Result<DeviceTexture> {
        self.process_disposed();
        self.resolve(texture)
    }

    fn resolve(&mut self, texture: &Texture) -> Result<DeviceTexture> {
        if let Some(gpu) = self.registry.get(texture.id()) {
            return Ok(gpu.handle);
        }

        let kind = texture.kind();
        let layout = texture.layout();
        let label = self.settings.device_label(&texture.label());
        let handle = self.device.create_texture(&TextureDescriptor {
            label: Some(&label),
            kind,
            layout,
            width: 1,
            height: 1,
        })?;

        let listener = texture.on_dispose(self.dispose_tx.clone());
        texture.set_resident(self.context, handle);
        self.registry
            .insert(texture, GpuTexture::new(handle, kind, layout, listener));

        log::debug!(
            "Registered texture '{label}' ({kind:?}) as {handle:?} in {:?}",
            self.context
        );
        Ok(handle)
    }

    /// Resolves `texture` and uploads it if its version moved.
    ///
    /// Returns whether an upload ran.
    pub fn sync(&mut self, texture: &Texture) -> Result<bool> {
        let handle = self.register(texture)?;
        let version = texture.version();
        let gpu = self
            .registry
            .get_mut(texture.id())
            .ok_or(TextureError::UnknownTexture(handle))?;
        if gpu.is_synced(version) {
            return Ok(false);
        }

        upload::upload_texture(&mut self.device, texture, gpu)?;
        gpu.last_synced_version = version;
        Ok(true)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Releases `texture` from all units and destroys its storage.
    ///
    /// With `skip_remove` the texture stays in the managed set. Destroying a
    /// texture that has no storage in this context is a no-op.
    pub fn destroy_texture(&mut self, texture: &Texture, skip_remove: bool) {
        self.process_disposed();
        self.evict(texture.id(), skip_remove);
    }

    fn evict(&mut self, id: TextureId, skip_remove: bool) -> bool {
        let Some(gpu) = self.registry.take_resource(id) else {
            return false;
        };

        if let Some(texture) = self.registry.managed(id) {
            texture.off_dispose(gpu.listener);
            texture.clear_resident(self.context);
        }
        self.release(id, gpu.kind);
        self.device.destroy_texture(gpu.handle);

        if !skip_remove {
            self.registry.unmanage(id);
        }

        log::debug!("Destroyed {:?} ({id:?}) in {:?}", gpu.handle, self.context);
        true
    }

    /// Handles every pending dispose notification.
    ///
    /// Returns the number of textures whose storage was destroyed.
    /// Notifications for textures already evicted are ignored.
    pub fn process_disposed(&mut self) -> usize {
        let disposed: SmallVec<[TextureId; 8]> = self.dispose_rx.try_iter().collect();
        disposed
            .into_iter()
            .filter(|&id| self.evict(id, false))
            .count()
    }

    /// Destroys every managed resource and the placeholders.
    ///
    /// Used when the context is torn down. The manager stays usable:
    /// placeholders and storage are re-created on demand.
    pub fn destroy_all(&mut self) {
        self.process_disposed();

        let ids = self.registry.managed_ids();
        let destroyed = ids.into_iter().filter(|&id| self.evict(id, true)).count();
        self.registry.clear_managed();

        if let Some(placeholders) = self.placeholders.take() {
            placeholders.destroy(&mut self.device);
        }
        self.slots.reset();

        log::debug!(
            "Destroyed all textures in {:?} ({destroyed} resources)",
            self.context
        );
    }

    fn ensure_placeholders(&mut self) -> Result<Placeholders> {
        if let Some(placeholders) = self.placeholders {
            return Ok(placeholders);
        }
        let placeholders = Placeholders::create(&mut self.device, &self.settings)?;
        self.placeholders = Some(placeholders);
        Ok(placeholders)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn context_id(&self) -> ContextId {
        self.context
    }

    /// Effective number of binding slots.
    #[inline]
    #[must_use]
    pub fn max_texture_units(&self) -> u32 {
        self.slots.count()
    }

    #[inline]
    #[must_use]
    pub fn active_slot(&self) -> Option<u32> {
        self.slots.active()
    }

    /// Texture occupying `slot`; `None` when it holds a placeholder.
    #[inline]
    #[must_use]
    pub fn slot(&self, slot: u32) -> Option<TextureId> {
        self.slots.occupant(slot)
    }

    #[must_use]
    pub fn slots_of(&self, texture: &Texture) -> SmallVec<[u32; 4]> {
        self.slots.slots_of(texture.id())
    }

    #[must_use]
    pub fn is_managed(&self, texture: &Texture) -> bool {
        self.registry.is_managed(texture.id())
    }

    #[must_use]
    pub fn managed_count(&self) -> usize {
        self.registry.managed_count()
    }

    #[must_use]
    pub fn gpu_texture(&self, texture: &Texture) -> Option<&GpuTexture> {
        self.registry.get(texture.id())
    }

    #[must_use]
    pub fn placeholder(&self, kind: TextureKind) -> Option<DeviceTexture> {
        self.placeholders.map(|p| p.get(kind))
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<D: TextureDevice> Drop for TextureManager<D> {
    /// Drops dispose subscriptions and residency entries. Device storage is
    /// left to the device itself.
    fn drop(&mut self) {
        for (texture, gpu) in self.registry.drain() {
            if let Some(gpu) = gpu {
                texture.off_dispose(gpu.listener);
                texture.clear_resident(self.context);
            }
        }
    }
}

impl<D: TextureDevice + std::fmt::Debug> std::fmt::Debug for TextureManager<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureManager")
            .field("context", &self.context)
            .field("device", &self.device)
            .field("slots", &self.slots)
            .field("managed", &self.registry.managed_count())
            .field("placeholders", &self.placeholders)
            .finish_non_exhaustive()
    }
}
