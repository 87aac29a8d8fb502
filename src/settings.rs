//! Texture Manager Settings
//!
//! Plain configuration consumed once by
//! [`TextureManager::new`](crate::manager::TextureManager::new).
//!
//! ```rust,ignore
//! use myth_texture_units::TextureSettings;
//!
//! let settings = TextureSettings {
//!     max_texture_units: Some(8),
//!     ..Default::default()
//! };
//! let manager = TextureManager::new(device, settings)?;
//! ```

/// Configuration for a [`TextureManager`](crate::manager::TextureManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSettings {
    /// Upper bound on the number of binding slots.
    ///
    /// The effective slot count is the smaller of this value and the
    /// device-reported maximum. `None` uses the device maximum.
    pub max_texture_units: Option<u32>,

    /// RGBA8 color of the placeholder bound in place of missing or
    /// still-loading textures. Transparent black by default.
    pub placeholder_color: [u8; 4],

    /// Prefix for device-side labels (shows up in GPU debuggers).
    pub label: Option<String>,
}

impl Default for TextureSettings {
    #[inline]
    fn default() -> Self {
        Self {
            max_texture_units: None,
            placeholder_color: [0, 0, 0, 0],
            label: None,
        }
    }
}

impl TextureSettings {
    /// Effective slot count for a device reporting `device_max` units.
    #[inline]
    #[must_use]
    pub fn slot_count(&self, device_max: u32) -> u32 {
        self.max_texture_units
            .map_or(device_max, |cap| cap.min(device_max))
    }

    /// Builds a device label for `name`, applying the configured prefix.
    #[must_use]
    pub fn device_label(&self, name: &str) -> String {
        match &self.label {
            Some(prefix) => format!("{prefix}/{name}"),
            None => name.to_string(),
        }
    }
}
