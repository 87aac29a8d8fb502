//! Binding-slot table
//!
//! Mirrors which texture occupies each hardware texture unit and which unit
//! is active, so redundant activation calls are never issued.

use smallvec::SmallVec;

use crate::device::{DeviceTexture, TextureDevice};
use crate::resources::texture::{TextureId, TextureKind};

#[derive(Debug, Clone)]
pub struct BindingSlots {
    /// `None` means the unit holds a placeholder (or was never bound)
    slots: Vec<Option<TextureId>>,
    active: Option<u32>,
}

impl BindingSlots {
    #[must_use]
    pub fn new(count: u32) -> Self {
        Self {
            slots: vec![None; count as usize],
            active: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn count(&self) -> u32 {
        self.slots.len() as u32
    }

    /// The unit most recently activated.
    #[inline]
    #[must_use]
    pub fn active(&self) -> Option<u32> {
        self.active
    }

    #[inline]
    #[must_use]
    pub fn occupant(&self, slot: u32) -> Option<TextureId> {
        self.slots.get(slot as usize).copied().flatten()
    }

    /// Activates `slot` unless it already is. Returns whether a call was issued.
    pub fn activate(&mut self, device: &mut impl TextureDevice, slot: u32) -> bool {
        if self.active == Some(slot) {
            return false;
        }
        log::trace!("activate texture unit {slot}");
        device.activate_unit(slot);
        self.active = Some(slot);
        true
    }

    pub fn set(&mut self, slot: u32, occupant: Option<TextureId>) {
        if let Some(entry) = self.slots.get_mut(slot as usize) {
            *entry = occupant;
        }
    }

    /// Units currently occupied by `texture`, in ascending order.
    #[must_use]
    pub fn slots_of(&self, texture: TextureId) -> SmallVec<[u32; 4]> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, occupant)| **occupant == Some(texture))
            .map(|(i, _)| i as u32)
            .collect()
    }

    /// Rebinds the placeholder into every unit occupied by `texture`.
    ///
    /// Returns the number of units released.
    pub fn release_all(
        &mut self,
        device: &mut impl TextureDevice,
        texture: TextureId,
        kind: TextureKind,
        placeholder: DeviceTexture,
    ) -> usize {
        let occupied = self.slots_of(texture);
        for &slot in &occupied {
            self.activate(device, slot);
            device.bind_texture(kind, placeholder);
            self.set(slot, None);
        }
        occupied.len()
    }

    /// Clears every unit occupied by `texture` without issuing device calls.
    ///
    /// Used when no placeholder exists to rebind. Returns the number of units
    /// cleared.
    pub fn forget(&mut self, texture: TextureId) -> usize {
        let mut cleared = 0;
        for entry in &mut self.slots {
            if *entry == Some(texture) {
                *entry = None;
                cleared += 1;
            }
        }
        cleared
    }

    /// Forgets all occupants and the active unit.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCall, RecordingDevice};
    use crate::resources::texture::Texture;

    #[test]
    fn test_activate_is_not_repeated() {
        let mut device = RecordingDevice::new(8);
        let mut slots = BindingSlots::new(8);

        assert!(slots.activate(&mut device, 3));
        assert!(!slots.activate(&mut device, 3));
        assert!(slots.activate(&mut device, 1));
        assert_eq!(
            device.calls(),
            &[DeviceCall::ActivateUnit(3), DeviceCall::ActivateUnit(1)]
        );
        assert_eq!(slots.active(), Some(1));
    }

    #[test]
    fn test_release_all_only_touches_occupied_units() {
        let mut device = RecordingDevice::new(8);
        let mut slots = BindingSlots::new(8);
        let a = Texture::new_2d("a", 1, 1, None).id();
        let b = Texture::new_2d("b", 1, 1, None).id();
        slots.set(2, Some(a));
        slots.set(4, Some(b));
        slots.set(5, Some(a));

        let released = slots.release_all(&mut device, a, TextureKind::Flat2D, DeviceTexture(99));
        assert_eq!(released, 2);
        assert_eq!(slots.occupant(2), None);
        assert_eq!(slots.occupant(5), None);
        assert_eq!(slots.occupant(4), Some(b));
        assert_eq!(device.activation_count(), 2);
    }

    #[test]
    fn test_forget_issues_no_calls() {
        let mut device = RecordingDevice::new(4);
        let mut slots = BindingSlots::new(4);
        let a = Texture::new_2d("a", 1, 1, None).id();
        slots.set(0, Some(a));
        slots.set(3, Some(a));

        assert_eq!(slots.forget(a), 2);
        assert!(slots.slots_of(a).is_empty());
        assert_eq!(slots.release_all(&mut device, a, TextureKind::Flat2D, DeviceTexture(1)), 0);
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_out_of_range_is_empty() {
        let slots = BindingSlots::new(2);
        assert_eq!(slots.occupant(7), None);
        assert!(slots.slots_of(Texture::new_2d("x", 1, 1, None).id()).is_empty());
    }
}
