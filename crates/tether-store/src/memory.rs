//! In-process slot storage.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tether_core::{Result, Slot, SlotStorage};

/// Slot storage that lives exactly as long as the value does.
#[derive(Debug, Default)]
pub struct MemorySlots {
    slots: Mutex<HashMap<Slot, String>>,
}

impl MemorySlots {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<Slot, String>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SlotStorage for MemorySlots {
    fn get(&self, slot: Slot) -> Result<Option<String>> {
        Ok(self.slots().get(&slot).cloned())
    }

    fn set(&self, slot: Slot, value: &str) -> Result<()> {
        self.slots().insert(slot, value.to_string());
        Ok(())
    }

    fn remove(&self, slot: Slot) -> Result<()> {
        self.slots().remove(&slot);
        Ok(())
    }

    fn set_pair(&self, access: &str, refresh: &str) -> Result<()> {
        let mut slots = self.slots();
        slots.insert(Slot::Access, access.to_string());
        slots.insert(Slot::Refresh, refresh.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let slots = MemorySlots::new();
        assert_eq!(slots.get(Slot::Access).unwrap(), None);

        slots.set(Slot::Access, "a").unwrap();
        assert_eq!(slots.get(Slot::Access).unwrap().as_deref(), Some("a"));
        assert_eq!(slots.get(Slot::Refresh).unwrap(), None);

        slots.remove(Slot::Access).unwrap();
        slots.remove(Slot::Access).unwrap();
        assert_eq!(slots.get(Slot::Access).unwrap(), None);
    }
}
