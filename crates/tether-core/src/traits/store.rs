//! Token storage traits.

use std::fmt;

use crate::types::StorageTier;
use crate::{AccessToken, CredentialPair, Result};

/// One of the two logical slots each tier holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Access,
    Refresh,
}

impl Slot {
    /// The storage key for this slot.
    pub fn key(&self) -> &'static str {
        match self {
            Slot::Access => "access_token",
            Slot::Refresh => "refresh_token",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Key/value storage for a single tier.
///
/// Implementations back one lifetime (process memory, a file on disk) and
/// know nothing about the other tier.
pub trait SlotStorage: Send + Sync {
    /// Prepare the backing medium. Idempotent.
    fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Read a slot.
    fn get(&self, slot: Slot) -> Result<Option<String>>;

    /// Write a slot.
    fn set(&self, slot: Slot, value: &str) -> Result<()>;

    /// Remove a slot. Removing an empty slot is not an error.
    fn remove(&self, slot: Slot) -> Result<()>;

    /// Write both slots. Backends that can write them in one step override this.
    fn set_pair(&self, access: &str, refresh: &str) -> Result<()> {
        self.set(Slot::Access, access)?;
        self.set(Slot::Refresh, refresh)
    }

    /// Remove both slots.
    fn remove_all(&self) -> Result<()> {
        self.remove(Slot::Access)?;
        self.remove(Slot::Refresh)
    }
}

/// A credential pair together with the tier it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPair {
    pub pair: CredentialPair,
    pub tier: StorageTier,
}

/// Two-tier credential storage.
///
/// Reads prefer [`StorageTier::Persistent`] over [`StorageTier::Ephemeral`];
/// `clear` always empties both tiers.
pub trait TokenStore: Send + Sync {
    /// Prepare both tiers for use. Idempotent.
    fn init(&self) -> Result<()>;

    /// Return the first complete pair in precedence order.
    fn read(&self) -> Result<Option<StoredPair>>;

    /// Store both tokens in `tier` without touching the other tier.
    fn write(&self, pair: &CredentialPair, tier: StorageTier) -> Result<()>;

    /// Overwrite only the access token held in `tier`.
    fn replace_access(&self, access: &AccessToken, tier: StorageTier) -> Result<()>;

    /// Remove every token from both tiers.
    fn clear(&self) -> Result<()>;
}
