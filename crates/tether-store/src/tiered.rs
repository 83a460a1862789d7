//! Two-tier token store.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, instrument};

use tether_core::{
    AccessToken, CredentialPair, RefreshToken, Result, Slot, SlotStorage, StorageTier, StoredPair,
    TokenStore,
};

use crate::{FileSlots, MemorySlots};

/// A [`TokenStore`] built from one slot storage per tier.
///
/// Every operation runs under a single mutex, so a reader never observes a
/// tier in the middle of being written or cleared.
#[derive(Debug)]
pub struct TieredStore<P, E> {
    persistent: P,
    ephemeral: E,
    guard: Mutex<()>,
}

impl TieredStore<MemorySlots, MemorySlots> {
    /// Both tiers in process memory.
    pub fn in_memory() -> Self {
        Self::new(MemorySlots::new(), MemorySlots::new())
    }
}

impl TieredStore<FileSlots, FileSlots> {
    /// Both tiers on disk, one JSON file each.
    pub fn on_disk(persistent: impl AsRef<Path>, ephemeral: impl AsRef<Path>) -> Self {
        Self::new(FileSlots::new(persistent), FileSlots::new(ephemeral))
    }
}

impl<P, E> TieredStore<P, E>
where
    P: SlotStorage,
    E: SlotStorage,
{
    /// Combine a persistent and an ephemeral slot storage.
    pub fn new(persistent: P, ephemeral: E) -> Self {
        Self {
            persistent,
            ephemeral,
            guard: Mutex::new(()),
        }
    }

    /// The slot storage backing `tier`.
    pub fn tier(&self, tier: StorageTier) -> &dyn SlotStorage {
        match tier {
            StorageTier::Persistent => &self.persistent,
            StorageTier::Ephemeral => &self.ephemeral,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.guard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_tier(&self, tier: StorageTier) -> Result<Option<CredentialPair>> {
        let slots = self.tier(tier);
        match (slots.get(Slot::Access)?, slots.get(Slot::Refresh)?) {
            (Some(access), Some(refresh)) => Ok(Some(CredentialPair::new(
                AccessToken::new(access),
                RefreshToken::new(refresh),
            ))),
            (None, None) => Ok(None),
            _ => {
                debug!(%tier, "Ignoring incomplete token pair");
                Ok(None)
            }
        }
    }
}

impl<P, E> TokenStore for TieredStore<P, E>
where
    P: SlotStorage,
    E: SlotStorage,
{
    fn init(&self) -> Result<()> {
        let _guard = self.lock();
        self.persistent.init()?;
        self.ephemeral.init()
    }

    fn read(&self) -> Result<Option<StoredPair>> {
        let _guard = self.lock();
        for tier in StorageTier::PRECEDENCE {
            if let Some(pair) = self.read_tier(tier)? {
                return Ok(Some(StoredPair { pair, tier }));
            }
        }
        Ok(None)
    }

    #[instrument(skip(self, pair))]
    fn write(&self, pair: &CredentialPair, tier: StorageTier) -> Result<()> {
        let _guard = self.lock();
        self.tier(tier)
            .set_pair(pair.access.as_str(), pair.refresh.as_str())
    }

    #[instrument(skip(self, access))]
    fn replace_access(&self, access: &AccessToken, tier: StorageTier) -> Result<()> {
        let _guard = self.lock();
        self.tier(tier).set(Slot::Access, access.as_str())
    }

    #[instrument(skip(self))]
    fn clear(&self) -> Result<()> {
        let _guard = self.lock();
        // Attempt both tiers even if the first fails.
        let persistent = self.persistent.remove_all();
        let ephemeral = self.ephemeral.remove_all();
        persistent.and(ephemeral)
    }
}
