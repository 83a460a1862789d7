//! tether-store - Token storage tiers.
//!
//! [`TieredStore`] is the [`TokenStore`](tether_core::TokenStore)
//! implementation: one [`SlotStorage`](tether_core::SlotStorage) per tier,
//! read in precedence order and cleared together. Two slot backends are
//! provided: [`MemorySlots`] for state that should die with the process and
//! [`FileSlots`] for state that should outlive it.

mod file;
mod memory;
mod tiered;

pub use file::FileSlots;
pub use memory::MemorySlots;
pub use tiered::TieredStore;
