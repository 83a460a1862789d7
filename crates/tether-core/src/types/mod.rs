//! Core value types.
//!
//! These types enforce their invariants at construction time.

mod base_url;
mod tier;

pub use base_url::BaseUrl;
pub use tier::StorageTier;
