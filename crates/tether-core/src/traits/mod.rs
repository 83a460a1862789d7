//! Core traits for token storage and token exchange.

mod endpoint;
mod store;

pub use endpoint::TokenEndpoint;
pub use store::{Slot, SlotStorage, StoredPair, TokenStore};
