//! Storage tier type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which storage lifetime holds a credential pair.
///
/// Chosen once per login from the caller's "remember me" flag and never
/// changed by a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageTier {
    /// Survives process and machine restarts.
    Persistent,
    /// Survives only the current session.
    Ephemeral,
}

impl StorageTier {
    /// Both tiers in read precedence order.
    pub const PRECEDENCE: [StorageTier; 2] = [StorageTier::Persistent, StorageTier::Ephemeral];

    /// Map a "remember me" flag to a tier.
    pub fn from_remember(remember: bool) -> Self {
        if remember {
            StorageTier::Persistent
        } else {
            StorageTier::Ephemeral
        }
    }
}

impl fmt::Display for StorageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageTier::Persistent => f.write_str("persistent"),
            StorageTier::Ephemeral => f.write_str("ephemeral"),
        }
    }
}
