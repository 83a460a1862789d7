//! tether-core - Core types and traits for a bearer-token session layer.
//!
//! A stateless bearer-token API is made to look like a continuously
//! authenticated session: tokens live in a two-tier [`TokenStore`], the
//! access token is decoded into [`Claims`] by the [`codec`], and the
//! [`SessionContext`] broadcasts the derived [`SessionState`] to observers.
//!
//! The HTTP plumbing (bearer attachment, refresh-and-replay) lives in
//! `tether-http`; concrete storage backends live in `tether-store`.

pub mod codec;
pub mod credentials;
pub mod error;
pub mod session;
pub mod tokens;
pub mod traits;
pub mod types;

pub use codec::Claims;
pub use credentials::Credentials;
pub use error::Error;
pub use session::{SessionContext, SessionState};
pub use tokens::{AccessToken, CredentialPair, RefreshToken};
pub use traits::{Slot, SlotStorage, StoredPair, TokenEndpoint, TokenStore};
pub use types::{BaseUrl, StorageTier};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
