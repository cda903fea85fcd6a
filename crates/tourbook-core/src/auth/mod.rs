//! Authentication state for the client.
//!
//! This module provides:
//! - `SessionState`: the session token, written through to a `KeyValueStore`
//! - `decode_token`: typed decoding of the token's payload segment
//! - `PrincipalStore`: the cached profile of the logged-in user
//!
//! Nothing here is a process-wide singleton. Callers share state by cloning
//! the handles, which are cheap `Arc` wrappers.

pub mod claims;
pub mod principal;
pub mod session;

pub use claims::{decode_token, TokenClaims, TokenDecodeError, UserId};
pub use principal::{Principal, PrincipalPatch, PrincipalStore};
pub use session::SessionState;
