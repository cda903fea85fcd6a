//! Tourbook core library.
//!
//! Client-side plumbing for the tourbook library backend:
//!
//! - `storage`: persistent key-value surface for credentials
//! - `auth`: session token state, token payload decoding, cached user profile
//! - `api`: the authenticated request pipeline and typed service calls
//! - `router`: route table and the authentication guard
//! - `app`: an injectable context tying the pieces together

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod models;
pub mod notify;
pub mod router;
pub mod storage;

pub use api::{ApiClient, ApiError, ErrorKind, RequestPipeline};
pub use app::AppContext;
pub use auth::{Principal, PrincipalStore, SessionState};
pub use config::Config;
pub use notify::{Notice, NoticeLevel, Notifier, TracingNotifier};
pub use router::{GuardDecision, Navigator, Router};
pub use storage::KeyValueStore;
