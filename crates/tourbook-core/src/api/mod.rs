//! REST API access for the tourbook backend.
//!
//! This module provides the `RequestPipeline`, through which every call
//! passes, and the `ApiClient` with one method per backend action.
//!
//! The backend wraps every payload in a `{code, data, message}` envelope and
//! authenticates with the raw session token in the `Authorization` header.

pub mod client;
pub mod envelope;
pub mod error;
pub mod pipeline;

pub use client::ApiClient;
pub use envelope::Envelope;
pub use error::{ApiError, ErrorKind};
pub use pipeline::{ApiRequest, RequestPipeline};
