//! Primary backend boundary: HTTP+JSON with bearer credentials.
//!
//! [`PrimaryBackend`] is the seam the core depends on; [`HttpBackend`] is the
//! reqwest implementation. A `401` on any authenticated call surfaces as
//! [`BackendError::Unauthorized`] so the caller can end the session.

pub mod client;
pub mod error;
pub mod types;

pub use meridian_common::Credential;

pub use {
    client::{HttpBackend, PrimaryBackend},
    error::BackendError,
    types::{
        BackendChannel, BackendMessage, BackendTenant, BackendUser, LoginResponse, NewChannel,
        RegisterRequest,
    },
};
