//! Error taxonomy surfaced by the core.
//!
//! Permission failures (`PermissionDenied`, `AuthError::Forbidden`) are final
//! and must never be presented as "try again". Everything reported by
//! [`Error::is_transient`] is an availability problem instead.

use thiserror::Error;

use crate::access::Capability;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("forbidden")]
    Forbidden,

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("malformed backend response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("all sources unavailable")]
    AllSourcesUnavailable,

    #[error("channel '{channel_id}' is not part of this tenant")]
    UnknownChannel { channel_id: String },

    #[error("session was cleared while the request was in flight")]
    SessionCleared,

    #[error("session expired")]
    SessionExpired,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("message source unavailable")]
    SourceUnavailable,

    #[error("message text is empty")]
    EmptyMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("permission denied: requires {capability}")]
pub struct PermissionDenied {
    pub capability: Capability,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Send(#[from] SendError),

    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),
}

impl Error {
    /// True when retrying later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Auth(AuthError::Unreachable(_))
                | Error::Resolution(ResolutionError::AllSourcesUnavailable)
                | Error::Send(SendError::SourceUnavailable)
        )
    }

    /// True for authorization failures the caller must not retry.
    pub fn is_permission(&self) -> bool {
        matches!(
            self,
            Error::PermissionDenied(_) | Error::Auth(AuthError::Forbidden)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
