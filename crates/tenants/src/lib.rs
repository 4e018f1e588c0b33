//! Tenant metadata and the per-tenant member directory.

pub mod members;
pub mod registry;

pub use {members::TenantMembers, registry::TenantRegistry};

use {
    meridian_auth::Session,
    meridian_backend::BackendError,
    meridian_common::AuthError,
};

/// Converts a failure of an authenticated backend call. A `401` ends the
/// session before being reported.
pub(crate) fn session_error(session: &Session, e: BackendError) -> AuthError {
    if e == BackendError::Unauthorized {
        tracing::warn!(tenant = session.tenant_id(), "credential rejected, ending session");
        session.invalidate();
    }
    AuthError::from(e)
}
