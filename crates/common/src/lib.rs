//! Shared data model and error taxonomy.
//!
//! Every other crate speaks in these types: tenants, channels and messages as
//! the core sees them, the role/capability vocabulary, and the errors the core
//! surfaces to its callers.

pub mod access;
pub mod credential;
pub mod demo;
pub mod error;
pub mod types;

pub use {
    access::{Capability, Role},
    credential::Credential,
    demo::{demo_tenants, is_demo_tenant, tenant_label},
    error::{AuthError, Error, PermissionDenied, ResolutionError, Result, SendError},
    types::{Channel, Member, Message, Resolved, Source, Tenant},
};
