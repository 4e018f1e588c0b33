//! Identity and authorization.
//!
//! [`SessionStore`] owns the lifecycle of the one session a client context
//! holds; [`permissions`] is the single authority that turns a session's role
//! into capabilities. Every privileged operation elsewhere takes a
//! [`Session`] explicitly and asks [`permissions::require`] before doing I/O.

pub mod permissions;
pub mod session;
pub mod storage;
pub mod store;

pub use {
    permissions::{demo_role_for, grants, has, require},
    session::{Identity, Session},
    storage::{CredentialStorage, FileStorage, MemoryStorage, StorageError},
    store::SessionStore,
};
