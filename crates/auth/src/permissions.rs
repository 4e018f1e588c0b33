use std::collections::BTreeSet;

use meridian_common::{Capability, PermissionDenied, Role};

use crate::session::Session;

/// Capabilities granted to `role`.
///
/// `admin` always receives the universal set; it is not looked up.
pub fn grants(role: Role) -> BTreeSet<Capability> {
    use Capability::*;

    match role {
        Role::Admin => Capability::ALL.into_iter().collect(),
        Role::Moderator => [ManageChannels, ViewMembers, SendMessages].into(),
        Role::Member => [ViewMembers, SendMessages].into(),
        Role::Guest => BTreeSet::new(),
    }
}

/// False for a missing or invalidated session.
pub fn has(session: Option<&Session>, capability: Capability) -> bool {
    session.is_some_and(|s| !s.is_invalidated() && grants(s.role()).contains(&capability))
}

pub fn require(session: Option<&Session>, capability: Capability) -> Result<(), PermissionDenied> {
    if has(session, capability) {
        Ok(())
    } else {
        Err(PermissionDenied { capability })
    }
}

/// Role for a locally synthesized demo session. Never applied to live tenants.
pub fn demo_role_for(email: &str) -> Role {
    let local = email.split('@').next().unwrap_or_default();
    if local.to_ascii_lowercase().contains("admin") {
        Role::Admin
    } else {
        Role::Member
    }
}
