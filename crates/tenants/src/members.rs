use std::sync::Arc;

use {
    meridian_auth::{Session, permissions},
    meridian_backend::{BackendUser, PrimaryBackend},
    meridian_common::{AuthError, Capability, Error, Member, Role},
    tracing::{info, warn},
};

use crate::session_error;

/// Member directory of the session's tenant.
pub struct TenantMembers {
    backend: Arc<dyn PrimaryBackend>,
}

impl TenantMembers {
    pub fn new(backend: Arc<dyn PrimaryBackend>) -> Self {
        Self { backend }
    }

    /// Requires `view_members`. Users the backend reports for another tenant
    /// are never returned.
    pub async fn list(&self, session: &Session) -> Result<Vec<Member>, Error> {
        permissions::require(Some(session), Capability::ViewMembers)?;
        if session.is_demo() {
            return Ok(demo_members(session.tenant_id()));
        }

        let users = self
            .backend
            .list_users(session.credential())
            .await
            .map_err(|e| session_error(session, e))?;
        Ok(users
            .into_iter()
            .filter_map(|u| member_in_tenant(u, session.tenant_id()))
            .collect())
    }

    /// Requires `manage_users`. Demo directories are read-only.
    pub async fn set_role(
        &self,
        session: &Session,
        user_id: &str,
        role: Role,
    ) -> Result<(), Error> {
        permissions::require(Some(session), Capability::ManageUsers)?;
        if session.is_demo() {
            return Err(AuthError::Rejected("demo tenants are read-only".into()).into());
        }
        self.backend
            .update_user_role(session.credential(), user_id, role)
            .await
            .map_err(|e| session_error(session, e))?;
        info!(user = user_id, %role, "member role updated");
        Ok(())
    }

    /// Changes the session user's own password. No capability is needed.
    pub async fn change_password(
        &self,
        session: &Session,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), Error> {
        if session.is_invalidated() {
            return Err(AuthError::InvalidCredentials.into());
        }
        if session.is_demo() {
            return Err(AuthError::Rejected("demo accounts have no password".into()).into());
        }
        if new_password.is_empty() {
            return Err(AuthError::Rejected("new password is required".into()).into());
        }
        self.backend
            .change_password(
                session.credential(),
                session.user_id(),
                current_password,
                new_password,
            )
            .await
            .map_err(|e| session_error(session, e))?;
        info!(user = session.user_id(), "password changed");
        Ok(())
    }
}

fn member_in_tenant(user: BackendUser, tenant_id: &str) -> Option<Member> {
    if user.tenant_id.as_deref().is_some_and(|t| t != tenant_id) {
        warn!(user = %user.id, "dropping user from another tenant");
        return None;
    }
    let role = match user.role.parse::<Role>() {
        Ok(role) => role,
        Err(e) => {
            warn!(user = %user.id, error = %e, "skipping user with unknown role");
            return None;
        },
    };
    Some(Member {
        name: user.name.unwrap_or_else(|| user.id.clone()),
        email: user.email,
        id: user.id,
        role,
    })
}

const DEMO_MEMBERS: &[(&str, &[(&str, &str, Role)])] = &[
    ("tenant-a", &[
        ("1", "Alice Johnson", Role::Admin),
        ("2", "Bob Smith", Role::Member),
        ("3", "Charlie Davis", Role::Member),
        ("4", "Diana Miller", Role::Moderator),
        ("5", "Eve Wilson", Role::Member),
    ]),
    ("tenant-b", &[
        ("1", "John Anderson", Role::Admin),
        ("2", "Kate Brown", Role::Member),
        ("3", "Liam Garcia", Role::Moderator),
    ]),
    ("tenant-c", &[
        ("1", "Quinn Taylor", Role::Admin),
        ("2", "Rachel Clark", Role::Member),
        ("3", "Sam Lewis", Role::Member),
    ]),
];

fn demo_members(tenant_id: &str) -> Vec<Member> {
    DEMO_MEMBERS
        .iter()
        .find(|(t, _)| *t == tenant_id)
        .map(|(_, members)| {
            members
                .iter()
                .map(|(id, name, role)| Member {
                    id: (*id).to_string(),
                    name: (*name).to_string(),
                    email: None,
                    role: *role,
                })
                .collect()
        })
        .unwrap_or_default()
}
