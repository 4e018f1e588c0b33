use std::sync::{Arc, Mutex, MutexGuard};

use {
    meridian_backend::{BackendError, BackendUser, PrimaryBackend, RegisterRequest},
    meridian_common::{AuthError, Credential, Member, Role, is_demo_tenant, tenant_label},
    serde::Deserialize,
    tracing::{debug, info, warn},
};

use crate::{
    permissions::demo_role_for,
    session::{Identity, Session},
    storage::{CredentialStorage, TOKEN_KEY, USER_KEY},
};

/// Holds the one session of a client context and persists it.
pub struct SessionStore {
    backend: Arc<dyn PrimaryBackend>,
    storage: Arc<dyn CredentialStorage>,
    current: Mutex<Option<Session>>,
}

/// Shape of the persisted `user` entry. Older clients wrote `organization`
/// for the tenant.
#[derive(Debug, Deserialize)]
struct StoredUser {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    role: String,
    #[serde(rename = "tenantId", alias = "tenant_id", alias = "organization")]
    tenant_id: String,
    #[serde(default, rename = "tenantName")]
    tenant_name: Option<String>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn PrimaryBackend>, storage: Arc<dyn CredentialStorage>) -> Self {
        Self {
            backend,
            storage,
            current: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Log in. Demo tenants are synthesized locally; live tenants go through
    /// the backend login exchange and never fall back to demo.
    pub async fn create(
        &self,
        email: &str,
        password: &str,
        tenant_id: &str,
    ) -> Result<Session, AuthError> {
        let tenant_id = tenant_id.trim();
        if tenant_id.is_empty() {
            return Err(AuthError::Rejected("tenant id is required".into()));
        }

        let session = if is_demo_tenant(tenant_id) {
            demo_session(email, tenant_id)
        } else {
            self.live_session(email, password, tenant_id).await?
        };

        self.persist(&session);
        if let Some(previous) = self.slot().replace(session.clone()) {
            previous.invalidate();
        }
        info!(
            tenant = session.tenant_id(),
            user = session.user_id(),
            role = %session.role(),
            "session created"
        );
        Ok(session)
    }

    async fn live_session(
        &self,
        email: &str,
        password: &str,
        tenant_id: &str,
    ) -> Result<Session, AuthError> {
        let resp = self.backend.login(email, password, tenant_id).await.map_err(|e| {
            warn!(tenant = tenant_id, error = %e, "login failed");
            AuthError::from(e)
        })?;
        if resp.token.trim().is_empty() {
            return Err(AuthError::MalformedResponse("login returned an empty token".into()));
        }
        let user = resp
            .user
            .ok_or_else(|| AuthError::MalformedResponse("login response has no user".into()))?;
        let identity = identity_from_backend(user, email, tenant_id)?;
        Ok(Session::new(identity, Credential::new(resp.token)))
    }

    /// Rebuild the session from persisted state. Missing or malformed data
    /// yields `None`; malformed data is also wiped.
    pub fn restore(&self) -> Option<Session> {
        if self.drop_invalidated() {
            return None;
        }
        let token = self.read(TOKEN_KEY)?;
        let user = self.read(USER_KEY)?;

        let session = match decode_stored(&token, &user) {
            Some(session) => session,
            None => {
                warn!("persisted session is malformed, discarding");
                self.wipe();
                return None;
            },
        };

        let mut slot = self.slot();
        if let Some(existing) = slot.as_ref()
            && !existing.is_invalidated()
            && *existing == session
        {
            return Some(existing.clone());
        }
        if let Some(previous) = slot.replace(session.clone()) {
            previous.invalidate();
        }
        debug!(tenant = session.tenant_id(), "session restored");
        Some(session)
    }

    /// Discard credential and identity. Idempotent.
    ///
    /// Live sessions are logged out on the backend on a best-effort basis.
    pub async fn clear(&self) {
        let taken = self.slot().take();
        self.wipe();
        let Some(session) = taken else {
            return;
        };
        session.invalidate();
        if !session.is_demo()
            && let Err(e) = self.backend.logout(session.credential()).await
        {
            warn!(error = %e, "backend logout failed");
        }
        info!(tenant = session.tenant_id(), "session cleared");
    }

    /// The live session, if any. An invalidated session is logged out here.
    pub fn current(&self) -> Option<Session> {
        if self.drop_invalidated() {
            return None;
        }
        self.slot().clone()
    }

    /// Forced logout: an invalidated session is taken and its persisted
    /// credential wiped so it cannot be restored again.
    fn drop_invalidated(&self) -> bool {
        let mut slot = self.slot();
        if !slot.as_ref().is_some_and(Session::is_invalidated) {
            return false;
        }
        slot.take();
        drop(slot);
        self.wipe();
        info!("session invalidated, forced logout");
        true
    }

    /// Create an account on the backend. Does not log in.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
        org_name: &str,
    ) -> Result<Member, AuthError> {
        let request = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role,
            org_name: org_name.to_string(),
        };
        let user = self.backend.register(&request).await.map_err(|e| match e {
            BackendError::Unauthorized => AuthError::Rejected("unauthorized".into()),
            other => AuthError::from(other),
        })?;
        let role = user
            .role
            .parse::<Role>()
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        info!(user = %user.id, %role, "account registered");
        Ok(Member {
            name: user.name.unwrap_or_else(|| name.to_string()),
            email: user.email.or_else(|| Some(email.to_string())),
            id: user.id,
            role,
        })
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "could not read persisted session");
                None
            },
        }
    }

    fn persist(&self, session: &Session) {
        let user = match serde_json::to_string(session.identity()) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "could not encode session identity");
                return;
            },
        };
        let result = self
            .storage
            .set(TOKEN_KEY, session.credential().expose())
            .and_then(|()| self.storage.set(USER_KEY, &user));
        if let Err(e) = result {
            warn!(error = %e, "could not persist session");
        }
    }

    fn wipe(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "could not remove persisted session");
            }
        }
    }
}

fn demo_session(email: &str, tenant_id: &str) -> Session {
    let local = email.split('@').next().unwrap_or_default().trim();
    let name = if local.is_empty() {
        "Anonymous User"
    } else {
        local
    };
    let identity = Identity {
        user_id: format!("{tenant_id}:{}", local.to_ascii_lowercase()),
        display_name: name.to_string(),
        email: Some(email.to_string()),
        role: demo_role_for(email),
        tenant_id: tenant_id.to_string(),
        tenant_name: tenant_label(tenant_id),
    };
    Session::new(
        identity,
        Credential::new(format!("demo-token-{}", uuid::Uuid::new_v4().simple())),
    )
}

/// The role is taken verbatim from the backend; an unknown role is malformed.
fn identity_from_backend(
    user: BackendUser,
    email: &str,
    requested_tenant: &str,
) -> Result<Identity, AuthError> {
    if user.id.trim().is_empty() {
        return Err(AuthError::MalformedResponse("user id is empty".into()));
    }
    let role = user
        .role
        .parse::<Role>()
        .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
    let tenant_id = user
        .tenant_id
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| requested_tenant.to_string());
    let tenant_name = user
        .tenant_name
        .unwrap_or_else(|| tenant_label(&tenant_id));
    Ok(Identity {
        display_name: user
            .name
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string()),
        email: user.email.or_else(|| Some(email.to_string())),
        user_id: user.id,
        role,
        tenant_id,
        tenant_name,
    })
}

fn decode_stored(token: &str, user: &str) -> Option<Session> {
    if token.trim().is_empty() {
        return None;
    }
    let stored: StoredUser = serde_json::from_str(user).ok()?;
    let role = stored.role.parse::<Role>().ok()?;
    if stored.id.trim().is_empty() || stored.tenant_id.trim().is_empty() {
        return None;
    }
    let identity = Identity {
        display_name: stored.name.unwrap_or_else(|| "Anonymous User".into()),
        email: stored.email,
        tenant_name: stored
            .tenant_name
            .unwrap_or_else(|| tenant_label(&stored.tenant_id)),
        user_id: stored.id,
        role,
        tenant_id: stored.tenant_id,
    };
    Some(Session::new(identity, Credential::new(token)))
}
