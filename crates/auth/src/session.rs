use {
    meridian_common::{Credential, Role, is_demo_tenant},
    serde::Serialize,
    tokio_util::sync::CancellationToken,
};

/// Who the session belongs to. Persisted as the `user` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    #[serde(rename = "id")]
    pub user_id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    #[serde(rename = "tenantName")]
    pub tenant_name: String,
}

/// An authenticated identity plus its credential.
///
/// Clones share one lifetime: clearing the store or calling
/// [`Session::invalidate`] on any clone ends all of them, which is how
/// in-flight work learns its result must be discarded.
#[derive(Debug, Clone)]
pub struct Session {
    identity: Identity,
    credential: Credential,
    lifetime: CancellationToken,
}

impl Session {
    pub fn new(identity: Identity, credential: Credential) -> Self {
        Self {
            identity,
            credential,
            lifetime: CancellationToken::new(),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }

    pub fn display_name(&self) -> &str {
        &self.identity.display_name
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }

    pub fn tenant_id(&self) -> &str {
        &self.identity.tenant_id
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn is_demo(&self) -> bool {
        is_demo_tenant(&self.identity.tenant_id)
    }

    /// Ends the session, e.g. after the backend answered `401`.
    pub fn invalidate(&self) {
        self.lifetime.cancel();
    }

    pub fn is_invalidated(&self) -> bool {
        self.lifetime.is_cancelled()
    }

    /// Resolves once the session ends.
    pub async fn ended(&self) {
        self.lifetime.cancelled().await;
    }
}

/// Field equality; the lifetime is not part of a session's value.
impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity && self.credential == other.credential
    }
}

impl Eq for Session {}
