use std::sync::Arc;

use {
    meridian_auth::Session,
    meridian_backend::{BackendError, Credential, PrimaryBackend},
    meridian_provider::{ChatProvider, ProviderError, ProviderIdentity},
    thiserror::Error,
    tokio::sync::Mutex,
    tracing::{debug, info},
};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("chat token exchange failed: {0}")]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

struct Connection {
    identity: ProviderIdentity,
    session_credential: Credential,
}

impl Connection {
    fn serves(&self, session: &Session) -> bool {
        self.identity.user_id == session.user_id()
            && self.identity.tenant_id == session.tenant_id()
            && self.session_credential == *session.credential()
    }
}

/// Binds the session identity to the external provider.
///
/// The provider token comes from the primary backend. One connection is kept
/// and reused while the same session asks; a different session reconnects.
pub struct ProviderLink {
    backend: Arc<dyn PrimaryBackend>,
    provider: Arc<dyn ChatProvider>,
    connection: Mutex<Option<Connection>>,
}

impl ProviderLink {
    pub fn new(backend: Arc<dyn PrimaryBackend>, provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            backend,
            provider,
            connection: Mutex::new(None),
        }
    }

    pub fn provider(&self) -> &dyn ChatProvider {
        self.provider.as_ref()
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    /// The connected identity for `session`, connecting first if needed.
    ///
    /// The lock is only held to read or swap the connection, never across the
    /// token exchange or identity-connect.
    pub async fn identity(&self, session: &Session) -> Result<ProviderIdentity, LinkError> {
        if let Some(conn) = self.connection.lock().await.as_ref()
            && conn.serves(session)
        {
            return Ok(conn.identity.clone());
        }

        let token = self.backend.chat_token(session.credential()).await?;
        let identity = ProviderIdentity {
            user_id: session.user_id().to_string(),
            name: session.display_name().to_string(),
            role: session.role(),
            tenant_id: session.tenant_id().to_string(),
            token: Credential::new(token),
        };
        debug!(user = session.user_id(), "connecting to chat provider");
        self.provider.connect_user(&identity).await?;
        info!(
            user = session.user_id(),
            tenant = session.tenant_id(),
            "chat provider connected"
        );

        *self.connection.lock().await = Some(Connection {
            identity: identity.clone(),
            session_credential: session.credential().clone(),
        });
        Ok(identity)
    }

    pub async fn disconnect(&self) {
        if self.connection.lock().await.take().is_some() {
            debug!("chat provider link dropped");
        }
    }
}
