use std::sync::Arc;

use {
    anyhow::{Context, Result, anyhow},
    meridian_auth::{FileStorage, Session, SessionStore},
    meridian_backend::{HttpBackend, PrimaryBackend},
    meridian_channels::{ChannelResolver, MessageGateway, ProviderLink},
    meridian_common::Error,
    meridian_config::{MeridianConfig, session_path},
    meridian_provider::StreamProvider,
    meridian_tenants::{TenantMembers, TenantRegistry},
    tracing::{debug, warn},
};

/// Everything a command needs, wired from one config.
pub struct App {
    pub store: SessionStore,
    pub tenants: TenantRegistry,
    pub members: TenantMembers,
    pub gateway: MessageGateway,
}

impl App {
    pub fn from_config(config: &MeridianConfig) -> Result<Self> {
        let backend: Arc<dyn PrimaryBackend> =
            Arc::new(HttpBackend::new(&config.backend).context("building backend client")?);

        let path = session_path(config);
        debug!(path = %path.display(), "session storage");
        let store = SessionStore::new(backend.clone(), Arc::new(FileStorage::new(path)));

        let mut resolver = ChannelResolver::new(backend.clone(), &config.resolver);
        if config.provider.is_usable() {
            match StreamProvider::new(&config.provider) {
                Ok(provider) => {
                    let link = ProviderLink::new(backend.clone(), Arc::new(provider));
                    resolver = resolver.with_external(Arc::new(link));
                },
                Err(e) => warn!(error = %e, "chat provider disabled"),
            }
        }

        Ok(Self {
            store,
            tenants: TenantRegistry::new(backend.clone()),
            members: TenantMembers::new(backend),
            gateway: MessageGateway::new(Arc::new(resolver)),
        })
    }

    /// The persisted session, or an error telling the user to log in.
    pub fn session(&self) -> Result<Session> {
        self.store
            .restore()
            .ok_or_else(|| anyhow!("not logged in, run `meridian login` first"))
    }

    /// Runs after every command. A session the backend rejected mid-command
    /// is logged out here, so its credential never reaches the next run.
    pub fn settle(&self) {
        if self.store.current().is_none() {
            debug!("no session to keep");
        }
    }

    pub fn resolver(&self) -> &ChannelResolver {
        self.gateway.resolver()
    }
}

/// Turns a core error into the message shown to the user. Authorization
/// failures and availability failures read differently.
pub fn explain(err: impl Into<Error>) -> anyhow::Error {
    let err = err.into();
    if err.is_permission() {
        anyhow!("not allowed: {err}")
    } else if err.is_transient() {
        anyhow!("temporarily unavailable: {err}, try again later")
    } else {
        anyhow!(err)
    }
}

/// Printed on stderr whenever a result came from the fixture fallback.
pub fn warn_degraded(degraded: bool) {
    if degraded {
        eprintln!("warning: live sources unavailable, showing fallback data");
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        meridian_common::{AuthError, Capability, PermissionDenied, ResolutionError, SendError},
    };

    #[test]
    fn permission_and_outage_read_differently() {
        let denied = explain(PermissionDenied {
            capability: Capability::SendMessages,
        });
        assert!(denied.to_string().starts_with("not allowed:"));
        assert!(explain(AuthError::Forbidden).to_string().starts_with("not allowed:"));

        let down = explain(SendError::SourceUnavailable);
        assert!(down.to_string().starts_with("temporarily unavailable:"));
        let all_down = explain(ResolutionError::AllSourcesUnavailable);
        assert!(all_down.to_string().starts_with("temporarily unavailable:"));

        let other = explain(AuthError::InvalidCredentials);
        assert_eq!(other.to_string(), "invalid credentials");
    }

    #[tokio::test]
    async fn rejected_session_is_wiped_before_exit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut config = MeridianConfig::default();
        config.storage.path = Some(path.clone());

        let app = App::from_config(&config).unwrap();
        let session = app.store.create("demo@x.com", "", "tenant-a").await.unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("token"));

        session.invalidate();
        app.settle();
        assert!(!std::fs::read_to_string(&path).unwrap().contains("token"));

        let next_run = App::from_config(&config).unwrap();
        assert!(next_run.session().is_err());
    }

    #[test]
    fn app_without_session_asks_for_login() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = MeridianConfig::default();
        config.storage.path = Some(dir.path().join("session.json"));
        let app = App::from_config(&config).unwrap();
        let err = app.session().unwrap_err();
        assert!(err.to_string().contains("meridian login"));
    }
}
