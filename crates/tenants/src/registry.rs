use std::{collections::HashSet, sync::Arc};

use {
    meridian_auth::{Session, permissions},
    meridian_backend::{BackendTenant, PrimaryBackend},
    meridian_common::{AuthError, Capability, Tenant, demo_tenants, is_demo_tenant},
    tracing::{debug, info, warn},
};

use crate::session_error;

/// Resolves tenant ids to metadata. Demo tenants never touch the backend.
pub struct TenantRegistry {
    backend: Arc<dyn PrimaryBackend>,
}

impl TenantRegistry {
    pub fn new(backend: Arc<dyn PrimaryBackend>) -> Self {
        Self { backend }
    }

    pub fn is_demo(&self, tenant_id: &str) -> bool {
        is_demo_tenant(tenant_id)
    }

    /// Demo tenants first, then live tenants in backend order. A live tenant
    /// whose id collides with a demo tenant is dropped. Backend failure yields
    /// the demo set alone.
    pub async fn list(&self, session: Option<&Session>) -> Vec<Tenant> {
        let mut tenants = demo_tenants();
        let live = match self
            .backend
            .list_tenants(session.map(Session::credential))
            .await
        {
            Ok(live) => live,
            Err(e) => {
                warn!(error = %e, "tenant listing failed, showing demo tenants only");
                return tenants;
            },
        };

        let mut seen: HashSet<String> = tenants.iter().map(|t| t.id.clone()).collect();
        for t in live {
            if !seen.insert(t.id.clone()) {
                debug!(tenant = %t.id, "dropping live tenant shadowed by an existing entry");
                continue;
            }
            tenants.push(live_tenant(t));
        }
        tenants
    }

    pub async fn get(&self, session: &Session, tenant_id: &str) -> Result<Tenant, AuthError> {
        if let Some(demo) = demo_tenants().into_iter().find(|t| t.id == tenant_id) {
            return Ok(demo);
        }
        self.backend
            .get_tenant(session.credential(), tenant_id)
            .await
            .map(live_tenant)
            .map_err(|e| session_error(session, e))
    }

    /// Requires `manage_tenant`; a missing grant or a backend `403` is
    /// [`AuthError::Forbidden`].
    pub async fn create(&self, session: &Session, name: &str) -> Result<Tenant, AuthError> {
        if !permissions::has(Some(session), Capability::ManageTenant) {
            return Err(AuthError::Forbidden);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::Rejected("tenant name is required".into()));
        }
        if session.is_demo() {
            return Err(AuthError::Rejected(
                "demo sessions cannot create tenants".into(),
            ));
        }

        let created = self
            .backend
            .create_tenant(session.credential(), name)
            .await
            .map_err(|e| session_error(session, e))?;
        info!(tenant = %created.id, "tenant created");
        Ok(live_tenant(created))
    }
}

fn live_tenant(t: BackendTenant) -> Tenant {
    Tenant {
        id: t.id,
        display_name: t.name,
        is_live: true,
    }
}
