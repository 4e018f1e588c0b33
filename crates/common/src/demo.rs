//! The closed set of demo tenants.
//!
//! Demo tenants are served entirely from fixtures. Any id outside this set is
//! a live tenant.

use crate::types::Tenant;

pub const DEMO_TENANTS: [(&str, &str); 3] = [
    ("tenant-a", "Tenant A Corp"),
    ("tenant-b", "Tenant B Inc"),
    ("tenant-c", "Tenant C LLC"),
];

pub fn is_demo_tenant(tenant_id: &str) -> bool {
    DEMO_TENANTS.iter().any(|(id, _)| *id == tenant_id)
}

/// Demo tenants in declaration order.
pub fn demo_tenants() -> Vec<Tenant> {
    DEMO_TENANTS
        .iter()
        .map(|(id, name)| Tenant {
            id: (*id).to_string(),
            display_name: (*name).to_string(),
            is_live: false,
        })
        .collect()
}

/// Short display label for a tenant id: `tenant-a` becomes `TENANT A`.
pub fn tenant_label(tenant_id: &str) -> String {
    tenant_id.replacen("tenant-", "tenant ", 1).to_uppercase()
}
