//! Wire shapes exchanged with the primary backend.
//!
//! The backend has shipped several field spellings over time (snake_case,
//! camelCase, and the capitalized names of untagged Go structs), so decoding
//! accepts all of them. Roles stay strings here; validation happens in the
//! session layer.

use {
    chrono::{DateTime, Utc},
    meridian_common::Role,
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendUser {
    #[serde(alias = "ID", alias = "user_id")]
    pub id: String,
    #[serde(default, alias = "Name")]
    pub name: Option<String>,
    #[serde(default, alias = "Email")]
    pub email: Option<String>,
    #[serde(alias = "Role")]
    pub role: String,
    #[serde(default, alias = "TenantID", alias = "tenantId", alias = "organization")]
    pub tenant_id: Option<String>,
    #[serde(default, alias = "tenantName")]
    pub tenant_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<BackendUser>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// The backend validates roles in upper case.
    #[serde(serialize_with = "role_upper")]
    pub role: Role,
    pub org_name: String,
}

fn role_upper<S: serde::Serializer>(role: &Role, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&role.as_str().to_ascii_uppercase())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendTenant {
    #[serde(alias = "ID")]
    pub id: String,
    #[serde(alias = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendChannel {
    #[serde(alias = "ID")]
    pub id: String,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Description")]
    pub description: Option<String>,
    #[serde(default, alias = "TenantID", alias = "tenantId")]
    pub tenant_id: Option<String>,
    #[serde(default, alias = "unreadCount", alias = "unread")]
    pub unread_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewChannel {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendMessage {
    #[serde(alias = "ID")]
    pub id: String,
    #[serde(alias = "author_id", alias = "userId")]
    pub user_id: String,
    #[serde(default, alias = "author_name", alias = "userName")]
    pub user_name: Option<String>,
    pub text: String,
    #[serde(alias = "timestamp", alias = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "channelId")]
    pub channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_go_struct_channel() {
        let ch: BackendChannel = serde_json::from_str(
            r#"{"ID":"c1","StreamID":"org-42-x","Name":"general","Description":"","TenantID":"org-42","CreatedBy":"u1"}"#,
        )
        .unwrap();
        assert_eq!(ch.id, "c1");
        assert_eq!(ch.tenant_id.as_deref(), Some("org-42"));
        assert_eq!(ch.unread_count, None);
    }

    #[test]
    fn decodes_user_with_organization_field() {
        let u: BackendUser =
            serde_json::from_str(r#"{"id":"u1","role":"MODERATOR","organization":"org-42"}"#)
                .unwrap();
        assert_eq!(u.tenant_id.as_deref(), Some("org-42"));
        assert_eq!(u.role, "MODERATOR");
    }

    #[test]
    fn register_serializes_role_uppercase() {
        let req = RegisterRequest {
            name: "Ann".into(),
            email: "ann@x.com".into(),
            password: "pw".into(),
            role: Role::Moderator,
            org_name: "Org".into(),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["role"], "MODERATOR");
        assert_eq!(v["org_name"], "Org");
    }
}
