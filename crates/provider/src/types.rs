use {
    chrono::{DateTime, Utc},
    meridian_common::{Credential, Role},
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// The identity presented on identity-connect, plus the provider token the
/// primary backend issued for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    pub user_id: String,
    pub name: String,
    pub role: Role,
    pub tenant_id: String,
    pub token: Credential,
}

/// Channel query: channels the member belongs to, tagged with the tenant,
/// most recent activity first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelQuery {
    pub member_id: String,
    pub tenant_id: String,
}

impl ChannelQuery {
    pub(crate) fn to_body(&self) -> Value {
        serde_json::json!({
            "filter_conditions": {
                "type": "messaging",
                "members": { "$in": [self.member_id] },
                "tenant_id": self.tenant_id,
            },
            "sort": [{ "field": "last_message_at", "direction": -1 }],
            "state": true,
            "watch": true,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderChannel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderMessage {
    pub id: String,
    #[serde(default)]
    pub text: String,
    pub user: ProviderUser,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProviderChannel {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tenant_id: String,
    pub members: Vec<String>,
}

/// Channel state as returned by query endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelHistory {
    pub channel: ProviderChannel,
    #[serde(default)]
    pub messages: Vec<ProviderMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelsResponse {
    #[serde(default)]
    pub channels: Vec<ChannelHistory>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageResponse {
    pub message: ProviderMessage,
}

/// Provider channel ids are tenant-prefixed: `tenant-a` + "Release Notes"
/// becomes `tenant-a-release-notes`.
pub fn channel_id_for(tenant_id: &str, name: &str) -> String {
    let slug = name
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    format!("{tenant_id}-{slug}")
}
