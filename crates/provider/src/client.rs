use {
    async_trait::async_trait,
    meridian_config::ProviderConfig,
    reqwest::{Method, RequestBuilder},
    secrecy::{ExposeSecret, Secret},
    serde::de::DeserializeOwned,
    tracing::debug,
};

use crate::{
    error::ProviderError,
    types::{
        ChannelHistory, ChannelQuery, ChannelsResponse, MessageResponse, NewProviderChannel,
        ProviderChannel, ProviderIdentity, ProviderMessage,
    },
};

/// The external chat provider as the core sees it.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Identity-connect: bind the provider token to a live connection.
    async fn connect_user(&self, identity: &ProviderIdentity) -> Result<(), ProviderError>;

    /// Channels matching `query`, in provider order (most recent activity first).
    async fn query_channels(
        &self,
        identity: &ProviderIdentity,
        query: &ChannelQuery,
    ) -> Result<Vec<ProviderChannel>, ProviderError>;

    async fn create_channel(
        &self,
        identity: &ProviderIdentity,
        channel: &NewProviderChannel,
    ) -> Result<ProviderChannel, ProviderError>;

    /// Channel metadata together with its message history.
    async fn channel_history(
        &self,
        identity: &ProviderIdentity,
        channel_id: &str,
    ) -> Result<ChannelHistory, ProviderError>;

    async fn send_message(
        &self,
        identity: &ProviderIdentity,
        channel_id: &str,
        text: &str,
    ) -> Result<ProviderMessage, ProviderError>;
}

// ── Stream-style REST client ────────────────────────────────────────────────

pub struct StreamProvider {
    client: reqwest::Client,
    api_key: Secret<String>,
    base_url: String,
}

impl StreamProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ProviderError::NotConfigured)?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            api_key: Secret::new(api_key.to_string()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str, identity: &ProviderIdentity) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .query(&[("api_key", self.api_key.expose_secret().as_str())])
            .header("Authorization", identity.token.expose())
            .header("Stream-Auth-Type", "jwt")
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ProviderError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        debug!(status = status.as_u16(), "provider response");
        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or_else(|| body.chars().take(200).collect());
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ChatProvider for StreamProvider {
    async fn connect_user(&self, identity: &ProviderIdentity) -> Result<(), ProviderError> {
        let req = self
            .request(Method::POST, "/connect", identity)
            .json(&serde_json::json!({
                "user_details": {
                    "id": identity.user_id,
                    "name": identity.name,
                    "role": identity.role,
                    "tenant_id": identity.tenant_id,
                }
            }));
        self.send::<serde_json::Value>(req).await.map(|_| ())
    }

    async fn query_channels(
        &self,
        identity: &ProviderIdentity,
        query: &ChannelQuery,
    ) -> Result<Vec<ProviderChannel>, ProviderError> {
        let req = self
            .request(Method::POST, "/channels", identity)
            .json(&query.to_body());
        let resp: ChannelsResponse = self.send(req).await?;
        Ok(resp.channels.into_iter().map(|c| c.channel).collect())
    }

    async fn create_channel(
        &self,
        identity: &ProviderIdentity,
        channel: &NewProviderChannel,
    ) -> Result<ProviderChannel, ProviderError> {
        let req = self
            .request(
                Method::POST,
                &format!("/channels/messaging/{}/query", channel.id),
                identity,
            )
            .json(&serde_json::json!({ "data": channel, "state": true }));
        let resp: ChannelHistory = self.send(req).await?;
        Ok(resp.channel)
    }

    async fn channel_history(
        &self,
        identity: &ProviderIdentity,
        channel_id: &str,
    ) -> Result<ChannelHistory, ProviderError> {
        let req = self
            .request(
                Method::POST,
                &format!("/channels/messaging/{channel_id}/query"),
                identity,
            )
            .json(&serde_json::json!({ "state": true, "messages": { "limit": 100 } }));
        self.send(req).await
    }

    async fn send_message(
        &self,
        identity: &ProviderIdentity,
        channel_id: &str,
        text: &str,
    ) -> Result<ProviderMessage, ProviderError> {
        let req = self
            .request(
                Method::POST,
                &format!("/channels/messaging/{channel_id}/message"),
                identity,
            )
            .json(&serde_json::json!({ "message": { "text": text } }));
        let resp: MessageResponse = self.send(req).await?;
        Ok(resp.message)
    }
}
