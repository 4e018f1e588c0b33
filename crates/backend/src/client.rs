use {
    async_trait::async_trait,
    meridian_common::{Credential, Role},
    meridian_config::BackendConfig,
    reqwest::{Method, RequestBuilder, StatusCode},
    serde::de::DeserializeOwned,
    serde_json::Value,
    tracing::debug,
};

use crate::{
    error::BackendError,
    types::{
        BackendChannel, BackendMessage, BackendTenant, BackendUser, ErrorBody, LoginResponse,
        NewChannel, RegisterRequest, TokenResponse,
    },
};

/// The primary backend as the core sees it.
///
/// Every authenticated method takes the session credential explicitly; the
/// implementation holds no identity of its own.
#[async_trait]
pub trait PrimaryBackend: Send + Sync {
    /// `POST /auth/login`. A rejection surfaces as `Unauthorized`.
    async fn login(
        &self,
        email: &str,
        password: &str,
        tenant_id: &str,
    ) -> Result<LoginResponse, BackendError>;

    /// `POST /auth/register`, answered with `201` and the created user.
    async fn register(&self, request: &RegisterRequest) -> Result<BackendUser, BackendError>;

    /// `POST /auth/logout`.
    async fn logout(&self, credential: &Credential) -> Result<(), BackendError>;

    /// `GET /auth/chat-token`: a token for the external chat provider.
    async fn chat_token(&self, credential: &Credential) -> Result<String, BackendError>;

    async fn list_tenants(
        &self,
        credential: Option<&Credential>,
    ) -> Result<Vec<BackendTenant>, BackendError>;

    async fn get_tenant(
        &self,
        credential: &Credential,
        tenant_id: &str,
    ) -> Result<BackendTenant, BackendError>;

    async fn create_tenant(
        &self,
        credential: &Credential,
        name: &str,
    ) -> Result<BackendTenant, BackendError>;

    /// Channels of the credential's tenant, in creation order.
    async fn list_channels(
        &self,
        credential: &Credential,
    ) -> Result<Vec<BackendChannel>, BackendError>;

    async fn create_channel(
        &self,
        credential: &Credential,
        channel: &NewChannel,
    ) -> Result<BackendChannel, BackendError>;

    async fn list_messages(
        &self,
        credential: &Credential,
        channel_id: &str,
    ) -> Result<Vec<BackendMessage>, BackendError>;

    async fn post_message(
        &self,
        credential: &Credential,
        channel_id: &str,
        text: &str,
    ) -> Result<BackendMessage, BackendError>;

    async fn list_users(&self, credential: &Credential) -> Result<Vec<BackendUser>, BackendError>;

    async fn update_user_role(
        &self,
        credential: &Credential,
        user_id: &str,
        role: Role,
    ) -> Result<BackendUser, BackendError>;

    async fn change_password(
        &self,
        credential: &Credential,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), BackendError>;
}

// ── HTTP implementation ──────────────────────────────────────────────────────

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, credential: Option<&Credential>) -> RequestBuilder {
        let req = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match credential {
            Some(c) => req.bearer_auth(c.expose()),
            None => req,
        }
    }

    /// Send and decode, mapping `401` and error bodies onto [`BackendError`].
    async fn send(&self, req: RequestBuilder) -> Result<Value, BackendError> {
        let resp = req.send().await?;
        let status = resp.status();
        let url = resp.url().path().to_string();
        let body = resp.text().await?;
        debug!(%url, status = status.as_u16(), "backend response");

        if status == StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized);
        }
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Accept either a bare array or `{ "<key>": [...] }`.
fn list_from<T: DeserializeOwned>(value: Value, key: &str) -> Result<Vec<T>, BackendError> {
    let items = match value {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => map
            .remove(key)
            .ok_or_else(|| BackendError::Decode(format!("missing '{key}' list")))?,
        Value::Null => return Ok(Vec::new()),
        other => return Err(BackendError::Decode(format!("unexpected {other}"))),
    };
    Ok(serde_json::from_value(items)?)
}

/// Accept either the bare object or `{ "<key>": {...} }`.
fn item_from<T: DeserializeOwned>(mut value: Value, key: &str) -> Result<T, BackendError> {
    if let Some(inner) = value.get_mut(key)
        && inner.is_object()
    {
        return Ok(serde_json::from_value(inner.take())?);
    }
    Ok(serde_json::from_value(value)?)
}

#[async_trait]
impl PrimaryBackend for HttpBackend {
    async fn login(
        &self,
        email: &str,
        password: &str,
        tenant_id: &str,
    ) -> Result<LoginResponse, BackendError> {
        let req = self
            .request(Method::POST, "/auth/login", None)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "tenant_id": tenant_id,
            }));
        Ok(serde_json::from_value(self.send(req).await?)?)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<BackendUser, BackendError> {
        let req = self
            .request(Method::POST, "/auth/register", None)
            .json(request);
        item_from(self.send(req).await?, "user")
    }

    async fn logout(&self, credential: &Credential) -> Result<(), BackendError> {
        let req = self.request(Method::POST, "/auth/logout", Some(credential));
        self.send(req).await.map(|_| ())
    }

    async fn chat_token(&self, credential: &Credential) -> Result<String, BackendError> {
        let req = self.request(Method::GET, "/auth/chat-token", Some(credential));
        let resp: TokenResponse = serde_json::from_value(self.send(req).await?)?;
        Ok(resp.token)
    }

    async fn list_tenants(
        &self,
        credential: Option<&Credential>,
    ) -> Result<Vec<BackendTenant>, BackendError> {
        let req = self.request(Method::GET, "/tenants", credential);
        list_from(self.send(req).await?, "tenants")
    }

    async fn get_tenant(
        &self,
        credential: &Credential,
        tenant_id: &str,
    ) -> Result<BackendTenant, BackendError> {
        let req = self.request(Method::GET, &format!("/tenants/{tenant_id}"), Some(credential));
        item_from(self.send(req).await?, "tenant")
    }

    async fn create_tenant(
        &self,
        credential: &Credential,
        name: &str,
    ) -> Result<BackendTenant, BackendError> {
        let req = self
            .request(Method::POST, "/tenants", Some(credential))
            .json(&serde_json::json!({ "name": name }));
        item_from(self.send(req).await?, "tenant")
    }

    async fn list_channels(
        &self,
        credential: &Credential,
    ) -> Result<Vec<BackendChannel>, BackendError> {
        let req = self.request(Method::GET, "/channels", Some(credential));
        list_from(self.send(req).await?, "channels")
    }

    async fn create_channel(
        &self,
        credential: &Credential,
        channel: &NewChannel,
    ) -> Result<BackendChannel, BackendError> {
        let req = self
            .request(Method::POST, "/channels", Some(credential))
            .json(channel);
        item_from(self.send(req).await?, "channel")
    }

    async fn list_messages(
        &self,
        credential: &Credential,
        channel_id: &str,
    ) -> Result<Vec<BackendMessage>, BackendError> {
        let req = self.request(
            Method::GET,
            &format!("/messages/{channel_id}"),
            Some(credential),
        );
        list_from(self.send(req).await?, "messages")
    }

    async fn post_message(
        &self,
        credential: &Credential,
        channel_id: &str,
        text: &str,
    ) -> Result<BackendMessage, BackendError> {
        let req = self
            .request(Method::POST, "/messages", Some(credential))
            .json(&serde_json::json!({ "channel_id": channel_id, "text": text }));
        item_from(self.send(req).await?, "message")
    }

    async fn list_users(&self, credential: &Credential) -> Result<Vec<BackendUser>, BackendError> {
        let req = self.request(Method::GET, "/users", Some(credential));
        list_from(self.send(req).await?, "users")
    }

    async fn update_user_role(
        &self,
        credential: &Credential,
        user_id: &str,
        role: Role,
    ) -> Result<BackendUser, BackendError> {
        let req = self
            .request(Method::PUT, &format!("/users/{user_id}"), Some(credential))
            .json(&serde_json::json!({ "role": role.as_str().to_ascii_uppercase() }));
        item_from(self.send(req).await?, "user")
    }

    async fn change_password(
        &self,
        credential: &Credential,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), BackendError> {
        let req = self
            .request(
                Method::PUT,
                &format!("/users/{user_id}/password"),
                Some(credential),
            )
            .json(&serde_json::json!({
                "current_password": current_password,
                "new_password": new_password,
            }));
        self.send(req).await.map(|_| ())
    }
}
