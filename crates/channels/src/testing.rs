//! In-memory backend and provider doubles with call counters.

use std::{
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    meridian_auth::{Identity, Session},
    meridian_backend::{
        BackendChannel, BackendError, BackendMessage, BackendTenant, BackendUser, LoginResponse,
        NewChannel, PrimaryBackend, RegisterRequest,
    },
    meridian_common::{Credential, Role},
    meridian_provider::{
        ChannelHistory, ChannelQuery, ChatProvider, NewProviderChannel, ProviderChannel,
        ProviderError, ProviderIdentity, ProviderMessage, ProviderUser,
    },
};

pub fn session(role: Role, tenant: &str) -> Session {
    Session::new(
        Identity {
            user_id: format!("{tenant}-user"),
            display_name: "Tester".into(),
            email: None,
            role,
            tenant_id: tenant.into(),
            tenant_name: tenant.to_uppercase(),
        },
        Credential::new(format!("{tenant}-token")),
    )
}

pub fn ts(minute: u32) -> DateTime<Utc> {
    DateTime::from_timestamp(1_710_000_000 + i64::from(minute) * 60, 0).unwrap()
}

fn down() -> BackendError {
    BackendError::Status {
        status: 503,
        message: "unavailable".into(),
    }
}

pub struct FakeBackend {
    pub calls: AtomicUsize,
    pub delay: Mutex<Option<Duration>>,
    pub chat_token: Mutex<Result<String, BackendError>>,
    pub channels: Mutex<Result<Vec<BackendChannel>, BackendError>>,
    pub messages: Mutex<Result<Vec<BackendMessage>, BackendError>>,
    pub created: Mutex<Result<BackendChannel, BackendError>>,
    pub posted: Mutex<Result<BackendMessage, BackendError>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Mutex::new(None),
            chat_token: Mutex::new(Ok("chat-token".into())),
            channels: Mutex::new(Err(down())),
            messages: Mutex::new(Err(down())),
            created: Mutex::new(Err(down())),
            posted: Mutex::new(Err(down())),
        }
    }
}

impl FakeBackend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

pub fn backend_channel(id: &str, tenant: Option<&str>) -> BackendChannel {
    BackendChannel {
        id: id.into(),
        name: id.into(),
        description: None,
        tenant_id: tenant.map(String::from),
        unread_count: None,
    }
}

pub fn backend_message(id: &str, channel: &str, minute: u32) -> BackendMessage {
    BackendMessage {
        id: id.into(),
        user_id: "u2".into(),
        user_name: Some("Ann".into()),
        text: format!("message {id}"),
        created_at: ts(minute),
        channel_id: Some(channel.into()),
    }
}

#[async_trait]
impl PrimaryBackend for FakeBackend {
    async fn login(&self, _: &str, _: &str, _: &str) -> Result<LoginResponse, BackendError> {
        self.enter().await;
        Err(down())
    }

    async fn register(&self, _: &RegisterRequest) -> Result<BackendUser, BackendError> {
        self.enter().await;
        Err(down())
    }

    async fn logout(&self, _: &Credential) -> Result<(), BackendError> {
        self.enter().await;
        Ok(())
    }

    async fn chat_token(&self, _: &Credential) -> Result<String, BackendError> {
        self.enter().await;
        self.chat_token.lock().unwrap().clone()
    }

    async fn list_tenants(&self, _: Option<&Credential>) -> Result<Vec<BackendTenant>, BackendError> {
        self.enter().await;
        Err(down())
    }

    async fn get_tenant(&self, _: &Credential, _: &str) -> Result<BackendTenant, BackendError> {
        self.enter().await;
        Err(down())
    }

    async fn create_tenant(&self, _: &Credential, _: &str) -> Result<BackendTenant, BackendError> {
        self.enter().await;
        Err(down())
    }

    async fn list_channels(&self, _: &Credential) -> Result<Vec<BackendChannel>, BackendError> {
        self.enter().await;
        self.channels.lock().unwrap().clone()
    }

    async fn create_channel(
        &self,
        _: &Credential,
        _: &NewChannel,
    ) -> Result<BackendChannel, BackendError> {
        self.enter().await;
        self.created.lock().unwrap().clone()
    }

    async fn list_messages(
        &self,
        _: &Credential,
        _: &str,
    ) -> Result<Vec<BackendMessage>, BackendError> {
        self.enter().await;
        self.messages.lock().unwrap().clone()
    }

    async fn post_message(
        &self,
        _: &Credential,
        _: &str,
        _: &str,
    ) -> Result<BackendMessage, BackendError> {
        self.enter().await;
        self.posted.lock().unwrap().clone()
    }

    async fn list_users(&self, _: &Credential) -> Result<Vec<BackendUser>, BackendError> {
        self.enter().await;
        Err(down())
    }

    async fn update_user_role(
        &self,
        _: &Credential,
        _: &str,
        _: Role,
    ) -> Result<BackendUser, BackendError> {
        self.enter().await;
        Err(down())
    }

    async fn change_password(
        &self,
        _: &Credential,
        _: &str,
        _: &str,
        _: &str,
    ) -> Result<(), BackendError> {
        self.enter().await;
        Err(down())
    }
}

fn provider_down() -> ProviderError {
    ProviderError::Transport("connection refused".into())
}

pub struct FakeProvider {
    pub calls: AtomicUsize,
    pub connects: AtomicUsize,
    pub channels: Mutex<Result<Vec<ProviderChannel>, ProviderError>>,
    pub history: Mutex<Result<ChannelHistory, ProviderError>>,
    pub created: Mutex<Result<ProviderChannel, ProviderError>>,
    pub sent: Mutex<Result<ProviderMessage, ProviderError>>,
    pub last_query: Mutex<Option<ChannelQuery>>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            connects: AtomicUsize::new(0),
            channels: Mutex::new(Err(provider_down())),
            history: Mutex::new(Err(provider_down())),
            created: Mutex::new(Err(provider_down())),
            sent: Mutex::new(Err(provider_down())),
            last_query: Mutex::new(None),
        }
    }
}

impl FakeProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn provider_channel(id: &str, tenant: &str) -> ProviderChannel {
    ProviderChannel {
        id: id.into(),
        name: Some(id.into()),
        description: None,
        tenant_id: Some(tenant.into()),
        unread_count: 0,
        last_message_at: None,
    }
}

pub fn provider_message(id: &str, minute: u32) -> ProviderMessage {
    ProviderMessage {
        id: id.into(),
        text: format!("message {id}"),
        user: ProviderUser {
            id: "u3".into(),
            name: Some("Bo".into()),
        },
        created_at: ts(minute),
    }
}

#[async_trait]
impl ChatProvider for FakeProvider {
    async fn connect_user(&self, _: &ProviderIdentity) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn query_channels(
        &self,
        _: &ProviderIdentity,
        query: &ChannelQuery,
    ) -> Result<Vec<ProviderChannel>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());
        self.channels.lock().unwrap().clone()
    }

    async fn create_channel(
        &self,
        _: &ProviderIdentity,
        channel: &NewProviderChannel,
    ) -> Result<ProviderChannel, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.created.lock().unwrap().clone().map(|mut c| {
            c.id = channel.id.clone();
            c
        })
    }

    async fn channel_history(
        &self,
        _: &ProviderIdentity,
        _: &str,
    ) -> Result<ChannelHistory, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.history.lock().unwrap().clone()
    }

    async fn send_message(
        &self,
        _: &ProviderIdentity,
        _: &str,
        _: &str,
    ) -> Result<ProviderMessage, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().clone()
    }
}
