use std::sync::Arc;

use {
    chrono::Utc,
    dashmap::DashMap,
    meridian_auth::{Session, permissions},
    meridian_common::{
        Capability, Error, Message, ResolutionError, Resolved, SendError, Source, is_demo_tenant,
    },
    tracing::{debug, info, warn},
};

use crate::{
    fixtures,
    resolver::{ChannelResolver, TierError, expire, sort_messages},
};

/// The session's local view of one channel.
#[derive(Debug, Default)]
struct ChannelView {
    /// As last served by the channel's source, plus acknowledged sends.
    messages: Vec<Message>,
    /// Authored locally in demo tenants; never sent anywhere.
    local: Vec<Message>,
}

impl ChannelView {
    fn merged(&self) -> Vec<Message> {
        let mut all = self.messages.clone();
        all.extend(self.local.iter().cloned());
        sort_messages(&mut all);
        all
    }
}

fn insert_ordered(messages: &mut Vec<Message>, message: Message) {
    let at = messages.partition_point(|m| m.timestamp <= message.timestamp);
    messages.insert(at, message);
}

/// Posts messages through each channel's resolved source and keeps the
/// session's ordered view of what it has seen and sent.
pub struct MessageGateway {
    resolver: Arc<ChannelResolver>,
    views: DashMap<(String, String), ChannelView>,
}

impl MessageGateway {
    pub fn new(resolver: Arc<ChannelResolver>) -> Self {
        Self {
            resolver,
            views: DashMap::new(),
        }
    }

    pub fn resolver(&self) -> &ChannelResolver {
        &self.resolver
    }

    /// Resolve a channel's messages and refresh the local view from them.
    pub async fn open(
        &self,
        session: &Session,
        channel_id: &str,
    ) -> Result<Resolved<Vec<Message>>, ResolutionError> {
        let resolved = self.resolver.get_messages(session, channel_id).await?;
        let mut view = self.views.entry(view_key(session, channel_id)).or_default();
        if !resolved.degraded {
            view.messages = resolved.value;
        }
        Ok(Resolved {
            source: resolved.source,
            degraded: resolved.degraded,
            value: view.merged(),
        })
    }

    /// The local view, oldest first. Empty for a channel never opened or
    /// sent to.
    pub fn view(&self, session: &Session, channel_id: &str) -> Vec<Message> {
        self.views
            .get(&view_key(session, channel_id))
            .map(|v| v.merged())
            .unwrap_or_default()
    }

    /// Requires `send_messages`, checked before any I/O. The message goes to
    /// the channel's own source; on failure the view is left untouched.
    pub async fn send(
        &self,
        session: &Session,
        channel_id: &str,
        text: &str,
    ) -> Result<Message, Error> {
        permissions::require(Some(session), Capability::SendMessages)?;
        if session.is_invalidated() {
            return Err(ResolutionError::SessionCleared.into());
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SendError::EmptyMessage.into());
        }

        let tenant = session.tenant_id();
        if is_demo_tenant(tenant) {
            return self.send_local(session, channel_id, text);
        }

        let source = match self.resolver.pinned_source(session, channel_id).await {
            Some(source) => source,
            None => {
                let resolved = self.open(session, channel_id).await?;
                if resolved.degraded {
                    warn!(tenant, channel = channel_id, "no live source for channel");
                    return Err(SendError::SourceUnavailable.into());
                }
                resolved.source
            },
        };

        let message = self
            .resolver
            .post(session, source, channel_id, text)
            .await
            .map_err(|e| -> Error {
                match e {
                    TierError::Unavailable => SendError::SourceUnavailable.into(),
                    TierError::Expired => expire(session).into(),
                    TierError::Cleared => ResolutionError::SessionCleared.into(),
                }
            })?;

        let mut view = self.views.entry(view_key(session, channel_id)).or_default();
        if !view.messages.iter().any(|m| m.id == message.id) {
            insert_ordered(&mut view.messages, message.clone());
        }
        info!(tenant, channel = channel_id, %source, "message sent");
        Ok(message)
    }

    /// Demo channels are fixtures: the message lives in the local view only.
    fn send_local(&self, session: &Session, channel_id: &str, text: &str) -> Result<Message, Error> {
        if !fixtures::has_channel(session.tenant_id(), channel_id) {
            return Err(ResolutionError::UnknownChannel {
                channel_id: channel_id.to_string(),
            }
            .into());
        }
        let message = Message {
            id: format!("local-{}", uuid::Uuid::new_v4().simple()),
            author_id: session.user_id().to_string(),
            author_name: session.display_name().to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
            channel_id: channel_id.to_string(),
        };
        let mut view = self.views.entry(view_key(session, channel_id)).or_default();
        if view.messages.is_empty() {
            view.messages = fixtures::messages(session.tenant_id(), channel_id).unwrap_or_default();
        }
        insert_ordered(&mut view.local, message.clone());
        debug!(channel = channel_id, source = %Source::Fixture, "message kept locally");
        Ok(message)
    }
}

fn view_key(session: &Session, channel_id: &str) -> (String, String) {
    (session.tenant_id().to_string(), channel_id.to_string())
}
