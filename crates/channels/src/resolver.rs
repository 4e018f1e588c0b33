//! The Primary → External → Fixture resolution chain.
//!
//! Each request walks the chain for the session's tenant and stops at the
//! first tier that answers. Demo tenants are answered by fixtures alone.
//! Once a channel's messages have been served by a live source, that source
//! is pinned for the channel and later requests never switch to another one.

use std::{future::Future, sync::Arc, time::Duration};

use {
    dashmap::DashMap,
    meridian_auth::{Session, permissions},
    meridian_backend::{BackendChannel, BackendError, BackendMessage, NewChannel, PrimaryBackend},
    meridian_common::{
        AuthError, Capability, Channel, Error, Message, ResolutionError, Resolved, Source,
        is_demo_tenant,
    },
    meridian_config::ResolverConfig,
    meridian_provider::{
        ChannelQuery, NewProviderChannel, ProviderChannel, ProviderMessage, channel_id_for,
    },
    tokio::sync::Mutex,
    tracing::{debug, info, warn},
};

use crate::{
    fixtures,
    link::{LinkError, ProviderLink},
};

/// Why a single tier did not answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TierError {
    /// Failed or timed out; the chain advances.
    Unavailable,
    /// The backend rejected the credential; the chain stops.
    Expired,
    /// The session ended while the call was in flight.
    Cleared,
}

trait Expiry {
    fn is_expiry(&self) -> bool;
}

impl Expiry for BackendError {
    fn is_expiry(&self) -> bool {
        *self == BackendError::Unauthorized
    }
}

impl Expiry for LinkError {
    fn is_expiry(&self) -> bool {
        matches!(self, LinkError::Backend(e) if e.is_expiry())
    }
}

type ChannelKey = (String, String);

pub struct ChannelResolver {
    backend: Arc<dyn PrimaryBackend>,
    external: Option<Arc<ProviderLink>>,
    step_timeout: Duration,
    /// Last channel list per (tenant, user).
    channels: DashMap<(String, String), Resolved<Vec<Channel>>>,
    /// Pinned source per (tenant, channel); the mutex is the resolving lock.
    slots: DashMap<ChannelKey, Arc<Mutex<Option<Source>>>>,
}

impl ChannelResolver {
    pub fn new(backend: Arc<dyn PrimaryBackend>, config: &ResolverConfig) -> Self {
        Self {
            backend,
            external: None,
            step_timeout: config.step_timeout(),
            channels: DashMap::new(),
            slots: DashMap::new(),
        }
    }

    /// Enable the external tier.
    pub fn with_external(mut self, link: Arc<ProviderLink>) -> Self {
        self.external = Some(link);
        self
    }

    pub(crate) fn link(&self) -> Option<&ProviderLink> {
        self.external.as_deref()
    }

    /// Drop what was learned for an ended session: its cached channel list
    /// and the provider connection.
    pub async fn disconnect(&self, session: &Session) {
        self.channels.remove(&list_key(session));
        if let Some(link) = self.link() {
            link.disconnect().await;
        }
        debug!(tenant = session.tenant_id(), "resolver state dropped");
    }

    // ── Channels ────────────────────────────────────────────────────────────

    /// Channels of the session's tenant, in the answering source's order.
    pub async fn list_channels(
        &self,
        session: &Session,
    ) -> Result<Resolved<Vec<Channel>>, ResolutionError> {
        ensure_open(session)?;
        let tenant = session.tenant_id();

        if is_demo_tenant(tenant) {
            let resolved = Resolved::from_source(Source::Fixture, fixtures::channels(tenant));
            return self.commit_channels(session, resolved);
        }

        match self
            .attempt(session, Source::Primary, self.backend.list_channels(session.credential()))
            .await
        {
            Ok(list) => {
                let channels = primary_channels(list, tenant);
                return self.commit_channels(session, Resolved::from_source(Source::Primary, channels));
            },
            Err(e) => self.advance(session, e)?,
        }

        if let Some(link) = self.link() {
            let query = ChannelQuery {
                member_id: session.user_id().to_string(),
                tenant_id: tenant.to_string(),
            };
            let fetch = async {
                let identity = link.identity(session).await?;
                Ok::<_, LinkError>(link.provider().query_channels(&identity, &query).await?)
            };
            match self.attempt(session, Source::External, fetch).await {
                Ok(list) => {
                    let channels = external_channels(list, tenant);
                    return self
                        .commit_channels(session, Resolved::from_source(Source::External, channels));
                },
                Err(e) => self.advance(session, e)?,
            }
        }

        warn!(tenant, "all channel sources failed, serving fixture fallback");
        self.commit_channels(session, Resolved::degraded(fixtures::channels(tenant)))
    }

    /// The last list resolved for this session's tenant and user.
    pub fn cached_channels(&self, session: &Session) -> Option<Resolved<Vec<Channel>>> {
        self.channels
            .get(&list_key(session))
            .map(|entry| entry.value().clone())
    }

    /// Requires `manage_channels`. Primary first, External second; fixtures
    /// are read-only so there is no third tier.
    pub async fn create_channel(
        &self,
        session: &Session,
        name: &str,
        description: &str,
    ) -> Result<Resolved<Channel>, Error> {
        permissions::require(Some(session), Capability::ManageChannels)?;
        ensure_open(session)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::Rejected("channel name is required".into()).into());
        }
        let tenant = session.tenant_id();
        if is_demo_tenant(tenant) {
            debug!(tenant, "demo channels are read-only");
            return Err(ResolutionError::AllSourcesUnavailable.into());
        }

        let request = NewChannel {
            name: name.to_string(),
            description: description.to_string(),
        };
        match self
            .attempt(
                session,
                Source::Primary,
                self.backend.create_channel(session.credential(), &request),
            )
            .await
        {
            Ok(created) => {
                let channel = primary_channel(created, tenant);
                return Ok(self.register_created(session, Source::Primary, channel)?);
            },
            Err(e) => self.advance(session, e)?,
        }

        if let Some(link) = self.link() {
            let request = NewProviderChannel {
                id: channel_id_for(tenant, name),
                name: name.to_string(),
                description: description.to_string(),
                tenant_id: tenant.to_string(),
                members: vec![session.user_id().to_string()],
            };
            let create = async {
                let identity = link.identity(session).await?;
                Ok::<_, LinkError>(link.provider().create_channel(&identity, &request).await?)
            };
            match self.attempt(session, Source::External, create).await {
                Ok(created) => {
                    let channel = external_channel(created, tenant);
                    return Ok(self.register_created(session, Source::External, channel)?);
                },
                Err(e) => self.advance(session, e)?,
            }
        }

        warn!(tenant, "channel creation failed on every writable source");
        Err(ResolutionError::AllSourcesUnavailable.into())
    }

    // ── Messages ────────────────────────────────────────────────────────────

    /// Messages of one channel, oldest first.
    ///
    /// Resolution is single-flight per channel: concurrent calls for the same
    /// channel wait for the first one and then reuse its pinned source.
    pub async fn get_messages(
        &self,
        session: &Session,
        channel_id: &str,
    ) -> Result<Resolved<Vec<Message>>, ResolutionError> {
        ensure_open(session)?;
        let tenant = session.tenant_id();

        if is_demo_tenant(tenant) {
            return fixtures::messages(tenant, channel_id)
                .map(|msgs| Resolved::from_source(Source::Fixture, msgs))
                .ok_or_else(|| unknown(channel_id));
        }
        if fixtures::has_channel_anywhere(channel_id) {
            return Err(unknown(channel_id));
        }

        let slot = self.slot(tenant, channel_id);
        let mut pinned = slot.lock().await;
        ensure_open(session)?;

        let order: &[Source] = match *pinned {
            Some(Source::Primary) => &[Source::Primary],
            Some(Source::External) => &[Source::External],
            _ => &[Source::Primary, Source::External],
        };

        for &source in order {
            let result = match source {
                Source::Primary => self.primary_messages(session, channel_id).await,
                Source::External => self.external_messages(session, channel_id).await,
                Source::Fixture => continue,
            };
            match result {
                Ok(Some(mut messages)) => {
                    ensure_open(session)?;
                    sort_messages(&mut messages);
                    if pinned.is_none() {
                        debug!(tenant, channel = channel_id, %source, "channel source pinned");
                        *pinned = Some(source);
                    }
                    return Ok(Resolved::from_source(source, messages));
                },
                Ok(None) => return Err(unknown(channel_id)),
                Err(e) => self.advance(session, e)?,
            }
        }

        if pinned.is_none() && !self.is_listed(session, channel_id) {
            return Err(unknown(channel_id));
        }
        warn!(tenant, channel = channel_id, "message sources failed, serving fixture fallback");
        Ok(Resolved::degraded(Vec::new()))
    }

    /// The source pinned for `channel_id` in the session's tenant, if any.
    pub async fn pinned_source(&self, session: &Session, channel_id: &str) -> Option<Source> {
        if is_demo_tenant(session.tenant_id()) {
            return fixtures::has_channel(session.tenant_id(), channel_id).then_some(Source::Fixture);
        }
        let slot = self
            .slots
            .get(&(session.tenant_id().to_string(), channel_id.to_string()))
            .map(|s| Arc::clone(s.value()))?;
        let pinned = *slot.lock().await;
        pinned
    }

    /// Post through `source`. No fallback: a write goes to the channel's own
    /// source or nowhere.
    pub(crate) async fn post(
        &self,
        session: &Session,
        source: Source,
        channel_id: &str,
        text: &str,
    ) -> Result<Message, TierError> {
        match source {
            Source::Primary => {
                let posted = self
                    .attempt(
                        session,
                        Source::Primary,
                        self.backend
                            .post_message(session.credential(), channel_id, text),
                    )
                    .await?;
                Ok(primary_message(posted, channel_id))
            },
            Source::External => {
                let link = self.link().ok_or(TierError::Unavailable)?;
                let send = async {
                    let identity = link.identity(session).await?;
                    Ok::<_, LinkError>(
                        link.provider()
                            .send_message(&identity, channel_id, text)
                            .await?,
                    )
                };
                let sent = self.attempt(session, Source::External, send).await?;
                Ok(external_message(sent, channel_id))
            },
            Source::Fixture => Err(TierError::Unavailable),
        }
    }

    // ── Tiers ───────────────────────────────────────────────────────────────

    /// `Ok(None)` means the source answered but the channel belongs to
    /// another tenant.
    async fn primary_messages(
        &self,
        session: &Session,
        channel_id: &str,
    ) -> Result<Option<Vec<Message>>, TierError> {
        let list = self
            .attempt(
                session,
                Source::Primary,
                self.backend.list_messages(session.credential(), channel_id),
            )
            .await?;
        Ok(Some(
            list.into_iter()
                .filter(|m| {
                    let ours = m.channel_id.as_deref().is_none_or(|c| c == channel_id);
                    if !ours {
                        warn!(channel = channel_id, message = %m.id, "dropping message of another channel");
                    }
                    ours
                })
                .map(|m| primary_message(m, channel_id))
                .collect(),
        ))
    }

    async fn external_messages(
        &self,
        session: &Session,
        channel_id: &str,
    ) -> Result<Option<Vec<Message>>, TierError> {
        let Some(link) = self.link() else {
            return Err(TierError::Unavailable);
        };
        let fetch = async {
            let identity = link.identity(session).await?;
            Ok::<_, LinkError>(link.provider().channel_history(&identity, channel_id).await?)
        };
        let history = self.attempt(session, Source::External, fetch).await?;
        if !tagged_for(&history.channel, session.tenant_id()) {
            warn!(channel = channel_id, "provider channel is not tagged with this tenant");
            return Ok(None);
        }
        Ok(Some(
            history
                .messages
                .into_iter()
                .map(|m| external_message(m, channel_id))
                .collect(),
        ))
    }

    /// Run one chain step under the step timeout, abandoning it as soon as
    /// the session ends.
    async fn attempt<T, E>(
        &self,
        session: &Session,
        source: Source,
        call: impl Future<Output = Result<T, E>>,
    ) -> Result<T, TierError>
    where
        E: std::fmt::Display + Expiry,
    {
        let outcome = tokio::select! {
            biased;
            () = session.ended() => return Err(TierError::Cleared),
            outcome = tokio::time::timeout(self.step_timeout, call) => outcome,
        };
        match outcome {
            Ok(Ok(value)) => {
                if session.is_invalidated() {
                    return Err(TierError::Cleared);
                }
                debug!(%source, "source answered");
                Ok(value)
            },
            Ok(Err(e)) if e.is_expiry() => Err(TierError::Expired),
            Ok(Err(e)) => {
                warn!(%source, error = %e, "source failed, advancing");
                Err(TierError::Unavailable)
            },
            Err(_) => {
                warn!(
                    %source,
                    timeout_ms = self.step_timeout.as_millis() as u64,
                    "source timed out, advancing"
                );
                Err(TierError::Unavailable)
            },
        }
    }

    /// Continue the chain after `Unavailable`; anything else stops it.
    fn advance(&self, session: &Session, e: TierError) -> Result<(), ResolutionError> {
        match e {
            TierError::Unavailable => Ok(()),
            TierError::Cleared => Err(ResolutionError::SessionCleared),
            TierError::Expired => Err(expire(session)),
        }
    }

    // ── Cache ───────────────────────────────────────────────────────────────

    fn slot(&self, tenant: &str, channel_id: &str) -> Arc<Mutex<Option<Source>>> {
        Arc::clone(
            self.slots
                .entry((tenant.to_string(), channel_id.to_string()))
                .or_default()
                .value(),
        )
    }

    fn is_listed(&self, session: &Session, channel_id: &str) -> bool {
        self.channels
            .get(&list_key(session))
            .is_some_and(|entry| entry.value().value.iter().any(|c| c.id == channel_id))
    }

    fn commit_channels(
        &self,
        session: &Session,
        resolved: Resolved<Vec<Channel>>,
    ) -> Result<Resolved<Vec<Channel>>, ResolutionError> {
        ensure_open(session)?;
        if !resolved.degraded && resolved.source != Source::Fixture {
            for channel in &resolved.value {
                self.pin_if_idle(session.tenant_id(), &channel.id, resolved.source);
            }
        }
        info!(
            tenant = session.tenant_id(),
            source = %resolved.source,
            degraded = resolved.degraded,
            count = resolved.value.len(),
            "channels resolved"
        );
        self.channels.insert(list_key(session), resolved.clone());
        Ok(resolved)
    }

    fn register_created(
        &self,
        session: &Session,
        source: Source,
        channel: Channel,
    ) -> Result<Resolved<Channel>, ResolutionError> {
        ensure_open(session)?;
        self.pin_if_idle(session.tenant_id(), &channel.id, source);
        let key = list_key(session);
        let stale = match self.channels.get_mut(&key) {
            Some(mut entry) if entry.value().source == source && !entry.value().degraded => {
                entry.value_mut().value.push(channel.clone());
                false
            },
            Some(_) => true,
            None => false,
        };
        if stale {
            self.channels.remove(&key);
        }
        info!(tenant = session.tenant_id(), channel = %channel.id, %source, "channel created");
        Ok(Resolved::from_source(source, channel))
    }

    /// Pin without waiting; a channel being resolved right now keeps
    /// whatever that resolution decides.
    fn pin_if_idle(&self, tenant: &str, channel_id: &str, source: Source) {
        let slot = self.slot(tenant, channel_id);
        if let Ok(mut pinned) = slot.try_lock()
            && pinned.is_none()
        {
            *pinned = Some(source);
        }
    }
}

fn list_key(session: &Session) -> (String, String) {
    (session.tenant_id().to_string(), session.user_id().to_string())
}

fn ensure_open(session: &Session) -> Result<(), ResolutionError> {
    if session.is_invalidated() {
        Err(ResolutionError::SessionCleared)
    } else {
        Ok(())
    }
}

pub(crate) fn expire(session: &Session) -> ResolutionError {
    warn!(tenant = session.tenant_id(), "credential rejected, ending session");
    session.invalidate();
    ResolutionError::SessionExpired
}

fn unknown(channel_id: &str) -> ResolutionError {
    ResolutionError::UnknownChannel {
        channel_id: channel_id.to_string(),
    }
}

/// Stable: equal timestamps keep arrival order.
pub(crate) fn sort_messages(messages: &mut [Message]) {
    messages.sort_by_key(|m| m.timestamp);
}

// ── Conversions ─────────────────────────────────────────────────────────────

fn primary_channel(c: BackendChannel, tenant: &str) -> Channel {
    Channel {
        id: c.id,
        name: c.name,
        description: c.description.filter(|d| !d.is_empty()),
        unread_count: c.unread_count.unwrap_or(0),
        source_tenant_id: tenant.to_string(),
    }
}

fn primary_channels(list: Vec<BackendChannel>, tenant: &str) -> Vec<Channel> {
    list.into_iter()
        .filter(|c| {
            let ours = c.tenant_id.as_deref().is_none_or(|t| t == tenant);
            if !ours {
                warn!(tenant, channel = %c.id, "dropping channel of another tenant");
            }
            ours
        })
        .map(|c| primary_channel(c, tenant))
        .collect()
}

fn external_channel(c: ProviderChannel, tenant: &str) -> Channel {
    Channel {
        name: c.name.unwrap_or_else(|| c.id.clone()),
        id: c.id,
        description: c.description.filter(|d| !d.is_empty()),
        unread_count: c.unread_count,
        source_tenant_id: tenant.to_string(),
    }
}

/// The provider is shared by every tenant; only an explicit tag proves
/// ownership.
fn tagged_for(channel: &ProviderChannel, tenant: &str) -> bool {
    channel.tenant_id.as_deref() == Some(tenant)
}

fn external_channels(list: Vec<ProviderChannel>, tenant: &str) -> Vec<Channel> {
    list.into_iter()
        .filter(|c| {
            let ours = tagged_for(c, tenant);
            if !ours {
                warn!(tenant, channel = %c.id, "dropping provider channel not tagged with this tenant");
            }
            ours
        })
        .map(|c| external_channel(c, tenant))
        .collect()
}

fn primary_message(m: BackendMessage, channel_id: &str) -> Message {
    Message {
        author_name: m.user_name.unwrap_or_else(|| m.user_id.clone()),
        author_id: m.user_id,
        id: m.id,
        text: m.text,
        timestamp: m.created_at,
        channel_id: m.channel_id.unwrap_or_else(|| channel_id.to_string()),
    }
}

fn external_message(m: ProviderMessage, channel_id: &str) -> Message {
    Message {
        author_name: m.user.name.unwrap_or_else(|| m.user.id.clone()),
        author_id: m.user.id,
        id: m.id,
        text: m.text,
        timestamp: m.created_at,
        channel_id: channel_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testing::*,
        meridian_common::{PermissionDenied, Role},
        meridian_provider::ChannelHistory,
    };

    struct Harness {
        backend: Arc<FakeBackend>,
        provider: Arc<FakeProvider>,
        resolver: Arc<ChannelResolver>,
    }

    fn harness() -> Harness {
        harness_with_timeout(4_000)
    }

    fn harness_with_timeout(step_timeout_ms: u64) -> Harness {
        let backend = Arc::new(FakeBackend::default());
        let provider = Arc::new(FakeProvider::default());
        let link = Arc::new(ProviderLink::new(backend.clone(), provider.clone()));
        let resolver = ChannelResolver::new(backend.clone(), &ResolverConfig { step_timeout_ms })
            .with_external(link);
        Harness {
            backend,
            provider,
            resolver: Arc::new(resolver),
        }
    }

    #[tokio::test]
    async fn demo_tenants_never_touch_upstream() {
        let h = harness();
        for tenant in ["tenant-a", "tenant-b", "tenant-c"] {
            let s = session(Role::Admin, tenant);
            let listed = h.resolver.list_channels(&s).await.unwrap();
            assert_eq!(listed.source, Source::Fixture);
            assert!(!listed.degraded);
            for channel in &listed.value {
                let msgs = h.resolver.get_messages(&s, &channel.id).await.unwrap();
                assert_eq!(msgs.source, Source::Fixture);
            }
            assert!(matches!(
                h.resolver.create_channel(&s, "new", "").await,
                Err(Error::Resolution(ResolutionError::AllSourcesUnavailable))
            ));
        }
        assert_eq!(h.backend.calls(), 0);
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn primary_answers_first() {
        let h = harness();
        *h.backend.channels.lock().unwrap() = Ok(vec![
            backend_channel("c1", Some("org-42")),
            backend_channel("c2", None),
        ]);
        let listed = h
            .resolver
            .list_channels(&session(Role::Member, "org-42"))
            .await
            .unwrap();
        assert_eq!(listed.source, Source::Primary);
        let ids: Vec<_> = listed.value.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn primary_down_falls_to_external() {
        let h = harness();
        *h.provider.channels.lock().unwrap() = Ok(vec![
            provider_channel("org-42-ops", "org-42"),
            provider_channel("org-42-general", "org-42"),
        ]);
        let s = session(Role::Member, "org-42");
        let listed = h.resolver.list_channels(&s).await.unwrap();
        assert_eq!(listed.source, Source::External);
        assert!(!listed.degraded);
        assert_eq!(listed.value.len(), 2);
        assert_eq!(listed.value[0].id, "org-42-ops");

        let query = h.provider.last_query.lock().unwrap().clone().unwrap();
        assert_eq!(query.member_id, "org-42-user");
        assert_eq!(query.tenant_id, "org-42");
    }

    #[tokio::test]
    async fn everything_down_is_degraded_fixture() {
        let h = harness();
        let s = session(Role::Member, "org-42");
        let listed = h.resolver.list_channels(&s).await.unwrap();
        assert_eq!(listed.source, Source::Fixture);
        assert!(listed.degraded);
        assert!(listed.value.is_empty());
        assert_eq!(h.resolver.cached_channels(&s), Some(listed));
    }

    #[tokio::test]
    async fn foreign_channels_are_dropped() {
        let h = harness();
        *h.backend.channels.lock().unwrap() = Ok(vec![
            backend_channel("mine", Some("org-42")),
            backend_channel("theirs", Some("org-7")),
        ]);
        let listed = h
            .resolver
            .list_channels(&session(Role::Member, "org-42"))
            .await
            .unwrap();
        assert_eq!(listed.value.len(), 1);
        assert!(listed.value.iter().all(|c| c.source_tenant_id == "org-42"));
    }

    #[tokio::test]
    async fn caches_do_not_cross_tenants() {
        let h = harness();
        *h.backend.channels.lock().unwrap() = Ok(vec![backend_channel("c1", None)]);
        let a = session(Role::Member, "org-42");
        h.resolver.list_channels(&a).await.unwrap();

        let b = session(Role::Member, "org-7");
        assert_eq!(h.resolver.cached_channels(&b), None);
        assert!(h.resolver.cached_channels(&a).is_some());
    }

    #[tokio::test]
    async fn demo_channel_of_other_tenant_is_unknown() {
        let h = harness();
        let err = h
            .resolver
            .get_messages(&session(Role::Admin, "tenant-a"), "b-sales")
            .await
            .unwrap_err();
        assert_eq!(err, ResolutionError::UnknownChannel {
            channel_id: "b-sales".into()
        });

        let live = h
            .resolver
            .get_messages(&session(Role::Admin, "org-42"), "a-general")
            .await
            .unwrap_err();
        assert!(matches!(live, ResolutionError::UnknownChannel { .. }));
        assert_eq!(h.backend.calls(), 0);
    }

    #[tokio::test]
    async fn messages_stay_on_pinned_source() {
        let h = harness();
        *h.backend.messages.lock().unwrap() = Ok(vec![
            backend_message("m2", "c1", 2),
            backend_message("m1", "c1", 1),
        ]);
        let s = session(Role::Member, "org-42");
        let first = h.resolver.get_messages(&s, "c1").await.unwrap();
        assert_eq!(first.source, Source::Primary);
        let ids: Vec<_> = first.value.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);

        // Primary goes down; the external provider must not be consulted.
        *h.backend.messages.lock().unwrap() = Err(BackendError::Transport("reset".into()));
        *h.provider.history.lock().unwrap() = Ok(ChannelHistory {
            channel: provider_channel("c1", "org-42"),
            messages: vec![provider_message("x1", 1)],
        });
        let second = h.resolver.get_messages(&s, "c1").await.unwrap();
        assert!(second.degraded);
        assert!(second.value.is_empty());
        assert_eq!(h.provider.calls(), 0);
        assert_eq!(h.resolver.pinned_source(&s, "c1").await, Some(Source::Primary));
    }

    #[tokio::test]
    async fn listing_pins_external_channels() {
        let h = harness();
        *h.provider.channels.lock().unwrap() = Ok(vec![provider_channel("org-42-ops", "org-42")]);
        *h.provider.history.lock().unwrap() = Ok(ChannelHistory {
            channel: provider_channel("org-42-ops", "org-42"),
            messages: vec![provider_message("x1", 1)],
        });
        let s = session(Role::Member, "org-42");
        h.resolver.list_channels(&s).await.unwrap();

        // Primary recovers, but the channel is already bound to External.
        *h.backend.messages.lock().unwrap() = Ok(vec![backend_message("m1", "org-42-ops", 1)]);
        let calls_before = h.backend.calls();
        let msgs = h.resolver.get_messages(&s, "org-42-ops").await.unwrap();
        assert_eq!(msgs.source, Source::External);
        assert_eq!(msgs.value[0].id, "x1");
        assert_eq!(h.backend.calls(), calls_before);
    }

    #[tokio::test]
    async fn provider_channel_of_other_tenant_is_unknown() {
        let h = harness();
        *h.provider.history.lock().unwrap() = Ok(ChannelHistory {
            channel: provider_channel("org-7-ops", "org-7"),
            messages: vec![provider_message("x1", 1)],
        });
        let err = h
            .resolver
            .get_messages(&session(Role::Member, "org-42"), "org-7-ops")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::UnknownChannel { .. }));
    }

    #[tokio::test]
    async fn untagged_provider_channel_belongs_to_nobody() {
        let h = harness();
        let mut untagged = provider_channel("org-7-secret", "org-7");
        untagged.tenant_id = None;
        *h.provider.history.lock().unwrap() = Ok(ChannelHistory {
            channel: untagged.clone(),
            messages: vec![provider_message("x1", 1)],
        });
        let s = session(Role::Member, "org-42");

        let err = h.resolver.get_messages(&s, "org-7-secret").await.unwrap_err();
        assert!(matches!(err, ResolutionError::UnknownChannel { .. }));
        assert_eq!(h.resolver.pinned_source(&s, "org-7-secret").await, None);

        *h.provider.channels.lock().unwrap() =
            Ok(vec![untagged, provider_channel("org-42-ops", "org-42")]);
        let listed = h.resolver.list_channels(&s).await.unwrap();
        assert_eq!(listed.source, Source::External);
        let ids: Vec<_> = listed.value.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["org-42-ops"]);
    }

    #[tokio::test]
    async fn disconnect_drops_cached_list_and_provider_link() {
        let h = harness();
        *h.provider.channels.lock().unwrap() = Ok(vec![provider_channel("org-42-ops", "org-42")]);
        let s = session(Role::Member, "org-42");
        h.resolver.list_channels(&s).await.unwrap();
        let link = h.resolver.link().unwrap();
        assert!(link.is_connected().await);

        h.resolver.disconnect(&s).await;
        assert!(h.resolver.cached_channels(&s).is_none());
        assert!(!link.is_connected().await);
    }

    #[tokio::test]
    async fn unlisted_channel_with_all_sources_down_is_unknown() {
        let h = harness();
        let err = h
            .resolver
            .get_messages(&session(Role::Member, "org-42"), "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::UnknownChannel { .. }));
    }

    #[tokio::test]
    async fn concurrent_resolution_is_single_flight() {
        let h = harness();
        *h.backend.delay.lock().unwrap() = Some(Duration::from_millis(50));
        *h.backend.messages.lock().unwrap() = Ok(vec![backend_message("m1", "c1", 1)]);
        *h.provider.history.lock().unwrap() = Ok(ChannelHistory {
            channel: provider_channel("c1", "org-42"),
            messages: vec![provider_message("x1", 1)],
        });
        let s = session(Role::Member, "org-42");

        let (a, b) = tokio::join!(
            h.resolver.get_messages(&s, "c1"),
            h.resolver.get_messages(&s, "c1")
        );
        assert_eq!(a.unwrap().source, Source::Primary);
        assert_eq!(b.unwrap().source, Source::Primary);
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn hung_primary_times_out_into_external() {
        let h = harness_with_timeout(20);
        *h.backend.delay.lock().unwrap() = Some(Duration::from_secs(30));
        *h.provider.channels.lock().unwrap() = Ok(vec![provider_channel("org-42-ops", "org-42")]);

        let listed = tokio::time::timeout(
            Duration::from_secs(5),
            h.resolver.list_channels(&session(Role::Member, "org-42")),
        )
        .await
        .unwrap();
        // The chat token exchange also hangs, so External times out too.
        let listed = listed.unwrap();
        assert!(listed.degraded);
    }

    #[tokio::test]
    async fn unauthorized_ends_session() {
        let h = harness();
        *h.backend.channels.lock().unwrap() = Err(BackendError::Unauthorized);
        *h.provider.channels.lock().unwrap() = Ok(vec![provider_channel("org-42-ops", "org-42")]);
        let s = session(Role::Member, "org-42");

        let err = h.resolver.list_channels(&s).await.unwrap_err();
        assert_eq!(err, ResolutionError::SessionExpired);
        assert!(s.is_invalidated());
        assert_eq!(h.provider.calls(), 0);
        assert_eq!(h.resolver.cached_channels(&s), None);
    }

    #[tokio::test]
    async fn clearing_mid_flight_discards_result() {
        let h = harness();
        *h.backend.delay.lock().unwrap() = Some(Duration::from_millis(100));
        *h.backend.channels.lock().unwrap() = Ok(vec![backend_channel("c1", None)]);
        let s = session(Role::Member, "org-42");

        let resolver = h.resolver.clone();
        let in_flight = s.clone();
        let task = tokio::spawn(async move { resolver.list_channels(&in_flight).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        s.invalidate();

        assert_eq!(task.await.unwrap(), Err(ResolutionError::SessionCleared));
        assert_eq!(h.resolver.cached_channels(&s), None);
    }

    #[tokio::test]
    async fn create_requires_manage_channels() {
        let h = harness();
        let err = h
            .resolver
            .create_channel(&session(Role::Member, "org-42"), "ops", "")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::PermissionDenied(PermissionDenied {
                capability: Capability::ManageChannels
            })
        );
        assert_eq!(h.backend.calls(), 0);
    }

    #[tokio::test]
    async fn create_falls_back_to_external_with_tenant_prefixed_id() {
        let h = harness();
        *h.provider.created.lock().unwrap() = Ok(provider_channel("ignored", "org-42"));
        let s = session(Role::Moderator, "org-42");
        let created = h
            .resolver
            .create_channel(&s, "Release Notes", "weekly")
            .await
            .unwrap();
        assert_eq!(created.source, Source::External);
        assert_eq!(created.value.id, "org-42-release-notes");
        assert_eq!(
            h.resolver.pinned_source(&s, "org-42-release-notes").await,
            Some(Source::External)
        );
    }

    #[tokio::test]
    async fn create_with_every_source_down_registers_nothing() {
        let h = harness();
        let s = session(Role::Admin, "org-42");
        *h.backend.channels.lock().unwrap() = Ok(vec![backend_channel("c1", None)]);
        h.resolver.list_channels(&s).await.unwrap();

        let err = h.resolver.create_channel(&s, "ops", "").await.unwrap_err();
        assert_eq!(err, Error::Resolution(ResolutionError::AllSourcesUnavailable));
        let cached = h.resolver.cached_channels(&s).unwrap();
        assert_eq!(cached.value.len(), 1);
        assert_eq!(h.resolver.pinned_source(&s, "org-42-ops").await, None);
    }

    #[tokio::test]
    async fn created_primary_channel_joins_cached_list() {
        let h = harness();
        let s = session(Role::Admin, "org-42");
        *h.backend.channels.lock().unwrap() = Ok(vec![backend_channel("c1", None)]);
        h.resolver.list_channels(&s).await.unwrap();
        *h.backend.created.lock().unwrap() = Ok(backend_channel("c2", Some("org-42")));

        let created = h.resolver.create_channel(&s, "c2", "").await.unwrap();
        assert_eq!(created.source, Source::Primary);
        let cached = h.resolver.cached_channels(&s).unwrap();
        let ids: Vec<_> = cached.value.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }
}
