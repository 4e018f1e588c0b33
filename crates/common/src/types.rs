use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

use crate::access::Role;

// ── Tenants ──────────────────────────────────────────────────────────────────

/// An isolated organization namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub display_name: String,
    /// `false` for the fixed demo tenants served from fixtures.
    pub is_live: bool,
}

/// A user as listed in a tenant's member directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
}

// ── Channels & messages ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub unread_count: u32,
    /// The only tenant this channel may ever be shown to.
    pub source_tenant_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub channel_id: String,
}

/// Which tier of the resolution chain answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Primary,
    External,
    Fixture,
}

impl Source {
    /// Fixtures are read-only.
    pub fn is_writable(&self) -> bool {
        !matches!(self, Source::Fixture)
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Source::Primary => "primary",
            Source::External => "external",
            Source::Fixture => "fixture",
        })
    }
}

/// A successful resolution, tagged with the source that produced it.
///
/// `degraded` is set when a live tenant fell through to fixture data because
/// every upstream tier failed; callers use it to warn the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub source: Source,
    pub degraded: bool,
    pub value: T,
}

impl<T> Resolved<T> {
    pub fn from_source(source: Source, value: T) -> Self {
        Self {
            source,
            degraded: false,
            value,
        }
    }

    pub fn degraded(value: T) -> Self {
        Self {
            source: Source::Fixture,
            degraded: true,
            value,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U> {
        Resolved {
            source: self.source,
            degraded: self.degraded,
            value: f(self.value),
        }
    }
}
