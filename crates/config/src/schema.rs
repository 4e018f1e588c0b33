/// Config schema types (backend, provider, resolver, storage).
use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeridianConfig {
    pub backend: BackendConfig,
    pub provider: ProviderConfig,
    pub resolver: ResolverConfig,
    pub storage: StorageConfig,
}

/// Primary backend (HTTP+JSON) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL including any path prefix, e.g. `http://localhost:8080/api`.
    pub base_url: String,

    /// Per-request ceiling enforced by the HTTP client.
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".into(),
            timeout_ms: 5_000,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// External real-time chat provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Whether the External tier takes part in resolution. Defaults to true.
    pub enabled: bool,

    pub base_url: String,

    /// Public provider API key (env var substitution recommended).
    pub api_key: Option<String>,

    pub timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://chat.stream-io-api.com".into(),
            api_key: None,
            timeout_ms: 5_000,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The External tier is only usable with a key.
    pub fn is_usable(&self) -> bool {
        self.enabled && self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Resolution chain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Upper bound for a single chain step before falling through.
    pub step_timeout_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            step_timeout_ms: 4_000,
        }
    }
}

impl ResolverConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms.max(1))
    }
}

/// Persisted client state location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Override for the session file. Defaults to `<data_dir>/session.json`.
    pub path: Option<PathBuf>,
}
