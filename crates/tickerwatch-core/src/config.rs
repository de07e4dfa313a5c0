//! Runtime configuration: TTL classes, quote service endpoint, state directory.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::ExpiryPolicy;
use crate::ValidationError;

pub const BASE_URL_ENV: &str = "TICKERWATCH_BASE_URL";
pub const HOME_ENV: &str = "TICKERWATCH_HOME";

/// Store name of the persisted watchlist + history blob.
pub const FINANCE_STORE: &str = "finance";
/// Store name of the persisted notification feed.
pub const NOTIFICATION_STORE: &str = "notifications";

const DEFAULT_USER_AGENT: &str = "TickerWatch/1.0";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Time-to-live classes of the two caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub snapshot_ttl: Duration,
    pub history_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_ttl: Duration::from_secs(10 * 60),
            history_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl CacheConfig {
    pub const fn snapshot_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::new(self.snapshot_ttl)
    }

    pub const fn history_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::new(self.history_ttl)
    }
}

/// Remote quote service endpoint and request defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_ms: u64,
}

impl ClientConfig {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = base_url.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingBaseUrl);
        }
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ValidationError::InvalidBaseUrl {
                value: trimmed.to_owned(),
            });
        }

        Ok(Self {
            base_url: trimmed.trim_end_matches('/').to_owned(),
            user_agent: String::from(DEFAULT_USER_AGENT),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        })
    }

    /// Reads the base url from `TICKERWATCH_BASE_URL`.
    pub fn from_env() -> Result<Self, ValidationError> {
        match env::var(BASE_URL_ENV) {
            Ok(value) => Self::new(value),
            Err(_) => Err(ValidationError::MissingBaseUrl),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Location of the file-backed key-value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub state_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: resolve_tickerwatch_home().join("state"),
        }
    }
}

fn resolve_tickerwatch_home() -> PathBuf {
    if let Some(path) = env::var_os(HOME_ENV) {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".tickerwatch");
    }

    PathBuf::from(".tickerwatch")
}
