//! Client configuration
//!
//! Profiles are read from a YAML file (`~/.accessctl.yaml` unless `--config`
//! names another) holding one named section per tenant:
//!
//! ```yaml
//! default:
//!   base_url: https://manage.example.com
//!   auth:
//!     type: bearer
//!     token: "..."
//!   contract_id: c-1234
//!   tail:
//!     interval_secs: 15
//! ```
//!
//! `ACCESSCTL_BASE_URL` and `ACCESSCTL_TOKEN` override the file.

use crate::auth::AuthConfig;
use crate::engine::{BackoffPolicy, GapPolicy, PollConfig};
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable overriding `base_url`
pub const ENV_BASE_URL: &str = "ACCESSCTL_BASE_URL";

/// Environment variable supplying a bearer token
pub const ENV_TOKEN: &str = "ACCESSCTL_TOKEN";

/// Section used when `--section` is not given
pub const DEFAULT_SECTION: &str = "default";

/// File name looked up in the home directory
pub const CONFIG_FILE_NAME: &str = ".accessctl.yaml";

// ============================================================================
// Profile
// ============================================================================

/// One named section of the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    /// API root, e.g. `https://manage.example.com`
    #[serde(default)]
    pub base_url: Option<String>,

    /// Credentials
    #[serde(default)]
    pub auth: AuthConfig,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Internal retries for single-shot commands
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Client-side request rate limit
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,

    /// Contract (tenant) id sent with every request
    #[serde(default)]
    pub contract_id: Option<String>,

    /// Records requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Live tail defaults
    #[serde(default)]
    pub tail: TailConfig,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            base_url: None,
            auth: AuthConfig::None,
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            rate_limit: None,
            contract_id: None,
            page_size: default_page_size(),
            tail: TailConfig::default(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_page_size() -> u32 {
    100
}

/// Live tail defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TailConfig {
    /// Seconds between polls when nothing new arrived
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Granularity of cancellable sleeps in milliseconds
    #[serde(default = "default_slice_ms")]
    pub slice_ms: u64,

    /// Backoff growth after failed polls
    #[serde(default)]
    pub backoff: BackoffType,

    /// First backoff delay in milliseconds
    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    /// Backoff ceiling in seconds
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,

    /// Item keys remembered for duplicate suppression
    #[serde(default = "default_dedup_window")]
    pub dedup_window: usize,

    /// Longest server `Retry-After` wait honoured, in seconds
    #[serde(default = "default_max_retry_after_secs")]
    pub max_retry_after_secs: u64,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            slice_ms: default_slice_ms(),
            backoff: BackoffType::default(),
            backoff_initial_ms: default_backoff_initial_ms(),
            backoff_max_secs: default_backoff_max_secs(),
            dedup_window: default_dedup_window(),
            max_retry_after_secs: default_max_retry_after_secs(),
        }
    }
}

fn default_interval() -> u64 {
    15
}

fn default_slice_ms() -> u64 {
    1000
}

fn default_backoff_initial_ms() -> u64 {
    1000
}

fn default_backoff_max_secs() -> u64 {
    60
}

fn default_dedup_window() -> usize {
    crate::state::DEFAULT_WINDOW
}

fn default_max_retry_after_secs() -> u64 {
    crate::engine::DEFAULT_MAX_RETRY_AFTER.as_secs()
}

impl Profile {
    /// Apply environment overrides, reading variables through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
            debug!("base_url taken from {ENV_BASE_URL}");
            self.base_url = Some(url);
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.is_empty()) {
            debug!("bearer token taken from {ENV_TOKEN}");
            self.auth = AuthConfig::Bearer { token };
        }
    }

    /// Check the profile is usable
    pub fn validate(&self) -> Result<()> {
        let base_url = self
            .base_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::missing_field("base_url"))?;
        let parsed = url::Url::parse(base_url)
            .map_err(|e| Error::invalid_value("base_url", e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "base_url",
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }

        if !self.auth.is_complete() {
            return Err(Error::invalid_value(
                "auth",
                format!("{} credentials are empty", self.auth.kind()),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::invalid_value("timeout_secs", "must be positive"));
        }
        if self.page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be positive"));
        }
        if self.tail.interval_secs == 0 {
            return Err(Error::invalid_value("tail.interval_secs", "must be positive"));
        }
        if self.tail.slice_ms == 0 {
            return Err(Error::invalid_value("tail.slice_ms", "must be positive"));
        }
        if self.tail.dedup_window == 0 {
            return Err(Error::invalid_value("tail.dedup_window", "must be positive"));
        }
        Ok(())
    }

    /// HTTP client settings for this profile
    pub fn http_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .max_retries(self.max_retries);

        if let Some(url) = &self.base_url {
            builder = builder.base_url(url.trim_end_matches('/'));
        }
        builder = match &self.rate_limit {
            Some(limit) => builder.rate_limit(limit.clone()),
            None => builder,
        };
        if let Some(contract) = &self.contract_id {
            builder = builder.query("contract_id", contract);
        }
        builder.build()
    }

    /// Poll engine settings for this profile
    pub fn poll_config(&self) -> PollConfig {
        PollConfig::with_interval(Duration::from_secs(self.tail.interval_secs))
            .slice(Duration::from_millis(self.tail.slice_ms))
            .backoff(BackoffPolicy::new(
                self.tail.backoff,
                Duration::from_millis(self.tail.backoff_initial_ms),
                Duration::from_secs(self.tail.backoff_max_secs),
            ))
            .gap_policy(GapPolicy::Warn)
            .dedup_window(self.tail.dedup_window)
            .max_retry_after(Duration::from_secs(self.tail.max_retry_after_secs))
    }
}

// ============================================================================
// Loading
// ============================================================================

/// `~/.accessctl.yaml`, if a home directory is known
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

/// Parse every section of a configuration file
pub fn parse_profiles(yaml: &str) -> Result<BTreeMap<String, Profile>> {
    if yaml.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_yaml::from_str(yaml).map_err(|e| Error::config(format!("Invalid configuration: {e}")))
}

/// Load `section` from `path`, apply environment overrides and validate.
///
/// An explicit `path` must exist. The default file is optional so that a
/// profile can come from the environment alone.
pub fn load_profile(path: Option<&Path>, section: &str) -> Result<Profile> {
    load_profile_with_env(path, section, |key| std::env::var(key).ok())
}

/// `load_profile` with an injectable environment
pub fn load_profile_with_env(
    path: Option<&Path>,
    section: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Profile> {
    let (path, explicit) = match path {
        Some(p) => (Some(p.to_path_buf()), true),
        None => (default_config_path(), false),
    };

    let mut profile = match path {
        Some(path) if path.exists() => read_section(&path, section)?,
        Some(path) if explicit => {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            })
        }
        _ => {
            debug!("No configuration file, using environment only");
            Profile::default()
        }
    };

    profile.apply_env(lookup);
    profile.validate()?;
    Ok(profile)
}

fn read_section(path: &Path, section: &str) -> Result<Profile> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read config file '{}': {e}",
            path.display()
        ))
    })?;
    let mut profiles = parse_profiles(&content)?;

    let available = profiles.keys().cloned().collect::<Vec<_>>().join(", ");
    profiles.remove(section).ok_or_else(|| {
        Error::config(format!(
            "Section '{section}' not found in '{}'. Available: {available}",
            path.display()
        ))
    })
}
