//! Client configuration loaded from environment variables.
//!
//! All settings have defaults so the client can start with zero
//! configuration against a local development backend.

use std::path::PathBuf;
use std::time::Duration;

use studyhub_shared::constants::{
    COMMENT_POLL_SECS, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT_SECS, GUEST_NAME,
};
use studyhub_shared::UserId;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST backend, without a trailing slash.
    /// Env: `STUDYHUB_API_URL`
    pub api_url: String,

    /// Per-request timeout. Expiry is reported as a retryable failure.
    /// Env: `STUDYHUB_TIMEOUT_SECS`
    pub request_timeout: Duration,

    /// How often an open comment thread is refreshed.
    /// Env: `STUDYHUB_COMMENT_POLL_SECS`
    pub comment_poll_interval: Duration,

    /// Logged-in user; `None` (or `0` in the environment) means anonymous.
    /// Env: `STUDYHUB_USER_ID`
    pub user_id: Option<UserId>,

    /// Env: `STUDYHUB_USER_NAME`
    pub user_name: String,

    /// Local database file. Defaults to the platform data directory.
    /// Env: `STUDYHUB_DB_PATH`
    pub db_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            comment_poll_interval: Duration::from_secs(COMMENT_POLL_SECS),
            user_id: None,
            user_name: GUEST_NAME.to_string(),
            db_path: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("STUDYHUB_API_URL") {
            let url = url.trim().trim_end_matches('/');
            if url.starts_with("http://") || url.starts_with("https://") {
                config.api_url = url.to_string();
            } else {
                tracing::warn!(value = %url, "Invalid STUDYHUB_API_URL, using default");
            }
        }

        if let Some(secs) = lookup("STUDYHUB_TIMEOUT_SECS") {
            match parse_secs(&secs) {
                Some(d) => config.request_timeout = d,
                None => tracing::warn!(value = %secs, "Invalid STUDYHUB_TIMEOUT_SECS, using default"),
            }
        }

        if let Some(secs) = lookup("STUDYHUB_COMMENT_POLL_SECS") {
            match parse_secs(&secs) {
                Some(d) => config.comment_poll_interval = d,
                None => tracing::warn!(
                    value = %secs,
                    "Invalid STUDYHUB_COMMENT_POLL_SECS, using default"
                ),
            }
        }

        if let Some(id) = lookup("STUDYHUB_USER_ID") {
            match id.parse::<UserId>() {
                Ok(user) if !user.is_anonymous() => config.user_id = Some(user),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Invalid STUDYHUB_USER_ID, staying anonymous"),
            }
        }

        if let Some(name) = lookup("STUDYHUB_USER_NAME") {
            if !name.trim().is_empty() {
                config.user_name = name.trim().to_string();
            }
        }

        if let Some(path) = lookup("STUDYHUB_DB_PATH") {
            config.db_path = Some(PathBuf::from(path));
        }

        config
    }
}

// Zero would disable the timeout / spin the poller.
fn parse_secs(s: &str) -> Option<Duration> {
    match s.trim().parse::<u64>() {
        Ok(n) if n > 0 => Some(Duration::from_secs(n)),
        _ => None,
    }
}
