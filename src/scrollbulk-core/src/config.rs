use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ClientError, Result};

/// Statuses the search engine uses for overload and gateway trouble.
pub const DEFAULT_RETRY_ON_STATUS: [u16; 4] = [429, 502, 503, 504];

/// Delay before retry number `attempt`.
///
/// The default is `2^attempt` seconds with no jitter, so a given attempt
/// always waits the same amount of time.
#[derive(Clone)]
pub struct Backoff(Arc<dyn Fn(u32) -> Duration + Send + Sync>);

impl Backoff {
    pub fn exponential() -> Self {
        Self::custom(exponential_delay)
    }

    /// Exponential backoff clamped to `max`. Use this when the retry budget
    /// is raised well above the default.
    pub fn capped(max: Duration) -> Self {
        Self::custom(move |attempt| exponential_delay(attempt).min(max))
    }

    pub fn custom(delay: impl Fn(u32) -> Duration + Send + Sync + 'static) -> Self {
        Self(Arc::new(delay))
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        (self.0)(attempt)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::exponential()
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Backoff(..)")
    }
}

pub fn exponential_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt))
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,

    // Retry policy
    #[serde(default = "default_retry_on_status")]
    pub retry_on_status: Vec<u16>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(skip)]
    pub backoff: Backoff,

    /// Per-request timeout handed to the HTTP client
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub scroll: ScrollSettings,
}

fn default_retry_on_status() -> Vec<u16> {
    DEFAULT_RETRY_ON_STATUS.to_vec()
}

fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScrollSettings {
    /// Hits requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Keep-alive of the opening search, before the counter offset
    #[serde(default = "default_open_keep_alive_ms")]
    pub open_keep_alive_ms: u64,

    /// Keep-alive of each continuation, before the counter offset
    #[serde(default = "default_continue_keep_alive_ms")]
    pub continue_keep_alive_ms: u64,

    /// Pause between delivered pages
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
}

fn default_page_size() -> usize {
    9000
}

fn default_open_keep_alive_ms() -> u64 {
    10 * 60 * 1000
}

fn default_continue_keep_alive_ms() -> u64 {
    2 * 60 * 1000
}

fn default_step_delay_ms() -> u64 {
    500
}

impl ScrollSettings {
    pub fn open_keep_alive(&self) -> Duration {
        Duration::from_millis(self.open_keep_alive_ms)
    }

    pub fn continue_keep_alive(&self) -> Duration {
        Duration::from_millis(self.continue_keep_alive_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            open_keep_alive_ms: default_open_keep_alive_ms(),
            continue_keep_alive_ms: default_continue_keep_alive_ms(),
            step_delay_ms: default_step_delay_ms(),
        }
    }
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Checks that don't need the network. Scheme and host parsing is left
    /// to the transport.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(ClientError::Connection("url must not be empty".to_string()));
        }

        if let Some(status) = self
            .retry_on_status
            .iter()
            .find(|status| !(100..=599).contains(*status))
        {
            return Err(ClientError::Connection(format!(
                "retry_on_status contains invalid HTTP status {}",
                status
            )));
        }

        if self.scroll.page_size == 0 {
            return Err(ClientError::Connection(
                "scroll.page_size must be at least 1".to_string(),
            ));
        }

        if self.timeout_ms == Some(0) {
            return Err(ClientError::Connection(
                "timeout_ms must be at least 1 when set".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            username: String::new(),
            password: String::new(),
            retry_on_status: default_retry_on_status(),
            max_retries: default_max_retries(),
            backoff: Backoff::default(),
            timeout_ms: None,
            scroll: ScrollSettings::default(),
        }
    }
}
