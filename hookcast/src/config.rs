//! Dispatcher Configuration
//!
//! Timing policy for delivery attempts, loaded from environment variables or
//! built in code.

use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Default delay between a failed send and the next attempt (seconds).
pub const DEFAULT_COOLDOWN_SECS: u64 = 60;

/// Default window after dispatch during which retries continue (seconds).
pub const DEFAULT_RETRY_SECS: u64 = 3600;

/// Default upper bound on a single send (seconds).
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = 30;

/// Decides which responses count as a delivered webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuccessPolicy {
    /// Any response counts, whatever its status code.
    #[default]
    AnyResponse,
    /// Only 2xx responses count; everything else is retried.
    RequireSuccessStatus,
}

impl SuccessPolicy {
    /// Parse from the env form (`"any"` or `"2xx"`).
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Some(Self::AnyResponse),
            "2xx" => Some(Self::RequireSuccessStatus),
            _ => None,
        }
    }

    /// Whether a response with this status code ends the attempt.
    pub const fn accepts(&self, status: u16) -> bool {
        match self {
            Self::AnyResponse => true,
            Self::RequireSuccessStatus => matches!(status, 200..=299),
        }
    }
}

/// Engine-wide delivery settings shared by every attempt.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Wait after a failed send before checking the window again
    pub cooldown_time: Duration,

    /// Total time after dispatch during which retries are still started
    pub retry_time: Duration,

    /// Upper bound on a single send; `None` waits on the transport forever
    pub send_timeout: Option<Duration>,

    /// Which responses end an attempt as delivered
    pub success_policy: SuccessPolicy,

    /// User-Agent sent by the HTTP transport
    pub user_agent: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            cooldown_time: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
            retry_time: Duration::from_secs(DEFAULT_RETRY_SECS),
            send_timeout: Some(Duration::from_secs(DEFAULT_SEND_TIMEOUT_SECS)),
            success_policy: SuccessPolicy::AnyResponse,
            user_agent: concat!("hookcast/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl DispatcherConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `WEBHOOK_COOLDOWN_SECS`: delay between retries (default: 60)
    /// - `WEBHOOK_RETRY_SECS`: retry window from dispatch (default: 3600)
    /// - `WEBHOOK_SEND_TIMEOUT_SECS`: per-send timeout, `0` disables it (default: 30)
    /// - `WEBHOOK_SUCCESS_POLICY`: `any` or `2xx` (default: any)
    /// - `WEBHOOK_USER_AGENT`: User-Agent header (default: `hookcast/<version>`)
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(secs) = env_secs("WEBHOOK_COOLDOWN_SECS")? {
            config.cooldown_time = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs("WEBHOOK_RETRY_SECS")? {
            config.retry_time = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs("WEBHOOK_SEND_TIMEOUT_SECS")? {
            config.send_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Ok(val) = env::var("WEBHOOK_SUCCESS_POLICY") {
            config.success_policy = SuccessPolicy::parse_str(&val).with_context(|| {
                format!("WEBHOOK_SUCCESS_POLICY must be `any` or `2xx`, got {val:?}")
            })?;
        }
        if let Ok(val) = env::var("WEBHOOK_USER_AGENT") {
            config.user_agent = val;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings under which the retry loop makes no sense.
    pub fn validate(&self) -> Result<()> {
        if self.cooldown_time.is_zero() {
            bail!("cooldown time must be greater than zero");
        }
        if self.retry_time.is_zero() {
            bail!("retry time must be greater than zero");
        }
        Ok(())
    }

    /// Short window for tests: 1s cooldown, 5s retry window, 2s send timeout.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            cooldown_time: Duration::from_secs(1),
            retry_time: Duration::from_secs(5),
            send_timeout: Some(Duration::from_secs(2)),
            ..Self::default()
        }
    }
}

fn env_secs(key: &str) -> Result<Option<u64>> {
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{key} must be a whole number of seconds, got {val:?}")),
        Err(_) => Ok(None),
    }
}
