//! Webhook Types
//!
//! Recipients, delivery errors, and the optional outcome reports.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A registered delivery target. Opaque: the URL is never validated on add.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recipient(String);

impl Recipient {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Recipient {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for Recipient {
    fn from(url: String) -> Self {
        Self(url)
    }
}

/// Returned by a dispatch. Says how many attempts were started, never whether
/// any of them will be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub dispatch_id: Uuid,
    pub attempts: usize,
    pub dispatched_at: DateTime<Utc>,
}

/// Why a single send did not count as a delivery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Invalid recipient URL: {0}")]
    InvalidUrl(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Send timed out after {0:?}")]
    Timeout(Duration),
    #[error("Rejected with HTTP {0}")]
    RejectedStatus(u16),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Outcome notifications emitted to an optional subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryReport {
    /// A send failed; the attempt will cool down and re-check its window.
    Failed {
        dispatch_id: Uuid,
        recipient: Recipient,
        send: u32,
        error: DeliveryError,
    },
    /// The attempt ended with an accepted response.
    Delivered {
        dispatch_id: Uuid,
        recipient: Recipient,
        sends: u32,
        status: u16,
    },
    /// The retry window closed before a delivery succeeded.
    Expired {
        dispatch_id: Uuid,
        recipient: Recipient,
        sends: u32,
        last_error: Option<DeliveryError>,
    },
}

impl DeliveryReport {
    pub const fn dispatch_id(&self) -> Uuid {
        match self {
            Self::Failed { dispatch_id, .. }
            | Self::Delivered { dispatch_id, .. }
            | Self::Expired { dispatch_id, .. } => *dispatch_id,
        }
    }

    pub const fn recipient(&self) -> &Recipient {
        match self {
            Self::Failed { recipient, .. }
            | Self::Delivered { recipient, .. }
            | Self::Expired { recipient, .. } => recipient,
        }
    }

    /// Whether this report ends the attempt.
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}
