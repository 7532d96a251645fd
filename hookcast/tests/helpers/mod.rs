//! Reusable test helpers for delivery integration tests.
//!
//! Provides [`RecordingTransport`], an in-process transport whose behavior is
//! scripted per recipient URL and which records every send with the (paused)
//! Tokio clock.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Mutex, Once};
use std::time::Duration;

use hookcast::{DeliveryError, DeliveryRequest, Transport, TransportResponse};
use tokio::time::Instant;

/// How a scripted recipient answers.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Respond with this status every time.
    Respond(u16),
    /// Fail at the transport level every time.
    Refuse,
    /// Fail this many times, then respond 200.
    FailTimes(u32),
    /// Respond with this status after a delay.
    SlowRespond(Duration, u16),
    /// Fail at the transport level after a delay.
    SlowRefuse(Duration),
    /// Never resolve.
    Hang,
}

/// One observed send.
#[derive(Debug, Clone)]
pub struct Sent {
    pub at: Instant,
    pub request: DeliveryRequest,
}

#[derive(Default)]
pub struct RecordingTransport {
    behaviors: Mutex<HashMap<String, Behavior>>,
    failures: Mutex<HashMap<String, u32>>,
    sent: Mutex<Vec<Sent>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script `url`. Unscripted URLs respond 200.
    pub fn script(self, url: &str, behavior: Behavior) -> Self {
        self.behaviors
            .lock()
            .unwrap()
            .insert(url.to_string(), behavior);
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, url: &str) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|s| s.request.url == url)
            .collect()
    }

    /// Offsets of every send to `url`, in whole seconds from `start`.
    pub fn offsets_secs(&self, url: &str, start: Instant) -> Vec<u64> {
        self.sent_to(url)
            .iter()
            .map(|s| (s.at - start).as_secs())
            .collect()
    }

    fn behavior(&self, url: &str) -> Behavior {
        self.behaviors
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or(Behavior::Respond(200))
    }

    fn fail_times(&self, url: &str, n: u32) -> Result<TransportResponse, DeliveryError> {
        let mut failures = self.failures.lock().unwrap();
        let seen = failures.entry(url.to_string()).or_insert(0);
        if *seen < n {
            *seen += 1;
            Err(refused())
        } else {
            Ok(TransportResponse { status: 200 })
        }
    }
}

impl Transport for RecordingTransport {
    async fn post(&self, request: &DeliveryRequest) -> Result<TransportResponse, DeliveryError> {
        self.sent.lock().unwrap().push(Sent {
            at: Instant::now(),
            request: request.clone(),
        });

        match self.behavior(&request.url) {
            Behavior::Respond(status) => Ok(TransportResponse { status }),
            Behavior::Refuse => Err(refused()),
            Behavior::FailTimes(n) => self.fail_times(&request.url, n),
            Behavior::SlowRespond(delay, status) => {
                tokio::time::sleep(delay).await;
                Ok(TransportResponse { status })
            }
            Behavior::SlowRefuse(delay) => {
                tokio::time::sleep(delay).await;
                Err(refused())
            }
            Behavior::Hang => std::future::pending().await,
        }
    }
}

pub fn refused() -> DeliveryError {
    DeliveryError::Transport("connection refused".into())
}

/// Let spawned attempts run until they park on a timer.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Install a test-writer subscriber once per binary. `RUST_LOG` controls it.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "hookcast=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}
