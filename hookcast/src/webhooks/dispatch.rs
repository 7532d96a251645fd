//! Webhook Event Dispatch
//!
//! Non-blocking entry point: snapshot the recipients, build one payload, and
//! spawn one delivery attempt per recipient.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::task::TaskTracker;
use tracing::debug;
use uuid::Uuid;

use super::delivery::{self, DeliveryAttempt, DeliveryContext, ReportSink};
use super::payload::{Fields, Payload};
use super::registry::RecipientRegistry;
use super::transport::{HttpTransport, Transport};
use super::types::{DeliveryReport, DispatchReceipt, Recipient};
use crate::config::DispatcherConfig;

/// Best-effort webhook fan-out.
///
/// Dispatching never waits on the network and never reports delivery results
/// to the caller. Attempts are spawned onto the current Tokio runtime, so
/// [`Dispatcher::dispatch`] must be called from within one.
#[derive(Debug)]
pub struct Dispatcher<T: Transport = HttpTransport> {
    registry: RecipientRegistry,
    ctx: Arc<DeliveryContext<T>>,
    tracker: TaskTracker,
}

impl Dispatcher<HttpTransport> {
    /// Dispatcher posting over HTTP with a `reqwest` client built from `config`.
    pub fn with_http(config: DispatcherConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config).context("Failed to build HTTP client")?;
        Self::try_new(config, transport)
    }
}

impl<T: Transport> Dispatcher<T> {
    /// Dispatcher over `transport`, rejecting a config that fails
    /// [`DispatcherConfig::validate`].
    pub fn try_new(config: DispatcherConfig, transport: T) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config, transport))
    }

    /// Dispatcher over `transport`. `config` must pass
    /// [`DispatcherConfig::validate`]; use [`Dispatcher::try_new`] for
    /// untrusted settings.
    pub fn new(config: DispatcherConfig, transport: T) -> Self {
        debug_assert!(
            config.validate().is_ok(),
            "invalid dispatcher config: {config:?}"
        );
        Self {
            registry: RecipientRegistry::new(),
            ctx: Arc::new(DeliveryContext {
                transport: Arc::new(transport),
                config,
                reports: ReportSink::default(),
            }),
            tracker: TaskTracker::new(),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.ctx.config
    }

    pub fn transport(&self) -> &T {
        &self.ctx.transport
    }

    /// Register a recipient for all future dispatches.
    pub fn add_recipient(&self, recipient: impl Into<Recipient>) {
        self.registry.add(recipient);
    }

    /// Currently registered recipients, in registration order.
    pub fn recipients(&self) -> Vec<Recipient> {
        self.registry.snapshot()
    }

    /// Dispatch `event` with `args` to every registered recipient.
    pub fn dispatch<A>(&self, event: &str, args: A) -> DispatchReceipt
    where
        A: IntoIterator,
        A::Item: Into<(String, String)>,
    {
        self.dispatch_with_fields(event, args, Fields::new())
    }

    /// Like [`Dispatcher::dispatch`], with extra fields merged in after
    /// `event` and before `args`.
    pub fn dispatch_with_fields<A, E>(&self, event: &str, args: A, extra: E) -> DispatchReceipt
    where
        A: IntoIterator,
        A::Item: Into<(String, String)>,
        E: IntoIterator,
        E::Item: Into<(String, String)>,
    {
        let payload = Arc::new(Payload::build(event, extra, args));
        let recipients = self.registry.snapshot();
        let ctime = Instant::now();
        let receipt = DispatchReceipt {
            dispatch_id: Uuid::now_v7(),
            attempts: recipients.len(),
            dispatched_at: chrono::Utc::now(),
        };

        debug!(
            dispatch_id = %receipt.dispatch_id,
            event = %event,
            recipients = recipients.len(),
            "Dispatching webhook event"
        );

        for recipient in recipients {
            let attempt = DeliveryAttempt {
                dispatch_id: receipt.dispatch_id,
                recipient,
                payload: Arc::clone(&payload),
                ctime,
            };
            self.tracker
                .spawn(delivery::run_attempt(Arc::clone(&self.ctx), attempt));
        }

        receipt
    }

    /// Receive a [`DeliveryReport`] for every failed send and every finished
    /// attempt from now on. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<DeliveryReport> {
        self.ctx.reports.subscribe()
    }

    /// Number of attempts still retrying or sending.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until no attempt is running, including attempts spawned by other
    /// tasks while this call waits. Cancels nothing.
    ///
    /// Meant for one caller at a time (shutdown, tests). Concurrent callers
    /// share the tracker, so the first to return reopens it for all.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhooks::transport::{DeliveryRequest, TransportResponse};
    use crate::webhooks::types::DeliveryError;

    #[derive(Debug)]
    struct AlwaysOk;

    impl Transport for AlwaysOk {
        async fn post(
            &self,
            _request: &DeliveryRequest,
        ) -> Result<TransportResponse, DeliveryError> {
            Ok(TransportResponse { status: 200 })
        }
    }

    #[tokio::test]
    async fn receipt_counts_snapshot_recipients() {
        let dispatcher = Dispatcher::new(DispatcherConfig::default_for_test(), AlwaysOk);
        dispatcher.add_recipient("https://a.example/hook");
        dispatcher.add_recipient("https://b.example/hook");

        let receipt = dispatcher.dispatch("org.example.ping", Fields::new());
        assert_eq!(receipt.attempts, 2);

        dispatcher.wait_idle().await;
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn dispatch_ids_are_unique() {
        let dispatcher = Dispatcher::new(DispatcherConfig::default_for_test(), AlwaysOk);
        let a = dispatcher.dispatch("org.example.ping", Fields::new());
        let b = dispatcher.dispatch("org.example.ping", Fields::new());
        assert_ne!(a.dispatch_id, b.dispatch_id);
        assert_eq!(a.attempts, 0);
    }

    #[test]
    fn try_new_rejects_zero_cooldown() {
        let config = DispatcherConfig {
            cooldown_time: std::time::Duration::ZERO,
            ..DispatcherConfig::default()
        };
        let err = Dispatcher::try_new(config, AlwaysOk).unwrap_err();
        assert!(err.to_string().contains("cooldown"));
    }

    #[test]
    fn try_new_accepts_valid_config() {
        let dispatcher = Dispatcher::try_new(DispatcherConfig::default_for_test(), AlwaysOk);
        assert!(dispatcher.is_ok());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "invalid dispatcher config")]
    fn new_panics_on_zero_window_in_debug() {
        let config = DispatcherConfig {
            retry_time: std::time::Duration::ZERO,
            ..DispatcherConfig::default()
        };
        let _ = Dispatcher::new(config, AlwaysOk);
    }

    #[test]
    fn with_http_rejects_invalid_config() {
        let config = DispatcherConfig {
            retry_time: std::time::Duration::ZERO,
            ..DispatcherConfig::default()
        };
        assert!(Dispatcher::with_http(config).is_err());
    }
}
