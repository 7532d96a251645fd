//! Webhook Delivery Attempts
//!
//! One task per (dispatch, recipient). Each task loops:
//! - check the retry window against the dispatch time, drop if it has closed;
//! - send once;
//! - on failure, sleep out the cooldown and go around again.
//!
//! The window is checked before every send only. A send already in flight when
//! the window closes still counts if it succeeds.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::payload::Payload;
use super::transport::{DeliveryRequest, Transport};
use super::types::{DeliveryError, DeliveryReport, Recipient};
use crate::config::DispatcherConfig;

/// Retry state for one recipient of one dispatch.
#[derive(Debug, Clone)]
pub struct DeliveryAttempt {
    pub dispatch_id: Uuid,
    pub recipient: Recipient,
    pub payload: Arc<Payload>,
    /// Dispatch time. Never refreshed on retry.
    pub ctime: Instant,
}

impl DeliveryAttempt {
    /// Whether the retry window measured from `ctime` has closed at `now`.
    /// A window too large to represent as an instant never closes.
    pub fn window_closed(&self, retry_time: std::time::Duration, now: Instant) -> bool {
        self.ctime
            .checked_add(retry_time)
            .is_some_and(|deadline| now >= deadline)
    }
}

/// Fans outcome reports out to whoever subscribed. Empty by default.
#[derive(Debug, Default)]
pub struct ReportSink {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<DeliveryReport>>>,
}

impl ReportSink {
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<DeliveryReport> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Deliver to every live subscriber; closed receivers are forgotten.
    pub fn emit(&self, report: DeliveryReport) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if subscribers.is_empty() {
            return;
        }
        subscribers.retain(|tx| tx.send(report.clone()).is_ok());
    }
}

/// Everything an attempt task needs besides its own state.
#[derive(Debug)]
pub struct DeliveryContext<T> {
    pub transport: Arc<T>,
    pub config: DispatcherConfig,
    pub reports: ReportSink,
}

/// Drive one attempt until it is delivered or its window closes.
pub async fn run_attempt<T: Transport>(ctx: Arc<DeliveryContext<T>>, attempt: DeliveryAttempt) {
    let request = DeliveryRequest::form(&attempt.recipient, &attempt.payload);
    let mut sends: u32 = 0;
    let mut last_error: Option<DeliveryError> = None;

    loop {
        if attempt.window_closed(ctx.config.retry_time, Instant::now()) {
            info!(
                dispatch_id = %attempt.dispatch_id,
                recipient = %attempt.recipient,
                sends,
                "Webhook retry window elapsed, dropping delivery"
            );
            ctx.reports.emit(DeliveryReport::Expired {
                dispatch_id: attempt.dispatch_id,
                recipient: attempt.recipient.clone(),
                sends,
                last_error,
            });
            return;
        }

        sends += 1;
        match send_once(ctx.transport.as_ref(), &ctx.config, &request).await {
            Ok(status) => {
                debug!(
                    dispatch_id = %attempt.dispatch_id,
                    recipient = %attempt.recipient,
                    send = sends,
                    status,
                    "Webhook delivered"
                );
                ctx.reports.emit(DeliveryReport::Delivered {
                    dispatch_id: attempt.dispatch_id,
                    recipient: attempt.recipient.clone(),
                    sends,
                    status,
                });
                return;
            }
            Err(error) => {
                warn!(
                    dispatch_id = %attempt.dispatch_id,
                    recipient = %attempt.recipient,
                    send = sends,
                    error = %error,
                    retry_in_secs = ctx.config.cooldown_time.as_secs(),
                    "Webhook delivery failed"
                );
                ctx.reports.emit(DeliveryReport::Failed {
                    dispatch_id: attempt.dispatch_id,
                    recipient: attempt.recipient.clone(),
                    send: sends,
                    error: error.clone(),
                });
                last_error = Some(error);
            }
        }

        tokio::time::sleep(ctx.config.cooldown_time).await;
    }
}

/// One send, bounded by the configured timeout and judged by the success
/// policy. Returns the status of an accepted response.
async fn send_once<T: Transport>(
    transport: &T,
    config: &DispatcherConfig,
    request: &DeliveryRequest,
) -> Result<u16, DeliveryError> {
    let response = match config.send_timeout {
        Some(limit) => tokio::time::timeout(limit, transport.post(request))
            .await
            .map_err(|_| DeliveryError::Timeout(limit))??,
        None => transport.post(request).await?,
    };

    if config.success_policy.accepts(response.status) {
        Ok(response.status)
    } else {
        Err(DeliveryError::RejectedStatus(response.status))
    }
}
