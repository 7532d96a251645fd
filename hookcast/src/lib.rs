//! `hookcast` Webhook Dispatcher
//!
//! Fans a named event out to every registered recipient URL as a form-encoded
//! HTTP POST. Failed deliveries are retried on a fixed cooldown until a retry
//! window measured from dispatch time elapses, then dropped silently.

pub mod config;
pub mod webhooks;

pub use config::{DispatcherConfig, SuccessPolicy};
pub use webhooks::{
    DeliveryError, DeliveryReport, DeliveryRequest, DispatchReceipt, Dispatcher, Fields,
    HttpTransport, Payload, Recipient, RecipientRegistry, Transport, TransportResponse,
};
