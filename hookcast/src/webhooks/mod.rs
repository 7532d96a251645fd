//! Webhook Fan-out
//!
//! Form-encoded HTTP POST delivery of named events to registered recipients,
//! with fixed-cooldown retries bounded by a window from dispatch time.

pub mod delivery;
pub mod dispatch;
pub mod payload;
pub mod registry;
pub mod transport;
pub mod types;

pub use dispatch::Dispatcher;
pub use payload::{Fields, Payload};
pub use registry::RecipientRegistry;
pub use transport::{DeliveryRequest, HttpTransport, Transport, TransportResponse};
pub use types::{DeliveryError, DeliveryReport, DispatchReceipt, Recipient};
