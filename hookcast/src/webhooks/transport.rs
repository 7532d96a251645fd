//! HTTP Transport
//!
//! The single POST-and-await operation the delivery engine depends on, and its
//! `reqwest` implementation.

use std::future::Future;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};

use super::payload::{Payload, FORM_CONTENT_TYPE};
use super::types::{DeliveryError, Recipient};
use crate::config::DispatcherConfig;

/// One fully-built POST: target URL, headers and form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
    pub url: String,
    pub headers: Vec<(HeaderName, String)>,
    pub body: String,
}

impl DeliveryRequest {
    /// Form-encode `payload` for `recipient` with explicit content headers.
    pub fn form(recipient: &Recipient, payload: &Payload) -> Self {
        let body = payload.encode();
        Self {
            url: recipient.as_str().to_string(),
            headers: vec![
                (CONTENT_TYPE, FORM_CONTENT_TYPE.to_string()),
                (CONTENT_LENGTH, body.len().to_string()),
            ],
            body,
        }
    }

    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// What the engine learns from a completed send. The body is never read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
}

/// Sends one request and resolves once a response arrives or the send fails.
pub trait Transport: Send + Sync + 'static {
    fn post(
        &self,
        request: &DeliveryRequest,
    ) -> impl Future<Output = Result<TransportResponse, DeliveryError>> + Send;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &DispatcherConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client (shared connection pool, custom TLS, proxies).
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    async fn post(&self, request: &DeliveryRequest) -> Result<TransportResponse, DeliveryError> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| DeliveryError::InvalidUrl(format!("{}: {e}", request.url)))?;

        let mut headers = HeaderMap::with_capacity(request.headers.len());
        for (name, value) in &request.headers {
            let value = HeaderValue::from_str(value)
                .map_err(|e| DeliveryError::Transport(format!("invalid {name} header: {e}")))?;
            headers.insert(name.clone(), value);
        }

        let response = self
            .client
            .post(url)
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await?;

        Ok(TransportResponse {
            status: response.status().as_u16(),
        })
    }
}
