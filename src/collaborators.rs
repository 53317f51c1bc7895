//! External collaborator interfaces consumed by node executors.
//!
//! The engine never owns message delivery or third-party APIs; it talks to
//! them through these narrow capability traits. Production wiring uses
//! [`HttpIntegrationClient`] (reqwest) and whatever notification transport
//! the host system provides; tests inject recording fakes.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::model::WorkflowIntegration;
use crate::types::HttpMethod;

/// Delivery channel of an outbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Sms,
    Webhook,
    InApp,
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Webhook => "webhook",
            Self::InApp => "in_app",
        };
        write!(f, "{label}")
    }
}

/// Result of one delivery attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub delivered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryReceipt {
    #[must_use]
    pub fn delivered() -> Self {
        Self {
            delivered: true,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            delivered: false,
            error: Some(error.into()),
        }
    }
}

/// Outbound message delivery, consumed by approval and notification nodes.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(
        &self,
        channel: NotificationChannel,
        recipients: &[String],
        subject: Option<&str>,
        body: &str,
    ) -> DeliveryReceipt;
}

/// Sender that only records the attempt in the trace log. The default when
/// the host system wires no real transport; also handy in examples.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotificationSender;

#[async_trait]
impl NotificationSender for TracingNotificationSender {
    async fn send(
        &self,
        channel: NotificationChannel,
        recipients: &[String],
        subject: Option<&str>,
        body: &str,
    ) -> DeliveryReceipt {
        tracing::info!(
            %channel,
            recipients = recipients.len(),
            subject = subject.unwrap_or(""),
            body_len = body.len(),
            "notification dispatched (tracing sender)"
        );
        DeliveryReceipt::delivered()
    }
}

/// Response of an integration call. `status == 0` never occurs; transport
/// failures surface as [`IntegrationError`] instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntegrationResponse {
    pub status: u16,
    pub body: Value,
}

impl IntegrationResponse {
    /// Client and server error classes count as failure; redirects that the
    /// HTTP client did not follow are treated as success-adjacent.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (100..400).contains(&self.status)
    }
}

/// Transport-level failure of an integration call.
#[derive(Debug, Error, Diagnostic)]
pub enum IntegrationError {
    #[error("integration transport error: {0}")]
    #[diagnostic(code(flowloom::collaborators::transport))]
    Transport(String),

    #[error("invalid integration request: {0}")]
    #[diagnostic(code(flowloom::collaborators::request))]
    InvalidRequest(String),
}

/// Outbound calls to external systems, consumed by integration nodes and
/// http task operations.
#[async_trait]
pub trait IntegrationClient: Send + Sync {
    /// Performs a call against a configured integration. Auth material and
    /// default headers of the integration apply; `headers` overlay them.
    async fn call(
        &self,
        integration: &WorkflowIntegration,
        method: HttpMethod,
        path: &str,
        headers: &FxHashMap<String, String>,
        payload: &Value,
    ) -> Result<IntegrationResponse, IntegrationError>;

    /// Plain request to an absolute URL, used by http task operations.
    async fn fetch(
        &self,
        method: HttpMethod,
        url: &str,
    ) -> Result<IntegrationResponse, IntegrationError>;
}

/// reqwest-backed [`IntegrationClient`].
#[derive(Clone)]
pub struct HttpIntegrationClient {
    client: reqwest::Client,
}

impl HttpIntegrationClient {
    /// Builds the client with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, IntegrationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IntegrationError::InvalidRequest(e.to_string()))?;
        Ok(Self { client })
    }

    fn request(&self, method: HttpMethod, url: &str) -> reqwest::RequestBuilder {
        let method = match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };
        self.client.request(method, url)
    }

    async fn finish(request: reqwest::RequestBuilder) -> Result<IntegrationResponse, IntegrationError> {
        let response = request
            .send()
            .await
            .map_err(|e| IntegrationError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| IntegrationError::Transport(e.to_string()))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(IntegrationResponse { status, body })
    }
}

#[async_trait]
impl IntegrationClient for HttpIntegrationClient {
    async fn call(
        &self,
        integration: &WorkflowIntegration,
        method: HttpMethod,
        path: &str,
        headers: &FxHashMap<String, String>,
        payload: &Value,
    ) -> Result<IntegrationResponse, IntegrationError> {
        let url = integration.url_for(path);
        let mut request = self.request(method, &url);
        for (name, value) in &integration.default_headers {
            request = request.header(name, value);
        }
        if let Some(auth) = &integration.auth {
            request = request.header(&auth.header, &auth.token);
        }
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if method != HttpMethod::Get && !payload.is_null() {
            request = request.json(payload);
        }
        tracing::debug!(%url, %method, "calling integration endpoint");
        Self::finish(request).await
    }

    async fn fetch(
        &self,
        method: HttpMethod,
        url: &str,
    ) -> Result<IntegrationResponse, IntegrationError> {
        tracing::debug!(%url, %method, "fetching url");
        Self::finish(self.request(method, url)).await
    }
}
