//! Recording fakes for the collaborator traits.

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::{Value, json};
use std::sync::Mutex;

use flowloom::collaborators::{
    DeliveryReceipt, IntegrationClient, IntegrationError, IntegrationResponse,
    NotificationChannel, NotificationSender,
};
use flowloom::model::WorkflowIntegration;
use flowloom::types::HttpMethod;

/// One message handed to the fake sender.
#[derive(Clone, Debug)]
pub struct SentMessage {
    pub channel: NotificationChannel,
    pub recipients: Vec<String>,
    pub subject: Option<String>,
    pub body: String,
}

/// Notification sender that records every attempt and can be switched into
/// a failing mode.
#[derive(Default)]
pub struct RecordingNotificationSender {
    pub sent: Mutex<Vec<SentMessage>>,
    pub fail_with: Mutex<Option<String>>,
}

impl RecordingNotificationSender {
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn fail_next(&self, error: &str) {
        *self.fail_with.lock().unwrap() = Some(error.to_string());
    }
}

#[async_trait]
impl NotificationSender for RecordingNotificationSender {
    async fn send(
        &self,
        channel: NotificationChannel,
        recipients: &[String],
        subject: Option<&str>,
        body: &str,
    ) -> DeliveryReceipt {
        self.sent.lock().unwrap().push(SentMessage {
            channel,
            recipients: recipients.to_vec(),
            subject: subject.map(ToString::to_string),
            body: body.to_string(),
        });
        match self.fail_with.lock().unwrap().take() {
            Some(error) => DeliveryReceipt::failed(error),
            None => DeliveryReceipt::delivered(),
        }
    }
}

/// What the fake integration client should answer with.
#[derive(Clone, Debug)]
pub enum FakeAnswer {
    Ok(u16, Value),
    Unreachable,
}

/// One recorded outbound call.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub url: String,
    pub method: HttpMethod,
    pub payload: Value,
}

/// Integration client that records calls and replays a configured answer.
pub struct FakeIntegrationClient {
    pub calls: Mutex<Vec<RecordedCall>>,
    pub answer: Mutex<FakeAnswer>,
}

impl Default for FakeIntegrationClient {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            answer: Mutex::new(FakeAnswer::Ok(200, json!({"ok": true}))),
        }
    }
}

impl FakeIntegrationClient {
    pub fn answer_with(&self, answer: FakeAnswer) {
        *self.answer.lock().unwrap() = answer;
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.lock().unwrap().last().cloned()
    }

    fn respond(&self) -> Result<IntegrationResponse, IntegrationError> {
        match self.answer.lock().unwrap().clone() {
            FakeAnswer::Ok(status, body) => Ok(IntegrationResponse { status, body }),
            FakeAnswer::Unreachable => {
                Err(IntegrationError::Transport("connection refused".into()))
            }
        }
    }
}

#[async_trait]
impl IntegrationClient for FakeIntegrationClient {
    async fn call(
        &self,
        integration: &WorkflowIntegration,
        method: HttpMethod,
        path: &str,
        _headers: &FxHashMap<String, String>,
        payload: &Value,
    ) -> Result<IntegrationResponse, IntegrationError> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: integration.url_for(path),
            method,
            payload: payload.clone(),
        });
        self.respond()
    }

    async fn fetch(
        &self,
        method: HttpMethod,
        url: &str,
    ) -> Result<IntegrationResponse, IntegrationError> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            method,
            payload: Value::Null,
        });
        self.respond()
    }
}
