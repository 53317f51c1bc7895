//! Descriptors of external endpoints referenced by integration nodes.
//!
//! Integrations are managed independently of workflows; a node config only
//! stores the integration id and the store resolves it at execution time.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::types::IntegrationId;

/// Transport class of an integration endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationType {
    Api,
    Webhook,
    Email,
    Sms,
}

impl fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Api => "api",
            Self::Webhook => "webhook",
            Self::Email => "email",
            Self::Sms => "sms",
        };
        write!(f, "{label}")
    }
}

/// Credential material attached to outbound calls as a request header.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntegrationAuth {
    /// Header name, e.g. `Authorization`.
    pub header: String,
    /// Header value, e.g. `Bearer <token>`.
    pub token: String,
}

/// An external endpoint a workflow can call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowIntegration {
    pub id: IntegrationId,
    pub name: String,
    pub integration_type: IntegrationType,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<IntegrationAuth>,
    #[serde(default)]
    pub default_headers: FxHashMap<String, String>,
    #[serde(default)]
    pub config: Value,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl WorkflowIntegration {
    pub fn new(
        name: impl Into<String>,
        integration_type: IntegrationType,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            integration_type,
            base_url: base_url.into(),
            auth: None,
            default_headers: FxHashMap::default(),
            config: Value::Null,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_auth(mut self, header: impl Into<String>, token: impl Into<String>) -> Self {
        self.auth = Some(IntegrationAuth {
            header: header.into(),
            token: token.into(),
        });
        self
    }

    /// Joins the base URL and a request path without doubling slashes.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        if path.is_empty() {
            return self.base_url.clone();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_join_handles_slashes() {
        let integration =
            WorkflowIntegration::new("crm", IntegrationType::Api, "https://crm.example.com/");
        assert_eq!(
            integration.url_for("/contacts"),
            "https://crm.example.com/contacts"
        );
        assert_eq!(integration.url_for(""), "https://crm.example.com/");
    }
}
