#![allow(dead_code)]

//! Remote Submission Client: the terminal network call of every flow.
//!
//! The client is a pure transport: callers attach page/campaign/user-agent
//! metadata, and retries are manual (the user presses submit again). There is
//! no deduplication, so a retry after a timeout may be delivered twice.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use self::http::HttpSubmissionClient;

use crate::wizard::validation::FormData;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// Network failure, timeout, 408/429 or 5xx. Safe to retry as-is.
    #[error("Submission temporarily unavailable: {message}")]
    Transient { status: Option<u16>, message: String },

    /// The server rejected the payload. The user must correct it first.
    #[error("Submission rejected ({kind}): {message}")]
    Terminal {
        status: u16,
        kind: String,
        message: String,
        reasons: Vec<String>,
    },
}

impl SubmissionError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmissionError::Transient { .. })
    }
}

/// Context attached by the caller, not the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMetadata {
    pub source: String,
    pub page: String,
    pub user_agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign: Option<String>,
}

/// Request body: every collected field plus the metadata keys.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionPayload {
    pub flow: &'static str,
    body: Map<String, Value>,
}

impl SubmissionPayload {
    /// Metadata keys overwrite form fields of the same name.
    pub fn new(flow: &'static str, fields: &FormData, metadata: &SubmissionMetadata) -> Self {
        let mut body = fields.clone();
        body.insert("source".into(), Value::String(metadata.source.clone()));
        body.insert("page".into(), Value::String(metadata.page.clone()));
        body.insert(
            "userAgent".into(),
            Value::String(metadata.user_agent.clone()),
        );
        if let Some(campaign) = &metadata.campaign {
            body.insert("campaign".into(), Value::String(campaign.clone()));
        }
        Self { flow, body }
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }
}

/// Confirmation returned by the backend. Both fields are optional; an
/// accepted submission with an unreadable body yields an empty receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[async_trait]
pub trait SubmissionClient: Send + Sync {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<Receipt, SubmissionError>;
}
