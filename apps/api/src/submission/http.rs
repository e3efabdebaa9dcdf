use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::submission::{Receipt, SubmissionClient, SubmissionError, SubmissionPayload};

/// Posts submissions as JSON to a single backend endpoint.
#[derive(Clone)]
pub struct HttpSubmissionClient {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "code")]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    reasons: Vec<String>,
}

impl HttpSubmissionClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl SubmissionClient for HttpSubmissionClient {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<Receipt, SubmissionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload.body())
            .send()
            .await
            .map_err(|e| {
                warn!(flow = payload.flow, "Submission transport error: {e}");
                SubmissionError::Transient {
                    status: None,
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let err = classify_failure(status, &body);
            warn!(flow = payload.flow, status = status.as_u16(), "Submission failed: {err}");
            return Err(err);
        }

        // Delivered. A body we cannot read does not undo the delivery.
        let receipt = serde_json::from_str::<Receipt>(&body).unwrap_or_default();
        debug!(flow = payload.flow, receipt_id = ?receipt.id, "Submission accepted");
        Ok(receipt)
    }
}

/// Maps a non-2xx response to a transient or terminal error.
fn classify_failure(status: StatusCode, body: &str) -> SubmissionError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);

    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        let message = parsed
            .and_then(|e| e.message)
            .unwrap_or_else(|| format!("server responded {status}"));
        return SubmissionError::Transient {
            status: Some(status.as_u16()),
            message,
        };
    }

    match parsed {
        Some(error) => SubmissionError::Terminal {
            status: status.as_u16(),
            kind: error.kind.unwrap_or_else(|| "rejected".to_string()),
            message: error
                .message
                .unwrap_or_else(|| "The submission was rejected".to_string()),
            reasons: error.reasons,
        },
        None => SubmissionError::Terminal {
            status: status.as_u16(),
            kind: "rejected".to_string(),
            message: if body.trim().is_empty() {
                format!("server responded {status}")
            } else {
                body.trim().to_string()
            },
            reasons: vec![],
        },
    }
}
