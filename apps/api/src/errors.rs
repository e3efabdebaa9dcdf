use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::submission::SubmissionError;
use crate::wizard::controller::WizardError;
use crate::wizard::validation::FieldError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Submission unavailable: {0}")]
    SubmissionUnavailable(String),

    #[error("Submission rejected ({kind}): {message}")]
    SubmissionRejected {
        kind: String,
        message: String,
        reasons: Vec<String>,
    },
}

impl From<WizardError> for AppError {
    fn from(err: WizardError) -> Self {
        match err {
            WizardError::Validation(errors) => AppError::Validation(errors),
            WizardError::Submission(SubmissionError::Transient { message, .. }) => {
                AppError::SubmissionUnavailable(message)
            }
            WizardError::Submission(SubmissionError::Terminal {
                kind,
                message,
                reasons,
                ..
            }) => AppError::SubmissionRejected {
                kind,
                message,
                reasons,
            },
            other @ (WizardError::AtTerminal
            | WizardError::NotAtTerminal
            | WizardError::SubmissionInProgress
            | WizardError::AlreadyCompleted) => AppError::Conflict(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, extra) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                "Some fields need attention".to_string(),
                Some(("details", json!(errors))),
            ),
            AppError::SubmissionUnavailable(msg) => {
                tracing::error!("Submission backend unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SUBMISSION_UNAVAILABLE",
                    "We couldn't send your application. Please try again.".to_string(),
                    Some(("retryable", Value::Bool(true))),
                )
            }
            AppError::SubmissionRejected {
                kind,
                message,
                reasons,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "SUBMISSION_REJECTED",
                message,
                Some(("details", json!({ "kind": kind, "reasons": reasons }))),
            ),
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some((key, value)) = extra {
            error[key] = value;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_maps_to_service_unavailable() {
        let err: AppError = WizardError::Submission(SubmissionError::Transient {
            status: Some(502),
            message: "bad gateway".into(),
        })
        .into();
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_terminal_maps_to_unprocessable() {
        let err: AppError = WizardError::Submission(SubmissionError::Terminal {
            status: 400,
            kind: "invalid".into(),
            message: "Email bounced".into(),
            reasons: vec![],
        })
        .into();
        assert_eq!(
            err.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_misuse_maps_to_conflict() {
        for e in [
            WizardError::AtTerminal,
            WizardError::NotAtTerminal,
            WizardError::SubmissionInProgress,
            WizardError::AlreadyCompleted,
        ] {
            let err: AppError = e.into();
            assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
        }
    }
}
