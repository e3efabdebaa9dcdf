pub mod health;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::wizard::handlers;
use crate::wizard::registry::Flow;
use crate::wizard::service::WizardService;

/// Session routes for one flow, mounted under `/api/v1/wizards/{flow}`.
pub fn wizard_router<F, S>(service: Arc<WizardService<F>>) -> Router<S>
where
    F: Flow,
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/sessions", post(handlers::handle_start::<F>))
        .route(
            "/sessions/:visitor_id",
            get(handlers::handle_get::<F>).delete(handlers::handle_exit::<F>),
        )
        .route(
            "/sessions/:visitor_id/steps",
            post(handlers::handle_submit_step::<F>),
        )
        .route("/sessions/:visitor_id/back", post(handlers::handle_back::<F>))
        .route(
            "/sessions/:visitor_id/complete",
            post(handlers::handle_complete::<F>),
        )
        .with_state(service)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .nest(
            &format!("/api/v1/wizards/{}", crate::flows::career_os::CareerOsFlow::NAME),
            wizard_router(state.career_os.clone()),
        )
        .nest(
            &format!("/api/v1/wizards/{}", crate::flows::contributor::ContributorFlow::NAME),
            wizard_router(state.contributor.clone()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::storage::{KeyValueStore, MemoryStore};
    use crate::submission::{
        Receipt, SubmissionClient, SubmissionError, SubmissionPayload,
    };

    /// Fails the first `failures` calls with a transient error, then accepts.
    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SubmissionClient for Flaky {
        async fn submit(&self, payload: &SubmissionPayload) -> Result<Receipt, SubmissionError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(SubmissionError::Transient {
                    status: Some(503),
                    message: "upstream down".into(),
                });
            }
            assert_eq!(payload.body()["userAgent"], json!("router-test"));
            Ok(Receipt {
                id: Some(format!("sub_{n}")),
                message: None,
            })
        }
    }

    fn app(failures: usize) -> (Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let client = Arc::new(Flaky {
            failures,
            calls: AtomicUsize::new(0),
        });
        let state = AppState {
            career_os: Arc::new(WizardService::new(
                store.clone(),
                client.clone(),
                "funnel",
                None,
            )),
            contributor: Arc::new(WizardService::new(store.clone(), client, "funnel", None)),
        };
        (build_router(state), store)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::USER_AGENT, "router-test");
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(0);
        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_fast_path_with_retry_over_http() {
        let (app, store) = app(1);
        let visitor = Uuid::new_v4();
        let base = "/api/v1/wizards/career-os/sessions";

        let (status, view) = call(
            &app,
            Method::POST,
            &base,
            Some(json!({"visitor_id": visitor, "path_variant": "fast"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["currentStep"], "contact");
        assert_eq!(view["canGoBack"], false);

        let (status, err) = call(
            &app,
            Method::POST,
            &format!("{base}/{visitor}/steps"),
            Some(json!({"payload": {"name": "A"}})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(err["error"]["details"][0]["field"], "email");

        let (status, view) = call(
            &app,
            Method::POST,
            &format!("{base}/{visitor}/steps"),
            Some(json!({"payload": {"name": "A", "email": "a@x.com"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["currentStep"], "terminal");
        assert_eq!(view["history"], json!(["contact"]));

        let complete = format!("{base}/{visitor}/complete");
        let (status, err) = call(
            &app,
            Method::POST,
            &complete,
            Some(json!({"page": "/career-os"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err["error"]["retryable"], true);
        let key = format!("funnel:{visitor}:career-os-application");
        assert!(store.get(&key).await.unwrap().is_some());

        let (status, token) = call(
            &app,
            Method::POST,
            &complete,
            Some(json!({"page": "/career-os"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(token["sessionId"], "sub_1");
        assert!(store.get(&key).await.unwrap().is_none());

        let (status, _) = call(&app, Method::GET, &format!("{base}/{visitor}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_back_and_exit_over_http() {
        let (app, store) = app(0);
        let visitor = Uuid::new_v4();
        let base = "/api/v1/wizards/contributor/sessions";

        call(
            &app,
            Method::POST,
            base,
            Some(json!({"visitor_id": visitor})),
        )
        .await;
        call(
            &app,
            Method::POST,
            &format!("{base}/{visitor}/steps"),
            Some(json!({"payload": {"name": "B", "email": "b@x.com"}})),
        )
        .await;

        let (status, view) =
            call(&app, Method::POST, &format!("{base}/{visitor}/back"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["currentStep"], "identity");
        assert_eq!(view["formData"]["name"], "B");
        assert_eq!(view["pathVariant"], "guided");

        let (status, _) = call(&app, Method::DELETE, &format!("{base}/{visitor}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let key = format!("funnel:{visitor}:contributor-wizard-state");
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_complete_before_terminal_conflicts() {
        let (app, _) = app(0);
        let visitor = Uuid::new_v4();
        let base = "/api/v1/wizards/career-os/sessions";
        call(&app, Method::POST, base, Some(json!({"visitor_id": visitor}))).await;

        let (status, err) = call(
            &app,
            Method::POST,
            &format!("{base}/{visitor}/complete"),
            Some(json!({"page": "/career-os"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_unknown_visitor_is_not_found() {
        let (app, _) = app(0);
        let (status, _) = call(
            &app,
            Method::POST,
            &format!("/api/v1/wizards/career-os/sessions/{}/back", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
