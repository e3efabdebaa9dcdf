use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::submission::SubmissionMetadata;
use crate::wizard::controller::{CompletionToken, WizardView};
use crate::wizard::registry::Flow;
use crate::wizard::service::{acquire, WizardService};
use crate::wizard::session::PathVariant;
use crate::wizard::validation::FormData;

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub visitor_id: Uuid,
    #[serde(default)]
    pub path_variant: PathVariant,
}

#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub payload: FormData,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    /// Defaults to the flow name.
    #[serde(default)]
    pub source: Option<String>,
    pub page: String,
    #[serde(default)]
    pub campaign: Option<String>,
}

type Service<F> = State<Arc<WizardService<F>>>;

/// POST /api/v1/wizards/{flow}/sessions
pub async fn handle_start<F: Flow>(
    State(service): Service<F>,
    Json(req): Json<StartRequest>,
) -> Result<Json<WizardView<F::Step>>, AppError> {
    let handle = service.open(req.visitor_id, req.path_variant).await;
    let controller = acquire(&handle)?;
    Ok(Json(controller.view()))
}

/// GET /api/v1/wizards/{flow}/sessions/:visitor_id
pub async fn handle_get<F: Flow>(
    State(service): Service<F>,
    Path(visitor_id): Path<Uuid>,
) -> Result<Json<WizardView<F::Step>>, AppError> {
    let handle = service
        .get(visitor_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No {} session for {visitor_id}", F::NAME)))?;
    let controller = acquire(&handle)?;
    Ok(Json(controller.view()))
}

/// POST /api/v1/wizards/{flow}/sessions/:visitor_id/steps
pub async fn handle_submit_step<F: Flow>(
    State(service): Service<F>,
    Path(visitor_id): Path<Uuid>,
    Json(req): Json<StepRequest>,
) -> Result<Json<WizardView<F::Step>>, AppError> {
    let handle = service
        .get(visitor_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No {} session for {visitor_id}", F::NAME)))?;
    let mut controller = acquire(&handle)?;
    controller.submit_step(req.payload).await?;
    Ok(Json(controller.view()))
}

/// POST /api/v1/wizards/{flow}/sessions/:visitor_id/back
pub async fn handle_back<F: Flow>(
    State(service): Service<F>,
    Path(visitor_id): Path<Uuid>,
) -> Result<Json<WizardView<F::Step>>, AppError> {
    let handle = service
        .get(visitor_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No {} session for {visitor_id}", F::NAME)))?;
    let mut controller = acquire(&handle)?;
    controller.go_back().await?;
    Ok(Json(controller.view()))
}

/// POST /api/v1/wizards/{flow}/sessions/:visitor_id/complete
pub async fn handle_complete<F: Flow>(
    State(service): Service<F>,
    Path(visitor_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<CompleteRequest>,
) -> Result<Json<CompletionToken>, AppError> {
    let handle = service
        .get(visitor_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No {} session for {visitor_id}", F::NAME)))?;

    let metadata = SubmissionMetadata {
        source: req.source.unwrap_or_else(|| F::NAME.to_string()),
        page: req.page,
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        campaign: req.campaign,
    };

    let token = {
        let mut controller = acquire(&handle)?;
        controller.complete(metadata).await?
    };
    service.forget(visitor_id).await;

    Ok(Json(token))
}

/// DELETE /api/v1/wizards/{flow}/sessions/:visitor_id
pub async fn handle_exit<F: Flow>(
    State(service): Service<F>,
    Path(visitor_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    match service.get(visitor_id).await {
        Some(handle) => {
            let mut controller = acquire(&handle)?;
            controller.exit().await;
        }
        None => service.snapshots_for(visitor_id).clear().await,
    }
    service.forget(visitor_id).await;
    info!(flow = F::NAME, %visitor_id, "Visitor exited wizard");
    Ok(StatusCode::NO_CONTENT)
}
