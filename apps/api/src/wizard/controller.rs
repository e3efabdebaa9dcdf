#![allow(dead_code)]

//! Wizard Controller: owns the authoritative `WizardSession` and drives
//! transitions, persistence and the terminal submission.
//!
//! Operations take `&mut self`, so transitions are strictly sequential per
//! controller. The `Submitting` status additionally rejects calls that arrive
//! while `complete()` is awaiting the backend.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::submission::{SubmissionClient, SubmissionError, SubmissionMetadata, SubmissionPayload};
use crate::wizard::persistence::SnapshotStore;
use crate::wizard::registry::{self, Cursor, Flow, StepName};
use crate::wizard::session::{PathVariant, WizardSession};
use crate::wizard::validation::{FieldError, FormData, ValidationResult};

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("Step validation failed")]
    Validation(Vec<FieldError>),

    #[error("The wizard is at its terminal state; there is no step to submit")]
    AtTerminal,

    #[error("The wizard has not reached its terminal state")]
    NotAtTerminal,

    #[error("A submission is already in progress")]
    SubmissionInProgress,

    #[error("The wizard has already been completed")]
    AlreadyCompleted,

    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStatus {
    Editing,
    Submitting,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionToken {
    pub session_id: String,
    pub receipt_id: Option<String>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// What the Step View renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", bound(serialize = "S: StepName"))]
pub struct WizardView<S> {
    pub flow: &'static str,
    pub current_step: Cursor<S>,
    pub path_variant: PathVariant,
    pub form_data: FormData,
    pub history: Vec<S>,
    pub progress: Progress,
    pub errors: Vec<FieldError>,
    pub status: WizardStatus,
    pub can_go_back: bool,
}

/// Holds `Submitting` for the lifetime of an in-flight submission and falls
/// back to `Editing` if the future is dropped before `finish`.
struct SubmittingGuard<'a> {
    status: &'a mut WizardStatus,
}

impl<'a> SubmittingGuard<'a> {
    fn enter(status: &'a mut WizardStatus) -> Self {
        *status = WizardStatus::Submitting;
        Self { status }
    }

    fn finish(self, status: WizardStatus) {
        *self.status = status;
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        if *self.status == WizardStatus::Submitting {
            *self.status = WizardStatus::Editing;
        }
    }
}

pub struct WizardController<F: Flow> {
    session: WizardSession<F::Step>,
    snapshots: SnapshotStore,
    client: Arc<dyn SubmissionClient>,
    status: WizardStatus,
    last_errors: Vec<FieldError>,
    _flow: PhantomData<F>,
}

impl<F: Flow> WizardController<F> {
    /// Resumes the persisted session if it replays cleanly; otherwise starts
    /// fresh at the first step. A resumed session keeps its own path variant.
    pub async fn start(
        snapshots: SnapshotStore,
        client: Arc<dyn SubmissionClient>,
        initial_variant: PathVariant,
    ) -> Self {
        let session = match snapshots.load::<F::Step>().await {
            Some(snapshot) => match registry::replay::<F>(&snapshot) {
                Ok(()) => {
                    info!(
                        flow = F::NAME,
                        step = ?snapshot.current_step,
                        "Resuming wizard from snapshot"
                    );
                    snapshot
                }
                Err(reason) => {
                    warn!(flow = F::NAME, "Rejecting snapshot: {reason}");
                    WizardSession::fresh(F::first_step(), initial_variant)
                }
            },
            None => WizardSession::fresh(F::first_step(), initial_variant),
        };

        Self {
            session,
            snapshots,
            client,
            status: WizardStatus::Editing,
            last_errors: Vec::new(),
            _flow: PhantomData,
        }
    }

    pub fn session(&self) -> &WizardSession<F::Step> {
        &self.session
    }

    pub fn current_step(&self) -> Cursor<F::Step> {
        self.session.current_step
    }

    pub fn status(&self) -> WizardStatus {
        self.status
    }

    pub fn last_errors(&self) -> &[FieldError] {
        &self.last_errors
    }

    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.session.history.len(),
            total: registry::planned_path::<F>(&self.session.form_data, self.session.path_variant)
                .len(),
        }
    }

    pub fn view(&self) -> WizardView<F::Step> {
        WizardView {
            flow: F::NAME,
            current_step: self.session.current_step,
            path_variant: self.session.path_variant,
            form_data: self.session.form_data.clone(),
            history: self.session.history.clone(),
            progress: self.progress(),
            errors: self.last_errors.clone(),
            status: self.status,
            can_go_back: registry::previous_step(&self.session.history).is_some(),
        }
    }

    fn ensure_editing(&self) -> Result<(), WizardError> {
        match self.status {
            WizardStatus::Editing => Ok(()),
            WizardStatus::Submitting => Err(WizardError::SubmissionInProgress),
            WizardStatus::Completed => Err(WizardError::AlreadyCompleted),
        }
    }

    /// Merges `payload` and advances if the current step validates.
    ///
    /// An invalid payload leaves the session untouched: the merge happens on
    /// a candidate copy that is only committed after validation passes.
    /// The payload may only carry fields the current step owns, so answers
    /// of steps already in `history` cannot change underneath them.
    pub async fn submit_step(&mut self, payload: FormData) -> Result<Cursor<F::Step>, WizardError> {
        self.ensure_editing()?;
        let Some(step) = self.session.current_step.step() else {
            return Err(WizardError::AtTerminal);
        };

        let owned = F::fields(step);
        let foreign: Vec<FieldError> = payload
            .keys()
            .filter(|k| !owned.contains(&k.as_str()))
            .map(|k| FieldError::new(k, "This field belongs to a different step"))
            .collect();
        if !foreign.is_empty() {
            self.last_errors = foreign.clone();
            return Err(WizardError::Validation(foreign));
        }

        let mut candidate = self.session.form_data.clone();
        candidate.extend(payload);

        if let ValidationResult::Invalid(errors) = F::validate(step, &candidate) {
            self.last_errors = errors.clone();
            return Err(WizardError::Validation(errors));
        }

        let next = F::next_step(step, &candidate, self.session.path_variant);
        self.session.form_data = candidate;
        self.session.history.push(step);
        self.session.current_step = next;
        self.last_errors.clear();

        info!(flow = F::NAME, from = ?step, to = ?next, "Step completed");
        self.snapshots.save(&self.session).await;
        Ok(next)
    }

    /// Steps back one entry. Answers are kept. Returns `None` on the first step.
    pub async fn go_back(&mut self) -> Result<Option<F::Step>, WizardError> {
        self.ensure_editing()?;
        let Some(previous) = self.session.history.pop() else {
            return Ok(None);
        };

        self.session.current_step = Cursor::Step(previous);
        self.last_errors.clear();

        info!(flow = F::NAME, to = ?previous, "Stepped back");
        self.snapshots.save(&self.session).await;
        Ok(Some(previous))
    }

    /// Sends the accumulated answers. On failure the session is left exactly
    /// as it was so the user can retry without re-entering anything.
    pub async fn complete(
        &mut self,
        metadata: SubmissionMetadata,
    ) -> Result<CompletionToken, WizardError> {
        self.ensure_editing()?;
        if !self.session.current_step.is_terminal() {
            return Err(WizardError::NotAtTerminal);
        }

        let payload = SubmissionPayload::new(F::NAME, &self.session.form_data, &metadata);

        let Self {
            session,
            snapshots,
            client,
            status,
            ..
        } = self;
        let guard = SubmittingGuard::enter(status);

        let receipt = match client.submit(&payload).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(
                    flow = F::NAME,
                    retryable = e.is_retryable(),
                    "Submission failed, session kept: {e}"
                );
                return Err(e.into());
            }
        };

        let session_id = receipt
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        session.session_id = Some(session_id.clone());
        snapshots.clear().await;
        guard.finish(WizardStatus::Completed);

        info!(flow = F::NAME, %session_id, "Wizard completed");
        Ok(CompletionToken {
            session_id,
            receipt_id: receipt.id,
            completed_at: Utc::now(),
        })
    }

    /// Explicit user exit: drops the snapshot and starts over.
    pub async fn exit(&mut self) {
        self.snapshots.clear().await;
        self.session = WizardSession::fresh(F::first_step(), self.session.path_variant);
        self.status = WizardStatus::Editing;
        self.last_errors.clear();
        info!(flow = F::NAME, "Wizard exited");
    }
}
