use serde::{Deserialize, Serialize};

use crate::wizard::registry::{Cursor, StepName};
use crate::wizard::validation::FormData;

/// Chosen at the start of a flow; decides which later steps are reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathVariant {
    /// Skips the optional intermediate steps.
    Fast,
    /// Visits every step.
    Guided,
}

impl Default for PathVariant {
    fn default() -> Self {
        Self::Guided
    }
}

/// The persisted unit of wizard state.
///
/// Serialized as `{currentStep, pathVariant, formData, history}` plus an
/// optional `sessionId` once the backend has issued one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    bound(serialize = "S: StepName", deserialize = "S: StepName")
)]
pub struct WizardSession<S> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub current_step: Cursor<S>,
    pub path_variant: PathVariant,
    pub form_data: FormData,
    pub history: Vec<S>,
}

impl<S: StepName> WizardSession<S> {
    pub fn fresh(first_step: S, path_variant: PathVariant) -> Self {
        Self {
            session_id: None,
            current_step: Cursor::Step(first_step),
            path_variant,
            form_data: FormData::new(),
            history: Vec::new(),
        }
    }
}
