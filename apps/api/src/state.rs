use std::sync::Arc;

use crate::flows::career_os::CareerOsFlow;
use crate::flows::contributor::ContributorFlow;
use crate::wizard::service::WizardService;

/// Shared application state: one wizard service per registered flow.
#[derive(Clone)]
pub struct AppState {
    pub career_os: Arc<WizardService<CareerOsFlow>>,
    pub contributor: Arc<WizardService<ContributorFlow>>,
}
