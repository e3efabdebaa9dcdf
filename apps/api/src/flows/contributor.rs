//! Contributor Wizard: collects a content contribution pitch.
//!
//! `fast`: identity → contribution → terminal.
//! `guided`: identity → contribution → outline → draft → links → terminal,
//! where templates skip `draft`.

use serde::{Deserialize, Serialize};

use crate::wizard::registry::{Cursor, Flow, StepName};
use crate::wizard::session::PathVariant;
use crate::wizard::validation::{
    require_choice, require_email, require_text, text, FieldError, FormData, ValidationResult,
};

pub const CONTRIBUTION_TYPES: &[&str] = &["article", "case_study", "template"];
pub const MIN_DRAFT_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributorStep {
    Identity,
    Contribution,
    Outline,
    Draft,
    Links,
}

impl StepName for ContributorStep {
    const ALL: &'static [Self] = &[
        ContributorStep::Identity,
        ContributorStep::Contribution,
        ContributorStep::Outline,
        ContributorStep::Draft,
        ContributorStep::Links,
    ];
}

pub struct ContributorFlow;

fn is_template(form: &FormData) -> bool {
    text(form, "contribution_type") == Some("template")
}

impl Flow for ContributorFlow {
    type Step = ContributorStep;

    const NAME: &'static str = "contributor";
    const STORAGE_KEY: &'static str = "contributor-wizard-state";

    fn first_step() -> ContributorStep {
        ContributorStep::Identity
    }

    fn fields(step: ContributorStep) -> &'static [&'static str] {
        match step {
            ContributorStep::Identity => &["name", "email"],
            ContributorStep::Contribution => &["contribution_type"],
            ContributorStep::Outline => &["title", "summary"],
            ContributorStep::Draft => &["body"],
            ContributorStep::Links => &["portfolio_url"],
        }
    }

    fn validate(step: ContributorStep, form: &FormData) -> ValidationResult {
        let mut errors = Vec::new();
        match step {
            ContributorStep::Identity => {
                require_text(form, "name", &mut errors);
                require_email(form, "email", &mut errors);
            }
            ContributorStep::Contribution => {
                require_choice(form, "contribution_type", CONTRIBUTION_TYPES, &mut errors);
            }
            ContributorStep::Outline => {
                require_text(form, "title", &mut errors);
                require_text(form, "summary", &mut errors);
            }
            ContributorStep::Draft => {
                let len = text(form, "body").map_or(0, |b| b.chars().count());
                if len < MIN_DRAFT_CHARS {
                    errors.push(FieldError::new(
                        "body",
                        format!("Drafts need at least {MIN_DRAFT_CHARS} characters"),
                    ));
                }
            }
            ContributorStep::Links => {
                if let Some(url) = text(form, "portfolio_url") {
                    if !(url.starts_with("http://") || url.starts_with("https://")) {
                        errors.push(FieldError::new(
                            "portfolio_url",
                            "Links must start with http:// or https://",
                        ));
                    }
                }
            }
        }
        ValidationResult::from_errors(errors)
    }

    fn next_step(
        step: ContributorStep,
        form: &FormData,
        variant: PathVariant,
    ) -> Cursor<ContributorStep> {
        use ContributorStep::*;
        match (step, variant) {
            (Identity, _) => Cursor::Step(Contribution),
            (Contribution, PathVariant::Fast) => Cursor::Terminal,
            (Contribution, PathVariant::Guided) => Cursor::Step(Outline),
            (Outline, _) if is_template(form) => Cursor::Step(Links),
            (Outline, _) => Cursor::Step(Draft),
            (Draft, _) => Cursor::Step(Links),
            (Links, _) => Cursor::Terminal,
        }
    }

    fn reachable_steps(variant: PathVariant) -> &'static [ContributorStep] {
        match variant {
            PathVariant::Fast => &[ContributorStep::Identity, ContributorStep::Contribution],
            PathVariant::Guided => ContributorStep::ALL,
        }
    }
}
