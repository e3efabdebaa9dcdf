//! Career OS application: the sales-funnel intake modal.
//!
//! `fast`: contact → terminal (book straight from the landing page).
//! `guided`: contact → background → goals → availability → terminal.

use serde::{Deserialize, Serialize};

use crate::wizard::registry::{Cursor, Flow, StepName};
use crate::wizard::session::PathVariant;
use crate::wizard::validation::{
    non_negative_int, require_choice, require_email, require_text, text, FieldError, FormData,
    ValidationResult,
};

pub const TIMELINES: &[&str] = &["now", "3_months", "6_months", "exploring"];
pub const BOOKING_PREFERENCES: &[&str] = &["call", "email"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareerOsStep {
    Contact,
    Background,
    Goals,
    Availability,
}

impl StepName for CareerOsStep {
    const ALL: &'static [Self] = &[
        CareerOsStep::Contact,
        CareerOsStep::Background,
        CareerOsStep::Goals,
        CareerOsStep::Availability,
    ];
}

pub struct CareerOsFlow;

impl Flow for CareerOsFlow {
    type Step = CareerOsStep;

    const NAME: &'static str = "career-os";
    const STORAGE_KEY: &'static str = "career-os-application";

    fn first_step() -> CareerOsStep {
        CareerOsStep::Contact
    }

    fn fields(step: CareerOsStep) -> &'static [&'static str] {
        match step {
            CareerOsStep::Contact => &["name", "email"],
            CareerOsStep::Background => &["current_role", "years_experience"],
            CareerOsStep::Goals => &["target_role", "timeline"],
            CareerOsStep::Availability => &["booking_preference", "timezone"],
        }
    }

    fn validate(step: CareerOsStep, form: &FormData) -> ValidationResult {
        let mut errors = Vec::new();
        match step {
            CareerOsStep::Contact => {
                require_text(form, "name", &mut errors);
                require_email(form, "email", &mut errors);
            }
            CareerOsStep::Background => {
                require_text(form, "current_role", &mut errors);
                if non_negative_int(form, "years_experience").is_none() {
                    errors.push(FieldError::new(
                        "years_experience",
                        "Enter a whole number of years",
                    ));
                }
            }
            CareerOsStep::Goals => {
                require_text(form, "target_role", &mut errors);
                require_choice(form, "timeline", TIMELINES, &mut errors);
            }
            CareerOsStep::Availability => {
                require_choice(form, "booking_preference", BOOKING_PREFERENCES, &mut errors);
                if text(form, "booking_preference") == Some("call") {
                    require_text(form, "timezone", &mut errors);
                }
            }
        }
        ValidationResult::from_errors(errors)
    }

    fn next_step(step: CareerOsStep, _form: &FormData, variant: PathVariant) -> Cursor<CareerOsStep> {
        use CareerOsStep::*;
        match (step, variant) {
            (Contact, PathVariant::Fast) => Cursor::Terminal,
            (Contact, PathVariant::Guided) => Cursor::Step(Background),
            (Background, _) => Cursor::Step(Goals),
            (Goals, _) => Cursor::Step(Availability),
            (Availability, _) => Cursor::Terminal,
        }
    }

    fn reachable_steps(variant: PathVariant) -> &'static [CareerOsStep] {
        match variant {
            PathVariant::Fast => &[CareerOsStep::Contact],
            PathVariant::Guided => CareerOsStep::ALL,
        }
    }
}
