//! Step Registry: the ordered, branching set of steps a flow walks through.
//!
//! Each flow declares its steps as an exhaustive enum and implements [`Flow`].
//! `next_step` is a total `match` over `(step, variant)`, so an unmapped
//! transition is a compile error rather than a silent no-op.

use std::fmt::Debug;

use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::wizard::session::{PathVariant, WizardSession};
use crate::wizard::validation::{FormData, ValidationResult};

/// Wire name of the terminal position. No step may serialize to this string.
pub const TERMINAL: &str = "terminal";

/// A step name. Implemented by each flow's step enum.
pub trait StepName:
    Copy + Eq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Every step, in registry order.
    const ALL: &'static [Self];
}

/// Where a session stands: on a named step, or past the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor<S> {
    Step(S),
    Terminal,
}

impl<S: StepName> Cursor<S> {
    pub fn step(&self) -> Option<S> {
        match self {
            Cursor::Step(s) => Some(*s),
            Cursor::Terminal => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Cursor::Terminal)
    }
}

impl<S: StepName> Serialize for Cursor<S> {
    fn serialize<Z: Serializer>(&self, serializer: Z) -> Result<Z::Ok, Z::Error> {
        match self {
            Cursor::Step(step) => step.serialize(serializer),
            Cursor::Terminal => serializer.serialize_str(TERMINAL),
        }
    }
}

impl<'de, S: StepName> Deserialize<'de> for Cursor<S> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == TERMINAL {
            return Ok(Cursor::Terminal);
        }
        let de: serde::de::value::StringDeserializer<D::Error> = raw.into_deserializer();
        S::deserialize(de).map(Cursor::Step)
    }
}

/// A multi-step flow: its steps, validators and branching policy.
///
/// All functions are pure. `next_step` must be deterministic so a persisted
/// session replays to the same position.
pub trait Flow: Send + Sync + 'static {
    type Step: StepName;

    /// Route segment and submission tag, e.g. `"career-os"`.
    const NAME: &'static str;

    /// Persistence key. Must be unique across flows.
    const STORAGE_KEY: &'static str;

    fn first_step() -> Self::Step;

    /// Fields a step owns. A step payload may only write these.
    fn fields(step: Self::Step) -> &'static [&'static str];

    fn validate(step: Self::Step, form: &FormData) -> ValidationResult;

    fn next_step(step: Self::Step, form: &FormData, variant: PathVariant) -> Cursor<Self::Step>;

    /// Every step that can be visited under `variant`, across all data branches.
    fn reachable_steps(variant: PathVariant) -> &'static [Self::Step];
}

/// The step the back button returns to, if any.
pub fn previous_step<S: StepName>(history: &[S]) -> Option<S> {
    history.last().copied()
}

pub fn is_reachable<F: Flow>(cursor: Cursor<F::Step>, variant: PathVariant) -> bool {
    match cursor {
        Cursor::Terminal => true,
        Cursor::Step(step) => F::reachable_steps(variant).contains(&step),
    }
}

/// Steps the session would walk from the first step given the current answers.
/// Used for the progress indicator; branches that skip steps shorten it.
pub fn planned_path<F: Flow>(form: &FormData, variant: PathVariant) -> Vec<F::Step> {
    let mut path = Vec::new();
    let mut cursor = Cursor::Step(F::first_step());
    while let Cursor::Step(step) = cursor {
        // A step enum has finitely many members; a longer walk is a cycle.
        if path.len() >= <F::Step as StepName>::ALL.len() {
            break;
        }
        path.push(step);
        cursor = F::next_step(step, form, variant);
    }
    path
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplayError {
    #[error("history entry {index} is {found}, expected {expected}")]
    Diverges {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("completed step {step} no longer validates")]
    MissingData { step: String },

    #[error("history ends at {expected}, snapshot claims {found}")]
    CursorMismatch { expected: String, found: String },

    #[error("{step} is not reachable on the {variant:?} path")]
    Unreachable { step: String, variant: PathVariant },
}

/// Re-walks `history` from the first step, checking each entry validates and
/// that the walk lands on `current_step`. A session that fails replay must not
/// be resumed.
pub fn replay<F: Flow>(session: &WizardSession<F::Step>) -> Result<(), ReplayError> {
    let mut cursor = Cursor::Step(F::first_step());

    for (index, &step) in session.history.iter().enumerate() {
        if cursor != Cursor::Step(step) {
            return Err(ReplayError::Diverges {
                index,
                expected: format!("{cursor:?}"),
                found: format!("{step:?}"),
            });
        }
        if !F::validate(step, &session.form_data).is_ok() {
            return Err(ReplayError::MissingData {
                step: format!("{step:?}"),
            });
        }
        cursor = F::next_step(step, &session.form_data, session.path_variant);
    }

    if cursor != session.current_step {
        return Err(ReplayError::CursorMismatch {
            expected: format!("{cursor:?}"),
            found: format!("{:?}", session.current_step),
        });
    }
    if !is_reachable::<F>(cursor, session.path_variant) {
        return Err(ReplayError::Unreachable {
            step: format!("{cursor:?}"),
            variant: session.path_variant,
        });
    }
    Ok(())
}
