use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field name → value, accumulated across steps.
pub type FormData = Map<String, Value>;

/// A single field-level reason a step payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Outcome of a step validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Ok,
    Invalid(Vec<FieldError>),
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationResult::Ok)
    }

    /// Folds a list of collected errors into a result.
    pub fn from_errors(errors: Vec<FieldError>) -> Self {
        if errors.is_empty() {
            ValidationResult::Ok
        } else {
            ValidationResult::Invalid(errors)
        }
    }
}

/// Returns the trimmed string value of `field`, treating blanks as absent.
pub fn text<'a>(form: &'a FormData, field: &str) -> Option<&'a str> {
    form.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub fn require_text(form: &FormData, field: &str, errors: &mut Vec<FieldError>) {
    if text(form, field).is_none() {
        errors.push(FieldError::new(field, "This field is required"));
    }
}

pub fn require_email(form: &FormData, field: &str, errors: &mut Vec<FieldError>) {
    match text(form, field) {
        None => errors.push(FieldError::new(field, "This field is required")),
        Some(email) if !looks_like_email(email) => {
            errors.push(FieldError::new(field, "Enter a valid email address"))
        }
        Some(_) => {}
    }
}

/// Requires `field` to be one of `allowed`.
pub fn require_choice(
    form: &FormData,
    field: &str,
    allowed: &[&str],
    errors: &mut Vec<FieldError>,
) {
    match text(form, field) {
        None => errors.push(FieldError::new(field, "This field is required")),
        Some(v) if !allowed.contains(&v) => errors.push(FieldError::new(
            field,
            format!("Must be one of: {}", allowed.join(", ")),
        )),
        Some(_) => {}
    }
}

/// Reads a non-negative integer given either as a JSON number or a numeric string.
pub fn non_negative_int(form: &FormData, field: &str) -> Option<u64> {
    match form.get(field)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !s.contains(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
