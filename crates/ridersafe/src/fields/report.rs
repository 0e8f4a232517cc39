//! Submit-time validity report.
//!
//! Forms re-check every identity field when they are submitted. Failures are
//! collected here and logged, but never block the submission.

use serde::Serialize;
use tracing::warn;

use super::format::FieldKind;

/// A field that failed its validity check at submit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidField {
    /// Form field name, e.g. `contact_1_phone`.
    pub field: String,
    /// Kind of check that failed.
    pub kind: FieldKind,
    /// The normalized value that was checked.
    pub value: String,
}

/// Outcome of re-checking a form's identity fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldReport {
    invalid: Vec<InvalidField>,
}

impl FieldReport {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a normalized value and record it if invalid.
    ///
    /// Empty optional fields are skipped when `required` is false.
    pub fn check(&mut self, field: &str, kind: FieldKind, value: &str, required: bool) {
        if value.is_empty() && !required {
            return;
        }
        if !kind.is_valid(value) {
            warn!(field = %field, kind = %kind, value = %value, "Submitting invalid field");
            self.invalid.push(InvalidField {
                field: field.to_string(),
                kind,
                value: value.to_string(),
            });
        }
    }

    /// True when every checked field was valid.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty()
    }

    /// Fields that failed their check.
    #[must_use]
    pub fn invalid(&self) -> &[InvalidField] {
        &self.invalid
    }

    /// Whether a given field failed.
    #[must_use]
    pub fn is_invalid(&self, field: &str) -> bool {
        self.invalid.iter().any(|f| f.field == field)
    }
}
