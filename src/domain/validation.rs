//! Field-level validation helpers shared by the entity drafts.
//!
//! Every rule appends to a [`FieldErrors`] collector instead of failing
//! fast, so a client sees all violations of a payload in one response.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ApiError, FieldError};

/// Maximum length of address fields.
pub const MAX_ADDRESS_LEN: usize = 200;

/// Maximum length of person names other than the student's own.
pub const MAX_PERSON_NAME_LEN: usize = 100;

/// Maximum length of free-text notes.
pub const MAX_NOTES_LEN: usize = 500;

/// Maximum length of e-mail addresses.
pub const MAX_EMAIL_LEN: usize = 255;

/// Optional leading `+`, a non-zero digit, then 10 to 14 digits.
#[allow(clippy::expect_used)]
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9][0-9]{10,14}$").expect("valid regex"));

#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*$").expect("valid regex")
});

/// Accumulates field violations for one payload.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    /// Records a violation.
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// Returns `true` when no violation was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Requires a non-blank value whose trimmed length is within
    /// `min..=max` characters. Returns the trimmed value when valid.
    pub fn required_text(
        &mut self,
        field: &str,
        value: Option<String>,
        min: usize,
        max: usize,
    ) -> Option<String> {
        let Some(trimmed) = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        else {
            self.push(field, format!("O campo '{field}' é obrigatório"));
            return None;
        };
        let len = trimmed.chars().count();
        if len < min || len > max {
            self.push(
                field,
                format!("O campo '{field}' deve ter entre {min} e {max} caracteres"),
            );
            return None;
        }
        Some(trimmed)
    }

    /// Accepts a missing or blank value as `None`; otherwise enforces an
    /// upper length bound.
    pub fn optional_text(
        &mut self,
        field: &str,
        value: Option<String>,
        max: usize,
    ) -> Option<String> {
        let trimmed = non_blank(value)?;
        if trimmed.chars().count() > max {
            self.push(
                field,
                format!("O campo '{field}' não pode ter mais que {max} caracteres"),
            );
            return None;
        }
        Some(trimmed)
    }

    /// Accepts a missing or blank value as `None`; otherwise requires the
    /// phone pattern.
    pub fn optional_phone(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let trimmed = non_blank(value)?;
        if !PHONE_RE.is_match(&trimmed) {
            self.push(field, "Telefone inválido");
            return None;
        }
        Some(trimmed)
    }

    /// Accepts a missing or blank value as `None`; otherwise requires a
    /// well-formed e-mail address of at most [`MAX_EMAIL_LEN`] characters.
    pub fn optional_email(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let trimmed = non_blank(value)?;
        if trimmed.chars().count() > MAX_EMAIL_LEN {
            self.push(
                field,
                format!("O campo '{field}' não pode ter mais que {MAX_EMAIL_LEN} caracteres"),
            );
            return None;
        }
        if !EMAIL_RE.is_match(&trimmed) {
            self.push(field, "Email inválido");
            return None;
        }
        Some(trimmed)
    }

    /// Converts the collected violations into a result.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidFields`] when at least one rule failed.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::InvalidFields(self.errors))
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
