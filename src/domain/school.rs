//! School (`escola`) entity, its unvalidated draft, and occupancy figures.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::SchoolId;
use super::validation::{FieldErrors, MAX_ADDRESS_LEN, MAX_PERSON_NAME_LEN};
use crate::error::ApiError;

/// Smallest capacity accepted when creating or editing a school.
pub const MIN_CAPACITY: i32 = 1;

/// Largest capacity accepted when creating or editing a school.
pub const MAX_CAPACITY: i32 = 1000;

/// A school row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct School {
    /// Database key.
    pub id: SchoolId,
    /// Unique display name.
    #[serde(rename = "nome")]
    pub name: String,
    /// Maximum number of ACTIVE enrollments.
    #[serde(rename = "capacidade")]
    pub capacity: i32,
    /// Postal address.
    #[serde(rename = "endereco")]
    pub address: Option<String>,
    /// Contact phone, E.164-like digits.
    #[serde(rename = "telefone")]
    pub phone: Option<String>,
    /// Contact e-mail.
    pub email: Option<String>,
    /// Name of the director.
    #[serde(rename = "diretor")]
    pub director: Option<String>,
    /// Inactive schools accept no new enrollments.
    #[serde(rename = "ativo")]
    pub active: bool,
    /// Creation timestamp.
    #[serde(rename = "dataCriacao")]
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp, `None` until the first edit.
    #[serde(rename = "dataAtualizacao")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// School fields as submitted by a client, before validation.
#[derive(Debug, Clone, Default)]
pub struct SchoolDraft {
    /// Display name.
    pub name: Option<String>,
    /// Requested capacity.
    pub capacity: Option<i32>,
    /// Postal address.
    pub address: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Contact e-mail.
    pub email: Option<String>,
    /// Director name.
    pub director: Option<String>,
    /// Active flag; defaults to `true` on create and "unchanged" on update.
    pub active: Option<bool>,
}

/// A validated school ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSchool {
    /// Trimmed display name.
    pub name: String,
    /// Capacity within `MIN_CAPACITY..=MAX_CAPACITY`.
    pub capacity: i32,
    /// Postal address.
    pub address: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Contact e-mail.
    pub email: Option<String>,
    /// Director name.
    pub director: Option<String>,
    /// Explicit active flag, if the client sent one.
    pub active: Option<bool>,
}

impl SchoolDraft {
    /// Checks every field rule and returns the validated school.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidFields`] listing every violated rule.
    pub fn validate(self) -> Result<NewSchool, ApiError> {
        let mut errors = FieldErrors::default();

        let name = errors.required_text("nome", self.name, 3, 100);
        let capacity = match self.capacity {
            None => {
                errors.push("capacidade", "A capacidade é obrigatória");
                None
            }
            Some(c) if c < MIN_CAPACITY => {
                errors.push("capacidade", "A capacidade deve ser maior que zero");
                None
            }
            Some(c) if c > MAX_CAPACITY => {
                errors.push("capacidade", "A capacidade não pode ser maior que 1000");
                None
            }
            Some(c) => Some(c),
        };
        let address = errors.optional_text("endereco", self.address, MAX_ADDRESS_LEN);
        let phone = errors.optional_phone("telefone", self.phone);
        let email = errors.optional_email("email", self.email);
        let director = errors.optional_text("diretor", self.director, MAX_PERSON_NAME_LEN);

        errors.into_result()?;
        match (name, capacity) {
            (Some(name), Some(capacity)) => Ok(NewSchool {
                name,
                capacity,
                address,
                phone,
                email,
                director,
                active: self.active,
            }),
            _ => Err(ApiError::Internal(
                "school validation accepted missing fields".to_string(),
            )),
        }
    }
}

/// Occupancy snapshot of a school.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Occupancy {
    /// School key.
    #[serde(rename = "escolaId")]
    pub school_id: SchoolId,
    /// School name.
    #[serde(rename = "escolaNome")]
    pub school_name: String,
    /// Configured capacity.
    #[serde(rename = "capacidade")]
    pub capacity: i32,
    /// Number of ACTIVE enrollments.
    #[serde(rename = "alunosAtivos")]
    pub active_enrollments: i64,
    /// `active / capacity * 100`, `0.0` when capacity is zero.
    #[serde(rename = "ocupacaoPercentual")]
    pub percentage: f64,
    /// Seats left before the school is full, never negative.
    #[serde(rename = "vagasDisponiveis")]
    pub remaining_seats: i64,
}

impl Occupancy {
    /// Computes occupancy for `school` given its ACTIVE enrollment count.
    #[must_use]
    pub fn compute(school: &School, active_enrollments: i64) -> Self {
        Self {
            school_id: school.id,
            school_name: school.name.clone(),
            capacity: school.capacity,
            active_enrollments,
            percentage: occupancy_percentage(active_enrollments, school.capacity),
            remaining_seats: (i64::from(school.capacity) - active_enrollments).max(0),
        }
    }

    /// Returns `true` when no seat is left.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.remaining_seats == 0
    }
}

/// `count / capacity * 100`, or `0.0` when `capacity` is not positive.
#[must_use]
pub fn occupancy_percentage(count: i64, capacity: i32) -> f64 {
    if capacity <= 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = count as f64 / f64::from(capacity);
    ratio * 100.0
}
