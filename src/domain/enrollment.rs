//! Enrollment (`matricula`) entity and its status state machine.
//!
//! ```text
//! PENDING ──▶ ACTIVE ──▶ CANCELLED
//!               │  ▲          │
//!               │  └──────────┘  (reactivation, re-validated)
//!               ├──▶ SUSPENDED
//!               └──▶ COMPLETED
//! ```
//!
//! Only ACTIVE enrollments count against a school's capacity.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::validation::{FieldErrors, MAX_NOTES_LEN};
use super::{EnrollmentId, SchoolId, StudentId};
use crate::error::ApiError;

/// Lifecycle status of an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum EnrollmentStatus {
    /// Counts against capacity.
    #[serde(rename = "ATIVA")]
    Active,
    /// Awaiting activation.
    #[serde(rename = "PENDENTE")]
    Pending,
    /// Cancelled; may be reactivated.
    #[serde(rename = "CANCELADA")]
    Cancelled,
    /// Temporarily suspended.
    #[serde(rename = "SUSPENSA")]
    Suspended,
    /// Finished.
    #[serde(rename = "CONCLUIDA")]
    Completed,
}

impl EnrollmentStatus {
    /// Wire and storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ATIVA",
            Self::Pending => "PENDENTE",
            Self::Cancelled => "CANCELADA",
            Self::Suspended => "SUSPENSA",
            Self::Completed => "CONCLUIDA",
        }
    }

    /// Returns `true` for [`EnrollmentStatus::Active`].
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns `true` if the state machine allows `self -> next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Active)
                | (Self::Active, Self::Cancelled)
                | (Self::Active, Self::Suspended)
                | (Self::Active, Self::Completed)
                | (Self::Cancelled, Self::Active)
        )
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrollmentStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ATIVA" => Ok(Self::Active),
            "PENDENTE" => Ok(Self::Pending),
            "CANCELADA" => Ok(Self::Cancelled),
            "SUSPENSA" => Ok(Self::Suspended),
            "CONCLUIDA" => Ok(Self::Completed),
            other => Err(ApiError::Validation(format!(
                "Status de matrícula desconhecido: {other}"
            ))),
        }
    }
}

/// An enrollment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Enrollment {
    /// Database key.
    pub id: EnrollmentId,
    /// Enrolled student.
    #[serde(rename = "alunoId")]
    pub student_id: StudentId,
    /// School the student is enrolled in.
    #[serde(rename = "escolaId")]
    pub school_id: SchoolId,
    /// Moment the enrollment was registered.
    #[serde(rename = "dataMatricula")]
    pub enrolled_at: DateTime<Utc>,
    /// First day of attendance.
    #[serde(rename = "dataInicio")]
    pub start_date: NaiveDate,
    /// Last day of attendance, if known.
    #[serde(rename = "dataFim")]
    pub end_date: Option<NaiveDate>,
    /// Lifecycle status.
    pub status: EnrollmentStatus,
    /// Free-text notes (also used as the attrition reason).
    #[serde(rename = "observacoes")]
    pub notes: Option<String>,
    /// Creation timestamp.
    #[serde(rename = "dataCriacao")]
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    #[serde(rename = "dataAtualizacao")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Enrollment fields as submitted by a client.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentDraft {
    /// Student to enroll.
    pub student_id: Option<StudentId>,
    /// Target school.
    pub school_id: Option<SchoolId>,
    /// First day of attendance; defaults to today.
    pub start_date: Option<NaiveDate>,
    /// Last day of attendance.
    pub end_date: Option<NaiveDate>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// `Some(false)` creates a PENDING enrollment.
    pub active: Option<bool>,
}

/// A validated enrollment request; existence and capacity are checked
/// later against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentRequest {
    /// Student to enroll.
    pub student_id: StudentId,
    /// Target school.
    pub school_id: SchoolId,
    /// First day of attendance.
    pub start_date: NaiveDate,
    /// Last day of attendance.
    pub end_date: Option<NaiveDate>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Initial status, ACTIVE or PENDING.
    pub initial_status: EnrollmentStatus,
}

impl EnrollmentDraft {
    /// Checks required references and the date range, filling the start
    /// date with `today` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidFields`] when a reference is missing, the
    /// notes are too long, or the end date precedes the start date.
    pub fn validate(self, today: NaiveDate) -> Result<EnrollmentRequest, ApiError> {
        let mut errors = FieldErrors::default();

        if self.student_id.is_none() {
            errors.push("alunoId", "O ID do aluno é obrigatório");
        }
        if self.school_id.is_none() {
            errors.push("escolaId", "O ID da escola é obrigatório");
        }
        let start_date = self.start_date.unwrap_or(today);
        if let Some(end) = self.end_date
            && end < start_date
        {
            errors.push(
                "dataFim",
                "A data de fim não pode ser anterior à data de início",
            );
        }
        let notes = errors.optional_text("observacoes", self.notes, MAX_NOTES_LEN);

        errors.into_result()?;
        let (Some(student_id), Some(school_id)) = (self.student_id, self.school_id) else {
            return Err(ApiError::Internal(
                "enrollment validation accepted missing references".to_string(),
            ));
        };
        let initial_status = if self.active == Some(false) {
            EnrollmentStatus::Pending
        } else {
            EnrollmentStatus::Active
        };
        Ok(EnrollmentRequest {
            student_id,
            school_id,
            start_date,
            end_date: self.end_date,
            notes,
            initial_status,
        })
    }
}

/// A fully checked enrollment ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEnrollment {
    /// Enrolled student.
    pub student_id: StudentId,
    /// Target school.
    pub school_id: SchoolId,
    /// Registration moment.
    pub enrolled_at: DateTime<Utc>,
    /// First day of attendance.
    pub start_date: NaiveDate,
    /// Last day of attendance.
    pub end_date: Option<NaiveDate>,
    /// Initial status.
    pub status: EnrollmentStatus,
    /// Free-text notes.
    pub notes: Option<String>,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        let Some(date) = NaiveDate::from_ymd_opt(y, m, d) else {
            panic!("valid date");
        };
        date
    }

    #[test]
    fn state_machine_edges() {
        use EnrollmentStatus::*;
        assert!(Pending.can_transition_to(Active));
        assert!(Active.can_transition_to(Cancelled));
        assert!(Active.can_transition_to(Suspended));
        assert!(Active.can_transition_to(Completed));
        assert!(Cancelled.can_transition_to(Active));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Active));
        assert!(!Suspended.can_transition_to(Completed));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn status_string_round_trip() {
        for status in [
            EnrollmentStatus::Active,
            EnrollmentStatus::Pending,
            EnrollmentStatus::Cancelled,
            EnrollmentStatus::Suspended,
            EnrollmentStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<EnrollmentStatus>().ok(), Some(status));
        }
        assert!("ACTIVE".parse::<EnrollmentStatus>().is_err());
    }

    #[test]
    fn status_serializes_with_wire_name() {
        let Ok(json) = serde_json::to_string(&EnrollmentStatus::Cancelled) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "\"CANCELADA\"");
    }

    #[test]
    fn draft_defaults_start_date_and_status() {
        let today = date(2024, 2, 1);
        let draft = EnrollmentDraft {
            student_id: Some(StudentId::new(1)),
            school_id: Some(SchoolId::new(2)),
            ..EnrollmentDraft::default()
        };
        let Ok(req) = draft.validate(today) else {
            panic!("draft should validate");
        };
        assert_eq!(req.start_date, today);
        assert_eq!(req.initial_status, EnrollmentStatus::Active);
    }

    #[test]
    fn inactive_draft_starts_pending() {
        let draft = EnrollmentDraft {
            student_id: Some(StudentId::new(1)),
            school_id: Some(SchoolId::new(2)),
            active: Some(false),
            ..EnrollmentDraft::default()
        };
        let Ok(req) = draft.validate(date(2024, 2, 1)) else {
            panic!("draft should validate");
        };
        assert_eq!(req.initial_status, EnrollmentStatus::Pending);
    }

    #[test]
    fn end_before_start_is_rejected() {
        let draft = EnrollmentDraft {
            student_id: Some(StudentId::new(1)),
            school_id: Some(SchoolId::new(2)),
            start_date: Some(date(2024, 3, 1)),
            end_date: Some(date(2024, 2, 1)),
            ..EnrollmentDraft::default()
        };
        assert!(matches!(
            draft.validate(date(2024, 1, 1)),
            Err(ApiError::InvalidFields(_))
        ));
    }

    #[test]
    fn missing_references_are_reported() {
        let Err(ApiError::InvalidFields(fields)) =
            EnrollmentDraft::default().validate(date(2024, 1, 1))
        else {
            panic!("expected field errors");
        };
        assert_eq!(fields.len(), 2);
    }
}
