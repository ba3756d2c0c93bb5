//! Enrollment request types.

use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::domain::{EnrollmentDraft, EnrollmentId, EnrollmentStatus, SchoolId, StudentId};
use crate::error::ApiError;

/// Body of `POST /matriculas`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateEnrollmentRequest {
    /// Student to enroll.
    #[serde(rename = "alunoId")]
    pub student_id: Option<StudentId>,
    /// Target school.
    #[serde(rename = "escolaId")]
    pub school_id: Option<SchoolId>,
    /// First day (`YYYY-MM-DD`), today or later.
    #[serde(rename = "dataInicio")]
    pub start_date: Option<NaiveDate>,
    /// Optional last day, not before `dataInicio`.
    #[serde(rename = "dataFim")]
    pub end_date: Option<NaiveDate>,
    /// Free text, up to 500 characters.
    #[serde(rename = "observacoes")]
    pub notes: Option<String>,
    /// `false` creates the enrollment as PENDENTE. Defaults to `true`.
    #[serde(rename = "ativo")]
    pub active: Option<bool>,
}

impl From<CreateEnrollmentRequest> for EnrollmentDraft {
    fn from(req: CreateEnrollmentRequest) -> Self {
        Self {
            student_id: req.student_id,
            school_id: req.school_id,
            start_date: req.start_date,
            end_date: req.end_date,
            notes: req.notes,
            active: req.active,
        }
    }
}

/// Body of `PATCH /matriculas/{id}/situacao`.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct TransitionRequest {
    /// Target status.
    pub status: EnrollmentStatus,
}

/// Query of `PATCH /matriculas/lote/status`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BatchIdsQuery {
    /// Comma-separated enrollment IDs, e.g. `1,2,3`.
    pub ids: Option<String>,
}

impl BatchIdsQuery {
    /// Parses the comma-separated list, skipping blank entries.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] when the list is missing, empty,
    /// or contains a non-numeric entry.
    pub fn parse(&self) -> Result<Vec<EnrollmentId>, ApiError> {
        let raw = self.ids.as_deref().unwrap_or_default();
        let ids = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<EnrollmentId>().map_err(|_| {
                    ApiError::Validation(format!("ID de matrícula inválido: '{s}'."))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if ids.is_empty() {
            return Err(ApiError::Validation(
                "Nenhum ID de matrícula fornecido.".to_string(),
            ));
        }
        Ok(ids)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn query(ids: &str) -> BatchIdsQuery {
        BatchIdsQuery {
            ids: Some(ids.to_string()),
        }
    }

    #[test]
    fn parses_comma_list_with_spaces() {
        let Ok(ids) = query("1, 2,,3").parse() else {
            panic!("expected ids");
        };
        assert_eq!(ids, vec![
            EnrollmentId::new(1),
            EnrollmentId::new(2),
            EnrollmentId::new(3)
        ]);
    }

    #[test]
    fn rejects_garbage_and_empty() {
        assert!(matches!(query("1,x").parse(), Err(ApiError::Validation(_))));
        assert!(matches!(query(" , ").parse(), Err(ApiError::Validation(_))));
        assert!(matches!(
            BatchIdsQuery::default().parse(),
            Err(ApiError::Validation(_))
        ));
    }
}
