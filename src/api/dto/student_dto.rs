//! Student request types.

use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::domain::{StudentDraft, StudentFilter};

/// Body of `POST /alunos`, `PUT /alunos/{id}` and each item of
/// `POST /alunos/lote`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct StudentRequest {
    /// Full name, 3–100 characters.
    #[serde(rename = "nome")]
    pub name: Option<String>,
    /// Age in years, 0–120.
    #[serde(rename = "idade")]
    pub age: Option<i32>,
    /// Birth date (`YYYY-MM-DD`), must be in the past.
    #[serde(rename = "dataNascimento")]
    pub birth_date: Option<NaiveDate>,
    /// Guardian name.
    #[serde(rename = "nomeResponsavel")]
    pub guardian_name: Option<String>,
    /// Guardian phone, 10 or 11 digits.
    #[serde(rename = "telefoneResponsavel")]
    pub guardian_phone: Option<String>,
    /// Guardian e-mail.
    #[serde(rename = "emailResponsavel")]
    pub guardian_email: Option<String>,
    /// Street address.
    #[serde(rename = "endereco")]
    pub address: Option<String>,
    /// Free text, up to 500 characters.
    #[serde(rename = "observacoes")]
    pub notes: Option<String>,
    /// Active flag, defaults to `true` on create.
    #[serde(rename = "ativo")]
    pub active: Option<bool>,
}

impl From<StudentRequest> for StudentDraft {
    fn from(req: StudentRequest) -> Self {
        Self {
            name: req.name,
            age: req.age,
            birth_date: req.birth_date,
            guardian_name: req.guardian_name,
            guardian_phone: req.guardian_phone,
            guardian_email: req.guardian_email,
            address: req.address,
            notes: req.notes,
            active: req.active,
        }
    }
}

/// Query of `GET /alunos/search`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentSearchQuery {
    /// Case-insensitive name fragment.
    #[serde(rename = "nome")]
    pub name: Option<String>,
    /// Minimum age, inclusive.
    #[serde(rename = "idadeMin")]
    pub age_min: Option<i32>,
    /// Maximum age, inclusive.
    #[serde(rename = "idadeMax")]
    pub age_max: Option<i32>,
}

impl From<StudentSearchQuery> for StudentFilter {
    fn from(query: StudentSearchQuery) -> Self {
        Self {
            name: query.name.filter(|n| !n.trim().is_empty()),
            age_min: query.age_min,
            age_max: query.age_max,
        }
    }
}
