//! API error type with HTTP status code mapping.
//!
//! [`ApiError`] is the single error type of the crate. Services, the
//! store and the extractors all return it; `IntoResponse` turns it into
//! the structured JSON body below.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{EnrollmentId, SchoolId, StudentId};

/// Message returned for every 5xx response; the cause is only logged.
pub const INTERNAL_ERROR_MESSAGE: &str = "Ocorreu um erro interno no servidor";

/// Message returned when the rate limit is exceeded.
pub const RATE_LIMIT_MESSAGE: &str = "Taxa de requisições excedida. Tente novamente em instantes.";

/// Structured JSON error response body.
///
/// ```json
/// {
///   "code": 400,
///   "error": "Bad Request",
///   "message": "A escola 'Escola Central' está lotada.",
///   "path": "/matriculas"
/// }
/// ```
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorBody {
    /// HTTP status code, repeated in the body.
    pub code: u16,
    /// Short reason phrase.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Request path, stamped by the error-path middleware.
    pub path: String,
    /// Field violations or per-item batch failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

/// A single violated field rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    /// Wire name of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

/// One failed item of a batch status update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BatchFailure {
    /// Enrollment that could not be updated.
    #[serde(rename = "matriculaId")]
    pub enrollment_id: EnrollmentId,
    /// Why it was rejected.
    #[serde(rename = "mensagem")]
    pub message: String,
}

/// Crate-wide error enum.
///
/// | Variant                 | HTTP status |
/// |-------------------------|-------------|
/// | `*NotFound`             | 404         |
/// | `Validation`, `InvalidFields`, `BatchPartial` | 400 |
/// | `Unauthorized`          | 401         |
/// | `Forbidden`             | 403         |
/// | `RateLimited`           | 429         |
/// | `Persistence`, `Internal` | 500       |
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// School with the given ID does not exist.
    #[error("Escola não encontrada: {0}")]
    SchoolNotFound(SchoolId),

    /// Student with the given ID does not exist.
    #[error("Aluno não encontrado: {0}")]
    StudentNotFound(StudentId),

    /// Enrollment with the given ID does not exist.
    #[error("Matrícula não encontrada: {0}")]
    EnrollmentNotFound(EnrollmentId),

    /// None of the IDs of a batch exist.
    #[error("Nenhuma das matrículas fornecidas foi encontrada.")]
    NoneFound,

    /// A business rule was violated.
    #[error("{0}")]
    Validation(String),

    /// One or more request fields failed validation.
    #[error("Dados de entrada inválidos")]
    InvalidFields(Vec<FieldError>),

    /// Some items of a batch were rejected; the others were applied.
    #[error("Algumas matrículas não puderam ser atualizadas: {}", summarize(.failures))]
    BatchPartial {
        /// Number of enrollments that were updated.
        updated: usize,
        /// Items that were rejected.
        failures: Vec<BatchFailure>,
    },

    /// Missing credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Credentials present but wrong.
    #[error("{0}")]
    Forbidden(String),

    /// Client exceeded the request rate.
    #[error("{RATE_LIMIT_MESSAGE}")]
    RateLimited {
        /// Milliseconds until the current window closes.
        retry_after_ms: u64,
    },

    /// Storage layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

fn summarize(failures: &[BatchFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("Matrícula ID {}: {}", f.enrollment_id, f.message))
        .collect::<Vec<_>>()
        .join(" ")
}

impl ApiError {
    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::SchoolNotFound(_)
            | Self::StudentNotFound(_)
            | Self::EnrollmentNotFound(_)
            | Self::NoneFound => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::InvalidFields(_) | Self::BatchPartial { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` for the 404 variants.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        self.status_code().as_u16() == 404
    }

    /// Builds the response body. The `path` is left empty; the error-path
    /// middleware fills it in.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        let status = self.status_code();
        let (error, message) = match self {
            Self::InvalidFields(_) => ("Erro de Validação".to_string(), self.to_string()),
            Self::Persistence(_) | Self::Internal(_) => (
                "Erro Interno do Servidor".to_string(),
                INTERNAL_ERROR_MESSAGE.to_string(),
            ),
            _ => (
                status.canonical_reason().unwrap_or("Error").to_string(),
                self.to_string(),
            ),
        };
        let details = match self {
            Self::InvalidFields(fields) => serde_json::to_value(fields).ok(),
            Self::BatchPartial { updated, failures } => Some(serde_json::json!({
                "atualizadas": updated,
                "falhas": failures,
            })),
            _ => None,
        };
        ErrorBody {
            code: status.as_u16(),
            error,
            message,
            path: String::new(),
            details,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(format!("Corpo da requisição inválido: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(format!("Parâmetros de consulta inválidos: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(format!("Parâmetro de caminho inválido: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = self.to_body();
        let mut response = axum::Json(body.clone()).into_response();
        *response.status_mut() = status;
        if let Self::RateLimited { retry_after_ms } = self {
            let secs = retry_after_ms.div_ceil(1000).max(1);
            if let Ok(value) = secs.to_string().parse() {
                response
                    .headers_mut()
                    .insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response.extensions_mut().insert(body);
        response
    }
}
