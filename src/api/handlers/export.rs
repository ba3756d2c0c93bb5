//! CSV export handlers.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::Utc;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::service::export;

/// Wraps a rendered CSV document as a dated attachment.
fn attachment(prefix: &str, csv: String) -> impl IntoResponse {
    let filename = format!(
        "attachment; filename=\"{prefix}_{}.csv\"",
        Utc::now().date_naive()
    );
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        csv,
    )
}

/// `GET /export/alunos/csv`: Students as CSV.
///
/// # Errors
///
/// Returns [`ApiError::Persistence`] on store failures.
#[utoipa::path(
    get,
    path = "/export/alunos/csv",
    tag = "Export",
    summary = "Export students",
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv", body = String),
    )
)]
pub async fn export_students(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let students = state.students.list().await?;
    Ok(attachment("alunos", export::students_csv(&students)))
}

/// `GET /export/escolas/csv`: Schools as CSV.
///
/// # Errors
///
/// Returns [`ApiError::Persistence`] on store failures.
#[utoipa::path(
    get,
    path = "/export/escolas/csv",
    tag = "Export",
    summary = "Export schools",
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv", body = String),
    )
)]
pub async fn export_schools(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let schools = state.schools.list().await?;
    Ok(attachment("escolas", export::schools_csv(&schools)))
}

/// `GET /export/matriculas/csv`: Enrollments as CSV.
///
/// # Errors
///
/// Returns [`ApiError::Persistence`] on store failures.
#[utoipa::path(
    get,
    path = "/export/matriculas/csv",
    tag = "Export",
    summary = "Export enrollments",
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv", body = String),
    )
)]
pub async fn export_enrollments(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let enrollments = state.enrollments.list().await?;
    Ok(attachment("matriculas", export::enrollments_csv(&enrollments)))
}

/// Export routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/export/alunos/csv", get(export_students))
        .route("/export/escolas/csv", get(export_schools))
        .route("/export/matriculas/csv", get(export_enrollments))
}
