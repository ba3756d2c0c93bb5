//! Report handlers: ranking, occupancy, growth, attrition and average age.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ApiPath, ApiQuery, PeriodQuery};
use crate::app_state::AppState;
use crate::domain::{Occupancy, SchoolId};
use crate::error::{ApiError, ErrorBody};
use crate::service::{AttritionEntry, GrowthEntry, RankingEntry};

/// `GET /relatorios/escolas/ranking`: Schools by occupancy, highest first.
///
/// # Errors
///
/// Returns [`ApiError::Persistence`] on store failures.
#[utoipa::path(
    get,
    path = "/relatorios/escolas/ranking",
    tag = "Relatorios",
    summary = "Occupancy ranking",
    description = "Every school with its occupancy percentage, ACTIVE student count, capacity and the average age of its ACTIVE students.",
    responses(
        (status = 200, description = "Ranking", body = Vec<RankingEntry>),
    )
)]
pub async fn occupancy_ranking(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.reports.ranking().await?))
}

/// `GET /relatorios/escolas/{id}/ocupacao`: Occupancy of one school.
///
/// # Errors
///
/// Returns [`ApiError::SchoolNotFound`] if the school does not exist.
#[utoipa::path(
    get,
    path = "/relatorios/escolas/{id}/ocupacao",
    tag = "Relatorios",
    summary = "School occupancy report",
    params(
        ("id" = i64, Path, description = "School ID"),
    ),
    responses(
        (status = 200, description = "Occupancy snapshot", body = Occupancy),
        (status = 404, description = "School not found", body = ErrorBody),
    )
)]
pub async fn school_occupancy_report(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<SchoolId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.schools.occupancy(id).await?))
}

/// `GET /relatorios/escolas/crescimento`: New enrollments per school in a
/// period.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] on a malformed or inverted period.
#[utoipa::path(
    get,
    path = "/relatorios/escolas/crescimento",
    tag = "Relatorios",
    summary = "Growth report",
    description = "Per school, enrollments whose start date falls in the period, also as a percentage of capacity.",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Growth per school", body = Vec<GrowthEntry>),
        (status = 400, description = "Invalid period", body = ErrorBody),
    )
)]
pub async fn growth_report(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let window = query.window()?;
    Ok(Json(state.reports.growth(window).await?))
}

/// `GET /relatorios/alunos/evasao`: Cancellations in a period.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] on a malformed or inverted period.
#[utoipa::path(
    get,
    path = "/relatorios/alunos/evasao",
    tag = "Relatorios",
    summary = "Attrition report",
    description = "CANCELADA enrollments whose end date falls in the period, inclusive.",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Cancelled enrollments", body = Vec<AttritionEntry>),
        (status = 400, description = "Invalid period", body = ErrorBody),
    )
)]
pub async fn attrition_report(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let window = query.window()?;
    Ok(Json(state.reports.attrition(window).await?))
}

/// `GET /relatorios/alunos/idade-media`: Average age per school.
///
/// # Errors
///
/// Returns [`ApiError::Persistence`] on store failures.
#[utoipa::path(
    get,
    path = "/relatorios/alunos/idade-media",
    tag = "Relatorios",
    summary = "Average age report",
    responses(
        (status = 200, description = "School ID to average age", body = std::collections::HashMap<String, f64>),
    )
)]
pub async fn average_age_report(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.students.average_age_by_school().await?))
}

/// Report routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/relatorios/escolas/ranking", get(occupancy_ranking))
        .route("/relatorios/escolas/crescimento", get(growth_report))
        .route(
            "/relatorios/escolas/{id}/ocupacao",
            get(school_occupancy_report),
        )
        .route("/relatorios/alunos/evasao", get(attrition_report))
        .route("/relatorios/alunos/idade-media", get(average_age_report))
}
