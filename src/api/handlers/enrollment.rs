//! Enrollment handlers: creation, status changes, lifecycle transitions,
//! cancellation and batch status updates.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};

use crate::api::dto::{
    ApiJson, ApiPath, ApiQuery, BatchIdsQuery, CreateEnrollmentRequest, StatusRequest,
    TransitionRequest,
};
use crate::app_state::AppState;
use crate::domain::{Enrollment, EnrollmentId};
use crate::error::{ApiError, ErrorBody};

/// `GET /matriculas`: List every enrollment.
///
/// # Errors
///
/// Returns [`ApiError::Persistence`] on store failures.
#[utoipa::path(
    get,
    path = "/matriculas",
    tag = "Matriculas",
    summary = "List enrollments",
    responses(
        (status = 200, description = "Enrollment list", body = Vec<Enrollment>),
    )
)]
pub async fn list_enrollments(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.enrollments.list().await?))
}

/// `POST /matriculas`: Enroll a student in a school.
///
/// # Errors
///
/// Returns [`ApiError::StudentNotFound`] / [`ApiError::SchoolNotFound`],
/// [`ApiError::InvalidFields`] on field violations, or
/// [`ApiError::Validation`] when the school is full or inactive, the
/// student is inactive, or an ACTIVE enrollment already exists.
#[utoipa::path(
    post,
    path = "/matriculas",
    tag = "Matriculas",
    summary = "Create an enrollment",
    description = "Creates an ACTIVE enrollment (or PENDENTE when `ativo` is false). ACTIVE enrollments are checked against the school capacity.",
    request_body = CreateEnrollmentRequest,
    responses(
        (status = 201, description = "Enrollment created", body = Enrollment),
        (status = 400, description = "School full, inactive entity, duplicate or invalid fields", body = ErrorBody),
        (status = 404, description = "Student or school not found", body = ErrorBody),
    )
)]
pub async fn create_enrollment(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateEnrollmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let enrollment = state.enrollments.create(req.into()).await?;
    let location = format!("/matriculas/{}", enrollment.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(enrollment),
    ))
}

/// `GET /matriculas/{id}`: Get one enrollment.
///
/// # Errors
///
/// Returns [`ApiError::EnrollmentNotFound`] if the enrollment does not exist.
#[utoipa::path(
    get,
    path = "/matriculas/{id}",
    tag = "Matriculas",
    summary = "Get an enrollment",
    params(
        ("id" = i64, Path, description = "Enrollment ID"),
    ),
    responses(
        (status = 200, description = "Enrollment details", body = Enrollment),
        (status = 404, description = "Enrollment not found", body = ErrorBody),
    )
)]
pub async fn get_enrollment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EnrollmentId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.enrollments.get(id).await?))
}

/// `DELETE /matriculas/{id}`: Cancel an enrollment. The record is kept.
///
/// # Errors
///
/// Returns [`ApiError::EnrollmentNotFound`], or [`ApiError::Validation`]
/// when the enrollment is already cancelled.
#[utoipa::path(
    delete,
    path = "/matriculas/{id}",
    tag = "Matriculas",
    summary = "Cancel an enrollment",
    description = "Sets the status to CANCELADA and the end date to today when absent.",
    params(
        ("id" = i64, Path, description = "Enrollment ID"),
    ),
    responses(
        (status = 200, description = "Enrollment cancelled", body = Enrollment),
        (status = 400, description = "Already cancelled", body = ErrorBody),
        (status = 404, description = "Enrollment not found", body = ErrorBody),
    )
)]
pub async fn cancel_enrollment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EnrollmentId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.enrollments.cancel(id).await?))
}

/// `PATCH /matriculas/{id}/status`: Activate or cancel.
///
/// # Errors
///
/// Returns [`ApiError::EnrollmentNotFound`], or [`ApiError::Validation`]
/// when reactivation would exceed capacity or hits an inactive entity.
#[utoipa::path(
    patch,
    path = "/matriculas/{id}/status",
    tag = "Matriculas",
    summary = "Set enrollment active flag",
    description = "`true` reactivates (subject to capacity and activity checks), `false` cancels.",
    params(
        ("id" = i64, Path, description = "Enrollment ID"),
    ),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Status changed", body = Enrollment),
        (status = 400, description = "Reactivation rejected", body = ErrorBody),
        (status = 404, description = "Enrollment not found", body = ErrorBody),
    )
)]
pub async fn set_enrollment_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EnrollmentId>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.enrollments.update_status(id, req.active).await?))
}

/// `PATCH /matriculas/{id}/situacao`: Move along the lifecycle.
///
/// # Errors
///
/// Returns [`ApiError::EnrollmentNotFound`], or [`ApiError::Validation`]
/// on a disallowed transition or a rejected activation.
#[utoipa::path(
    patch,
    path = "/matriculas/{id}/situacao",
    tag = "Matriculas",
    summary = "Transition enrollment status",
    description = "Applies one lifecycle transition, e.g. PENDENTE → ATIVA or ATIVA → SUSPENSA.",
    params(
        ("id" = i64, Path, description = "Enrollment ID"),
    ),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Status changed", body = Enrollment),
        (status = 400, description = "Transition rejected", body = ErrorBody),
        (status = 404, description = "Enrollment not found", body = ErrorBody),
    )
)]
pub async fn transition_enrollment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EnrollmentId>,
    ApiJson(req): ApiJson<TransitionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.enrollments.transition(id, req.status).await?))
}

/// `PATCH /matriculas/lote/status?ids=1,2,3`: Batch status update.
///
/// Each ID is processed in its own transaction; valid ones stay applied
/// even when others fail.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] when no ID is given,
/// [`ApiError::NoneFound`] when none exists, and
/// [`ApiError::BatchPartial`] when some were rejected.
#[utoipa::path(
    patch,
    path = "/matriculas/lote/status",
    tag = "Matriculas",
    summary = "Batch set enrollment active flag",
    params(BatchIdsQuery),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Every enrollment updated", body = Vec<Enrollment>),
        (status = 400, description = "No IDs, or some updates rejected", body = ErrorBody),
        (status = 404, description = "None of the enrollments exist", body = ErrorBody),
    )
)]
pub async fn batch_update_status(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BatchIdsQuery>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ids = query.parse()?;
    Ok(Json(
        state
            .enrollments
            .batch_update_status(&ids, req.active)
            .await?,
    ))
}

/// Enrollment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/matriculas", get(list_enrollments).post(create_enrollment))
        .route("/matriculas/lote/status", patch(batch_update_status))
        .route(
            "/matriculas/{id}",
            get(get_enrollment).delete(cancel_enrollment),
        )
        .route("/matriculas/{id}/status", patch(set_enrollment_status))
        .route("/matriculas/{id}/situacao", patch(transition_enrollment))
}
