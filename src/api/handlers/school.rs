//! School handlers: CRUD, capacity, status and occupancy.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};

use crate::api::dto::{ApiJson, ApiPath, ApiQuery, CapacityQuery, SchoolRequest, StatusRequest};
use crate::app_state::AppState;
use crate::domain::{Occupancy, School, SchoolId};
use crate::error::{ApiError, ErrorBody};

/// `GET /escolas`: List every school.
///
/// # Errors
///
/// Returns [`ApiError::Persistence`] on store failures.
#[utoipa::path(
    get,
    path = "/escolas",
    tag = "Escolas",
    summary = "List schools",
    description = "Returns every school ordered by ID.",
    responses(
        (status = 200, description = "School list", body = Vec<School>),
    )
)]
pub async fn list_schools(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.schools.list().await?))
}

/// `POST /escolas`: Create a school.
///
/// # Errors
///
/// Returns [`ApiError::InvalidFields`] on field violations and
/// [`ApiError::Validation`] when the name is taken.
#[utoipa::path(
    post,
    path = "/escolas",
    tag = "Escolas",
    summary = "Create a school",
    description = "Validates the fields and creates a school. Names are unique, case-insensitively.",
    request_body = SchoolRequest,
    responses(
        (status = 201, description = "School created", body = School),
        (status = 400, description = "Invalid fields or duplicate name", body = ErrorBody),
    )
)]
pub async fn create_school(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SchoolRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let school = state.schools.create(req.into()).await?;
    let location = format!("/escolas/{}", school.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(school),
    ))
}

/// `GET /escolas/disponiveis`: Schools with at least one free seat.
///
/// # Errors
///
/// Returns [`ApiError::Persistence`] on store failures.
#[utoipa::path(
    get,
    path = "/escolas/disponiveis",
    tag = "Escolas",
    summary = "List schools with free seats",
    description = "Returns the schools whose ACTIVE enrollment count is below capacity.",
    responses(
        (status = 200, description = "Schools with free seats", body = Vec<School>),
    )
)]
pub async fn list_available(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.schools.list_available().await?))
}

/// `GET /escolas/{id}`: Get one school.
///
/// # Errors
///
/// Returns [`ApiError::SchoolNotFound`] if the school does not exist.
#[utoipa::path(
    get,
    path = "/escolas/{id}",
    tag = "Escolas",
    summary = "Get a school",
    params(
        ("id" = i64, Path, description = "School ID"),
    ),
    responses(
        (status = 200, description = "School details", body = School),
        (status = 404, description = "School not found", body = ErrorBody),
    )
)]
pub async fn get_school(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<SchoolId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.schools.get(id).await?))
}

/// `PUT /escolas/{id}`: Replace a school's fields.
///
/// # Errors
///
/// Returns [`ApiError::SchoolNotFound`], [`ApiError::InvalidFields`], or
/// [`ApiError::Validation`] when the new capacity is below the ACTIVE
/// enrollment count or the name is taken.
#[utoipa::path(
    put,
    path = "/escolas/{id}",
    tag = "Escolas",
    summary = "Update a school",
    description = "Replaces every field. Capacity cannot drop below the current ACTIVE enrollment count.",
    params(
        ("id" = i64, Path, description = "School ID"),
    ),
    request_body = SchoolRequest,
    responses(
        (status = 200, description = "School updated", body = School),
        (status = 400, description = "Invalid fields, duplicate name or capacity too low", body = ErrorBody),
        (status = 404, description = "School not found", body = ErrorBody),
    )
)]
pub async fn update_school(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<SchoolId>,
    ApiJson(req): ApiJson<SchoolRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.schools.update(id, req.into()).await?))
}

/// `DELETE /escolas/{id}`: Delete a school and its enrollments.
///
/// # Errors
///
/// Returns [`ApiError::SchoolNotFound`] if the school does not exist.
#[utoipa::path(
    delete,
    path = "/escolas/{id}",
    tag = "Escolas",
    summary = "Delete a school",
    description = "Removes the school; its enrollments are removed with it.",
    params(
        ("id" = i64, Path, description = "School ID"),
    ),
    responses(
        (status = 204, description = "School deleted"),
        (status = 404, description = "School not found", body = ErrorBody),
    )
)]
pub async fn delete_school(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<SchoolId>,
) -> Result<impl IntoResponse, ApiError> {
    state.schools.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PATCH /escolas/{id}/capacidade?novaCapacidade=N`: Change capacity.
///
/// # Errors
///
/// Returns [`ApiError::SchoolNotFound`], or [`ApiError::Validation`] when
/// the parameter is missing, out of range, or below the ACTIVE count.
#[utoipa::path(
    patch,
    path = "/escolas/{id}/capacidade",
    tag = "Escolas",
    summary = "Change school capacity",
    params(
        ("id" = i64, Path, description = "School ID"),
        CapacityQuery,
    ),
    responses(
        (status = 200, description = "Capacity changed", body = School),
        (status = 400, description = "Capacity invalid or below active enrollments", body = ErrorBody),
        (status = 404, description = "School not found", body = ErrorBody),
    )
)]
pub async fn update_capacity(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<SchoolId>,
    ApiQuery(query): ApiQuery<CapacityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let capacity = query.required()?;
    Ok(Json(state.schools.update_capacity(id, capacity).await?))
}

/// `OPTIONS /escolas/{id}/capacidade`: Capacity summary in headers.
///
/// # Errors
///
/// Returns [`ApiError::SchoolNotFound`] if the school does not exist.
#[utoipa::path(
    options,
    path = "/escolas/{id}/capacidade",
    tag = "Escolas",
    summary = "Capacity operations",
    description = "Returns the allowed methods plus current capacity, active enrollment count and free seats as headers.",
    params(
        ("id" = i64, Path, description = "School ID"),
    ),
    responses(
        (status = 200, description = "Capacity headers",
            headers(
                ("X-Capacidade-Atual" = i32, description = "Configured capacity"),
                ("X-Alunos-Matriculados" = i64, description = "ACTIVE enrollments"),
                ("X-Vagas-Disponiveis" = i64, description = "Free seats"),
            )
        ),
        (status = 404, description = "School not found", body = ErrorBody),
    )
)]
pub async fn capacity_options(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<SchoolId>,
) -> Result<impl IntoResponse, ApiError> {
    let occupancy = state.schools.occupancy(id).await?;
    Ok((
        StatusCode::OK,
        [
            ("allow", "GET, PATCH, OPTIONS".to_string()),
            ("x-capacidade-atual", occupancy.capacity.to_string()),
            (
                "x-alunos-matriculados",
                occupancy.active_enrollments.to_string(),
            ),
            ("x-vagas-disponiveis", occupancy.remaining_seats.to_string()),
        ],
    ))
}

/// `PATCH /escolas/{id}/status`: Activate or deactivate a school.
///
/// # Errors
///
/// Returns [`ApiError::SchoolNotFound`] if the school does not exist.
#[utoipa::path(
    patch,
    path = "/escolas/{id}/status",
    tag = "Escolas",
    summary = "Set school active flag",
    params(
        ("id" = i64, Path, description = "School ID"),
    ),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Status changed", body = School),
        (status = 404, description = "School not found", body = ErrorBody),
    )
)]
pub async fn set_school_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<SchoolId>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.schools.set_active(id, req.active).await?))
}

/// `GET /escolas/{id}/ocupacao`: Occupancy snapshot.
///
/// # Errors
///
/// Returns [`ApiError::SchoolNotFound`] if the school does not exist.
#[utoipa::path(
    get,
    path = "/escolas/{id}/ocupacao",
    tag = "Escolas",
    summary = "School occupancy",
    params(
        ("id" = i64, Path, description = "School ID"),
    ),
    responses(
        (status = 200, description = "Occupancy snapshot", body = Occupancy),
        (status = 404, description = "School not found", body = ErrorBody),
    )
)]
pub async fn school_occupancy(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<SchoolId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.schools.occupancy(id).await?))
}

/// School routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/escolas", get(list_schools).post(create_school))
        .route("/escolas/disponiveis", get(list_available))
        .route(
            "/escolas/{id}",
            get(get_school).put(update_school).delete(delete_school),
        )
        .route(
            "/escolas/{id}/capacidade",
            patch(update_capacity).options(capacity_options),
        )
        .route("/escolas/{id}/status", patch(set_school_status))
        .route("/escolas/{id}/ocupacao", get(school_occupancy))
}
