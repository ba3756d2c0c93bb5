//! Student handlers: CRUD, search, batch creation and per-student queries.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use crate::api::dto::{
    ApiJson, ApiPath, ApiQuery, StatusRequest, StudentRequest, StudentSearchQuery,
};
use crate::app_state::AppState;
use crate::domain::{Enrollment, Student, StudentDraft, StudentFilter, StudentId};
use crate::error::{ApiError, ErrorBody};
use crate::service::BatchCreateReport;

/// `GET /alunos`: List every student.
///
/// # Errors
///
/// Returns [`ApiError::Persistence`] on store failures.
#[utoipa::path(
    get,
    path = "/alunos",
    tag = "Alunos",
    summary = "List students",
    responses(
        (status = 200, description = "Student list", body = Vec<Student>),
    )
)]
pub async fn list_students(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.students.list().await?))
}

/// `POST /alunos`: Create a student.
///
/// # Errors
///
/// Returns [`ApiError::InvalidFields`] on field violations.
#[utoipa::path(
    post,
    path = "/alunos",
    tag = "Alunos",
    summary = "Create a student",
    request_body = StudentRequest,
    responses(
        (status = 201, description = "Student created", body = Student),
        (status = 400, description = "Invalid fields", body = ErrorBody),
    )
)]
pub async fn create_student(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<StudentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let student = state.students.create(req.into()).await?;
    let location = format!("/alunos/{}", student.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(student),
    ))
}

/// `GET /alunos/search`: Filter students by name fragment and age range.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] when a query parameter is malformed.
#[utoipa::path(
    get,
    path = "/alunos/search",
    tag = "Alunos",
    summary = "Search students",
    description = "Every parameter is optional; omitted ones do not filter. An inverted age range matches nobody.",
    params(StudentSearchQuery),
    responses(
        (status = 200, description = "Matching students", body = Vec<Student>),
        (status = 400, description = "Malformed query parameter", body = ErrorBody),
    )
)]
pub async fn search_students(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StudentSearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = StudentFilter::from(query);
    Ok(Json(state.students.search(&filter).await?))
}

/// `POST /alunos/lote`: Create several students at once.
///
/// Valid items are created even when others fail; failures are reported
/// by their position in the request array.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] when the array is empty.
#[utoipa::path(
    post,
    path = "/alunos/lote",
    tag = "Alunos",
    summary = "Batch create students",
    request_body = Vec<StudentRequest>,
    responses(
        (status = 201, description = "Created students and per-item failures", body = BatchCreateReport),
        (status = 400, description = "Empty batch", body = ErrorBody),
    )
)]
pub async fn batch_create_students(
    State(state): State<AppState>,
    ApiJson(items): ApiJson<Vec<StudentRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let drafts: Vec<StudentDraft> = items.into_iter().map(StudentDraft::from).collect();
    let report = state.students.batch_create(drafts).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// `GET /alunos/media-idade`: Average student age per school.
///
/// # Errors
///
/// Returns [`ApiError::Persistence`] on store failures.
#[utoipa::path(
    get,
    path = "/alunos/media-idade",
    tag = "Alunos",
    summary = "Average age per school",
    description = "Maps each school ID to the average age of its enrolled students.",
    responses(
        (status = 200, description = "School ID to average age", body = std::collections::HashMap<String, f64>),
    )
)]
pub async fn average_age(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.students.average_age_by_school().await?))
}

/// `GET /alunos/{id}`: Get one student.
///
/// # Errors
///
/// Returns [`ApiError::StudentNotFound`] if the student does not exist.
#[utoipa::path(
    get,
    path = "/alunos/{id}",
    tag = "Alunos",
    summary = "Get a student",
    params(
        ("id" = i64, Path, description = "Student ID"),
    ),
    responses(
        (status = 200, description = "Student details", body = Student),
        (status = 404, description = "Student not found", body = ErrorBody),
    )
)]
pub async fn get_student(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<StudentId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.students.get(id).await?))
}

/// `HEAD /alunos/{id}`: Existence check.
///
/// # Errors
///
/// Returns [`ApiError::StudentNotFound`] if the student does not exist.
#[utoipa::path(
    head,
    path = "/alunos/{id}",
    tag = "Alunos",
    summary = "Check student existence",
    params(
        ("id" = i64, Path, description = "Student ID"),
    ),
    responses(
        (status = 200, description = "Student exists"),
        (status = 404, description = "Student not found"),
    )
)]
pub async fn head_student(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<StudentId>,
) -> Result<impl IntoResponse, ApiError> {
    if state.students.exists(id).await? {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::StudentNotFound(id))
    }
}

/// `PUT /alunos/{id}`: Replace a student's fields.
///
/// # Errors
///
/// Returns [`ApiError::StudentNotFound`] or [`ApiError::InvalidFields`].
#[utoipa::path(
    put,
    path = "/alunos/{id}",
    tag = "Alunos",
    summary = "Update a student",
    params(
        ("id" = i64, Path, description = "Student ID"),
    ),
    request_body = StudentRequest,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 400, description = "Invalid fields", body = ErrorBody),
        (status = 404, description = "Student not found", body = ErrorBody),
    )
)]
pub async fn update_student(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<StudentId>,
    ApiJson(req): ApiJson<StudentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.students.update(id, req.into()).await?))
}

/// `DELETE /alunos/{id}`: Delete a student and their enrollments.
///
/// # Errors
///
/// Returns [`ApiError::StudentNotFound`] if the student does not exist.
#[utoipa::path(
    delete,
    path = "/alunos/{id}",
    tag = "Alunos",
    summary = "Delete a student",
    params(
        ("id" = i64, Path, description = "Student ID"),
    ),
    responses(
        (status = 204, description = "Student deleted"),
        (status = 404, description = "Student not found", body = ErrorBody),
    )
)]
pub async fn delete_student(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<StudentId>,
) -> Result<impl IntoResponse, ApiError> {
    state.students.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PATCH /alunos/{id}/status`: Activate or deactivate a student.
///
/// # Errors
///
/// Returns [`ApiError::StudentNotFound`] if the student does not exist.
#[utoipa::path(
    patch,
    path = "/alunos/{id}/status",
    tag = "Alunos",
    summary = "Set student active flag",
    params(
        ("id" = i64, Path, description = "Student ID"),
    ),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Status changed", body = Student),
        (status = 404, description = "Student not found", body = ErrorBody),
    )
)]
pub async fn set_student_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<StudentId>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.students.set_active(id, req.active).await?))
}

/// `GET /alunos/{id}/matriculas`: Enrollments of one student.
///
/// # Errors
///
/// Returns [`ApiError::StudentNotFound`] if the student does not exist.
#[utoipa::path(
    get,
    path = "/alunos/{id}/matriculas",
    tag = "Alunos",
    summary = "List a student's enrollments",
    params(
        ("id" = i64, Path, description = "Student ID"),
    ),
    responses(
        (status = 200, description = "Enrollments of every status", body = Vec<Enrollment>),
        (status = 404, description = "Student not found", body = ErrorBody),
    )
)]
pub async fn student_enrollments(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<StudentId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.students.enrollments(id).await?))
}

/// Student routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/alunos", get(list_students).post(create_student))
        .route("/alunos/search", get(search_students))
        .route("/alunos/lote", post(batch_create_students))
        .route("/alunos/media-idade", get(average_age))
        .route(
            "/alunos/{id}",
            get(get_student)
                .head(head_student)
                .put(update_student)
                .delete(delete_student),
        )
        .route("/alunos/{id}/status", patch(set_student_status))
        .route("/alunos/{id}/matriculas", get(student_enrollments))
}
