//! REST API layer: route handlers, DTOs, middleware and router composition.
//!
//! Resources are mounted at the root (`/escolas`, `/alunos`,
//! `/matriculas`, `/relatorios`, `/export`). The OpenAPI document is
//! served at `/api-docs/openapi.json` with Swagger UI at `/swagger-ui`
//! when the `swagger-ui` feature is enabled.

pub mod dto;
pub mod handlers;
pub mod middleware;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI description of every endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "Escola API",
        description = "Schools, students and enrollments with capacity-aware enrollment lifecycle."
    ),
    paths(
        handlers::school::list_schools,
        handlers::school::create_school,
        handlers::school::list_available,
        handlers::school::get_school,
        handlers::school::update_school,
        handlers::school::delete_school,
        handlers::school::update_capacity,
        handlers::school::capacity_options,
        handlers::school::set_school_status,
        handlers::school::school_occupancy,
        handlers::student::list_students,
        handlers::student::create_student,
        handlers::student::search_students,
        handlers::student::batch_create_students,
        handlers::student::average_age,
        handlers::student::get_student,
        handlers::student::head_student,
        handlers::student::update_student,
        handlers::student::delete_student,
        handlers::student::set_student_status,
        handlers::student::student_enrollments,
        handlers::enrollment::list_enrollments,
        handlers::enrollment::create_enrollment,
        handlers::enrollment::get_enrollment,
        handlers::enrollment::cancel_enrollment,
        handlers::enrollment::set_enrollment_status,
        handlers::enrollment::transition_enrollment,
        handlers::enrollment::batch_update_status,
        handlers::report::occupancy_ranking,
        handlers::report::school_occupancy_report,
        handlers::report::growth_report,
        handlers::report::attrition_report,
        handlers::report::average_age_report,
        handlers::export::export_students,
        handlers::export::export_schools,
        handlers::export::export_enrollments,
        handlers::system::health_handler,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::FieldError,
        crate::error::BatchFailure,
        crate::domain::EnrollmentStatus,
    )),
    tags(
        (name = "Escolas", description = "School management and capacity"),
        (name = "Alunos", description = "Student management"),
        (name = "Matriculas", description = "Enrollment lifecycle"),
        (name = "Relatorios", description = "Read-only reports"),
        (name = "Export", description = "CSV export"),
        (name = "System", description = "Health check"),
    )
)]
pub struct ApiDoc;

/// Builds the complete router with every endpoint and the request
/// middleware, bound to `state`.
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .merge(handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
        .layer(axum::middleware::from_fn(middleware::idempotency_key))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_api_key,
        ))
        .layer(axum::middleware::from_fn(middleware::stamp_error_path))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_resource() {
        let doc = ApiDoc::openapi();
        for path in [
            "/escolas",
            "/escolas/{id}/capacidade",
            "/alunos/{id}",
            "/alunos/lote",
            "/matriculas/lote/status",
            "/matriculas/{id}/situacao",
            "/relatorios/alunos/evasao",
            "/export/alunos/csv",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
