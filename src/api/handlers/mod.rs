//! REST endpoint handlers organized by resource.

pub mod enrollment;
pub mod export;
pub mod report;
pub mod school;
pub mod student;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes. `/health` is merged separately.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(school::routes())
        .merge(student::routes())
        .merge(enrollment::routes())
        .merge(report::routes())
        .merge(export::routes())
}
