//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::api::middleware::RateLimiter;
use crate::config::AppConfig;
use crate::persistence::Store;
use crate::service::{EnrollmentService, ReportService, SchoolService, StudentService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// School CRUD, capacity and occupancy.
    pub schools: Arc<SchoolService>,
    /// Student CRUD, search and batch creation.
    pub students: Arc<StudentService>,
    /// Enrollment lifecycle.
    pub enrollments: Arc<EnrollmentService>,
    /// Read-only aggregations.
    pub reports: Arc<ReportService>,
    /// Runtime configuration, read by the middleware.
    pub config: Arc<AppConfig>,
    /// Fixed-window request counter.
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wires every service to the same store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
        let rate_limiter = RateLimiter::new(
            config.rate_limit_max_requests,
            std::time::Duration::from_millis(config.rate_limit_window_ms),
        );
        Self {
            schools: Arc::new(SchoolService::new(Arc::clone(&store))),
            students: Arc::new(StudentService::new(Arc::clone(&store))),
            enrollments: Arc::new(EnrollmentService::new(Arc::clone(&store))),
            reports: Arc::new(ReportService::new(store)),
            config: Arc::new(config),
            rate_limiter: Arc::new(rate_limiter),
        }
    }
}
