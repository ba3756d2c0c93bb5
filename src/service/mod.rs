//! Service layer: business logic orchestration.
//!
//! Each service holds an `Arc<dyn Store>` and runs every call inside one
//! store transaction. [`EnrollmentService`] carries the capacity and
//! activity rules; the others are CRUD plus read-only aggregations.

pub mod enrollment_service;
pub mod export;
pub mod report_service;
pub mod school_service;
pub mod student_service;

pub use enrollment_service::EnrollmentService;
pub use report_service::{AttritionEntry, DateWindow, GrowthEntry, RankingEntry, ReportService};
pub use school_service::SchoolService;
pub use student_service::{BatchCreateFailure, BatchCreateReport, StudentService};
