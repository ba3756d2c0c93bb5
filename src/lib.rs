//! # escola-api
//!
//! REST API for schools (`escolas`), students (`alunos`) and enrollments
//! (`matriculas`).
//!
//! The enrollment lifecycle is the core: an ACTIVE enrollment occupies a
//! seat, a school never holds more ACTIVE enrollments than its capacity,
//! and a student holds at most one ACTIVE enrollment per school. Creation
//! and activation lock the school before counting seats, so concurrent
//! requests cannot overfill it.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── Middleware (api/middleware): API key, rate limit,
//!     │   Idempotency-Key echo, error path stamping
//!     ├── REST Handlers (api/handlers)
//!     │
//!     ├── Services (service/): schools, students, enrollments, reports
//!     ├── Domain types and validation (domain/)
//!     │
//!     └── Store (persistence/): PostgreSQL or in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
