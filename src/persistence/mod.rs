//! Persistence layer: the entity store and its two implementations.
//!
//! Services never talk to a database handle directly. They open a
//! transaction with [`Store::begin`], issue reads and writes through the
//! returned [`StoreTx`], and finish with [`StoreTx::commit`]. Dropping a
//! transaction without committing rolls it back.
//!
//! - [`postgres::PostgresStore`]: `sqlx::PgPool`, one database
//!   transaction per call, `SELECT ... FOR UPDATE` on school rows.
//! - [`memory::MemoryStore`]: in-process tables behind a single
//!   `tokio::sync::RwLock`; a transaction holds the write guard for its
//!   whole lifetime.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

use crate::domain::{
    Enrollment, EnrollmentId, NewEnrollment, NewSchool, NewStudent, School, SchoolId, Student,
    StudentId,
};
use crate::error::ApiError;

pub mod memory;
mod models;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Factory for store transactions.
#[async_trait]
pub trait Store: Send + Sync + fmt::Debug {
    /// Opens a new transaction.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] when the backend is unreachable.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, ApiError>;
}

/// Operations available inside one store transaction.
///
/// Writes become visible to other transactions only after
/// [`StoreTx::commit`]. Every method fails with
/// [`ApiError::Persistence`] on backend errors.
#[allow(clippy::missing_errors_doc)]
#[async_trait]
pub trait StoreTx: Send {
    // ── schools ─────────────────────────────────────────────────────

    /// Inserts a school; `active` defaults to `true`.
    async fn insert_school(&mut self, school: &NewSchool) -> Result<School, ApiError>;

    /// Reads a school by key.
    async fn find_school(&mut self, id: SchoolId) -> Result<Option<School>, ApiError>;

    /// Reads a school and locks its row until the transaction ends.
    async fn lock_school(&mut self, id: SchoolId) -> Result<Option<School>, ApiError>;

    /// All schools ordered by key.
    async fn list_schools(&mut self) -> Result<Vec<School>, ApiError>;

    /// Overwrites every mutable column of an existing school.
    async fn update_school(&mut self, school: &School) -> Result<School, ApiError>;

    /// Deletes a school and its enrollments. Returns `false` if absent.
    async fn delete_school(&mut self, id: SchoolId) -> Result<bool, ApiError>;

    /// Case-insensitive check whether another school already uses `name`.
    async fn school_name_taken(
        &mut self,
        name: &str,
        except: Option<SchoolId>,
    ) -> Result<bool, ApiError>;

    // ── students ────────────────────────────────────────────────────

    /// Inserts a student; `active` defaults to `true`.
    async fn insert_student(&mut self, student: &NewStudent) -> Result<Student, ApiError>;

    /// Reads a student by key.
    async fn find_student(&mut self, id: StudentId) -> Result<Option<Student>, ApiError>;

    /// All students ordered by key.
    async fn list_students(&mut self) -> Result<Vec<Student>, ApiError>;

    /// Overwrites every mutable column of an existing student.
    async fn update_student(&mut self, student: &Student) -> Result<Student, ApiError>;

    /// Deletes a student and its enrollments. Returns `false` if absent.
    async fn delete_student(&mut self, id: StudentId) -> Result<bool, ApiError>;

    // ── enrollments ─────────────────────────────────────────────────

    /// Inserts an enrollment.
    async fn insert_enrollment(&mut self, enrollment: &NewEnrollment)
    -> Result<Enrollment, ApiError>;

    /// Reads an enrollment by key.
    async fn find_enrollment(&mut self, id: EnrollmentId) -> Result<Option<Enrollment>, ApiError>;

    /// All enrollments ordered by key.
    async fn list_enrollments(&mut self) -> Result<Vec<Enrollment>, ApiError>;

    /// Enrollments of one student ordered by key.
    async fn list_enrollments_by_student(
        &mut self,
        student_id: StudentId,
    ) -> Result<Vec<Enrollment>, ApiError>;

    /// Overwrites status, dates, notes and `updated_at` of an enrollment.
    async fn update_enrollment(&mut self, enrollment: &Enrollment)
    -> Result<Enrollment, ApiError>;

    /// Number of ACTIVE enrollments at a school.
    async fn count_active_enrollments(&mut self, school_id: SchoolId) -> Result<i64, ApiError>;

    /// Whether the student holds an ACTIVE enrollment at the school,
    /// ignoring `except`.
    async fn has_active_enrollment(
        &mut self,
        student_id: StudentId,
        school_id: SchoolId,
        except: Option<EnrollmentId>,
    ) -> Result<bool, ApiError>;

    /// ACTIVE enrollment counts for every school that has at least one.
    async fn active_counts(&mut self) -> Result<HashMap<SchoolId, i64>, ApiError>;

    // ── lifecycle ───────────────────────────────────────────────────

    /// Makes every write of this transaction durable.
    async fn commit(self: Box<Self>) -> Result<(), ApiError>;
}
