//! Domain layer: entity types, identifiers, validation, and the
//! enrollment status state machine.
//!
//! Everything here is storage-agnostic. Drafts (`*Draft`) carry client
//! input as received; `validate` turns them into the `New*` values the
//! store accepts.

pub mod enrollment;
pub mod ids;
pub mod school;
pub mod student;
pub mod validation;

pub use enrollment::{
    Enrollment, EnrollmentDraft, EnrollmentRequest, EnrollmentStatus, NewEnrollment,
};
pub use ids::{EnrollmentId, SchoolId, StudentId};
pub use school::{NewSchool, Occupancy, School, SchoolDraft};
pub use student::{NewStudent, Student, StudentDraft, StudentFilter};
