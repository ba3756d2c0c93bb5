//! Data Transfer Objects for REST request deserialization.
//!
//! Response bodies reuse the domain and service types directly; wire
//! names are Portuguese camelCase throughout.

pub mod common_dto;
pub mod enrollment_dto;
pub mod report_dto;
pub mod school_dto;
pub mod student_dto;

pub use common_dto::*;
pub use enrollment_dto::*;
pub use report_dto::*;
pub use school_dto::*;
pub use student_dto::*;
