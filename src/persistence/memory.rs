//! In-process entity store.
//!
//! [`MemoryStore`] keeps the three tables in `BTreeMap`s behind one
//! [`tokio::sync::RwLock`]. A transaction takes the write guard, works on
//! a private copy of the tables and swaps it in on commit, so concurrent
//! transactions are fully serialized and an uncommitted transaction
//! leaves no trace.
//!
//! Used by the test suites and when `PERSISTENCE_ENABLED=false`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use super::{Store, StoreTx};
use crate::domain::{
    Enrollment, EnrollmentId, EnrollmentStatus, NewEnrollment, NewSchool, NewStudent, School,
    SchoolId, Student, StudentId,
};
use crate::error::ApiError;

#[derive(Debug, Clone, Default)]
struct Tables {
    schools: BTreeMap<SchoolId, School>,
    students: BTreeMap<StudentId, Student>,
    enrollments: BTreeMap<EnrollmentId, Enrollment>,
    last_school_id: i64,
    last_student_id: i64,
    last_enrollment_id: i64,
}

/// Entity store living in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, ApiError> {
        let guard = Arc::clone(&self.tables).write_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

struct MemoryTx {
    guard: OwnedRwLockWriteGuard<Tables>,
    work: Tables,
}

impl MemoryTx {
    fn active_at(&self, school_id: SchoolId) -> impl Iterator<Item = &Enrollment> {
        self.work
            .enrollments
            .values()
            .filter(move |e| e.school_id == school_id && e.status.is_active())
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn insert_school(&mut self, school: &NewSchool) -> Result<School, ApiError> {
        if name_in_use(&self.work, &school.name, None) {
            return Err(duplicate_school_name(&school.name));
        }
        self.work.last_school_id += 1;
        let row = School {
            id: SchoolId::new(self.work.last_school_id),
            name: school.name.clone(),
            capacity: school.capacity,
            address: school.address.clone(),
            phone: school.phone.clone(),
            email: school.email.clone(),
            director: school.director.clone(),
            active: school.active.unwrap_or(true),
            created_at: Utc::now(),
            updated_at: None,
        };
        self.work.schools.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_school(&mut self, id: SchoolId) -> Result<Option<School>, ApiError> {
        Ok(self.work.schools.get(&id).cloned())
    }

    async fn lock_school(&mut self, id: SchoolId) -> Result<Option<School>, ApiError> {
        // The transaction already holds the only write guard.
        Ok(self.work.schools.get(&id).cloned())
    }

    async fn list_schools(&mut self) -> Result<Vec<School>, ApiError> {
        Ok(self.work.schools.values().cloned().collect())
    }

    async fn update_school(&mut self, school: &School) -> Result<School, ApiError> {
        if !self.work.schools.contains_key(&school.id) {
            return Err(ApiError::SchoolNotFound(school.id));
        }
        if name_in_use(&self.work, &school.name, Some(school.id)) {
            return Err(duplicate_school_name(&school.name));
        }
        self.work.schools.insert(school.id, school.clone());
        Ok(school.clone())
    }

    async fn delete_school(&mut self, id: SchoolId) -> Result<bool, ApiError> {
        if self.work.schools.remove(&id).is_none() {
            return Ok(false);
        }
        self.work.enrollments.retain(|_, e| e.school_id != id);
        Ok(true)
    }

    async fn school_name_taken(
        &mut self,
        name: &str,
        except: Option<SchoolId>,
    ) -> Result<bool, ApiError> {
        Ok(name_in_use(&self.work, name, except))
    }

    async fn insert_student(&mut self, student: &NewStudent) -> Result<Student, ApiError> {
        self.work.last_student_id += 1;
        let row = Student {
            id: StudentId::new(self.work.last_student_id),
            name: student.name.clone(),
            age: student.age,
            birth_date: student.birth_date,
            guardian_name: student.guardian_name.clone(),
            guardian_phone: student.guardian_phone.clone(),
            guardian_email: student.guardian_email.clone(),
            address: student.address.clone(),
            notes: student.notes.clone(),
            active: student.active.unwrap_or(true),
            created_at: Utc::now(),
            updated_at: None,
        };
        self.work.students.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_student(&mut self, id: StudentId) -> Result<Option<Student>, ApiError> {
        Ok(self.work.students.get(&id).cloned())
    }

    async fn list_students(&mut self) -> Result<Vec<Student>, ApiError> {
        Ok(self.work.students.values().cloned().collect())
    }

    async fn update_student(&mut self, student: &Student) -> Result<Student, ApiError> {
        if !self.work.students.contains_key(&student.id) {
            return Err(ApiError::StudentNotFound(student.id));
        }
        self.work.students.insert(student.id, student.clone());
        Ok(student.clone())
    }

    async fn delete_student(&mut self, id: StudentId) -> Result<bool, ApiError> {
        if self.work.students.remove(&id).is_none() {
            return Ok(false);
        }
        self.work.enrollments.retain(|_, e| e.student_id != id);
        Ok(true)
    }

    async fn insert_enrollment(
        &mut self,
        enrollment: &NewEnrollment,
    ) -> Result<Enrollment, ApiError> {
        if !self.work.schools.contains_key(&enrollment.school_id) {
            return Err(ApiError::SchoolNotFound(enrollment.school_id));
        }
        if !self.work.students.contains_key(&enrollment.student_id) {
            return Err(ApiError::StudentNotFound(enrollment.student_id));
        }
        self.work.last_enrollment_id += 1;
        let row = Enrollment {
            id: EnrollmentId::new(self.work.last_enrollment_id),
            student_id: enrollment.student_id,
            school_id: enrollment.school_id,
            enrolled_at: enrollment.enrolled_at,
            start_date: enrollment.start_date,
            end_date: enrollment.end_date,
            status: enrollment.status,
            notes: enrollment.notes.clone(),
            created_at: Utc::now(),
            updated_at: None,
        };
        self.work.enrollments.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_enrollment(&mut self, id: EnrollmentId) -> Result<Option<Enrollment>, ApiError> {
        Ok(self.work.enrollments.get(&id).cloned())
    }

    async fn list_enrollments(&mut self) -> Result<Vec<Enrollment>, ApiError> {
        Ok(self.work.enrollments.values().cloned().collect())
    }

    async fn list_enrollments_by_student(
        &mut self,
        student_id: StudentId,
    ) -> Result<Vec<Enrollment>, ApiError> {
        Ok(self
            .work
            .enrollments
            .values()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn update_enrollment(
        &mut self,
        enrollment: &Enrollment,
    ) -> Result<Enrollment, ApiError> {
        let Some(row) = self.work.enrollments.get_mut(&enrollment.id) else {
            return Err(ApiError::EnrollmentNotFound(enrollment.id));
        };
        row.status = enrollment.status;
        row.start_date = enrollment.start_date;
        row.end_date = enrollment.end_date;
        row.notes.clone_from(&enrollment.notes);
        row.updated_at = enrollment.updated_at;
        Ok(row.clone())
    }

    async fn count_active_enrollments(&mut self, school_id: SchoolId) -> Result<i64, ApiError> {
        let count = self.active_at(school_id).count();
        i64::try_from(count).map_err(|e| ApiError::Internal(e.to_string()))
    }

    async fn has_active_enrollment(
        &mut self,
        student_id: StudentId,
        school_id: SchoolId,
        except: Option<EnrollmentId>,
    ) -> Result<bool, ApiError> {
        Ok(self
            .active_at(school_id)
            .any(|e| e.student_id == student_id && Some(e.id) != except))
    }

    async fn active_counts(&mut self) -> Result<HashMap<SchoolId, i64>, ApiError> {
        let mut counts = HashMap::new();
        for enrollment in self.work.enrollments.values() {
            if enrollment.status == EnrollmentStatus::Active {
                *counts.entry(enrollment.school_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn commit(self: Box<Self>) -> Result<(), ApiError> {
        let Self { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

fn name_in_use(tables: &Tables, name: &str, except: Option<SchoolId>) -> bool {
    let wanted = name.trim().to_lowercase();
    tables
        .schools
        .values()
        .any(|s| Some(s.id) != except && s.name.to_lowercase() == wanted)
}

fn duplicate_school_name(name: &str) -> ApiError {
    ApiError::Validation(format!("Já existe uma escola com o nome '{name}'."))
}
