//! Student service: CRUD, search, batch creation and per-school age
//! averages.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Enrollment, SchoolId, Student, StudentDraft, StudentFilter, StudentId};
use crate::error::{ApiError, FieldError};
use crate::persistence::Store;

/// Outcome of a batch creation: valid entries are stored, invalid ones
/// are reported by their position in the request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchCreateReport {
    /// Students that were created.
    #[serde(rename = "criados")]
    pub created: Vec<Student>,
    /// Entries that were rejected.
    #[serde(rename = "falhas")]
    pub failures: Vec<BatchCreateFailure>,
}

/// One rejected entry of a batch creation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchCreateFailure {
    /// Zero-based position in the submitted list.
    #[serde(rename = "indice")]
    pub index: usize,
    /// Violated field rules.
    #[serde(rename = "erros")]
    pub errors: Vec<FieldError>,
}

/// Business logic for students.
#[derive(Debug, Clone)]
pub struct StudentService {
    store: Arc<dyn Store>,
}

impl StudentService {
    /// Creates a new `StudentService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Validates and inserts a new student.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidFields`] when a field rule fails.
    pub async fn create(&self, draft: StudentDraft) -> Result<Student, ApiError> {
        let new = draft.validate()?;
        let mut tx = self.store.begin().await?;
        let student = tx.insert_student(&new).await?;
        tx.commit().await?;

        tracing::info!(student_id = %student.id, "student created");
        Ok(student)
    }

    /// Returns one student.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::StudentNotFound`] if it does not exist.
    pub async fn get(&self, id: StudentId) -> Result<Student, ApiError> {
        let mut tx = self.store.begin().await?;
        tx.find_student(id).await?.ok_or(ApiError::StudentNotFound(id))
    }

    /// Returns `true` if the student exists.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on store failure.
    pub async fn exists(&self, id: StudentId) -> Result<bool, ApiError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.find_student(id).await?.is_some())
    }

    /// Returns every student ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on store failure.
    pub async fn list(&self) -> Result<Vec<Student>, ApiError> {
        let mut tx = self.store.begin().await?;
        tx.list_students().await
    }

    /// Replaces the editable fields of a student. An absent `ativo` keeps
    /// the current flag.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::StudentNotFound`] if it does not exist and
    /// [`ApiError::InvalidFields`] when a field rule fails.
    pub async fn update(&self, id: StudentId, draft: StudentDraft) -> Result<Student, ApiError> {
        let new = draft.validate()?;
        let mut tx = self.store.begin().await?;
        let mut student = tx
            .find_student(id)
            .await?
            .ok_or(ApiError::StudentNotFound(id))?;

        student.name = new.name;
        student.age = new.age;
        student.birth_date = new.birth_date;
        student.guardian_name = new.guardian_name;
        student.guardian_phone = new.guardian_phone;
        student.guardian_email = new.guardian_email;
        student.address = new.address;
        student.notes = new.notes;
        student.active = new.active.unwrap_or(student.active);
        student.updated_at = Some(Utc::now());
        let student = tx.update_student(&student).await?;
        tx.commit().await?;

        tracing::info!(student_id = %id, "student updated");
        Ok(student)
    }

    /// Activates or deactivates a student. Existing enrollments keep their
    /// status.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::StudentNotFound`] if it does not exist.
    pub async fn set_active(&self, id: StudentId, active: bool) -> Result<Student, ApiError> {
        let mut tx = self.store.begin().await?;
        let mut student = tx
            .find_student(id)
            .await?
            .ok_or(ApiError::StudentNotFound(id))?;
        student.active = active;
        student.updated_at = Some(Utc::now());
        let student = tx.update_student(&student).await?;
        tx.commit().await?;

        tracing::info!(student_id = %id, active, "student status changed");
        Ok(student)
    }

    /// Deletes a student together with their enrollments.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::StudentNotFound`] if it does not exist.
    pub async fn delete(&self, id: StudentId) -> Result<(), ApiError> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_student(id).await? {
            return Err(ApiError::StudentNotFound(id));
        }
        tx.commit().await?;

        tracing::info!(student_id = %id, "student deleted");
        Ok(())
    }

    /// Returns the students matching every present filter; an empty list
    /// when nothing matches, including an inverted age range.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] if the store fails.
    pub async fn search(&self, filter: &StudentFilter) -> Result<Vec<Student>, ApiError> {
        let mut tx = self.store.begin().await?;
        let students = tx.list_students().await?;
        Ok(students.into_iter().filter(|s| filter.matches(s)).collect())
    }

    /// Creates every valid entry, each in its own transaction. Invalid
    /// entries are reported and do not affect the others.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for an empty list and
    /// [`ApiError::Persistence`] if the store fails.
    pub async fn batch_create(
        &self,
        drafts: Vec<StudentDraft>,
    ) -> Result<BatchCreateReport, ApiError> {
        if drafts.is_empty() {
            return Err(ApiError::Validation(
                "Nenhum aluno fornecido.".to_string(),
            ));
        }
        let mut report = BatchCreateReport {
            created: Vec::with_capacity(drafts.len()),
            failures: Vec::new(),
        };
        for (index, draft) in drafts.into_iter().enumerate() {
            match self.create(draft).await {
                Ok(student) => report.created.push(student),
                Err(ApiError::InvalidFields(errors)) => {
                    report.failures.push(BatchCreateFailure { index, errors });
                }
                Err(other) => return Err(other),
            }
        }

        tracing::info!(
            created = report.created.len(),
            rejected = report.failures.len(),
            "student batch processed"
        );
        Ok(report)
    }

    /// Returns every enrollment of a student, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::StudentNotFound`] if the student does not exist.
    pub async fn enrollments(&self, id: StudentId) -> Result<Vec<Enrollment>, ApiError> {
        let mut tx = self.store.begin().await?;
        if tx.find_student(id).await?.is_none() {
            return Err(ApiError::StudentNotFound(id));
        }
        tx.list_enrollments_by_student(id).await
    }

    /// Average age of enrolled students per school, over enrollments of
    /// any status. Schools without enrollments are absent.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on store failure.
    pub async fn average_age_by_school(&self) -> Result<BTreeMap<SchoolId, f64>, ApiError> {
        let mut tx = self.store.begin().await?;
        let students: BTreeMap<StudentId, i32> = tx
            .list_students()
            .await?
            .into_iter()
            .map(|s| (s.id, s.age))
            .collect();
        let enrollments = tx.list_enrollments().await?;

        let mut sums: BTreeMap<SchoolId, (i64, u32)> = BTreeMap::new();
        for enrollment in &enrollments {
            if let Some(age) = students.get(&enrollment.student_id) {
                let entry = sums.entry(enrollment.school_id).or_insert((0, 0));
                entry.0 += i64::from(*age);
                entry.1 += 1;
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let averages = sums
            .into_iter()
            .map(|(school_id, (sum, n))| (school_id, sum as f64 / f64::from(n)))
            .collect();
        Ok(averages)
    }
}
