//! Enrollment service: creation, status changes and cancellation.
//!
//! Every path that can produce an ACTIVE enrollment locks the school row
//! first and then checks, in the same transaction:
//!
//! 1. the school and the student are active,
//! 2. the school still has a free seat,
//! 3. the student holds no other ACTIVE enrollment at that school.
//!
//! Batch updates run one transaction per ID and report failures without
//! rolling back the IDs that succeeded.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::domain::{
    Enrollment, EnrollmentDraft, EnrollmentId, EnrollmentStatus, NewEnrollment,
};
use crate::error::{ApiError, BatchFailure};
use crate::persistence::{Store, StoreTx};

/// Business logic for enrollments.
#[derive(Debug, Clone)]
pub struct EnrollmentService {
    store: Arc<dyn Store>,
}

impl EnrollmentService {
    /// Creates a new `EnrollmentService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Enrolls a student in a school.
    ///
    /// The enrollment starts ACTIVE unless the draft asks for an inactive
    /// one, in which case it starts PENDING and the seat and duplicate
    /// checks are deferred to its activation.
    ///
    /// # Errors
    ///
    /// - [`ApiError::InvalidFields`] for missing references or a bad date range.
    /// - [`ApiError::SchoolNotFound`] / [`ApiError::StudentNotFound`].
    /// - [`ApiError::Validation`] when the school or the student is
    ///   inactive, the school is full, or the student is already enrolled.
    pub async fn create(&self, draft: EnrollmentDraft) -> Result<Enrollment, ApiError> {
        let now = Utc::now();
        let request = draft.validate(now.date_naive())?;

        let mut tx = self.store.begin().await?;
        let school = tx
            .lock_school(request.school_id)
            .await?
            .ok_or(ApiError::SchoolNotFound(request.school_id))?;
        let student = tx
            .find_student(request.student_id)
            .await?
            .ok_or(ApiError::StudentNotFound(request.student_id))?;

        if !school.active {
            return Err(ApiError::Validation(
                "Não é possível matricular em uma escola inativa.".to_string(),
            ));
        }
        if !student.active {
            return Err(ApiError::Validation(
                "Não é possível matricular um aluno inativo.".to_string(),
            ));
        }
        if request.initial_status.is_active() {
            let active = tx.count_active_enrollments(school.id).await?;
            if active >= i64::from(school.capacity) {
                return Err(ApiError::Validation(format!(
                    "A escola '{}' está lotada: capacidade máxima de {} alunos atingida.",
                    school.name, school.capacity
                )));
            }
            if tx
                .has_active_enrollment(student.id, school.id, None)
                .await?
            {
                return Err(ApiError::Validation(
                    "O aluno já possui uma matrícula ATIVA nesta escola.".to_string(),
                ));
            }
        }

        let enrollment = tx
            .insert_enrollment(&NewEnrollment {
                student_id: request.student_id,
                school_id: request.school_id,
                enrolled_at: now,
                start_date: request.start_date,
                end_date: request.end_date,
                status: request.initial_status,
                notes: request.notes,
            })
            .await?;
        tx.commit().await?;

        tracing::info!(
            enrollment_id = %enrollment.id,
            student_id = %enrollment.student_id,
            school_id = %enrollment.school_id,
            status = %enrollment.status,
            "enrollment created"
        );
        Ok(enrollment)
    }

    /// Returns one enrollment.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EnrollmentNotFound`] if it does not exist.
    pub async fn get(&self, id: EnrollmentId) -> Result<Enrollment, ApiError> {
        let mut tx = self.store.begin().await?;
        tx.find_enrollment(id)
            .await?
            .ok_or(ApiError::EnrollmentNotFound(id))
    }

    /// Returns every enrollment ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on store failure.
    pub async fn list(&self) -> Result<Vec<Enrollment>, ApiError> {
        let mut tx = self.store.begin().await?;
        tx.list_enrollments().await
    }

    /// Sets an enrollment ACTIVE (`true`) or CANCELLED (`false`).
    ///
    /// Moving a non-ACTIVE enrollment to ACTIVE re-runs the activation
    /// checks. Deactivating records today as the end date when none is
    /// set.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EnrollmentNotFound`] if it does not exist and
    /// [`ApiError::Validation`] when an activation check fails.
    pub async fn update_status(
        &self,
        id: EnrollmentId,
        active: bool,
    ) -> Result<Enrollment, ApiError> {
        let mut tx = self.store.begin().await?;
        let mut enrollment = tx
            .find_enrollment(id)
            .await?
            .ok_or(ApiError::EnrollmentNotFound(id))?;

        let previous = enrollment.status;
        if active {
            if !previous.is_active() {
                ensure_can_activate(tx.as_mut(), &enrollment, REACTIVATE).await?;
            }
            reopen(&mut enrollment);
        } else {
            close(&mut enrollment, EnrollmentStatus::Cancelled, today());
        }
        enrollment.updated_at = Some(Utc::now());
        let enrollment = tx.update_enrollment(&enrollment).await?;
        tx.commit().await?;

        tracing::info!(enrollment_id = %id, from = %previous, to = %enrollment.status, "enrollment status updated");
        Ok(enrollment)
    }

    /// Applies [`Self::update_status`] to every ID, each in its own
    /// transaction. Duplicate IDs are processed once.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Validation`] for an empty ID list.
    /// - [`ApiError::NoneFound`] when no ID exists.
    /// - [`ApiError::BatchPartial`] when at least one ID failed; the
    ///   others stay applied.
    pub async fn batch_update_status(
        &self,
        ids: &[EnrollmentId],
        active: bool,
    ) -> Result<Vec<Enrollment>, ApiError> {
        if ids.is_empty() {
            return Err(ApiError::Validation(
                "Nenhum ID de matrícula fornecido.".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        let unique: Vec<EnrollmentId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let mut updated = Vec::with_capacity(unique.len());
        let mut failures = Vec::new();
        let mut missing = 0usize;
        for id in &unique {
            match self.update_status(*id, active).await {
                Ok(enrollment) => updated.push(enrollment),
                Err(ApiError::EnrollmentNotFound(_)) => {
                    missing += 1;
                    failures.push(BatchFailure {
                        enrollment_id: *id,
                        message: "Matrícula não encontrada.".to_string(),
                    });
                }
                Err(ApiError::Validation(message)) => failures.push(BatchFailure {
                    enrollment_id: *id,
                    message,
                }),
                Err(other) => return Err(other),
            }
        }

        tracing::info!(
            requested = unique.len(),
            updated = updated.len(),
            failed = failures.len(),
            active,
            "enrollment batch status update"
        );
        if missing == unique.len() {
            return Err(ApiError::NoneFound);
        }
        if !failures.is_empty() {
            return Err(ApiError::BatchPartial {
                updated: updated.len(),
                failures,
            });
        }
        Ok(updated)
    }

    /// Cancels an enrollment, recording today as its end date when none is
    /// set.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EnrollmentNotFound`] if it does not exist and
    /// [`ApiError::Validation`] if it is already cancelled.
    pub async fn cancel(&self, id: EnrollmentId) -> Result<Enrollment, ApiError> {
        let mut tx = self.store.begin().await?;
        let mut enrollment = tx
            .find_enrollment(id)
            .await?
            .ok_or(ApiError::EnrollmentNotFound(id))?;
        if enrollment.status == EnrollmentStatus::Cancelled {
            return Err(ApiError::Validation(
                "A matrícula já está cancelada.".to_string(),
            ));
        }
        close(&mut enrollment, EnrollmentStatus::Cancelled, today());
        enrollment.updated_at = Some(Utc::now());
        let enrollment = tx.update_enrollment(&enrollment).await?;
        tx.commit().await?;

        tracing::info!(enrollment_id = %id, "enrollment cancelled");
        Ok(enrollment)
    }

    /// Moves an enrollment along one edge of the status state machine.
    ///
    /// Edges into ACTIVE run the activation checks; edges into CANCELLED
    /// or COMPLETED record today as the end date when none is set.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EnrollmentNotFound`] if it does not exist and
    /// [`ApiError::Validation`] for an edge the state machine does not
    /// allow or a failed activation check.
    pub async fn transition(
        &self,
        id: EnrollmentId,
        target: EnrollmentStatus,
    ) -> Result<Enrollment, ApiError> {
        let mut tx = self.store.begin().await?;
        let mut enrollment = tx
            .find_enrollment(id)
            .await?
            .ok_or(ApiError::EnrollmentNotFound(id))?;

        let previous = enrollment.status;
        if !previous.can_transition_to(target) {
            return Err(ApiError::Validation(format!(
                "Transição de status inválida: {previous} → {target}."
            )));
        }
        match target {
            EnrollmentStatus::Active => {
                let prefix = if previous == EnrollmentStatus::Pending {
                    ACTIVATE
                } else {
                    REACTIVATE
                };
                ensure_can_activate(tx.as_mut(), &enrollment, prefix).await?;
                reopen(&mut enrollment);
            }
            EnrollmentStatus::Cancelled | EnrollmentStatus::Completed => {
                close(&mut enrollment, target, today());
            }
            EnrollmentStatus::Suspended | EnrollmentStatus::Pending => {
                enrollment.status = target;
            }
        }
        enrollment.updated_at = Some(Utc::now());
        let enrollment = tx.update_enrollment(&enrollment).await?;
        tx.commit().await?;

        tracing::info!(enrollment_id = %id, from = %previous, to = %target, "enrollment transitioned");
        Ok(enrollment)
    }
}

const ACTIVATE: &str = "Não é possível ativar a matrícula";
const REACTIVATE: &str = "Não é possível reativar a matrícula";

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Sets a terminal status and fills the end date, never before the start
/// date.
fn close(enrollment: &mut Enrollment, status: EnrollmentStatus, today: NaiveDate) {
    enrollment.status = status;
    if enrollment.end_date.is_none() {
        enrollment.end_date = Some(today.max(enrollment.start_date));
    }
}

/// Makes an enrollment ACTIVE. Leaving CANCELLED drops the end date so the
/// next cancellation records its own.
fn reopen(enrollment: &mut Enrollment) {
    if enrollment.status == EnrollmentStatus::Cancelled {
        enrollment.end_date = None;
    }
    enrollment.status = EnrollmentStatus::Active;
}

/// Locks the school and runs the activation checks for `enrollment`.
async fn ensure_can_activate(
    tx: &mut dyn StoreTx,
    enrollment: &Enrollment,
    prefix: &str,
) -> Result<(), ApiError> {
    let school = tx
        .lock_school(enrollment.school_id)
        .await?
        .ok_or(ApiError::SchoolNotFound(enrollment.school_id))?;
    let student = tx
        .find_student(enrollment.student_id)
        .await?
        .ok_or(ApiError::StudentNotFound(enrollment.student_id))?;

    let active = tx.count_active_enrollments(school.id).await?;
    if active >= i64::from(school.capacity) {
        return Err(ApiError::Validation(format!(
            "{prefix}: a escola está lotada."
        )));
    }
    if !student.active {
        return Err(ApiError::Validation(format!(
            "{prefix}: o aluno está inativo."
        )));
    }
    if !school.active {
        return Err(ApiError::Validation(format!(
            "{prefix}: a escola está inativa."
        )));
    }
    if tx
        .has_active_enrollment(student.id, school.id, Some(enrollment.id))
        .await?
    {
        return Err(ApiError::Validation(format!(
            "{prefix}: o aluno já possui uma matrícula ATIVA nesta escola."
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::domain::{SchoolDraft, SchoolId, StudentDraft, StudentId};
    use crate::persistence::MemoryStore;
    use crate::service::{SchoolService, StudentService};

    struct Fixture {
        schools: SchoolService,
        students: StudentService,
        enrollments: EnrollmentService,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        Fixture {
            schools: SchoolService::new(Arc::clone(&store)),
            students: StudentService::new(Arc::clone(&store)),
            enrollments: EnrollmentService::new(store),
        }
    }

    async fn school(f: &Fixture, name: &str, capacity: i32) -> SchoolId {
        let Ok(school) = f
            .schools
            .create(SchoolDraft {
                name: Some(name.to_string()),
                capacity: Some(capacity),
                ..SchoolDraft::default()
            })
            .await
        else {
            panic!("school creation failed");
        };
        school.id
    }

    async fn student(f: &Fixture, name: &str) -> StudentId {
        let Ok(student) = f
            .students
            .create(StudentDraft {
                name: Some(name.to_string()),
                age: Some(11),
                birth_date: NaiveDate::from_ymd_opt(2013, 9, 2),
                ..StudentDraft::default()
            })
            .await
        else {
            panic!("student creation failed");
        };
        student.id
    }

    fn draft(student_id: StudentId, school_id: SchoolId) -> EnrollmentDraft {
        EnrollmentDraft {
            student_id: Some(student_id),
            school_id: Some(school_id),
            ..EnrollmentDraft::default()
        }
    }

    async fn enroll(f: &Fixture, student_id: StudentId, school_id: SchoolId) -> Enrollment {
        let Ok(enrollment) = f.enrollments.create(draft(student_id, school_id)).await else {
            panic!("enrollment failed");
        };
        enrollment
    }

    async fn active_count(f: &Fixture, school_id: SchoolId) -> i64 {
        let Ok(occ) = f.schools.occupancy(school_id).await else {
            panic!("occupancy failed");
        };
        occ.active_enrollments
    }

    #[tokio::test]
    async fn full_school_rejects_second_student() {
        let f = fixture();
        let s = school(&f, "Escola Pequena", 1).await;
        let a = student(&f, "Ana Souza").await;
        let b = student(&f, "Bruno Lima").await;

        let first = enroll(&f, a, s).await;
        assert_eq!(first.status, EnrollmentStatus::Active);
        assert_eq!(first.start_date, today());

        let Err(ApiError::Validation(msg)) = f.enrollments.create(draft(b, s)).await else {
            panic!("expected capacity error");
        };
        assert!(msg.contains("lotada"));
        assert_eq!(active_count(&f, s).await, 1);
    }

    #[tokio::test]
    async fn duplicate_active_enrollment_is_rejected() {
        let f = fixture();
        let s = school(&f, "Escola Central", 10).await;
        let a = student(&f, "Ana Souza").await;
        enroll(&f, a, s).await;

        let Err(ApiError::Validation(msg)) = f.enrollments.create(draft(a, s)).await else {
            panic!("expected duplicate error");
        };
        assert!(msg.contains("já possui"));
    }

    #[tokio::test]
    async fn inactive_school_or_student_blocks_enrollment() {
        let f = fixture();
        let s = school(&f, "Escola Central", 10).await;
        let a = student(&f, "Ana Souza").await;

        assert!(f.schools.set_active(s, false).await.is_ok());
        assert!(matches!(
            f.enrollments.create(draft(a, s)).await,
            Err(ApiError::Validation(_))
        ));

        assert!(f.schools.set_active(s, true).await.is_ok());
        assert!(f.students.set_active(a, false).await.is_ok());
        assert!(matches!(
            f.enrollments.create(draft(a, s)).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn missing_references_are_not_found() {
        let f = fixture();
        let s = school(&f, "Escola Central", 10).await;
        let a = student(&f, "Ana Souza").await;
        assert!(matches!(
            f.enrollments.create(draft(StudentId::new(404), s)).await,
            Err(ApiError::StudentNotFound(_))
        ));
        assert!(matches!(
            f.enrollments.create(draft(a, SchoolId::new(404))).await,
            Err(ApiError::SchoolNotFound(_))
        ));
    }

    #[tokio::test]
    async fn pending_enrollment_skips_seat_check_until_activation() {
        let f = fixture();
        let s = school(&f, "Escola Pequena", 1).await;
        let a = student(&f, "Ana Souza").await;
        let b = student(&f, "Bruno Lima").await;
        enroll(&f, a, s).await;

        let Ok(pending) = f
            .enrollments
            .create(EnrollmentDraft {
                active: Some(false),
                ..draft(b, s)
            })
            .await
        else {
            panic!("pending enrollment should be accepted");
        };
        assert_eq!(pending.status, EnrollmentStatus::Pending);

        let Err(ApiError::Validation(msg)) = f
            .enrollments
            .transition(pending.id, EnrollmentStatus::Active)
            .await
        else {
            panic!("activation should fail on a full school");
        };
        assert!(msg.contains("lotada"));
    }

    #[tokio::test]
    async fn cancel_twice_fails_and_sets_end_date() {
        let f = fixture();
        let s = school(&f, "Escola Central", 10).await;
        let a = student(&f, "Ana Souza").await;
        let e = enroll(&f, a, s).await;

        let Ok(cancelled) = f.enrollments.cancel(e.id).await else {
            panic!("cancel failed");
        };
        assert_eq!(cancelled.status, EnrollmentStatus::Cancelled);
        assert_eq!(cancelled.end_date, Some(today()));
        assert!(cancelled.updated_at.is_some());

        let Err(ApiError::Validation(msg)) = f.enrollments.cancel(e.id).await else {
            panic!("second cancel should fail");
        };
        assert_eq!(msg, "A matrícula já está cancelada.");
    }

    #[tokio::test]
    async fn reactivation_respects_capacity() {
        let f = fixture();
        let s = school(&f, "Escola Pequena", 1).await;
        let a = student(&f, "Ana Souza").await;
        let b = student(&f, "Bruno Lima").await;

        let ea = enroll(&f, a, s).await;
        assert!(f.enrollments.cancel(ea.id).await.is_ok());
        let eb = enroll(&f, b, s).await;

        let Err(ApiError::Validation(msg)) = f.enrollments.update_status(ea.id, true).await else {
            panic!("reactivation should fail while full");
        };
        assert_eq!(msg, "Não é possível reativar a matrícula: a escola está lotada.");

        assert!(f.enrollments.cancel(eb.id).await.is_ok());
        let Ok(reactivated) = f.enrollments.update_status(ea.id, true).await else {
            panic!("reactivation should succeed with a free seat");
        };
        assert_eq!(reactivated.status, EnrollmentStatus::Active);
        assert_eq!(active_count(&f, s).await, 1);
    }

    #[tokio::test]
    async fn reactivation_rejects_inactive_student() {
        let f = fixture();
        let s = school(&f, "Escola Central", 10).await;
        let a = student(&f, "Ana Souza").await;
        let e = enroll(&f, a, s).await;
        assert!(f.enrollments.update_status(e.id, false).await.is_ok());
        assert!(f.students.set_active(a, false).await.is_ok());

        let Err(ApiError::Validation(msg)) = f.enrollments.update_status(e.id, true).await else {
            panic!("reactivation should fail");
        };
        assert!(msg.contains("aluno está inativo"));
    }

    #[tokio::test]
    async fn batch_update_applies_valid_and_reports_invalid() {
        let f = fixture();
        let s = school(&f, "Escola Pequena", 1).await;
        let a = student(&f, "Ana Souza").await;
        let b = student(&f, "Bruno Lima").await;
        let ea = enroll(&f, a, s).await;
        assert!(f.enrollments.cancel(ea.id).await.is_ok());
        let Ok(eb) = f
            .enrollments
            .create(EnrollmentDraft {
                active: Some(false),
                ..draft(b, s)
            })
            .await
        else {
            panic!("pending enrollment failed");
        };

        // Only one seat: the first activation wins, the second is rejected.
        let result = f
            .enrollments
            .batch_update_status(&[ea.id, eb.id, EnrollmentId::new(999)], true)
            .await;
        let Err(ApiError::BatchPartial { updated, failures }) = result else {
            panic!("expected partial failure");
        };
        assert_eq!(updated, 1);
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].enrollment_id, eb.id);
        assert_eq!(failures[1].enrollment_id, EnrollmentId::new(999));

        let Ok(applied) = f.enrollments.get(ea.id).await else {
            panic!("get failed");
        };
        assert_eq!(applied.status, EnrollmentStatus::Active);
        assert_eq!(active_count(&f, s).await, 1);
    }

    #[tokio::test]
    async fn batch_update_edge_cases() {
        let f = fixture();
        assert!(matches!(
            f.enrollments.batch_update_status(&[], false).await,
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            f.enrollments
                .batch_update_status(&[EnrollmentId::new(1), EnrollmentId::new(2)], false)
                .await,
            Err(ApiError::NoneFound)
        ));

        let s = school(&f, "Escola Central", 10).await;
        let a = student(&f, "Ana Souza").await;
        let e = enroll(&f, a, s).await;
        let Ok(updated) = f
            .enrollments
            .batch_update_status(&[e.id, e.id], false)
            .await
        else {
            panic!("batch should succeed");
        };
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].status, EnrollmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn transition_follows_state_machine() {
        let f = fixture();
        let s = school(&f, "Escola Central", 10).await;
        let a = student(&f, "Ana Souza").await;
        let e = enroll(&f, a, s).await;

        let Ok(suspended) = f
            .enrollments
            .transition(e.id, EnrollmentStatus::Suspended)
            .await
        else {
            panic!("suspend failed");
        };
        assert_eq!(suspended.status, EnrollmentStatus::Suspended);
        assert_eq!(active_count(&f, s).await, 0);

        assert!(matches!(
            f.enrollments
                .transition(e.id, EnrollmentStatus::Completed)
                .await,
            Err(ApiError::Validation(_))
        ));

        let e2 = enroll(&f, a, s).await;
        let Ok(done) = f
            .enrollments
            .transition(e2.id, EnrollmentStatus::Completed)
            .await
        else {
            panic!("complete failed");
        };
        assert_eq!(done.status, EnrollmentStatus::Completed);
        assert!(done.end_date.is_some());
    }

    #[tokio::test]
    async fn capacity_holds_under_concurrent_enrollment() {
        let f = fixture();
        let s = school(&f, "Escola Pequena", 3).await;
        let mut ids = Vec::new();
        for i in 0..8 {
            ids.push(student(&f, &format!("Aluno {i:02}")).await);
        }

        let mut handles = Vec::new();
        for id in ids {
            let service = f.enrollments.clone();
            handles.push(tokio::spawn(async move { service.create(draft(id, s)).await }));
        }
        let mut ok = 0;
        for handle in handles {
            if let Ok(Ok(_)) = handle.await {
                ok += 1;
            }
        }
        assert_eq!(ok, 3);
        assert_eq!(active_count(&f, s).await, 3);
    }
}
