//! PostgreSQL implementation of the entity store.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

use super::models::{
    ENROLLMENT_COLUMNS, EnrollmentRow, SCHOOL_COLUMNS, STUDENT_COLUMNS, SchoolRow, StudentRow,
};
use super::{Store, StoreTx};
use crate::config::AppConfig;
use crate::domain::{
    Enrollment, EnrollmentId, EnrollmentStatus, NewEnrollment, NewSchool, NewStudent, School,
    SchoolId, Student, StudentId,
};
use crate::error::ApiError;

/// Name of the unique index on `lower(nome)` of `escolas`.
const SCHOOL_NAME_INDEX: &str = "uq_escolas_nome";

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] if the database is unreachable.
    pub async fn connect(config: &AppConfig) -> Result<Self, ApiError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| ApiError::Persistence(e.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded migrations under `migrations/`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), ApiError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Persistence(e.to_string()))
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, ApiError> {
        let tx = self.pool.begin().await.map_err(db_error)?;
        Ok(Box::new(PgTx { tx }))
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn insert_school(&mut self, school: &NewSchool) -> Result<School, ApiError> {
        let sql = format!(
            "INSERT INTO escolas (nome, capacidade, endereco, telefone, email, diretor, ativo) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {SCHOOL_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SchoolRow>(&sql)
            .bind(&school.name)
            .bind(school.capacity)
            .bind(&school.address)
            .bind(&school.phone)
            .bind(&school.email)
            .bind(&school.director)
            .bind(school.active.unwrap_or(true))
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| school_write_error(e, &school.name))?;
        Ok(row.into())
    }

    async fn find_school(&mut self, id: SchoolId) -> Result<Option<School>, ApiError> {
        let sql = format!("SELECT {SCHOOL_COLUMNS} FROM escolas WHERE id = $1");
        let row = sqlx::query_as::<_, SchoolRow>(&sql)
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn lock_school(&mut self, id: SchoolId) -> Result<Option<School>, ApiError> {
        let sql = format!("SELECT {SCHOOL_COLUMNS} FROM escolas WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, SchoolRow>(&sql)
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn list_schools(&mut self) -> Result<Vec<School>, ApiError> {
        let sql = format!("SELECT {SCHOOL_COLUMNS} FROM escolas ORDER BY id");
        let rows = sqlx::query_as::<_, SchoolRow>(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_school(&mut self, school: &School) -> Result<School, ApiError> {
        let sql = format!(
            "UPDATE escolas SET nome = $2, capacidade = $3, endereco = $4, telefone = $5, \
             email = $6, diretor = $7, ativo = $8, data_atualizacao = $9 \
             WHERE id = $1 RETURNING {SCHOOL_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SchoolRow>(&sql)
            .bind(school.id.get())
            .bind(&school.name)
            .bind(school.capacity)
            .bind(&school.address)
            .bind(&school.phone)
            .bind(&school.email)
            .bind(&school.director)
            .bind(school.active)
            .bind(school.updated_at)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| school_write_error(e, &school.name))?;
        row.map(Into::into)
            .ok_or(ApiError::SchoolNotFound(school.id))
    }

    async fn delete_school(&mut self, id: SchoolId) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM escolas WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn school_name_taken(
        &mut self,
        name: &str,
        except: Option<SchoolId>,
    ) -> Result<bool, ApiError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM escolas \
             WHERE lower(nome) = lower($1) AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(name.trim())
        .bind(except.map(SchoolId::get))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error)
    }

    async fn insert_student(&mut self, student: &NewStudent) -> Result<Student, ApiError> {
        let sql = format!(
            "INSERT INTO alunos (nome, idade, data_nascimento, nome_responsavel, \
             telefone_responsavel, email_responsavel, endereco, observacoes, ativo) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {STUDENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, StudentRow>(&sql)
            .bind(&student.name)
            .bind(student.age)
            .bind(student.birth_date)
            .bind(&student.guardian_name)
            .bind(&student.guardian_phone)
            .bind(&student.guardian_email)
            .bind(&student.address)
            .bind(&student.notes)
            .bind(student.active.unwrap_or(true))
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_error)?;
        Ok(row.into())
    }

    async fn find_student(&mut self, id: StudentId) -> Result<Option<Student>, ApiError> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM alunos WHERE id = $1");
        let row = sqlx::query_as::<_, StudentRow>(&sql)
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn list_students(&mut self) -> Result<Vec<Student>, ApiError> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM alunos ORDER BY id");
        let rows = sqlx::query_as::<_, StudentRow>(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_student(&mut self, student: &Student) -> Result<Student, ApiError> {
        let sql = format!(
            "UPDATE alunos SET nome = $2, idade = $3, data_nascimento = $4, \
             nome_responsavel = $5, telefone_responsavel = $6, email_responsavel = $7, \
             endereco = $8, observacoes = $9, ativo = $10, data_atualizacao = $11 \
             WHERE id = $1 RETURNING {STUDENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, StudentRow>(&sql)
            .bind(student.id.get())
            .bind(&student.name)
            .bind(student.age)
            .bind(student.birth_date)
            .bind(&student.guardian_name)
            .bind(&student.guardian_phone)
            .bind(&student.guardian_email)
            .bind(&student.address)
            .bind(&student.notes)
            .bind(student.active)
            .bind(student.updated_at)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error)?;
        row.map(Into::into)
            .ok_or(ApiError::StudentNotFound(student.id))
    }

    async fn delete_student(&mut self, id: StudentId) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM alunos WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_enrollment(
        &mut self,
        enrollment: &NewEnrollment,
    ) -> Result<Enrollment, ApiError> {
        let sql = format!(
            "INSERT INTO matriculas (aluno_id, escola_id, data_matricula, data_inicio, data_fim, \
             status, observacoes) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {ENROLLMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EnrollmentRow>(&sql)
            .bind(enrollment.student_id.get())
            .bind(enrollment.school_id.get())
            .bind(enrollment.enrolled_at)
            .bind(enrollment.start_date)
            .bind(enrollment.end_date)
            .bind(enrollment.status.as_str())
            .bind(&enrollment.notes)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_error)?;
        row.try_into()
    }

    async fn find_enrollment(&mut self, id: EnrollmentId) -> Result<Option<Enrollment>, ApiError> {
        let sql = format!("SELECT {ENROLLMENT_COLUMNS} FROM matriculas WHERE id = $1");
        let row = sqlx::query_as::<_, EnrollmentRow>(&sql)
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_enrollments(&mut self) -> Result<Vec<Enrollment>, ApiError> {
        let sql = format!("SELECT {ENROLLMENT_COLUMNS} FROM matriculas ORDER BY id");
        let rows = sqlx::query_as::<_, EnrollmentRow>(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_error)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_enrollments_by_student(
        &mut self,
        student_id: StudentId,
    ) -> Result<Vec<Enrollment>, ApiError> {
        let sql =
            format!("SELECT {ENROLLMENT_COLUMNS} FROM matriculas WHERE aluno_id = $1 ORDER BY id");
        let rows = sqlx::query_as::<_, EnrollmentRow>(&sql)
            .bind(student_id.get())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_error)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_enrollment(
        &mut self,
        enrollment: &Enrollment,
    ) -> Result<Enrollment, ApiError> {
        let sql = format!(
            "UPDATE matriculas SET status = $2, data_inicio = $3, data_fim = $4, \
             observacoes = $5, data_atualizacao = $6 WHERE id = $1 \
             RETURNING {ENROLLMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EnrollmentRow>(&sql)
            .bind(enrollment.id.get())
            .bind(enrollment.status.as_str())
            .bind(enrollment.start_date)
            .bind(enrollment.end_date)
            .bind(&enrollment.notes)
            .bind(enrollment.updated_at)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error)?;
        row.ok_or(ApiError::EnrollmentNotFound(enrollment.id))?
            .try_into()
    }

    async fn count_active_enrollments(&mut self, school_id: SchoolId) -> Result<i64, ApiError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM matriculas WHERE escola_id = $1 AND status = $2",
        )
        .bind(school_id.get())
        .bind(EnrollmentStatus::Active.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error)
    }

    async fn has_active_enrollment(
        &mut self,
        student_id: StudentId,
        school_id: SchoolId,
        except: Option<EnrollmentId>,
    ) -> Result<bool, ApiError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM matriculas \
             WHERE aluno_id = $1 AND escola_id = $2 AND status = $3 \
             AND ($4::BIGINT IS NULL OR id <> $4))",
        )
        .bind(student_id.get())
        .bind(school_id.get())
        .bind(EnrollmentStatus::Active.as_str())
        .bind(except.map(EnrollmentId::get))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error)
    }

    async fn active_counts(&mut self) -> Result<HashMap<SchoolId, i64>, ApiError> {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            "SELECT escola_id, COUNT(*) FROM matriculas WHERE status = $1 GROUP BY escola_id",
        )
        .bind(EnrollmentStatus::Active.as_str())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error)?;
        Ok(rows
            .into_iter()
            .map(|(school_id, count)| (SchoolId::new(school_id), count))
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), ApiError> {
        self.tx.commit().await.map_err(db_error)
    }
}

fn db_error(err: sqlx::Error) -> ApiError {
    ApiError::Persistence(err.to_string())
}

/// Maps a violation of the school name index to a validation error.
fn school_write_error(err: sqlx::Error, name: &str) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.code().as_deref() == Some("23505")
        && db_err.constraint() == Some(SCHOOL_NAME_INDEX)
    {
        return ApiError::Validation(format!("Já existe uma escola com o nome '{name}'."));
    }
    db_error(err)
}
