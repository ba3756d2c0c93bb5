//! Database row models for the `escolas`, `alunos` and `matriculas` tables.
//!
//! Rows mirror the column layout; conversion into domain types happens
//! here so the store implementation only deals with SQL.

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{
    Enrollment, EnrollmentId, EnrollmentStatus, School, SchoolId, Student, StudentId,
};
use crate::error::ApiError;

/// Column list of `escolas`, in [`SchoolRow`] order.
pub const SCHOOL_COLUMNS: &str =
    "id, nome, capacidade, endereco, telefone, email, diretor, ativo, data_criacao, data_atualizacao";

/// Column list of `alunos`, in [`StudentRow`] order.
pub const STUDENT_COLUMNS: &str = "id, nome, idade, data_nascimento, nome_responsavel, \
     telefone_responsavel, email_responsavel, endereco, observacoes, ativo, data_criacao, \
     data_atualizacao";

/// Column list of `matriculas`, in [`EnrollmentRow`] order.
pub const ENROLLMENT_COLUMNS: &str = "id, aluno_id, escola_id, data_matricula, data_inicio, \
     data_fim, status, observacoes, data_criacao, data_atualizacao";

/// A row of the `escolas` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SchoolRow {
    pub id: i64,
    pub nome: String,
    pub capacidade: i32,
    pub endereco: Option<String>,
    pub telefone: Option<String>,
    pub email: Option<String>,
    pub diretor: Option<String>,
    pub ativo: bool,
    pub data_criacao: DateTime<Utc>,
    pub data_atualizacao: Option<DateTime<Utc>>,
}

impl From<SchoolRow> for School {
    fn from(row: SchoolRow) -> Self {
        Self {
            id: SchoolId::new(row.id),
            name: row.nome,
            capacity: row.capacidade,
            address: row.endereco,
            phone: row.telefone,
            email: row.email,
            director: row.diretor,
            active: row.ativo,
            created_at: row.data_criacao,
            updated_at: row.data_atualizacao,
        }
    }
}

/// A row of the `alunos` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StudentRow {
    pub id: i64,
    pub nome: String,
    pub idade: i32,
    pub data_nascimento: NaiveDate,
    pub nome_responsavel: Option<String>,
    pub telefone_responsavel: Option<String>,
    pub email_responsavel: Option<String>,
    pub endereco: Option<String>,
    pub observacoes: Option<String>,
    pub ativo: bool,
    pub data_criacao: DateTime<Utc>,
    pub data_atualizacao: Option<DateTime<Utc>>,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Self {
            id: StudentId::new(row.id),
            name: row.nome,
            age: row.idade,
            birth_date: row.data_nascimento,
            guardian_name: row.nome_responsavel,
            guardian_phone: row.telefone_responsavel,
            guardian_email: row.email_responsavel,
            address: row.endereco,
            notes: row.observacoes,
            active: row.ativo,
            created_at: row.data_criacao,
            updated_at: row.data_atualizacao,
        }
    }
}

/// A row of the `matriculas` table. `status` is stored as its wire name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnrollmentRow {
    pub id: i64,
    pub aluno_id: i64,
    pub escola_id: i64,
    pub data_matricula: DateTime<Utc>,
    pub data_inicio: NaiveDate,
    pub data_fim: Option<NaiveDate>,
    pub status: String,
    pub observacoes: Option<String>,
    pub data_criacao: DateTime<Utc>,
    pub data_atualizacao: Option<DateTime<Utc>>,
}

impl TryFrom<EnrollmentRow> for Enrollment {
    type Error = ApiError;

    fn try_from(row: EnrollmentRow) -> Result<Self, Self::Error> {
        let status: EnrollmentStatus = row.status.parse().map_err(|_| {
            ApiError::Persistence(format!(
                "matricula {} has unknown status '{}'",
                row.id, row.status
            ))
        })?;
        Ok(Self {
            id: EnrollmentId::new(row.id),
            student_id: StudentId::new(row.aluno_id),
            school_id: SchoolId::new(row.escola_id),
            enrolled_at: row.data_matricula,
            start_date: row.data_inicio,
            end_date: row.data_fim,
            status,
            notes: row.observacoes,
            created_at: row.data_criacao,
            updated_at: row.data_atualizacao,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> EnrollmentRow {
        let now = Utc::now();
        EnrollmentRow {
            id: 7,
            aluno_id: 1,
            escola_id: 2,
            data_matricula: now,
            data_inicio: now.date_naive(),
            data_fim: None,
            status: status.to_string(),
            observacoes: None,
            data_criacao: now,
            data_atualizacao: None,
        }
    }

    #[test]
    fn enrollment_row_parses_status() {
        let converted = Enrollment::try_from(row("SUSPENSA")).ok();
        assert_eq!(converted.map(|e| e.status), Some(EnrollmentStatus::Suspended));
    }

    #[test]
    fn unknown_status_is_a_persistence_error() {
        assert!(matches!(
            Enrollment::try_from(row("ARCHIVED")),
            Err(ApiError::Persistence(_))
        ));
    }
}
