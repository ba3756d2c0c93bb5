//! Student (`aluno`) entity and its unvalidated draft.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::StudentId;
use super::validation::{FieldErrors, MAX_ADDRESS_LEN, MAX_NOTES_LEN, MAX_PERSON_NAME_LEN};
use crate::error::ApiError;

/// Youngest accepted student age.
pub const MIN_AGE: i32 = 3;

/// Oldest accepted student age.
pub const MAX_AGE: i32 = 18;

/// A student row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Student {
    /// Database key.
    pub id: StudentId,
    /// Full name.
    #[serde(rename = "nome")]
    pub name: String,
    /// Age in years.
    #[serde(rename = "idade")]
    pub age: i32,
    /// Date of birth.
    #[serde(rename = "dataNascimento")]
    pub birth_date: NaiveDate,
    /// Guardian's name.
    #[serde(rename = "nomeResponsavel")]
    pub guardian_name: Option<String>,
    /// Guardian's phone.
    #[serde(rename = "telefoneResponsavel")]
    pub guardian_phone: Option<String>,
    /// Guardian's e-mail.
    #[serde(rename = "emailResponsavel")]
    pub guardian_email: Option<String>,
    /// Home address.
    #[serde(rename = "endereco")]
    pub address: Option<String>,
    /// Free-text notes.
    #[serde(rename = "observacoes")]
    pub notes: Option<String>,
    /// Inactive students cannot hold ACTIVE enrollments.
    #[serde(rename = "ativo")]
    pub active: bool,
    /// Creation timestamp.
    #[serde(rename = "dataCriacao")]
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    #[serde(rename = "dataAtualizacao")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Student fields as submitted by a client, before validation.
#[derive(Debug, Clone, Default)]
pub struct StudentDraft {
    /// Full name.
    pub name: Option<String>,
    /// Age in years.
    pub age: Option<i32>,
    /// Date of birth.
    pub birth_date: Option<NaiveDate>,
    /// Guardian's name.
    pub guardian_name: Option<String>,
    /// Guardian's phone.
    pub guardian_phone: Option<String>,
    /// Guardian's e-mail.
    pub guardian_email: Option<String>,
    /// Home address.
    pub address: Option<String>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Active flag.
    pub active: Option<bool>,
}

/// A validated student ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    /// Trimmed full name.
    pub name: String,
    /// Age within `MIN_AGE..=MAX_AGE`.
    pub age: i32,
    /// Date of birth.
    pub birth_date: NaiveDate,
    /// Guardian's name.
    pub guardian_name: Option<String>,
    /// Guardian's phone.
    pub guardian_phone: Option<String>,
    /// Guardian's e-mail.
    pub guardian_email: Option<String>,
    /// Home address.
    pub address: Option<String>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Explicit active flag, if the client sent one.
    pub active: Option<bool>,
}

impl StudentDraft {
    /// Checks every field rule and returns the validated student.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidFields`] listing every violated rule.
    pub fn validate(self) -> Result<NewStudent, ApiError> {
        let mut errors = FieldErrors::default();

        let name = errors.required_text("nome", self.name, 3, 100);
        let age = match self.age {
            None => {
                errors.push("idade", "A idade é obrigatória");
                None
            }
            Some(a) if a < MIN_AGE => {
                errors.push("idade", "A idade deve ser maior ou igual a 3 anos");
                None
            }
            Some(a) if a > MAX_AGE => {
                errors.push("idade", "A idade deve ser menor ou igual a 18 anos");
                None
            }
            Some(a) => Some(a),
        };
        if self.birth_date.is_none() {
            errors.push("dataNascimento", "A data de nascimento é obrigatória");
        }
        let guardian_name =
            errors.optional_text("nomeResponsavel", self.guardian_name, MAX_PERSON_NAME_LEN);
        let guardian_phone = errors.optional_phone("telefoneResponsavel", self.guardian_phone);
        let guardian_email = errors.optional_email("emailResponsavel", self.guardian_email);
        let address = errors.optional_text("endereco", self.address, MAX_ADDRESS_LEN);
        let notes = errors.optional_text("observacoes", self.notes, MAX_NOTES_LEN);

        errors.into_result()?;
        match (name, age, self.birth_date) {
            (Some(name), Some(age), Some(birth_date)) => Ok(NewStudent {
                name,
                age,
                birth_date,
                guardian_name,
                guardian_phone,
                guardian_email,
                address,
                notes,
                active: self.active,
            }),
            _ => Err(ApiError::Internal(
                "student validation accepted missing fields".to_string(),
            )),
        }
    }
}

/// Optional search filters for students.
#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    /// Case-insensitive substring of the name.
    pub name: Option<String>,
    /// Inclusive lower age bound.
    pub age_min: Option<i32>,
    /// Inclusive upper age bound.
    pub age_max: Option<i32>,
}

impl StudentFilter {
    /// Returns `true` when `student` satisfies every present filter.
    #[must_use]
    pub fn matches(&self, student: &Student) -> bool {
        let name_ok = match self.name.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => student
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        };
        let min_ok = self.age_min.is_none_or(|min| student.age >= min);
        let max_ok = self.age_max.is_none_or(|max| student.age <= max);
        name_ok && min_ok && max_ok
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn birth() -> NaiveDate {
        let Some(d) = NaiveDate::from_ymd_opt(2015, 3, 10) else {
            panic!("valid date");
        };
        d
    }

    fn student(name: &str, age: i32) -> Student {
        Student {
            id: StudentId::new(1),
            name: name.to_string(),
            age,
            birth_date: birth(),
            guardian_name: None,
            guardian_phone: None,
            guardian_email: None,
            address: None,
            notes: None,
            active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn valid_draft_is_accepted() {
        let draft = StudentDraft {
            name: Some("Maria Souza".to_string()),
            age: Some(10),
            birth_date: Some(birth()),
            guardian_email: Some("mae@exemplo.com".to_string()),
            ..StudentDraft::default()
        };
        let Ok(new) = draft.validate() else {
            panic!("draft should validate");
        };
        assert_eq!(new.age, 10);
        assert_eq!(new.guardian_email.as_deref(), Some("mae@exemplo.com"));
    }

    #[test]
    fn age_out_of_range_and_missing_birth_date() {
        let draft = StudentDraft {
            name: Some("Maria Souza".to_string()),
            age: Some(19),
            ..StudentDraft::default()
        };
        let Err(ApiError::InvalidFields(fields)) = draft.validate() else {
            panic!("expected field errors");
        };
        let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, vec!["idade", "dataNascimento"]);
    }

    #[test]
    fn filter_matches_case_insensitive_substring() {
        let filter = StudentFilter {
            name: Some("SOUZA".to_string()),
            ..StudentFilter::default()
        };
        assert!(filter.matches(&student("Maria Souza", 10)));
        assert!(!filter.matches(&student("João Lima", 10)));
    }

    #[test]
    fn filter_age_bounds_are_inclusive() {
        let filter = StudentFilter {
            name: None,
            age_min: Some(10),
            age_max: Some(12),
        };
        assert!(filter.matches(&student("A B C", 10)));
        assert!(filter.matches(&student("A B C", 12)));
        assert!(!filter.matches(&student("A B C", 9)));
        assert!(!filter.matches(&student("A B C", 13)));
    }
}
