//! CSV rendering of schools, students and enrollments.

use crate::domain::{Enrollment, School, Student};

/// Header row of the student export.
pub const STUDENT_HEADER: &str = "ID,Nome,Idade,Data Nascimento,Nome Responsável,\
Telefone Responsável,Email Responsável,Endereço,Observações,Ativo";

/// Header row of the school export.
pub const SCHOOL_HEADER: &str = "ID,Nome,Capacidade,Endereço,Telefone,Email,Diretor,Ativo";

/// Header row of the enrollment export.
pub const ENROLLMENT_HEADER: &str =
    "ID,Aluno ID,Escola ID,Data Matrícula,Data Início,Data Fim,Status,Observações";

/// Escape a value for CSV: wrap in quotes if it contains a comma, quote, or
/// line break.
fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn opt(value: Option<&String>) -> String {
    value.map(|v| csv_escape(v)).unwrap_or_default()
}

fn render<T>(header: &str, rows: &[T], line: impl Fn(&T) -> String) -> String {
    let mut out = String::with_capacity(header.len() + 1 + rows.len() * 64);
    out.push_str(header);
    out.push('\n');
    for row in rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}

/// Renders students as CSV, one line per student after the header.
#[must_use]
pub fn students_csv(students: &[Student]) -> String {
    render(STUDENT_HEADER, students, |s| {
        [
            s.id.to_string(),
            csv_escape(&s.name),
            s.age.to_string(),
            s.birth_date.to_string(),
            opt(s.guardian_name.as_ref()),
            opt(s.guardian_phone.as_ref()),
            opt(s.guardian_email.as_ref()),
            opt(s.address.as_ref()),
            opt(s.notes.as_ref()),
            s.active.to_string(),
        ]
        .join(",")
    })
}

/// Renders schools as CSV.
#[must_use]
pub fn schools_csv(schools: &[School]) -> String {
    render(SCHOOL_HEADER, schools, |s| {
        [
            s.id.to_string(),
            csv_escape(&s.name),
            s.capacity.to_string(),
            opt(s.address.as_ref()),
            opt(s.phone.as_ref()),
            opt(s.email.as_ref()),
            opt(s.director.as_ref()),
            s.active.to_string(),
        ]
        .join(",")
    })
}

/// Renders enrollments as CSV. Timestamps use RFC 3339.
#[must_use]
pub fn enrollments_csv(enrollments: &[Enrollment]) -> String {
    render(ENROLLMENT_HEADER, enrollments, |e| {
        [
            e.id.to_string(),
            e.student_id.to_string(),
            e.school_id.to_string(),
            e.enrolled_at.to_rfc3339(),
            e.start_date.to_string(),
            e.end_date.map(|d| d.to_string()).unwrap_or_default(),
            e.status.to_string(),
            opt(e.notes.as_ref()),
        ]
        .join(",")
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::domain::{SchoolId, StudentId};

    #[test]
    fn escape_quotes_and_commas() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn schools_render_header_and_rows() {
        let school = School {
            id: SchoolId::new(4),
            name: "Escola Central, Unidade 2".to_string(),
            capacity: 30,
            address: None,
            phone: Some("11987654321".to_string()),
            email: None,
            director: Some("Marta".to_string()),
            active: true,
            created_at: Utc::now(),
            updated_at: None,
        };
        let csv = schools_csv(&[school]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec![
            SCHOOL_HEADER,
            "4,\"Escola Central, Unidade 2\",30,,11987654321,,Marta,true",
        ]);
    }

    #[test]
    fn students_render_dates_iso() {
        let Some(birth_date) = NaiveDate::from_ymd_opt(2015, 3, 9) else {
            panic!("valid date");
        };
        let student = Student {
            id: StudentId::new(1),
            name: "Ana Souza".to_string(),
            age: 9,
            birth_date,
            guardian_name: None,
            guardian_phone: None,
            guardian_email: None,
            address: None,
            notes: Some("linha 1\nlinha 2".to_string()),
            active: false,
            created_at: Utc::now(),
            updated_at: None,
        };
        let csv = students_csv(&[student]);
        assert!(csv.starts_with("ID,Nome,Idade,Data Nascimento,"));
        assert!(csv.contains("1,Ana Souza,9,2015-03-09,,,,,\"linha 1\nlinha 2\",false\n"));
    }

    #[test]
    fn empty_export_is_header_only() {
        assert_eq!(enrollments_csv(&[]), format!("{ENROLLMENT_HEADER}\n"));
    }
}
