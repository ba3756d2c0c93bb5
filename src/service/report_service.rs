//! Report service: read-only aggregations over schools and enrollments.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::school::occupancy_percentage;
use crate::domain::{EnrollmentId, EnrollmentStatus, SchoolId, StudentId};
use crate::error::ApiError;
use crate::persistence::Store;

const DATE_FORMAT_MESSAGE: &str = "Formato de data inválido. Use o formato ISO (YYYY-MM-DD)";

/// Inclusive date window of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    /// First day, inclusive.
    pub start: NaiveDate,
    /// Last day, inclusive.
    pub end: NaiveDate,
}

impl DateWindow {
    /// Parses two ISO `YYYY-MM-DD` dates.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] when a date is missing or
    /// malformed, or when `start > end`.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, ApiError> {
        let parse = |raw: Option<&str>| {
            raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
                .ok_or_else(|| ApiError::Validation(DATE_FORMAT_MESSAGE.to_string()))
        };
        let window = Self {
            start: parse(start)?,
            end: parse(end)?,
        };
        if window.start > window.end {
            return Err(ApiError::Validation(
                "A data de início não pode ser posterior à data de fim.".to_string(),
            ));
        }
        Ok(window)
    }

    /// Returns `true` when `date` lies inside the window.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// One line of the occupancy ranking.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RankingEntry {
    /// School key.
    #[serde(rename = "escolaId")]
    pub school_id: SchoolId,
    /// School name.
    #[serde(rename = "escolaNome")]
    pub school_name: String,
    /// Occupancy percentage.
    #[serde(rename = "ocupacao")]
    pub occupancy: f64,
    /// Average age of the actively enrolled students, `0.0` when none.
    #[serde(rename = "mediaIdade")]
    pub average_age: f64,
    /// Number of ACTIVE enrollments.
    #[serde(rename = "totalAlunos")]
    pub total_students: i64,
    /// Configured capacity.
    #[serde(rename = "capacidade")]
    pub capacity: i32,
}

/// One line of the growth report.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GrowthEntry {
    /// School key.
    #[serde(rename = "escolaId")]
    pub school_id: SchoolId,
    /// School name.
    #[serde(rename = "escolaNome")]
    pub school_name: String,
    /// Enrollments whose start date falls in the window.
    #[serde(rename = "matriculasNovas")]
    pub new_enrollments: i64,
    /// `new_enrollments / capacity * 100`.
    #[serde(rename = "crescimentoPercentual")]
    pub growth_percentage: f64,
    /// Window start.
    #[serde(rename = "periodoInicio")]
    pub period_start: NaiveDate,
    /// Window end.
    #[serde(rename = "periodoFim")]
    pub period_end: NaiveDate,
}

/// One cancelled enrollment of the attrition report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AttritionEntry {
    /// Enrollment key.
    #[serde(rename = "matriculaId")]
    pub enrollment_id: EnrollmentId,
    /// Student key.
    #[serde(rename = "alunoId")]
    pub student_id: StudentId,
    /// Student name.
    #[serde(rename = "alunoNome")]
    pub student_name: String,
    /// School key.
    #[serde(rename = "escolaId")]
    pub school_id: SchoolId,
    /// School name.
    #[serde(rename = "escolaNome")]
    pub school_name: String,
    /// Enrollment start date.
    #[serde(rename = "dataInicio")]
    pub start_date: NaiveDate,
    /// Enrollment end date.
    #[serde(rename = "dataFim")]
    pub end_date: NaiveDate,
    /// Enrollment notes.
    #[serde(rename = "motivo")]
    pub reason: Option<String>,
}

/// Read-only aggregations for the `/relatorios` routes.
#[derive(Debug, Clone)]
pub struct ReportService {
    store: Arc<dyn Store>,
}

impl ReportService {
    /// Creates a new `ReportService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Schools sorted by descending occupancy, ties by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on store failure.
    pub async fn ranking(&self) -> Result<Vec<RankingEntry>, ApiError> {
        let mut tx = self.store.begin().await?;
        let schools = tx.list_schools().await?;
        let ages: HashMap<StudentId, i32> = tx
            .list_students()
            .await?
            .into_iter()
            .map(|s| (s.id, s.age))
            .collect();

        let mut per_school: HashMap<SchoolId, (i64, i64)> = HashMap::new();
        for enrollment in tx.list_enrollments().await? {
            if enrollment.status != EnrollmentStatus::Active {
                continue;
            }
            let entry = per_school.entry(enrollment.school_id).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += ages
                .get(&enrollment.student_id)
                .copied()
                .map_or(0, i64::from);
        }

        let mut ranking: Vec<RankingEntry> = schools
            .into_iter()
            .map(|school| {
                let (count, age_sum) = per_school.get(&school.id).copied().unwrap_or((0, 0));
                #[allow(clippy::cast_precision_loss)]
                let average_age = if count == 0 {
                    0.0
                } else {
                    age_sum as f64 / count as f64
                };
                RankingEntry {
                    school_id: school.id,
                    occupancy: occupancy_percentage(count, school.capacity),
                    school_name: school.name,
                    average_age,
                    total_students: count,
                    capacity: school.capacity,
                }
            })
            .collect();
        ranking.sort_by(|a, b| {
            b.occupancy
                .partial_cmp(&a.occupancy)
                .unwrap_or(Ordering::Equal)
                .then(a.school_id.cmp(&b.school_id))
        });
        Ok(ranking)
    }

    /// Per school, the enrollments whose start date falls in `window`,
    /// as a percentage of capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on store failure.
    pub async fn growth(&self, window: DateWindow) -> Result<Vec<GrowthEntry>, ApiError> {
        let mut tx = self.store.begin().await?;
        let schools = tx.list_schools().await?;
        let mut counts: HashMap<SchoolId, i64> = HashMap::new();
        for enrollment in tx.list_enrollments().await? {
            if window.contains(enrollment.start_date) {
                *counts.entry(enrollment.school_id).or_insert(0) += 1;
            }
        }

        Ok(schools
            .into_iter()
            .map(|school| {
                let new_enrollments = counts.get(&school.id).copied().unwrap_or(0);
                GrowthEntry {
                    school_id: school.id,
                    growth_percentage: occupancy_percentage(new_enrollments, school.capacity),
                    school_name: school.name,
                    new_enrollments,
                    period_start: window.start,
                    period_end: window.end,
                }
            })
            .collect())
    }

    /// CANCELLED enrollments whose end date falls in `window`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on store failure.
    pub async fn attrition(&self, window: DateWindow) -> Result<Vec<AttritionEntry>, ApiError> {
        let mut tx = self.store.begin().await?;
        let schools: HashMap<SchoolId, String> = tx
            .list_schools()
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();
        let students: HashMap<StudentId, String> = tx
            .list_students()
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();

        let mut entries = Vec::new();
        for enrollment in tx.list_enrollments().await? {
            let Some(end_date) = enrollment.end_date else {
                continue;
            };
            if enrollment.status != EnrollmentStatus::Cancelled || !window.contains(end_date) {
                continue;
            }
            entries.push(AttritionEntry {
                enrollment_id: enrollment.id,
                student_id: enrollment.student_id,
                student_name: students
                    .get(&enrollment.student_id)
                    .cloned()
                    .unwrap_or_default(),
                school_id: enrollment.school_id,
                school_name: schools
                    .get(&enrollment.school_id)
                    .cloned()
                    .unwrap_or_default(),
                start_date: enrollment.start_date,
                end_date,
                reason: enrollment.notes,
            });
        }
        Ok(entries)
    }
}
