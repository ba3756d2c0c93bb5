//! School service: CRUD, capacity management and occupancy queries.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::school::MAX_CAPACITY;
use crate::domain::{Occupancy, School, SchoolDraft, SchoolId};
use crate::error::ApiError;
use crate::persistence::{Store, StoreTx};

/// Business logic for schools.
///
/// Every method runs inside one store transaction. Capacity changes lock
/// the school row before counting its ACTIVE enrollments.
#[derive(Debug, Clone)]
pub struct SchoolService {
    store: Arc<dyn Store>,
}

impl SchoolService {
    /// Creates a new `SchoolService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Validates and inserts a new school.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidFields`] when a field rule fails and
    /// [`ApiError::Validation`] when the name is already taken.
    pub async fn create(&self, draft: SchoolDraft) -> Result<School, ApiError> {
        let new = draft.validate()?;
        let mut tx = self.store.begin().await?;
        ensure_name_free(tx.as_mut(), &new.name, None).await?;
        let school = tx.insert_school(&new).await?;
        tx.commit().await?;

        tracing::info!(school_id = %school.id, name = %school.name, capacity = school.capacity, "school created");
        Ok(school)
    }

    /// Returns one school.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SchoolNotFound`] if it does not exist.
    pub async fn get(&self, id: SchoolId) -> Result<School, ApiError> {
        let mut tx = self.store.begin().await?;
        tx.find_school(id).await?.ok_or(ApiError::SchoolNotFound(id))
    }

    /// Returns every school ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on store failure.
    pub async fn list(&self) -> Result<Vec<School>, ApiError> {
        let mut tx = self.store.begin().await?;
        tx.list_schools().await
    }

    /// Replaces the editable fields of a school.
    ///
    /// An absent `ativo` keeps the current flag.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SchoolNotFound`] if it does not exist, field or
    /// name errors as in [`Self::create`], and [`ApiError::Validation`]
    /// when the new capacity is below the ACTIVE enrollment count.
    pub async fn update(&self, id: SchoolId, draft: SchoolDraft) -> Result<School, ApiError> {
        let new = draft.validate()?;
        let mut tx = self.store.begin().await?;
        let mut school = tx
            .lock_school(id)
            .await?
            .ok_or(ApiError::SchoolNotFound(id))?;
        ensure_name_free(tx.as_mut(), &new.name, Some(id)).await?;
        let active = tx.count_active_enrollments(id).await?;
        ensure_fits(new.capacity, active)?;

        school.name = new.name;
        school.capacity = new.capacity;
        school.address = new.address;
        school.phone = new.phone;
        school.email = new.email;
        school.director = new.director;
        school.active = new.active.unwrap_or(school.active);
        school.updated_at = Some(Utc::now());
        let school = tx.update_school(&school).await?;
        tx.commit().await?;

        tracing::info!(school_id = %id, "school updated");
        Ok(school)
    }

    /// Changes only the capacity of a school.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for a capacity outside
    /// `0..=MAX_CAPACITY` or below the ACTIVE enrollment count, and
    /// [`ApiError::SchoolNotFound`] if the school does not exist.
    pub async fn update_capacity(
        &self,
        id: SchoolId,
        new_capacity: i32,
    ) -> Result<School, ApiError> {
        if new_capacity < 0 {
            return Err(ApiError::Validation(
                "A capacidade não pode ser negativa.".to_string(),
            ));
        }
        if new_capacity > MAX_CAPACITY {
            return Err(ApiError::Validation(format!(
                "A capacidade não pode ser maior que {MAX_CAPACITY}."
            )));
        }
        let mut tx = self.store.begin().await?;
        let mut school = tx
            .lock_school(id)
            .await?
            .ok_or(ApiError::SchoolNotFound(id))?;
        let active = tx.count_active_enrollments(id).await?;
        ensure_fits(new_capacity, active)?;

        let previous = school.capacity;
        school.capacity = new_capacity;
        school.updated_at = Some(Utc::now());
        let school = tx.update_school(&school).await?;
        tx.commit().await?;

        tracing::info!(school_id = %id, previous, capacity = new_capacity, "school capacity changed");
        Ok(school)
    }

    /// Returns the occupancy snapshot of a school.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SchoolNotFound`] if it does not exist.
    pub async fn occupancy(&self, id: SchoolId) -> Result<Occupancy, ApiError> {
        let mut tx = self.store.begin().await?;
        let school = tx.find_school(id).await?.ok_or(ApiError::SchoolNotFound(id))?;
        let active = tx.count_active_enrollments(id).await?;
        Ok(Occupancy::compute(&school, active))
    }

    /// Returns the schools whose ACTIVE enrollment count is below their
    /// capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on store failure.
    pub async fn list_available(&self) -> Result<Vec<School>, ApiError> {
        let mut tx = self.store.begin().await?;
        let counts = tx.active_counts().await?;
        let schools = tx.list_schools().await?;
        Ok(schools
            .into_iter()
            .filter(|s| counts.get(&s.id).copied().unwrap_or(0) < i64::from(s.capacity))
            .collect())
    }

    /// Activates or deactivates a school.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SchoolNotFound`] if it does not exist.
    pub async fn set_active(&self, id: SchoolId, active: bool) -> Result<School, ApiError> {
        let mut tx = self.store.begin().await?;
        let mut school = tx
            .lock_school(id)
            .await?
            .ok_or(ApiError::SchoolNotFound(id))?;
        school.active = active;
        school.updated_at = Some(Utc::now());
        let school = tx.update_school(&school).await?;
        tx.commit().await?;

        tracing::info!(school_id = %id, active, "school status changed");
        Ok(school)
    }

    /// Deletes a school together with its enrollments.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SchoolNotFound`] if it does not exist.
    pub async fn delete(&self, id: SchoolId) -> Result<(), ApiError> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_school(id).await? {
            return Err(ApiError::SchoolNotFound(id));
        }
        tx.commit().await?;

        tracing::info!(school_id = %id, "school deleted");
        Ok(())
    }
}

async fn ensure_name_free(
    tx: &mut dyn StoreTx,
    name: &str,
    except: Option<SchoolId>,
) -> Result<(), ApiError> {
    if tx.school_name_taken(name, except).await? {
        return Err(ApiError::Validation(format!(
            "Já existe uma escola com o nome '{name}'."
        )));
    }
    Ok(())
}

fn ensure_fits(capacity: i32, active: i64) -> Result<(), ApiError> {
    if i64::from(capacity) < active {
        return Err(ApiError::Validation(format!(
            "Não é possível reduzir a capacidade para {capacity}: a escola possui {active} \
             alunos com matrícula ativa."
        )));
    }
    Ok(())
}
