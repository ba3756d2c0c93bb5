//! School request types.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::domain::SchoolDraft;
use crate::error::ApiError;

/// Body of `POST /escolas` and `PUT /escolas/{id}`.
///
/// Every field is optional at the wire level so that missing values are
/// reported together by the domain validation.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SchoolRequest {
    /// Unique name, 3–100 characters.
    #[serde(rename = "nome")]
    pub name: Option<String>,
    /// Maximum number of ACTIVE enrollments, 1–1000.
    #[serde(rename = "capacidade")]
    pub capacity: Option<i32>,
    /// Street address.
    #[serde(rename = "endereco")]
    pub address: Option<String>,
    /// 10 or 11 digits.
    #[serde(rename = "telefone")]
    pub phone: Option<String>,
    /// Contact e-mail.
    pub email: Option<String>,
    /// Director name.
    #[serde(rename = "diretor")]
    pub director: Option<String>,
    /// Active flag, defaults to `true` on create.
    #[serde(rename = "ativo")]
    pub active: Option<bool>,
}

impl From<SchoolRequest> for SchoolDraft {
    fn from(req: SchoolRequest) -> Self {
        Self {
            name: req.name,
            capacity: req.capacity,
            address: req.address,
            phone: req.phone,
            email: req.email,
            director: req.director,
            active: req.active,
        }
    }
}

/// Query of `PATCH /escolas/{id}/capacidade`.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CapacityQuery {
    /// New capacity; must not drop below the ACTIVE enrollment count.
    #[serde(rename = "novaCapacidade")]
    pub new_capacity: Option<i32>,
}

impl CapacityQuery {
    /// Returns the requested capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] when the parameter is absent.
    pub fn required(self) -> Result<i32, ApiError> {
        self.new_capacity.ok_or_else(|| {
            ApiError::Validation("O parâmetro 'novaCapacidade' é obrigatório.".to_string())
        })
    }
}
