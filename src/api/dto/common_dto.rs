//! Extractors and request types shared across resources.

use axum::extract::{FromRequest, FromRequestParts};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ApiError;

/// JSON body extractor whose rejection is an [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejection is an [`ApiError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path parameter extractor whose rejection is an [`ApiError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Body of the `PATCH …/status` endpoints.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct StatusRequest {
    /// New value of the active flag.
    #[serde(rename = "ativo")]
    pub active: bool,
}
