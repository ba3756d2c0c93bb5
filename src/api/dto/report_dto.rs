//! Report query types.

use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::ApiError;
use crate::service::DateWindow;

/// Period of the growth and attrition reports. Dates are kept as text so
/// that a malformed value yields the report's own format message.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PeriodQuery {
    /// First day, `YYYY-MM-DD`.
    #[serde(rename = "dataInicio")]
    pub start: Option<String>,
    /// Last day, `YYYY-MM-DD`.
    #[serde(rename = "dataFim")]
    pub end: Option<String>,
}

impl PeriodQuery {
    /// Converts into a validated [`DateWindow`].
    ///
    /// # Errors
    ///
    /// See [`DateWindow::parse`].
    pub fn window(&self) -> Result<DateWindow, ApiError> {
        DateWindow::parse(self.start.as_deref(), self.end.as_deref())
    }
}
