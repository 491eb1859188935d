use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Table-level failures that abort a dashboard computation.
///
/// Row-level problems never surface here; they are absorbed by the pipeline
/// (see [`crate::services::aging::InvalidAge`]).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DashboardError {
    /// A configured column role has no matching column in the table.
    #[error("{table} table has no column {column:?} for role {role}")]
    MissingColumn {
        table: String,
        role: String,
        column: String,
    },
    /// A created-date cell could not be converted while deriving ages.
    #[error("{table} table column {column:?} row {row}: cannot parse date {value:?}")]
    DateParse {
        table: String,
        column: String,
        row: usize,
        value: String,
    },
}

impl DashboardError {
    pub fn missing_column(
        table: impl Into<String>,
        role: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self::MissingColumn {
            table: table.into(),
            role: role.into(),
            column: column.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingColumn { .. } => "missing_column",
            Self::DateParse { .. } => "date_parse",
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }
}

impl From<DashboardError> for AppError {
    fn from(err: DashboardError) -> Self {
        tracing::warn!(error = %err, code = err.code(), "dashboard computation rejected");
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err.code(), err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.code.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
