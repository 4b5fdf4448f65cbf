use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use strata::customers::CustomerError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("diagnostics are only available in development")]
    Forbidden,

    #[error("request cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<CustomerError> for GatewayError {
    fn from(err: CustomerError) -> Self {
        match err {
            CustomerError::NotFound { .. } => GatewayError::NotFound(err.to_string()),
            CustomerError::Conflict { .. } => GatewayError::Conflict(err.to_string()),
            CustomerError::Validation { .. } => GatewayError::InvalidRequest(err.to_string()),
            CustomerError::Cancelled => GatewayError::Cancelled,
            CustomerError::Repository { .. } => GatewayError::InternalError(err.to_string()),
        }
    }
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Conflict(_) => StatusCode::CONFLICT,
            GatewayError::Forbidden => StatusCode::FORBIDDEN,
            GatewayError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}
