use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::consts::GENERIC_PROVIDER_FAILURE;

/// Uniform failure body returned by the generation endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ErrorEnvelope {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("{0}")]
    Validation(String),
    #[error("provider returned an unusable result: {0}")]
    ProviderContract(String),
    #[error("{0}")]
    ProviderFailure(String),
    #[error("authentication with the provider failed: {0}")]
    Unauthorized(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("video generation timed out after {0} seconds")]
    Timeout(u64),
}

impl GenerationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GenerationError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Only transport-level failures are worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::Network(_))
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let message = self.to_string();
        let error = if message.trim().is_empty() {
            GENERIC_PROVIDER_FAILURE.to_string()
        } else {
            message
        };
        ErrorEnvelope { error }
    }
}

impl From<GenerationError> for (StatusCode, Json<ErrorEnvelope>) {
    fn from(error: GenerationError) -> Self {
        (error.status_code(), Json(error.envelope()))
    }
}

impl IntoResponse for GenerationError {
    fn into_response(self) -> Response {
        <(StatusCode, Json<ErrorEnvelope>)>::from(self).into_response()
    }
}
