//! Mapping from domain failures to HTTP error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chorale::ValidationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body returned for every failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error_code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Core(#[from] chorale::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Core(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(e) => e.code(),
            ApiError::Core(chorale::Error::ReferenceNotFound(_)) => "reference_not_found",
            ApiError::Core(chorale::Error::EventOutOfRange { .. }) => "event_out_of_range",
            ApiError::Core(chorale::Error::EmptySequence) => "empty_sequence",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        use serde_json::json;

        match self {
            ApiError::Validation(ValidationError::Malformed(reason)) => {
                Some(json!({ "reason": reason }))
            }
            ApiError::Validation(ValidationError::InvalidNote { index, note }) => {
                Some(json!({ "index": index, "note": note }))
            }
            ApiError::Validation(ValidationError::DuplicateTimeslot(t_sec)) => {
                Some(json!({ "t_sec": t_sec }))
            }
            ApiError::Validation(ValidationError::EventOutOfRange { t_sec, duration_sec })
            | ApiError::Core(chorale::Error::EventOutOfRange { t_sec, duration_sec }) => {
                Some(json!({ "t_sec": t_sec, "duration_sec": duration_sec }))
            }
            ApiError::Core(chorale::Error::ReferenceNotFound(id)) => {
                Some(json!({ "reference_id": id }))
            }
            _ => None,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error_code: self.code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::info!(error_code = self.code(), error = %self, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}
