//! HTTP error mapping
//!
//! Client-input failures answer 422 with a `detail` list naming the
//! offending parameter. Training failures keep the `{"error":
//! "err!"}` body and add the failed stage. Everything else is a 500.

use axum::{
    extract::{multipart::MultipartRejection, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::core::error::{ResolveError, TtsError};
use crate::server::types::{ValidationDetail, ValidationErrorBody};

/// Error returned by every handler
#[derive(Debug)]
pub enum ApiError {
    /// 422 naming where the bad input was found
    Validation { loc: Vec<String>, message: String },
    /// 404
    NotFound(String),
    /// 500
    Server(TtsError),
}

impl ApiError {
    /// Bad query parameter
    pub fn validation(param: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            loc: vec!["query".to_string(), param.into()],
            message: message.into(),
        }
    }

    /// Bad multipart form field
    pub fn body_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            loc: vec!["body".to_string(), field.into()],
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        ApiError::validation(err.param(), err.to_string())
    }
}

impl From<TtsError> for ApiError {
    fn from(err: TtsError) -> Self {
        match err {
            TtsError::Resolve(e) => e.into(),
            other => ApiError::Server(other),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        // Field name is only available inside the message text
        ApiError::Validation {
            loc: vec!["query".to_string()],
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Validation {
            loc: vec!["body".to_string()],
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation { loc, message } => {
                warn!("Validation error: {}", message);
                let body = ValidationErrorBody {
                    detail: vec![ValidationDetail {
                        kind: "invalid_params".to_string(),
                        msg: message,
                        loc,
                    }],
                };
                (status, Json(body)).into_response()
            }
            ApiError::NotFound(message) => {
                (status, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Server(TtsError::Training { stage, message }) => {
                error!("Training submission failed at {}: {}", stage, message);
                let body = json!({
                    "error": "err!",
                    "stage": stage.as_str(),
                    "message": message,
                });
                (status, Json(body)).into_response()
            }
            ApiError::Server(err) => {
                error!("Request failed: {}", err);
                (status, Json(json!({ "error": err.to_string() }))).into_response()
            }
        }
    }
}
