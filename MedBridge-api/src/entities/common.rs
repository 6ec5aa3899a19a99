use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use medbridge_domain::services::ServiceError;

/// Error response format for API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error type/code - machine-readable identifier
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Create a not found error response
    pub fn not_found(resource: &str) -> Self {
        Self {
            error: "not_found".to_string(),
            message: format!("The requested {} could not be found", resource),
            details: None,
        }
    }

    /// Create a validation error response
    pub fn validation_error(message: &str, details: Option<serde_json::Value>) -> Self {
        Self {
            error: "validation_error".to_string(),
            message: message.to_string(),
            details,
        }
    }

    /// Create a bad request error response
    pub fn bad_request(message: &str) -> Self {
        Self {
            error: "bad_request".to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    /// The shared resource existed but may no longer be opened
    pub fn gone(message: &str) -> Self {
        Self {
            error: "gone".to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    /// Create a payload too large error response
    pub fn payload_too_large(message: &str) -> Self {
        Self {
            error: "payload_too_large".to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    /// Create an internal error response
    pub fn internal_error() -> Self {
        Self {
            error: "internal_error".to_string(),
            message: "An unexpected error occurred".to_string(),
            details: None,
        }
    }

    /// HTTP status for the error code
    pub fn status(&self) -> StatusCode {
        match self.error.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "validation_error" => StatusCode::BAD_REQUEST,
            "bad_request" => StatusCode::BAD_REQUEST,
            "gone" => StatusCode::GONE,
            "payload_too_large" => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ServiceError> for ErrorResponse {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(messages) => {
                let message = messages.join("; ");
                Self::validation_error(&message, Some(serde_json::json!(messages)))
            }
            ServiceError::NotFound(message) => Self {
                error: "not_found".to_string(),
                message,
                details: None,
            },
            ServiceError::Gone(message) => Self::gone(&message),
            ServiceError::PayloadTooLarge(message) => Self::payload_too_large(&message),
            other => {
                error!("Request failed: {}", other);
                Self::internal_error()
            }
        }
    }
}

/// Body returned by operations that have nothing else to report
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
    /// Number of records changed, where that is meaningful
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<usize>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            updated: None,
        }
    }

    pub fn updated(count: usize) -> Self {
        Self {
            success: true,
            updated: Some(count),
        }
    }
}

/// Query selecting the records of one device
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DeviceQuery {
    /// Opaque device id of the patient
    pub device_id: Option<String>,
}

/// Hospital search query
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HospitalQuery {
    /// Case-insensitive text matched against name and address
    pub q: Option<String>,
}
