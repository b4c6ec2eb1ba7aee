// HTTP API Error Types
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::services::DirectoryError;
use crate::store::StoreError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError { message, field_errors } => {
                let mut response = json!({
                    "error": true,
                    "message": message,
                    "code": "VALIDATION_ERROR"
                });

                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }

                response
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Validation(errors) => {
                ApiError::validation_error("Invalid request body", Some(errors.fields))
            }
            DirectoryError::BadRequest(msg) => ApiError::bad_request(msg),
            e @ DirectoryError::UnknownGroups(_) => ApiError::bad_request(e.to_string()),
            e @ DirectoryError::EmailMismatch => ApiError::bad_request(e.to_string()),
            e @ DirectoryError::InvalidKey => ApiError::forbidden(e.to_string()),
            e @ DirectoryError::MemberNotFound => ApiError::not_found(e.to_string()),
            DirectoryError::NotFound(msg) => ApiError::not_found(msg),
            e @ DirectoryError::DuplicateEmail => ApiError::conflict(e.to_string()),
            DirectoryError::Conflict(msg) => ApiError::conflict(msg),
            e @ DirectoryError::GroupInUse { .. } => ApiError::conflict(e.to_string()),
            DirectoryError::Store(e) => e.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ApiError::conflict(msg),
            StoreError::NotFound(msg) => ApiError::not_found(msg),
            e @ StoreError::GroupInUse { .. } => ApiError::conflict(e.to_string()),
            StoreError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
            StoreError::Http(http_err) => {
                tracing::error!("Spreadsheet HTTP error: {}", http_err);
                ApiError::internal_server_error("Spreadsheet error occurred")
            }
            StoreError::Sheets(msg) => {
                tracing::error!("Spreadsheet error: {}", msg);
                ApiError::internal_server_error("Spreadsheet error occurred")
            }
            StoreError::ConfigMissing(msg) => {
                tracing::error!("Store misconfigured: {}", msg);
                ApiError::internal_server_error("Store is not configured")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_json(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrors;

    #[test]
    fn directory_errors_map_to_status_codes() {
        let cases: Vec<(DirectoryError, u16)> = vec![
            (DirectoryError::Validation(ValidationErrors::single("email", "required")), 400),
            (DirectoryError::UnknownGroups(vec!["X".into()]), 400),
            (DirectoryError::EmailMismatch, 400),
            (DirectoryError::InvalidKey, 403),
            (DirectoryError::MemberNotFound, 404),
            (DirectoryError::DuplicateEmail, 409),
            (DirectoryError::GroupInUse { name: "Tax".into(), count: 2 }, 409),
            (DirectoryError::Store(StoreError::Sheets("boom".into())), 500),
        ];
        for (err, status) in cases {
            let label = err.to_string();
            assert_eq!(ApiError::from(err).status_code(), status, "{}", label);
        }
    }

    #[test]
    fn validation_error_carries_field_errors() {
        let api: ApiError = DirectoryError::Validation(ValidationErrors::single("groups", "At least one group is required")).into();
        let body = api.to_json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["field_errors"]["groups"], "At least one group is required");
    }

    #[test]
    fn store_details_are_not_echoed() {
        let api: ApiError = StoreError::Sheets("token exchange failed: secret".into()).into();
        assert!(!api.message().contains("secret"));
    }
}
