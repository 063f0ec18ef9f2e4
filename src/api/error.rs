//! Structured API error responses with error codes
//!
//! Every handler error is turned into a JSON body carrying a stable,
//! machine-readable code plus an `x-error-code` header.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::infra::BreachError;

// ============================================================================
// Error Codes
// ============================================================================

/// Error codes for API responses
///
/// These codes are stable and can be used by clients for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (3xxx)
    /// Request body is missing or not valid JSON
    InvalidRequestBody,
    /// Required field is missing
    MissingRequiredField,
    /// Field value is invalid
    InvalidFieldValue,
    /// Field outside the supported vocabulary
    UnsupportedField,
    /// Hash prefix rejected by the prefix policy
    InvalidHashPrefix,
    /// Unknown search mode
    InvalidSearchMode,

    // Resource errors (4xxx)
    /// Requested resource not found
    ResourceNotFound,
    /// Breach not present in the catalog
    BreachNotFound,

    // Infrastructure errors (8xxx)
    /// Database operation failed
    DatabaseError,
    /// Breach catalog is inconsistent
    CatalogError,
    /// External service unavailable
    ServiceUnavailable,
    /// Operation timed out
    Timeout,
    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn numeric_code(&self) -> u32 {
        match self {
            ErrorCode::InvalidRequestBody => 3001,
            ErrorCode::MissingRequiredField => 3002,
            ErrorCode::InvalidFieldValue => 3003,
            ErrorCode::UnsupportedField => 3004,
            ErrorCode::InvalidHashPrefix => 3005,
            ErrorCode::InvalidSearchMode => 3006,

            ErrorCode::ResourceNotFound => 4001,
            ErrorCode::BreachNotFound => 4002,

            ErrorCode::DatabaseError => 8001,
            ErrorCode::ServiceUnavailable => 8002,
            ErrorCode::Timeout => 8003,
            ErrorCode::CatalogError => 8004,
            ErrorCode::InternalError => 8999,
        }
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequestBody
            | ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFieldValue
            | ErrorCode::UnsupportedField
            | ErrorCode::InvalidHashPrefix
            | ErrorCode::InvalidSearchMode => StatusCode::BAD_REQUEST,

            ErrorCode::ResourceNotFound | ErrorCode::BreachNotFound => StatusCode::NOT_FOUND,

            ErrorCode::DatabaseError | ErrorCode::CatalogError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code_str = match self {
            ErrorCode::InvalidRequestBody => "INVALID_REQUEST_BODY",
            ErrorCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            ErrorCode::InvalidFieldValue => "INVALID_FIELD_VALUE",
            ErrorCode::UnsupportedField => "UNSUPPORTED_FIELD",
            ErrorCode::InvalidHashPrefix => "INVALID_HASH_PREFIX",
            ErrorCode::InvalidSearchMode => "INVALID_SEARCH_MODE",
            ErrorCode::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorCode::BreachNotFound => "BREACH_NOT_FOUND",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::CatalogError => "CATALOG_ERROR",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", code_str)
    }
}

// ============================================================================
// Structured Error Response
// ============================================================================

/// Structured error response for API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorDetails,
}

/// Detailed error information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Numeric error code for easy categorization
    pub numeric_code: u32,

    /// Human-readable error message
    pub message: String,

    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Related resource ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                message: message.into(),
                details: None,
                resource_id: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.error.resource_id = Some(id.into());
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.error.code
    }

    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code_str = self.error.code.to_string();
        let mut response = (status, Json(self)).into_response();

        if let Ok(code_value) = axum::http::HeaderValue::from_str(&code_str) {
            response.headers_mut().insert(
                axum::http::header::HeaderName::from_static("x-error-code"),
                code_value,
            );
        }

        response
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<BreachError> for ApiError {
    fn from(err: BreachError) -> Self {
        match err {
            BreachError::Database(e) => {
                ApiError::new(ErrorCode::DatabaseError, format!("Database error: {}", e))
            }
            BreachError::BreachNotFound(name) => {
                ApiError::new(ErrorCode::BreachNotFound, format!("Breach not found: {}", name))
                    .with_resource_id(name)
            }
            BreachError::UnsupportedField(field) => ApiError::new(
                ErrorCode::UnsupportedField,
                format!("Unsupported field: {}", field),
            )
            .with_details(serde_json::json!({ "field": field })),
            BreachError::InvalidPrefix(msg) => ApiError::new(ErrorCode::InvalidHashPrefix, msg),
            BreachError::InvalidRequest(msg) => ApiError::new(ErrorCode::InvalidFieldValue, msg),
            BreachError::InvalidIdentifier(ident) => ApiError::new(
                ErrorCode::CatalogError,
                format!("Catalog references an invalid identifier: {}", ident),
            ),
            BreachError::InvalidMetadata { breach, reason } => ApiError::new(
                ErrorCode::CatalogError,
                format!("Invalid metadata for breach {}: {}", breach, reason),
            )
            .with_resource_id(breach),
            BreachError::Timeout(msg) => ApiError::new(ErrorCode::Timeout, msg),
            BreachError::Fixture(e) => {
                ApiError::new(ErrorCode::CatalogError, format!("Fixture error: {}", e))
            }
            BreachError::FixtureFormat(e) => {
                ApiError::new(ErrorCode::CatalogError, format!("Fixture format error: {}", e))
            }
            BreachError::Configuration(msg) => ApiError::new(
                ErrorCode::InternalError,
                format!("Configuration error: {}", msg),
            ),
            BreachError::Internal(msg) => ApiError::new(ErrorCode::InternalError, msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let code = match rejection {
            JsonRejection::MissingJsonContentType(_) | JsonRejection::BytesRejection(_) => {
                ErrorCode::InvalidRequestBody
            }
            JsonRejection::JsonDataError(_) => ErrorCode::InvalidFieldValue,
            _ => ErrorCode::InvalidRequestBody,
        };
        ApiError::new(code, rejection.body_text())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Create a not found error for a specific resource type
pub fn not_found(resource_type: &str, id: impl std::fmt::Display) -> ApiError {
    ApiError::new(
        ErrorCode::ResourceNotFound,
        format!("{} not found: {}", resource_type, id),
    )
    .with_resource_id(id.to_string())
}

/// Create a validation error with field details
pub fn validation_error(field: &str, message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorCode::InvalidFieldValue, message.into())
        .with_details(serde_json::json!({ "field": field }))
}

/// Create an internal error
pub fn internal_error(message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorCode::InternalError, message.into())
}

// ============================================================================
// Tests
// ============================================================================
