// src/api/error.rs
// Centralized error handling for HTTP API responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::fmt;
use tracing::error;

/// Standard API error response format.
///
/// 400s carry the caller-facing message plus an optional rephrasing
/// suggestion and echoed partial parameters; 500s carry a generic message
/// while the specific cause goes to the log.
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
    pub suggestion: Option<String>,
    pub details: Option<Value>,
}

impl ApiError {
    /// Create a new bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::BAD_REQUEST,
            suggestion: None,
            details: None,
        }
    }

    /// Create a new internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::INTERNAL_SERVER_ERROR,
            suggestion: None,
            details: None,
        }
    }

    /// Attach an actionable rephrasing suggestion for the caller
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach structured details (e.g. the partially extracted parameters)
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Log the underlying cause and surface a generic downstream-failure 500.
    pub fn downstream(context: &str, err: impl fmt::Debug) -> Self {
        error!("{}: {:?}", context, err);
        Self::internal(format!("Failed to get response from AI service: {}", context))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.message,
            "status": self.status_code.as_u16(),
        });
        if let Some(suggestion) = self.suggestion {
            body["suggestion"] = json!(suggestion);
        }
        if let Some(details) = self.details {
            body["extracted_params"] = details;
        }
        (self.status_code, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Helper for missing required request fields
pub fn missing_param_error(param_name: &str) -> ApiError {
    ApiError::bad_request(format!("Missing required parameter: {param_name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_shape() {
        let error = ApiError::bad_request("Missing 'message' in request body");
        assert_eq!(error.status_code, StatusCode::BAD_REQUEST);
        assert!(error.suggestion.is_none());
    }

    #[test]
    fn test_suggestion_and_details() {
        let error = ApiError::bad_request("Could not determine repository")
            .with_suggestion("try: create an issue on owner/repo saying ...")
            .with_details(json!({"repo_name": "TechEurope"}));
        assert!(error.suggestion.as_deref().unwrap().contains("owner/repo"));
        assert_eq!(error.details.unwrap()["repo_name"], "TechEurope");
    }

    #[test]
    fn test_downstream_is_500_and_generic() {
        let error = ApiError::downstream("chat completion", "connection refused");
        assert_eq!(error.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(error.message.starts_with("Failed to get response from AI service"));
        assert!(!error.message.contains("connection refused"));
    }
}
