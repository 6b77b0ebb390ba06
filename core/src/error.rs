use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Structured error body returned by procedure endpoints.
/// The message is stable and minimal; underlying causes go to the logs.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error code (e.g. "validation_failed", "handler_failed")
    pub error: String,
    /// Human/agent-readable description of what went wrong
    pub message: String,
    /// Which part of the request caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Request ID for correlating the response with provider logs
    pub request_id: String,
}

/// Error codes used on the wire
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const CONFIGURATION_ERROR: &str = "configuration_error";
    pub const HANDLER_FAILED: &str = "handler_failed";
    pub const NOT_FOUND: &str = "not_found";
    pub const INTERNAL_ERROR: &str = "internal_error";
}
