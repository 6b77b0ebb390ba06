use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use procwire_core::error::{self, ApiError};

use crate::extract::field_from_serde_message;

/// Error returned by a user-supplied procedure handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Failures reported by the router collaborator behind a [`crate::ServerManager`].
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("public callback URL is not configured")]
    MissingPublicUrl,
    #[error("invalid procedure path '{0}'")]
    InvalidPath(String),
    #[error("no handler registered at '{0}'")]
    NotRegistered(String),
    #[error("cannot derive callback URL for procedure '{procedure}'")]
    UrlJoin {
        procedure: String,
        #[source]
        source: url::ParseError,
    },
    #[error("router rejected handler at '{path}': {reason}")]
    Rejected { path: String, reason: String },
}

/// Everything that can go wrong declaring or invoking a procedure.
///
/// Registration errors (`Configuration`, `RegistrationConsistency`, `Poisoned`)
/// are returned synchronously to the provider at startup. The remaining
/// variants are per-request and are turned into HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ProcedureError {
    #[error("procedure '{procedure}' is misconfigured: {reason}")]
    Configuration {
        procedure: String,
        reason: String,
        #[source]
        source: Option<ServerError>,
    },
    #[error("provider prefix is not set")]
    UnconfiguredProvider,
    #[error("malformed request body")]
    MalformedRequest(#[source] serde_json::Error),
    #[error("no procedure registered at '{path}'")]
    NotFound { path: String },
    #[error("handler for procedure '{procedure}' failed")]
    HandlerExecution {
        procedure: String,
        #[source]
        source: HandlerError,
    },
    #[error("handler registration for procedure '{procedure}' failed")]
    RegistrationConsistency {
        procedure: String,
        #[source]
        source: ServerError,
        /// Set when undoing the registration failed as well
        rollback: Option<ServerError>,
    },
    #[error("'{owner}' has an inconsistent procedure table and must not be advertised")]
    Poisoned { owner: String },
}

impl IntoResponse for ProcedureError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            ProcedureError::MalformedRequest(err) => {
                let detail = err.to_string();
                tracing::debug!(%request_id, error = %detail, "rejected malformed procedure request");
                (
                    StatusCode::BAD_REQUEST,
                    ApiError {
                        error: error::codes::VALIDATION_FAILED.to_string(),
                        message: "Invalid request body".to_string(),
                        field: Some(field_from_serde_message(&detail).unwrap_or("body".to_string())),
                        request_id,
                    },
                )
            }
            ProcedureError::UnconfiguredProvider => {
                tracing::error!(%request_id, "procedure invoked before provider prefix was set");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::CONFIGURATION_ERROR.to_string(),
                        message: "Provider prefix is not set".to_string(),
                        field: None,
                        request_id,
                    },
                )
            }
            ProcedureError::NotFound { path } => (
                StatusCode::NOT_FOUND,
                ApiError {
                    error: error::codes::NOT_FOUND.to_string(),
                    message: format!("No procedure registered at '{path}'"),
                    field: None,
                    request_id,
                },
            ),
            ProcedureError::HandlerExecution { procedure, source } => {
                tracing::error!(%request_id, %procedure, cause = %source, "procedure handler failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::HANDLER_FAILED.to_string(),
                        message: "Unable to execute handler".to_string(),
                        field: None,
                        request_id,
                    },
                )
            }
            other => {
                tracing::error!(%request_id, error = %other, "unexpected procedure error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::INTERNAL_ERROR.to_string(),
                        message: "An internal error occurred".to_string(),
                        field: None,
                        request_id,
                    },
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}
