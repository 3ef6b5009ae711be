//! Error types for the pybox server.
//!
//! This module defines:
//! - The request validation error taxonomy with client-facing messages
//! - The top-level server error type and its HTTP mapping
//!
//! Validation errors carry specific, actionable messages and map to HTTP 400.
//! Everything else is logged server-side with full detail and surfaced to the
//! client as an opaque "Internal server error" so no paths or internals leak.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::payload::ErrorResponse;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that terminate a request before a normal execute response is built
#[derive(Debug, Error)]
pub enum ServerError {
    /// The request payload failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Creating or writing the per-request workspace failed
    #[error("workspace error: {0}")]
    Workspace(#[from] std::io::Error),

    /// Anything unanticipated
    #[error("internal error: {0}")]
    Internal(String),
}

/// Rejection reasons produced by request validation.
///
/// Display strings are the exact messages returned to the client.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Code field is missing, not a string, or empty
    #[error("No code provided")]
    NoCode,

    /// Code exceeds the configured maximum size (reported in KiB)
    #[error("Code size exceeds maximum allowed size of {0}KB")]
    CodeTooLarge(usize),

    /// Files field is present but not an array
    #[error("Files must be an array")]
    FilesNotArray,

    /// More files than the configured maximum
    #[error("Too many files. Maximum {0} allowed")]
    TooManyFiles(usize),

    /// A file entry is not a JSON object
    #[error("Invalid file object")]
    InvalidFileObject,

    /// A file entry lacks a usable name or content
    #[error("File must have name and content")]
    MissingNameOrContent,

    /// A file name failed the character-set, hidden-file, or extension checks
    #[error("Invalid filename: {name}. Only alphanumeric characters, dots, underscores, and hyphens are allowed with extensions: {allowed}")]
    InvalidFilename {
        /// The offending client-supplied name
        name: String,

        /// Comma-separated allowlisted extensions
        allowed: String,
    },

    /// A file's content exceeds the per-file ceiling (reported in KiB)
    #[error("File {0} exceeds maximum allowed size of {1}KB")]
    FileTooLarge(String, usize),
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::Validation(err) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response(),
            err => {
                tracing::error!("request failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Internal server error".to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}
