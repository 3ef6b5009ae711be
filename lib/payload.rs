//! Request and response payload definitions for the pybox server.
//!
//! This module defines the data structures for:
//! - The execute endpoint response shape
//! - Error response structures
//! - Health check message formatting
//!
//! The execute request body is parsed field-by-field in [`crate::validate`]
//! rather than through a derived `Deserialize`, so malformed shapes produce
//! the specific messages the wire contract promises.

use serde::{Deserialize, Serialize};

//--------------------------------------------------------------------------------------------------
// Types: Responses
//--------------------------------------------------------------------------------------------------

/// Response payload for the execute endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteResponse {
    /// Captured stdout of the subprocess
    pub output: String,

    /// Captured stderr, or a user-readable description of why execution ended
    pub error: String,

    /// True iff the subprocess exited normally within limits and wrote
    /// nothing to stderr
    pub success: bool,
}

/// Response payload carrying a single error message
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the violated constraint, or an opaque internal message
    pub error: String,
}

/// Response type for regular message responses
#[derive(Debug, Serialize)]
pub struct RegularMessageResponse {
    /// Message indicating the status of the operation
    pub message: String,
}
