//! Request handlers for the pybox server.
//!
//! The execute handler orchestrates validation, workspace materialization,
//! subprocess execution, and teardown, and maps every failure mode to the
//! structured JSON result the wire contract promises. Workspace release is
//! unconditional: it runs on the success path and on every error path, and
//! only after the subprocess has fully terminated.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::Value;

use crate::{
    config::{Config, Limits},
    engine::{self, ExecutionResult, TerminationReason},
    error::ServerResult,
    payload::{ExecuteResponse, RegularMessageResponse},
    state::AppState,
    validate,
    workspace::Workspace,
};

//--------------------------------------------------------------------------------------------------
// Functions: Handlers
//--------------------------------------------------------------------------------------------------

/// Handler for health check
pub async fn health() -> ServerResult<impl IntoResponse> {
    Ok((
        StatusCode::OK,
        Json(RegularMessageResponse {
            message: "Service is healthy".to_string(),
        }),
    ))
}

/// Handler for code execution.
///
/// The payload is taken as raw JSON and validated field-by-field so shape
/// violations produce the contract's specific messages rather than a generic
/// deserialization rejection.
pub async fn execute(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> ServerResult<impl IntoResponse> {
    let config = state.get_config();

    // Fail fast before anything touches disk
    let request = validate::parse_request(&payload, config.get_limits())?;

    let workspace = Workspace::acquire(config.get_temp_root()).await?;

    // Hold the outcome so release always runs before the error propagates
    let outcome = execute_in_workspace(&workspace, &request, config.as_ref()).await;
    workspace.release().await;
    let result = outcome?;

    Ok((
        StatusCode::OK,
        Json(build_response(result, config.get_limits())),
    ))
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

/// Materialize the request into the workspace and run the interpreter
async fn execute_in_workspace(
    workspace: &Workspace,
    request: &validate::ExecutionRequest,
    config: &Config,
) -> ServerResult<ExecutionResult> {
    let entry = workspace.materialize(request).await?;
    engine::run(
        &entry,
        workspace.get_root(),
        config.get_python_bin(),
        config.get_limits(),
    )
    .await
}

/// Map an execution result to the wire response
fn build_response(result: ExecutionResult, limits: &Limits) -> ExecuteResponse {
    match result.reason {
        TerminationReason::Normal => {
            let success = result.succeeded();
            ExecuteResponse {
                output: result.stdout,
                error: result.stderr,
                success,
            }
        }
        TerminationReason::Timeout => ExecuteResponse {
            output: String::new(),
            error: format!(
                "Execution timeout: Code took too long to execute (>{}s)",
                limits.timeout.as_secs()
            ),
            success: false,
        },
        // Surfaced like a runtime fault of the executed code, with whatever
        // stdout was captured before the kill
        TerminationReason::OutputLimit => ExecuteResponse {
            output: result.stdout,
            error: format!(
                "Output limit exceeded: execution produced more than {}KB of output",
                limits.max_output_bytes / 1024
            ),
            success: false,
        },
        TerminationReason::ProcessError => ExecuteResponse {
            output: String::new(),
            error: result.stderr,
            success: false,
        },
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
