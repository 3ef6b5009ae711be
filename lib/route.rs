//! Router configuration for the pybox server.
//!
//! This module assembles the API routes, wires in the logging middleware,
//! and attaches the shared application state.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handler, middleware as app_middleware, state::AppState};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Create a new router with the given state
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/execute", post(handler::execute))
        .route("/health", get(handler::health));

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn(app_middleware::logging_middleware))
        .with_state(state)
}
