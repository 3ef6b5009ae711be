//! Application state management for the pybox server.
//!
//! The state is deliberately minimal: every request is independent, so the
//! only thing shared across handlers is the read-only configuration.

use std::sync::Arc;

use getset::Getters;

use crate::config::Config;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Application state structure
#[derive(Clone, Getters)]
#[getset(get = "pub with_prefix")]
pub struct AppState {
    /// The application configuration
    config: Arc<Config>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl AppState {
    /// Create a new application state instance
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}
