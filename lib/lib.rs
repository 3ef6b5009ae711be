//! Pybox Server - A server for executing untrusted Python snippets.
//!
//! Each request gets its own temporary workspace and its own interpreter
//! subprocess, bounded by a wall-clock timeout and an output-size ceiling.
//! Nothing survives a request: the workspace is destroyed on every exit path.

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod payload;
pub mod route;
pub mod state;
pub mod validate;
pub mod workspace;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use config::*;
pub use engine::*;
pub use error::*;
pub use payload::*;
pub use state::*;
pub use validate::*;
pub use workspace::*;
