//! Configuration module for the pybox server.
//!
//! This module handles server configuration including:
//! - Listen address and interpreter selection
//! - Workspace root directory management
//! - Execution limits (sizes, file counts, timeout, output ceiling)
//!
//! The module provides:
//! - Configuration structure for server settings
//! - Default values matching the documented wire contract
//! - Read-only access to settings shared across requests

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use getset::Getters;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The IP address the server binds to
pub const LOCALHOST_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Default port the server listens on
pub const DEFAULT_SERVER_PORT: u16 = 5151;

/// Default interpreter used to run submissions
pub const DEFAULT_PYTHON_BIN: &str = "python3";

/// Maximum number of auxiliary files per request
pub const MAX_FILES: usize = 10;

/// Maximum size of a single auxiliary file in bytes (100 KiB)
pub const MAX_FILE_SIZE: usize = 100 * 1024;

/// Maximum size of the main code in bytes (500 KiB)
pub const MAX_CODE_SIZE: usize = 500 * 1024;

/// File extensions accepted for auxiliary files
pub const ALLOWED_FILE_EXTENSIONS: &[&str] = &[".py", ".txt", ".json", ".csv"];

/// Default wall-clock execution timeout
pub const EXECUTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum captured bytes per output stream (1 MiB)
pub const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Per-request execution limits.
///
/// These are read-only for the lifetime of the server; concurrent requests
/// share them without synchronization.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum number of auxiliary files per request
    pub max_files: usize,

    /// Maximum size of a single auxiliary file in bytes
    pub max_file_bytes: usize,

    /// Maximum size of the main code in bytes
    pub max_code_bytes: usize,

    /// Allowed auxiliary file extensions, including the leading dot
    pub allowed_extensions: Vec<String>,

    /// Wall-clock timeout after which the subprocess is killed
    pub timeout: Duration,

    /// Per-stream output ceiling in bytes
    pub max_output_bytes: usize,
}

/// Configuration structure that holds all the application settings
#[derive(Debug, Getters)]
#[getset(get = "pub with_prefix")]
pub struct Config {
    /// Address to listen on
    addr: SocketAddr,

    /// Directory under which per-request workspaces are created
    temp_root: PathBuf,

    /// Interpreter binary used to run submissions
    python_bin: String,

    /// Execution limits applied to every request
    limits: Limits,
}

//--------------------------------------------------------------------------------------------------
// Implementations
//--------------------------------------------------------------------------------------------------

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_files: MAX_FILES,
            max_file_bytes: MAX_FILE_SIZE,
            max_code_bytes: MAX_CODE_SIZE,
            allowed_extensions: ALLOWED_FILE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            timeout: EXECUTION_TIMEOUT,
            max_output_bytes: MAX_OUTPUT_SIZE,
        }
    }
}

impl Config {
    /// Create a new configuration
    pub fn new(
        port: u16,
        temp_root: Option<PathBuf>,
        python_bin: Option<String>,
        limits: Limits,
    ) -> Self {
        Self {
            addr: SocketAddr::new(LOCALHOST_IP, port),
            temp_root: temp_root.unwrap_or_else(std::env::temp_dir),
            python_bin: python_bin.unwrap_or_else(|| DEFAULT_PYTHON_BIN.to_string()),
            limits,
        }
    }
}
