use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use clap::Parser;
use pybox::{
    config::{Config, Limits, DEFAULT_SERVER_PORT},
    route,
    state::AppState,
};
use tower_http::cors::{Any, CorsLayer};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Arguments for the pyboxserver command
#[derive(Debug, Parser)]
#[command(name = "pyboxserver", author)]
struct PyboxServerArgs {
    /// Port number to listen on
    #[arg(long, default_value_t = DEFAULT_SERVER_PORT)]
    port: u16,

    /// Directory under which per-request workspaces are created
    #[arg(short = 'p', long = "path")]
    temp_root: Option<PathBuf>,

    /// Python interpreter used to run submissions
    #[arg(long = "python")]
    python_bin: Option<String>,

    /// Wall-clock execution timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

//--------------------------------------------------------------------------------------------------
// Functions: Main
//--------------------------------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Parse command line arguments
    let args = PyboxServerArgs::parse();

    let limits = Limits {
        timeout: Duration::from_secs(args.timeout),
        ..Limits::default()
    };

    // Create configuration from arguments
    let config = Arc::new(Config::new(
        args.port,
        args.temp_root,
        args.python_bin,
        limits,
    ));

    // Create application state
    let state = AppState::new(config.clone());

    // Configure CORS for the browser editor
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_origin(Any);

    // Build application
    let app = route::create_router(state).layer(cors);

    // Start server
    tracing::info!("Starting server on {}", config.get_addr());
    let listener = tokio::net::TcpListener::bind(config.get_addr()).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
