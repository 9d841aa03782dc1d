//! fiberroute API server
//!
//! REST backend for the fiber-route annotation frontend. Provides:
//!
//! - Document registration (validated PDF upload)
//! - Annotated PDF export via the overlay renderer
//! - CSV/JSON measurement reports
//! - Cable configuration validation
//!
//! ## Architecture
//!
//! The server is a thin, stateless shell around the library crates: the
//! only state it owns is the upload directory of registered source
//! documents. Exports are pure functions of (stored PDF, request body),
//! so the process can be scaled horizontally behind a shared volume.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;
#[cfg(test)]
mod tests;

use api::{
    handle_cable_validate, handle_export_pdf, handle_export_report, handle_health,
    handle_register_document,
};

/// Command-line arguments for the fiberroute server
#[derive(Parser, Debug)]
#[command(name = "fiberroute-api")]
#[command(about = "fiberroute server for annotated site-plan exports")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Directory registered documents are stored in
    #[arg(long, default_value = "uploads")]
    upload_dir: PathBuf,

    /// Rate limit: requests per second per IP
    #[arg(long, default_value = "10")]
    rate_limit: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Where registered source documents live
    pub upload_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting fiberroute server on {}:{}", args.host, args.port);

    std::fs::create_dir_all(&args.upload_dir)?;

    // Create rate limiter configuration
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(args.rate_limit.into())
            .burst_size(args.rate_limit * 2)
            .finish()
            .expect("Failed to create rate limiter config"),
    );

    // Create shared state
    let state = AppState {
        upload_dir: args.upload_dir.clone(),
    };

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(handle_health))
        // API endpoints
        .route("/api/documents", post(handle_register_document))
        .route("/api/exports/pdf", post(handle_export_pdf))
        .route("/api/exports/report", post(handle_export_report))
        .route("/api/cable-config/validate", post(handle_cable_validate))
        // Apply middleware
        .layer(GovernorLayer {
            config: governor_conf,
        })
        .layer(cors)
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Upload directory: {}", args.upload_dir.display());
    info!("Rate limit: {} requests/second per IP", args.rate_limit);

    axum::serve(listener, app).await?;

    Ok(())
}
