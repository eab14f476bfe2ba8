/// Rollcall - QR-based attendance service
///
/// A course attendance backend: teachers issue short-lived QR session
/// tokens, students scan them and are marked present when close enough
/// to the classroom.

mod account;
mod api;
mod attendance;
mod auth;
mod blob_store;
mod config;
mod context;
mod course;
mod db;
mod error;
mod server;

use config::ServerConfig;
use context::AppContext;
use error::RollcallResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> RollcallResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollcall=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}
