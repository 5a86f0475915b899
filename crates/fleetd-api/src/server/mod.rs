//! HTTP server for the fleetd registry.

pub mod middleware;
pub mod router;
pub mod types;

pub use middleware::check_admin_auth;
pub use router::create_router;
pub use types::{MAX_REQUEST_BODY_SIZE, ServerState};

use fleetd_core::Config;
use tracing::{info, warn};

/// Start the web server. This is the main entry point for running the
/// registry.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = ServerState::from_config(&config)?;

    if state.admin_token.is_none() {
        warn!(
            category = "server",
            "no admin token configured; admin endpoints will return 503"
        );
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(category = "server", %addr, "fleetd listening");

    axum::serve(listener, app).await?;
    Ok(())
}
