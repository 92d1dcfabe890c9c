//! Tally API Server
//!
//! Main entry point for the ledger service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use tally_api::{AppState, create_router};
use tally_core::ledger::PostingPolicy;
use tally_core::reports::ReportClock;
use tally_db::{PgLedgerStore, connect};
use tally_shared::{AppConfig, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    telemetry::init_tracing(&config.logging);

    let db = connect(&config.database)
        .await
        .context("failed to connect to database")?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let clock = ReportClock::from_timezone(&config.ledger.timezone)
        .context("invalid ledger.timezone")?;
    let policy = PostingPolicy::from(&config.ledger);
    info!(
        max_post_retries = policy.max_post_retries,
        timezone = %config.ledger.timezone,
        "Ledger configured"
    );

    let state = AppState::new(Arc::new(PgLedgerStore::new(db)), policy, clock);
    let app = create_router(
        state,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
