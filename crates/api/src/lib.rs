//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes for accounts, journal entries and reports
//! - Request extractors
//! - Translation of ledger errors into JSON error responses
//!
//! Handlers only see the storage traits of `tally-core`, so the same router
//! serves the PostgreSQL store and the in-memory one.

pub mod error;
pub mod extractors;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tally_core::ledger::{PostingEngine, PostingPolicy};
use tally_core::reports::{ReportClock, ReportingEngine};
use tally_core::store::LedgerStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Account registry, journal store and report reader.
    pub store: Arc<dyn LedgerStore>,
    /// Write side of the ledger.
    pub posting: PostingEngine<dyn LedgerStore>,
    /// Read side of the ledger.
    pub reports: ReportingEngine<dyn LedgerStore>,
}

impl AppState {
    /// Wires both engines over one store.
    pub fn new(store: Arc<dyn LedgerStore>, policy: PostingPolicy, clock: ReportClock) -> Self {
        Self {
            posting: PostingEngine::new(Arc::clone(&store), policy),
            reports: ReportingEngine::new(Arc::clone(&store), clock),
            store,
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
