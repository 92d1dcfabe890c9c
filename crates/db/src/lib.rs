//! PostgreSQL store for the Tally ledger.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repositories implementing the ledger operations in SQL transactions
//! - [`PgLedgerStore`], which plugs the repositories into the core store traits
//! - Database migrations

pub mod entities;
mod error;
pub mod migration;
pub mod repositories;
pub mod store;

pub use repositories::{AccountRepository, JournalRepository, ReportRepository, SequenceRepository};
pub use store::PgLedgerStore;

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tally_shared::config::DatabaseConfig;

/// Establishes a connection pool to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(false);
    Database::connect(options).await
}
