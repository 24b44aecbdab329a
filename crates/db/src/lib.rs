//! PostgreSQL persistence for the stock ledger.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Database migrations, including the append-only guard on movements
//! - [`PgLedgerStore`], the `LedgerStore` implementation used in production

pub mod entities;
pub mod migration;
pub mod store;

pub use migration::Migrator;
pub use store::{PgLedgerStore, PgLedgerTx};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use stockledger_shared::DatabaseConfig;
use tracing::info;

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
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(config.sqlx_logging);

    let db = Database::connect(options).await?;
    info!(max_connections = config.max_connections, "Connected to database");
    Ok(db)
}
