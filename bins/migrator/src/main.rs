//! Database migration runner for Stockledger.
//!
//! Usage:
//!   migrator up      - Run all pending migrations
//!   migrator down    - Rollback last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations
//!
//! The database URL comes from the application configuration
//! (`config/*` files or `STOCKLEDGER__DATABASE__URL`).

use anyhow::{Context, bail};
use sea_orm_migration::MigratorTrait;
use stockledger_db::Migrator;
use stockledger_shared::AppConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockledger=info,sea_orm_migration=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());

    let config = AppConfig::load_with_dotenv().context("Failed to load configuration")?;
    let db = stockledger_db::connect(&config.database)
        .await
        .context("Failed to connect to database")?;

    match command.as_str() {
        "up" => Migrator::up(&db, None).await?,
        "down" => Migrator::down(&db, Some(1)).await?,
        "status" => Migrator::status(&db).await?,
        "fresh" => Migrator::fresh(&db).await?,
        other => bail!("unknown command {other:?}, expected up, down, status or fresh"),
    }

    info!(command = %command, "Migration command finished");
    Ok(())
}
