//! Database seeder for Stockledger.
//!
//! Registers the document series the workflows number from. Safe to run
//! repeatedly: existing series are updated in place and their counters are
//! left alone.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::{Datelike, Utc};
use stockledger_core::sequence::DocumentSeries;
use stockledger_core::workflow::DocumentWorkflows;
use stockledger_db::PgLedgerStore;
use stockledger_shared::AppConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default series: name and description.
const DEFAULT_SERIES: &[(&str, &str)] = &[
    ("NIR", "Goods receipt notes"),
    ("FACT", "Sales invoices"),
    ("AVIZ", "Delivery notes"),
    ("RET", "Return notes"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockledger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load_with_dotenv().context("Failed to load configuration")?;
    let db = stockledger_db::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let workflows = DocumentWorkflows::new(PgLedgerStore::new(db), &config.ledger);

    let year = Utc::now().year();
    for (name, description) in DEFAULT_SERIES {
        let series = DocumentSeries::new(*name, Some((*description).to_string()));
        workflows
            .register_series(&series)
            .await
            .with_context(|| format!("Failed to register series {name}"))?;

        let current = workflows.current_number(name, year).await?;
        info!(
            series = name,
            year,
            last_number = current.unwrap_or(0),
            "Series registered"
        );
    }

    info!("Seeding complete");
    Ok(())
}
