use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

mod attributes;
mod common;
mod config;
mod derive;
mod dispatcher;
mod error;
mod pool;
mod postgres_client;
mod sink;

use attributes::FakeAttributeSource;
use config::GeneratorConfig;
use postgres_client::{connect, create_database_if_not_exists, create_tables, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = GeneratorConfig::load().context("Invalid configuration")?;
    let database = &config.database;
    let run = &config.run;
    info!(
        "⚙️ Target {}:{}/{} with {} workers, {} records, account age {}..={}s, last login delay 1..={}s",
        database.host,
        database.port,
        database.dbname,
        run.num_workers,
        run.records,
        run.ranges.min_days,
        run.ranges.max_days,
        run.ranges.delay_last_login
    );

    create_database_if_not_exists(database)
        .await
        .with_context(|| format!("Unable to create database '{}'", database.dbname))?;

    {
        let client = connect(&database.postgres_config())
            .await
            .with_context(|| format!("Unable to connect to database '{}'", database.dbname))?;
        create_tables(&client).await.context("Unable to create tables")?;
    }

    let store = Arc::new(PgStore::new(database));
    let summary = pool::populate(run, store, FakeAttributeSource)
        .await
        .context("Record generation stopped")?;

    info!(
        "✅ Successfully processed {} records ({} dispatched, {} cycles) in {:.1}s ({:.0} records/s)",
        summary.requested,
        summary.dispatched,
        summary.cycles,
        summary.elapsed.as_secs_f64(),
        summary.records_per_second()
    );
    info!(
        "🧾 {} of {} writes succeeded, {} failed across {} workers",
        summary.writes_succeeded,
        summary.writes_attempted(),
        summary.writes_failed,
        summary.workers
    );
    Ok(())
}
