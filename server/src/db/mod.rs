// medcart_server/src/db/mod.rs

//! Postgres wiring: pool setup, embedded migrations and the demo seed.

pub mod pg_store;
mod rows;
pub mod seed;

pub use pg_store::PgStore;

use crate::config::AppConfig;
use crate::errors::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub async fn connect(config: &AppConfig) -> Result<PgPool> {
  let pool = PgPoolOptions::new()
    .max_connections(config.database_max_connections)
    .connect(&config.database_url)
    .await?;
  tracing::info!(max_connections = config.database_max_connections, "Connected to the database.");
  Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
  sqlx::migrate!("./migrations").run(pool).await?;
  tracing::info!("Database migrations applied.");
  Ok(())
}
