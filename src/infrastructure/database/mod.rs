//! User and credential persistence.
//!
//! PostgreSQL when `DATABASE_URL` is configured, otherwise an in-process map.

mod memory_repository;
mod postgres_repository;


pub use memory_repository::MemoryRepository;
pub use postgres_repository::PostgresRepository;

use crate::config::DatabaseConfig;
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Delay between schema initialization attempts.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Idempotent schema; safe to run on every startup.
const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS users (
        id           UUID PRIMARY KEY,
        username     TEXT NOT NULL UNIQUE,
        display_name TEXT NOT NULL,
        created_at   TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS credentials (
        id                 BYTEA PRIMARY KEY,
        user_id            UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        username           TEXT NOT NULL,
        public_key         BYTEA NOT NULL,
        counter            BIGINT NOT NULL,
        transports         TEXT[] NOT NULL DEFAULT '{}',
        attestation_format TEXT NOT NULL,
        aaguid             UUID NOT NULL,
        created_at         TIMESTAMPTZ NOT NULL,
        last_used_at       TIMESTAMPTZ
    )",
    "CREATE INDEX IF NOT EXISTS credentials_username_idx ON credentials (username)",
];

/// Builds the connection pool and makes sure the schema exists.
///
/// The database may still be starting (e.g. under docker compose), so schema
/// creation is retried up to `retry_count` times before giving up.
pub async fn connect_with_retry(config: &DatabaseConfig) -> Result<PgPool> {
    // ---
    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_lazy(&config.database_url)
        .context("invalid DATABASE_URL")?;

    let attempts = config.retry_count.max(1);
    let mut attempt = 1;
    loop {
        match init_schema(&pool).await {
            Ok(()) => {
                tracing::info!(attempt, "Database schema ready");
                return Ok(pool);
            }
            Err(err) if attempt >= attempts => {
                return Err(err.context(format!("database unavailable after {attempts} attempts")));
            }
            Err(err) => {
                tracing::warn!(attempt, attempts, "Database not ready: {err:#}");
                tokio::time::sleep(RETRY_DELAY).await;
                attempt += 1;
            }
        }
    }
}

async fn init_schema(pool: &PgPool) -> Result<()> {
    // ---
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("schema initialization failed")?;
    }
    Ok(())
}
