//! Schema definitions and migration utilities.
//!
//! The SQL is embedded at compile time so the binary carries its own schema.

use std::path::Path;

use sqlx::PgPool;

use crate::error::{StoreError, StoreResult};

/// Embedded migration SQL for the core schema (001_schema.sql).
pub const SCHEMA_MIGRATION: &str = include_str!("../../../migrations/001_schema.sql");

/// Embedded SQL that drops all service tables (000_reset.sql).
pub const RESET_SQL: &str = include_str!("../../../migrations/000_reset.sql");

/// Run the schema migration against the database.
///
/// This function is idempotent - it can be run multiple times safely.
pub async fn run_migrations(pool: &PgPool) -> StoreResult<()> {
    tracing::info!("Running database migrations...");

    sqlx::raw_sql(SCHEMA_MIGRATION)
        .execute(pool)
        .await
        .map_err(|e| StoreError::Migration(format!("Schema migration failed: {}", e)))?;

    tracing::info!("Migrations completed successfully");
    Ok(())
}

/// Drop and recreate all service tables.
pub async fn reset(pool: &PgPool) -> StoreResult<()> {
    tracing::warn!("Resetting database schema");

    sqlx::raw_sql(RESET_SQL)
        .execute(pool)
        .await
        .map_err(|e| StoreError::Migration(format!("Schema reset failed: {}", e)))?;

    run_migrations(pool).await
}

/// Execute a seed SQL file against the database.
pub async fn seed(pool: &PgPool, path: &Path) -> StoreResult<()> {
    let sql = read_seed(path).await?;

    tracing::info!(path = %path.display(), "Loading seed data");
    sqlx::raw_sql(&sql)
        .execute(pool)
        .await
        .map_err(|e| StoreError::Seed(format!("{}: {}", path.display(), e)))?;

    Ok(())
}

/// Read a seed file, rejecting empty ones.
pub async fn read_seed(path: &Path) -> StoreResult<String> {
    let sql = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StoreError::Seed(format!("{}: {}", path.display(), e)))?;

    if sql.trim().is_empty() {
        return Err(StoreError::Seed(format!("{}: file is empty", path.display())));
    }

    Ok(sql)
}
