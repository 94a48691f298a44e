//! Store abstraction and the PostgreSQL implementation.
//!
//! The HTTP layer only sees [`Store`]; the binary picks [`PgStore`] or
//! [`crate::MemoryStore`] at startup.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::{StoreError, StoreResult};
use crate::models::Event;
use crate::schema;

/// Persistence operations used by the request handlers.
///
/// Implementations must be safe for concurrent use from many requests.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Number of enrollment rows for the `(module, org_id)` pair.
    async fn count(&self, module: &str, org_id: &str) -> StoreResult<i64>;

    /// Append an opaque event payload.
    async fn append_event(&self, payload: Bytes) -> StoreResult<Event>;

    /// Read events in insertion order.
    ///
    /// A negative `limit` means no limit. A negative `offset` is treated as 0.
    async fn events(&self, limit: i64, offset: i64) -> StoreResult<Vec<Event>>;

    /// Release the underlying handle. Closing twice is a no-op.
    async fn close(&self) -> StoreResult<()>;
}

/// Configuration for connecting to the database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections to maintain.
    pub min_connections: u32,
    /// Run migrations on connect.
    pub run_migrations: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://postgres@localhost:5432/postgres".to_string(),
            max_connections: 10,
            min_connections: 1,
            run_migrations: true,
        }
    }
}

impl StoreConfig {
    /// Configuration with the given URL and default pool settings.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }
}

/// PostgreSQL-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database with the given configuration.
    ///
    /// Runs the embedded migration if `config.run_migrations` is true.
    pub async fn connect(config: StoreConfig) -> StoreResult<Self> {
        if config.database_url.is_empty() {
            return Err(StoreError::Config("database URL is empty".to_string()));
        }

        tracing::info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.database_url)
            .await?;

        tracing::info!("Connected to database");

        if config.run_migrations {
            schema::run_migrations(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Create a store from an existing connection pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Drop and recreate all tables.
    pub async fn reset(&self) -> StoreResult<()> {
        schema::reset(&self.pool).await
    }

    /// Load seed data from a SQL file.
    pub async fn seed(&self, path: &Path) -> StoreResult<()> {
        schema::seed(&self.pool, path).await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn count(&self, module: &str, org_id: &str) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM accounts_modules WHERE module_name = $1 AND org_id = $2"#,
        )
        .bind(module)
        .bind(org_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn append_event(&self, payload: Bytes) -> StoreResult<Event> {
        let row = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (payload)
            VALUES ($1)
            RETURNING id, received_at, payload
            "#,
        )
        .bind(Event::payload_from_bytes(&payload))
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn events(&self, limit: i64, offset: i64) -> StoreResult<Vec<Event>> {
        // LIMIT NULL is LIMIT ALL in PostgreSQL.
        let limit = (limit >= 0).then_some(limit);

        let rows = sqlx::query_as::<_, Event>(
            r#"
            SELECT id, received_at, payload
            FROM events
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn close(&self) -> StoreResult<()> {
        if !self.pool.is_closed() {
            tracing::info!("Closing database pool");
            self.pool.close().await;
        }
        Ok(())
    }
}
