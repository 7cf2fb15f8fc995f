//! `PostgreSQL` persistence for the seat ledger.
//!
//! This crate provides [`PostgresStore`], which implements every store trait
//! from `seatledger-core`, and [`PostgresChangeFeed`], which relays changes to
//! the `events` table through `LISTEN/NOTIFY`. It uses sqlx with runtime
//! queries and supports:
//!
//! - Seat mutations as row-locking transactions (`SELECT … FOR UPDATE` on the
//!   event row, then conditional updates)
//! - A partial unique index on `registrations (event_id, user_id)` as the
//!   backstop against duplicate registrations
//! - Embedded migrations
//!
//! # Lock ordering
//!
//! Every transaction that touches both tables locks the `events` row before
//! any `registrations` row, so concurrent ledger operations cannot deadlock.
//!
//! # Example
//!
//! ```ignore
//! use seatledger_postgres::PostgresStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresStore::connect("postgres://localhost/seatledger", 10).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

mod catalog;
mod feed;
mod rows;
mod seats;

pub use feed::{CHANNEL, PostgresChangeFeed};

use seatledger_core::error::StoreError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Store backed by a `PostgreSQL` connection pool.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect with a pool of at most `max_connections`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the database cannot be reached.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        Self::connect_with(
            PgPoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(Duration::from_secs(5)),
            database_url,
        )
        .await
    }

    /// Connect with explicit pool options.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the database cannot be reached.
    pub async fn connect_with(options: PgPoolOptions, database_url: &str) -> Result<Self, StoreError> {
        let pool = options
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to connect: {e}")))?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}

/// Map a sqlx error into a [`StoreError`] with context.
pub(crate) fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| {
        metrics::counter!("seatledger_store_errors_total", "operation" => context).increment(1);
        StoreError::Unavailable(format!("{context}: {e}"))
    }
}

/// Whether an error is a unique-constraint violation.
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
