//! Database operations for the catalog `PostgreSQL`.
//!
//! ## Tables
//!
//! - `products` - Base row for every catalog item, tagged with its kind
//! - `books` - Book specialization (author, isbn), 1:1 with `products`
//! - `magazines` - Magazine specialization (issue number, publication date)
//! - `orders` - Order header (status, creation time)
//! - `order_items` - Line items keyed by `(order_id, product_id)`
//!
//! The schema lives in `crates/api/migrations/`. It is applied by the
//! integration test harness; deployments apply it out of band.
//!
//! ## Operation model
//!
//! Every repository call is one bounded [`Operation`]: it starts a clock,
//! runs at most `operation_timeout`, and (for writes and multi-statement
//! reads) executes inside a single transaction that is committed on success
//! and rolled back on every other exit path, including cancellation.

pub mod catalog;
pub mod kinds;
pub mod orders;
pub mod products;

use std::future::Future;
use std::time::{Duration, Instant};

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use tracing::{error, warn};

use bookstore_core::ProductKind;

use crate::config::DatabaseConfig;

pub use catalog::CatalogRepository;
pub use kinds::{Books, Magazines};
pub use orders::OrderRepository;
pub use products::{BookRepository, MagazineRepository, ProductRepository, ProductSchema};

/// Default bound for a single repository operation.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Requested row was not found.
    #[error("{operation}: not found after {elapsed:?}")]
    NotFound {
        /// Step that looked for the row.
        operation: &'static str,
        /// Time since the operation started.
        elapsed: Duration,
    },

    /// The product exists but is stored under another kind.
    #[error("{operation}: wrong product type: expected '{expected}', got '{actual}'")]
    WrongProductType {
        /// Step that read the base row.
        operation: &'static str,
        /// Time since the operation started.
        elapsed: Duration,
        /// Kind the caller asked for.
        expected: ProductKind,
        /// Kind tag found on the stored row.
        actual: ProductKind,
    },

    /// Unique constraint violation (e.g. duplicate ISBN).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Foreign key violation: the row is still referenced, or references a
    /// row that does not exist.
    #[error("referential integrity: {0}")]
    Integrity(String),

    /// The operation exceeded its time bound.
    #[error("{operation}: timeout after {elapsed:?}")]
    Timeout {
        /// Step that was running when the bound elapsed.
        operation: &'static str,
        /// Time since the operation started.
        elapsed: Duration,
    },

    /// Database error from sqlx.
    #[error("{operation}: failed after {elapsed:?}: {source}")]
    Database {
        /// Step that failed.
        operation: &'static str,
        /// Time since the operation started.
        elapsed: Duration,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Shared handle to the connection pool and the per-operation bound.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
    operation_timeout: Duration,
}

impl Database {
    /// Wrap a pool with the given per-operation timeout.
    #[must_use]
    pub const fn new(pool: PgPool, operation_timeout: Duration) -> Self {
        Self {
            pool,
            operation_timeout,
        }
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run `body` as one bounded operation.
    ///
    /// The body is dropped when the bound elapses; any transaction it holds
    /// is rolled back by the driver when dropped.
    pub(crate) async fn run<T, F>(&self, op: &Operation, body: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        if let Ok(result) = tokio::time::timeout(self.operation_timeout, body).await {
            result
        } else {
            let elapsed = op.elapsed();
            error!(
                operation = op.name(),
                elapsed = ?elapsed,
                reason = "timeout",
                "operation exceeded its time bound"
            );
            Err(RepositoryError::Timeout {
                operation: op.name(),
                elapsed,
            })
        }
    }

    /// Begin a transaction for `op`.
    pub(crate) async fn begin(
        &self,
        op: &Operation,
    ) -> Result<Transaction<'static, Postgres>, RepositoryError> {
        self.pool.begin().await.map_err(|e| op.fail("begin_tx", e))
    }
}

/// Clock and name of one repository operation, used to tag errors and logs.
#[derive(Debug)]
pub struct Operation {
    name: &'static str,
    started: Instant,
}

impl Operation {
    /// Start timing an operation.
    #[must_use]
    pub fn start(name: &'static str) -> Self {
        Self {
            name,
            started: Instant::now(),
        }
    }

    /// Operation name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Time since the operation started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Convert a driver error raised by `step` into a `RepositoryError`,
    /// logging it with the operation's elapsed time.
    ///
    /// Pool acquisition timeouts become `Timeout`, unique violations become
    /// `Conflict`, foreign key violations become `Integrity`, and everything
    /// else is `Database`.
    pub fn fail(&self, step: &'static str, err: sqlx::Error) -> RepositoryError {
        let elapsed = self.elapsed();

        if matches!(err, sqlx::Error::PoolTimedOut) {
            error!(
                operation = self.name,
                step,
                elapsed = ?elapsed,
                reason = "timeout",
                error = %err,
                "database step failed"
            );
            return RepositoryError::Timeout {
                operation: step,
                elapsed,
            };
        }

        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            let constraint = db_err.constraint().unwrap_or("unique").to_owned();
            error!(
                operation = self.name,
                step,
                elapsed = ?elapsed,
                constraint = %constraint,
                "unique constraint violated"
            );
            return RepositoryError::Conflict(format!("{step}: {constraint} already exists"));
        }

        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_foreign_key_violation()
        {
            let constraint = db_err.constraint().unwrap_or("foreign key").to_owned();
            warn!(
                operation = self.name,
                step,
                elapsed = ?elapsed,
                constraint = %constraint,
                "foreign key violated"
            );
            return RepositoryError::Integrity(format!("{step}: {constraint}"));
        }

        error!(
            operation = self.name,
            step,
            elapsed = ?elapsed,
            error = %err,
            "database step failed"
        );
        RepositoryError::Database {
            operation: step,
            elapsed,
            source: err,
        }
    }

    /// `NotFound` for a row that `step` looked for.
    pub fn not_found(&self, step: &'static str) -> RepositoryError {
        let elapsed = self.elapsed();
        warn!(operation = self.name, step, elapsed = ?elapsed, "row not found");
        RepositoryError::NotFound {
            operation: step,
            elapsed,
        }
    }

    /// `WrongProductType` for a base row that `step` read under another kind.
    pub fn wrong_kind(
        &self,
        step: &'static str,
        expected: ProductKind,
        actual: ProductKind,
    ) -> RepositoryError {
        let elapsed = self.elapsed();
        warn!(
            operation = self.name,
            step,
            elapsed = ?elapsed,
            expected = %expected,
            actual = %actual,
            "product stored under another kind"
        );
        RepositoryError::WrongProductType {
            operation: step,
            elapsed,
            expected,
            actual,
        }
    }
}

/// Commit `tx` if `result` is `Ok`, roll it back otherwise.
///
/// A failed rollback is logged and the original error is returned.
pub(crate) async fn finish<T>(
    tx: Transaction<'static, Postgres>,
    op: &Operation,
    result: Result<T, RepositoryError>,
) -> Result<T, RepositoryError> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(|e| op.fail("commit", e))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                error!(
                    operation = op.name(),
                    error = %rollback_err,
                    "rollback failed"
                );
            }
            Err(err)
        }
    }
}

/// Create a `PostgreSQL` connection pool and verify it answers.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established or the
/// initial ping fails.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .max_lifetime(config.max_lifetime)
        .acquire_timeout(config.acquire_timeout)
        .connect(config.url.expose_secret())
        .await?;

    if let Err(e) = ping(&pool).await {
        pool.close().await;
        return Err(e);
    }

    Ok(pool)
}

/// Check that the pool can run a trivial statement.
///
/// # Errors
///
/// Returns `sqlx::Error` if the database does not answer.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
