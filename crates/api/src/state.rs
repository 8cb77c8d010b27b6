//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::db::Database;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// bounded database handle.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    db: Database,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Store operations are bounded by `config.operation_timeout`.
    #[must_use]
    pub fn new(config: &ApiConfig, pool: PgPool) -> Self {
        let db = Database::new(pool, config.operation_timeout);
        Self {
            inner: Arc::new(AppStateInner { db }),
        }
    }

    /// Get a reference to the bounded database handle.
    #[must_use]
    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        self.inner.db.pool()
    }
}
