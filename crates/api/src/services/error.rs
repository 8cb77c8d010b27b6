//! Service error types.

use thiserror::Error;

use bookstore_core::{ProductId, ProductKind};

use crate::db::RepositoryError;

/// Errors that can occur in catalog and order services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Store operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The pre-write uniqueness check found the key already taken.
    #[error("{kind} with {field} '{value}' already exists")]
    UniquenessConflict {
        /// Kind being written.
        kind: ProductKind,
        /// Unique column that collided (`isbn`, `issue_number`).
        field: &'static str,
        /// The colliding value.
        value: String,
    },

    /// An order references a product the catalog does not have.
    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),

    /// The order's item set is not acceptable.
    #[error("invalid order: {0}")]
    InvalidOrder(String),
}
