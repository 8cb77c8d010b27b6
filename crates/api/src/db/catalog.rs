//! Catalog resolver: batched lookup of base product rows.

use tracing::{debug, info, instrument};

use bookstore_core::ProductId;

use super::products::ProductRow;
use super::{Database, Operation, RepositoryError};
use crate::models::BaseProduct;

const SELECT_PRODUCTS: &str = r"
    SELECT id, type, name, price, stock, created_at
    FROM products
    WHERE id = ANY($1)
";

impl From<ProductRow> for BaseProduct {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
            stock: row.stock,
            created_at: row.created_at,
        }
    }
}

/// Repository for kind-agnostic catalog reads.
pub struct CatalogRepository<'a> {
    db: &'a Database,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Fetch the base rows of every product in `ids` in a single statement.
    ///
    /// Ids with no product are silently absent from the result; callers
    /// compare the result against what they asked for. Result order is
    /// unspecified.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` or `Timeout`.
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    pub async fn get_by_ids(&self, ids: &[ProductId]) -> Result<Vec<BaseProduct>, RepositoryError> {
        let ids = distinct_ids(ids);
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let op = Operation::start("get_products_by_ids");
        debug!(operation = op.name(), ids = ?ids, "resolving products");

        let rows = self
            .db
            .run(&op, async {
                sqlx::query_as::<_, ProductRow>(SELECT_PRODUCTS)
                    .bind(&ids)
                    .fetch_all(self.db.pool())
                    .await
                    .map_err(|e| op.fail("get_by_ids_product", e))
            })
            .await?;

        info!(
            operation = op.name(),
            requested = ids.len(),
            found = rows.len(),
            elapsed = ?op.elapsed(),
            "products resolved"
        );
        Ok(rows.into_iter().map(BaseProduct::from).collect())
    }
}

fn distinct_ids(ids: &[ProductId]) -> Vec<i32> {
    let mut ids: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
