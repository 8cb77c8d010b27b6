//! Product store: one base row in `products` plus one specialization row per
//! product, written and removed together.
//!
//! The store is generic over a [`ProductSchema`], which names the
//! specialization table and knows how to bind and read the kind's columns.
//! The descriptors for books and magazines live in [`super::kinds`].

use std::fmt::{Debug, Display};
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{FromRow, PgConnection, Postgres};
use tracing::{debug, info, instrument, warn};

use bookstore_core::{Price, ProductId, ProductKind};

use super::kinds::{Books, Magazines};
use super::{Database, Operation, RepositoryError, finish};
use crate::models::{NewProduct, Product};

// =============================================================================
// Schema description
// =============================================================================

/// Layout of a kind's specialization table.
///
/// The table is keyed by `product_id` (1:1 with `products.id`). `columns` are
/// listed in the order the kind binds them and match the field names of its
/// details row type.
#[derive(Debug, Clone, Copy)]
pub struct SpecializationTable {
    /// Table name.
    pub name: &'static str,
    /// Kind-specific columns, in bind order.
    pub columns: &'static [&'static str],
    /// Column that must be unique across the table.
    pub unique_column: &'static str,
    /// Step names used to tag errors and logs.
    pub insert_step: &'static str,
    pub select_step: &'static str,
    pub update_step: &'static str,
    pub delete_step: &'static str,
    pub exists_step: &'static str,
}

impl SpecializationTable {
    fn placeholders(&self) -> impl Iterator<Item = (usize, &'static str)> {
        // $1 is always the product id.
        self.columns
            .iter()
            .copied()
            .enumerate()
            .map(|(i, c)| (i + 2, c))
    }

    /// `INSERT` of one specialization row; binds the id, then the columns.
    #[must_use]
    pub fn insert_sql(&self) -> String {
        let values: Vec<String> = self.placeholders().map(|(n, _)| format!("${n}")).collect();
        format!(
            "INSERT INTO {} (product_id, {}) VALUES ($1, {})",
            self.name,
            self.columns.join(", "),
            values.join(", ")
        )
    }

    /// `SELECT` of the kind's columns for one product id.
    #[must_use]
    pub fn select_sql(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE product_id = $1",
            self.columns.join(", "),
            self.name
        )
    }

    /// `UPDATE` of every kind column; binds the id, then the columns.
    #[must_use]
    pub fn update_sql(&self) -> String {
        let assignments: Vec<String> = self
            .placeholders()
            .map(|(n, column)| format!("{column} = ${n}"))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE product_id = $1",
            self.name,
            assignments.join(", ")
        )
    }

    /// `DELETE` of one specialization row.
    #[must_use]
    pub fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE product_id = $1", self.name)
    }

    /// Existence check on the unique column.
    #[must_use]
    pub fn exists_sql(&self) -> String {
        format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = $1)",
            self.name, self.unique_column
        )
    }
}

/// A product kind stored as a specialization of `products`.
pub trait ProductSchema: Send + Sync + 'static {
    /// Tag written to `products.type`.
    const KIND: ProductKind;

    /// The kind's specialization table.
    const TABLE: SpecializationTable;

    /// Kind-specific attributes, read from the columns of [`Self::TABLE`].
    type Details: for<'r> FromRow<'r, PgRow> + Debug + Clone + Send + Sync + Unpin;

    /// Value of the unique column.
    type Key: for<'q> sqlx::Encode<'q, Postgres>
        + sqlx::Type<Postgres>
        + Clone
        + Debug
        + Display
        + PartialEq
        + Send
        + Sync;

    /// Unique key of a product of this kind.
    fn key(details: &Self::Details) -> &Self::Key;

    /// Bind the kind's columns in [`SpecializationTable::columns`] order.
    fn bind_details<'q>(
        query: Query<'q, Postgres, PgArguments>,
        details: &'q Self::Details,
    ) -> Query<'q, Postgres, PgArguments>;
}

// =============================================================================
// Internal Row Types
// =============================================================================

const INSERT_PRODUCT: &str = r"
    INSERT INTO products (type, name, price, stock, created_at)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id
";

const SELECT_PRODUCT: &str = r"
    SELECT id, type, name, price, stock, created_at
    FROM products
    WHERE id = $1
";

const UPDATE_PRODUCT: &str = r"
    UPDATE products
    SET name = $2, price = $3, stock = $4
    WHERE id = $1
";

const DELETE_PRODUCT: &str = "DELETE FROM products WHERE id = $1";

/// Internal row type for `products` queries.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct ProductRow {
    pub id: ProductId,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub name: String,
    pub price: Price,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for products of kind `K`.
pub struct ProductRepository<'a, K> {
    db: &'a Database,
    kind: PhantomData<fn() -> K>,
}

/// Product store for books.
pub type BookRepository<'a> = ProductRepository<'a, Books>;

/// Product store for magazines.
pub type MagazineRepository<'a> = ProductRepository<'a, Magazines>;

impl<'a, K: ProductSchema> ProductRepository<'a, K> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self {
            db,
            kind: PhantomData,
        }
    }

    /// Insert the base row and the specialization row in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` tagged `insert_product` or the
    /// kind's insert step, `Conflict` if the unique column is already taken,
    /// or `Timeout`. Nothing is written on error.
    #[instrument(skip(self, product), fields(kind = K::KIND.as_str()))]
    pub async fn create(
        &self,
        product: &NewProduct<K::Details>,
    ) -> Result<ProductId, RepositoryError> {
        let op = Operation::start("create_product");
        debug!(
            operation = op.name(),
            name = %product.name,
            price = %product.price,
            stock = product.stock,
            details = ?product.details,
            "creating product"
        );

        let id = self
            .db
            .run(&op, async {
                let mut tx = self.db.begin(&op).await?;
                let result = insert_rows::<K>(&mut tx, &op, product).await;
                finish(tx, &op, result).await
            })
            .await?;

        info!(
            operation = op.name(),
            product_id = %id,
            elapsed = ?op.elapsed(),
            "product created"
        );
        Ok(id)
    }

    /// Read a product of kind `K`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no base row exists,
    /// `WrongProductType` if it exists under another kind, and
    /// `DataCorruption` if the kind tag is unknown or the specialization row
    /// is missing.
    #[instrument(skip(self), fields(kind = K::KIND.as_str(), product_id = %id))]
    pub async fn get_by_id(&self, id: ProductId) -> Result<Product<K::Details>, RepositoryError> {
        let op = Operation::start("get_product");
        debug!(operation = op.name(), product_id = %id, "fetching product");

        let product = self
            .db
            .run(&op, async {
                let mut tx = self.db.begin(&op).await?;
                let result = select_rows::<K>(&mut tx, &op, id).await;
                finish(tx, &op, result).await
            })
            .await?;

        info!(
            operation = op.name(),
            product_id = %id,
            elapsed = ?op.elapsed(),
            "product fetched"
        );
        Ok(product)
    }

    /// Overwrite the mutable fields of both rows in one transaction.
    ///
    /// An update that touches no rows is logged as a warning, not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` tagged `update_product` or the
    /// kind's update step, `Conflict`, or `Timeout`.
    #[instrument(skip(self, product), fields(kind = K::KIND.as_str(), product_id = %product.id))]
    pub async fn update(&self, product: &Product<K::Details>) -> Result<(), RepositoryError> {
        let op = Operation::start("update_product");
        debug!(
            operation = op.name(),
            product_id = %product.id,
            name = %product.name,
            price = %product.price,
            stock = product.stock,
            details = ?product.details,
            "updating product"
        );

        self.db
            .run(&op, async {
                let mut tx = self.db.begin(&op).await?;
                let result = update_rows::<K>(&mut tx, &op, product).await;
                finish(tx, &op, result).await
            })
            .await?;

        info!(
            operation = op.name(),
            product_id = %product.id,
            elapsed = ?op.elapsed(),
            "product updated"
        );
        Ok(())
    }

    /// Remove the specialization row, then the base row, in one transaction.
    ///
    /// Deleting an absent product is logged as a warning, not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Integrity` if an order item still references
    /// the product or it is stored under another kind, `Database` tagged with
    /// the failing step, or `Timeout`.
    #[instrument(skip(self), fields(kind = K::KIND.as_str(), product_id = %id))]
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let op = Operation::start("delete_product");
        debug!(operation = op.name(), product_id = %id, "deleting product");

        self.db
            .run(&op, async {
                let mut tx = self.db.begin(&op).await?;
                let result = delete_rows::<K>(&mut tx, &op, id).await;
                finish(tx, &op, result).await
            })
            .await?;

        info!(
            operation = op.name(),
            product_id = %id,
            elapsed = ?op.elapsed(),
            "product deleted"
        );
        Ok(())
    }

    /// Whether any product of this kind already uses `key`.
    ///
    /// A single read outside any transaction; the answer can be stale by the
    /// time a subsequent write runs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` or `Timeout`.
    #[instrument(skip(self), fields(kind = K::KIND.as_str(), key = %key))]
    pub async fn key_exists(&self, key: &K::Key) -> Result<bool, RepositoryError> {
        let op = Operation::start(K::TABLE.exists_step);
        let sql = K::TABLE.exists_sql();

        let exists = self
            .db
            .run(&op, async {
                sqlx::query_scalar::<_, bool>(&sql)
                    .bind(key)
                    .fetch_one(self.db.pool())
                    .await
                    .map_err(|e| op.fail(K::TABLE.exists_step, e))
            })
            .await?;

        debug!(
            operation = op.name(),
            key = %key,
            exists,
            elapsed = ?op.elapsed(),
            "uniqueness checked"
        );
        Ok(exists)
    }
}

// =============================================================================
// Transaction bodies
// =============================================================================

async fn insert_rows<K: ProductSchema>(
    conn: &mut PgConnection,
    op: &Operation,
    product: &NewProduct<K::Details>,
) -> Result<ProductId, RepositoryError> {
    let id = sqlx::query_scalar::<_, ProductId>(INSERT_PRODUCT)
        .bind(K::KIND.as_str())
        .bind(&product.name)
        .bind(product.price)
        .bind(product.stock)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| op.fail("insert_product", e))?;

    let sql = K::TABLE.insert_sql();
    K::bind_details(sqlx::query(&sql).bind(id), &product.details)
        .execute(&mut *conn)
        .await
        .map_err(|e| op.fail(K::TABLE.insert_step, e))?;

    Ok(id)
}

async fn select_rows<K: ProductSchema>(
    conn: &mut PgConnection,
    op: &Operation,
    id: ProductId,
) -> Result<Product<K::Details>, RepositoryError> {
    let row = sqlx::query_as::<_, ProductRow>(SELECT_PRODUCT)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| op.fail("get_by_id_product", e))?
        .ok_or_else(|| op.not_found("get_by_id_product"))?;
    check_kind::<K>(op, &row)?;

    let sql = K::TABLE.select_sql();
    let details = sqlx::query_as::<_, K::Details>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| op.fail(K::TABLE.select_step, e))?
        .ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "product {id} is tagged '{}' but has no {} row",
                K::KIND,
                K::TABLE.name
            ))
        })?;

    Ok(Product {
        id: row.id,
        name: row.name,
        price: row.price,
        stock: row.stock,
        created_at: row.created_at,
        details,
    })
}

async fn update_rows<K: ProductSchema>(
    conn: &mut PgConnection,
    op: &Operation,
    product: &Product<K::Details>,
) -> Result<(), RepositoryError> {
    let base = sqlx::query(UPDATE_PRODUCT)
        .bind(product.id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.stock)
        .execute(&mut *conn)
        .await
        .map_err(|e| op.fail("update_product", e))?;
    warn_if_untouched(op, "update_product", product.id, base.rows_affected());

    let sql = K::TABLE.update_sql();
    let specialization = K::bind_details(sqlx::query(&sql).bind(product.id), &product.details)
        .execute(&mut *conn)
        .await
        .map_err(|e| op.fail(K::TABLE.update_step, e))?;
    let rows_affected = specialization.rows_affected();
    warn_if_untouched(op, K::TABLE.update_step, product.id, rows_affected);

    Ok(())
}

async fn delete_rows<K: ProductSchema>(
    conn: &mut PgConnection,
    op: &Operation,
    id: ProductId,
) -> Result<(), RepositoryError> {
    let sql = K::TABLE.delete_sql();
    let specialization = sqlx::query(&sql)
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| op.fail(K::TABLE.delete_step, e))?;
    warn_if_untouched(op, K::TABLE.delete_step, id, specialization.rows_affected());

    let base = sqlx::query(DELETE_PRODUCT)
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| op.fail("delete_product", e))?;
    warn_if_untouched(op, "delete_product", id, base.rows_affected());

    Ok(())
}

/// The base row must carry a known kind tag, and it must be `K`'s.
fn check_kind<K: ProductSchema>(op: &Operation, row: &ProductRow) -> Result<(), RepositoryError> {
    let kind = row
        .kind
        .parse::<ProductKind>()
        .map_err(|e| RepositoryError::DataCorruption(format!("product {}: {e}", row.id)))?;
    if kind != K::KIND {
        return Err(op.wrong_kind("get_by_id_product", K::KIND, kind));
    }
    Ok(())
}

fn warn_if_untouched(op: &Operation, step: &'static str, id: ProductId, rows_affected: u64) {
    if rows_affected == 0 {
        warn!(
            operation = op.name(),
            step,
            product_id = %id,
            "no rows affected; product may not exist"
        );
    }
}
