//! Order store: order headers and their line items.
//!
//! An order owns at most one line item per product. Updates reconcile the
//! stored items against the incoming set instead of replacing them: every
//! incoming item is upserted on `(order_id, product_id)`, then every stored
//! item whose product is not in the incoming set is deleted.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::{debug, info, instrument, warn};

use bookstore_core::{OrderId, OrderStatus};

use super::{Database, Operation, RepositoryError, finish};
use crate::models::{NewOrder, Order, OrderItem};

const INSERT_ORDER: &str = r"
    INSERT INTO orders (status, created_at)
    VALUES ($1, $2)
    RETURNING id
";

const SELECT_ORDER: &str = r"
    SELECT id, status, created_at
    FROM orders
    WHERE id = $1
";

const UPDATE_ORDER: &str = "UPDATE orders SET status = $2 WHERE id = $1";

const DELETE_ORDER: &str = "DELETE FROM orders WHERE id = $1";

const INSERT_ITEM: &str = r"
    INSERT INTO order_items (order_id, product_id, quantity, price)
    VALUES ($1, $2, $3, $4)
";

const SELECT_ITEMS: &str = r"
    SELECT product_id, quantity, price
    FROM order_items
    WHERE order_id = $1
";

const UPSERT_ITEM: &str = r"
    INSERT INTO order_items (order_id, product_id, quantity, price)
    VALUES ($1, $2, $3, $4)
    ON CONFLICT (order_id, product_id) DO UPDATE
    SET quantity = EXCLUDED.quantity, price = EXCLUDED.price
";

const DELETE_STALE_ITEMS: &str = r"
    DELETE FROM order_items
    WHERE order_id = $1 AND product_id <> ALL($2)
";

const COUNT_ITEMS: &str = "SELECT COUNT(*) FROM order_items WHERE order_id = $1";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `orders` queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    status: String,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let status = self
            .status
            .parse::<OrderStatus>()
            .map_err(|e| RepositoryError::DataCorruption(format!("order {}: {e}", self.id)))?;

        Ok(Order {
            id: self.id,
            status,
            created_at: self.created_at,
            items,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for orders and their line items.
pub struct OrderRepository<'a> {
    db: &'a Database,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert the header and every line item in one transaction.
    ///
    /// Item prices are written as given; callers stamp them from the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` tagged `insert_order` or
    /// `insert_order_item`, or `Timeout`. Nothing is written on error.
    #[instrument(skip(self, order), fields(items = order.items.len()))]
    pub async fn create(&self, order: &NewOrder) -> Result<OrderId, RepositoryError> {
        let op = Operation::start("create_order");
        log_order(&op, order.status, &order.items);

        let id = self
            .db
            .run(&op, async {
                let mut tx = self.db.begin(&op).await?;
                let result = insert_rows(&mut tx, &op, order).await;
                finish(tx, &op, result).await
            })
            .await?;

        info!(operation = op.name(), order_id = %id, elapsed = ?op.elapsed(), "order created");
        Ok(id)
    }

    /// Read an order header and its line items.
    ///
    /// Items come back in storage order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the header is absent, or
    /// `DataCorruption` if the stored status is not recognised.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_by_id(&self, id: OrderId) -> Result<Order, RepositoryError> {
        let op = Operation::start("get_order");
        debug!(operation = op.name(), order_id = %id, "fetching order");

        let order = self
            .db
            .run(&op, async {
                let mut tx = self.db.begin(&op).await?;
                let result = select_rows(&mut tx, &op, id).await;
                finish(tx, &op, result).await
            })
            .await?;

        info!(
            operation = op.name(),
            order_id = %id,
            status = %order.status,
            items = order.items.len(),
            elapsed = ?op.elapsed(),
            "order fetched"
        );
        Ok(order)
    }

    /// Write the status and reconcile the line items in one transaction.
    ///
    /// Afterwards the stored item set equals `order.items` exactly. A status
    /// update that touches no rows is logged as a warning, not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` tagged `update_order`,
    /// `upsert_order_item` or `delete_order_items`, or `Timeout`.
    #[instrument(skip(self, order), fields(order_id = %order.id, items = order.items.len()))]
    pub async fn update(&self, order: &Order) -> Result<(), RepositoryError> {
        let op = Operation::start("update_order");
        log_order(&op, order.status, &order.items);

        let removed = self
            .db
            .run(&op, async {
                let mut tx = self.db.begin(&op).await?;
                let result = reconcile_rows(&mut tx, &op, order).await;
                finish(tx, &op, result).await
            })
            .await?;

        info!(
            operation = op.name(),
            order_id = %order.id,
            items = order.items.len(),
            removed,
            elapsed = ?op.elapsed(),
            "order updated"
        );
        Ok(())
    }

    /// Delete an order header.
    ///
    /// Line items are removed by the schema's cascade; any that remain
    /// afterwards are logged as a warning. Deleting an absent order is also
    /// a warning, not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` tagged `delete_order` or
    /// `count_order_items`, or `Timeout`.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let op = Operation::start("delete_order");
        debug!(operation = op.name(), order_id = %id, "deleting order");

        self.db
            .run(&op, async {
                let mut tx = self.db.begin(&op).await?;
                let result = delete_rows(&mut tx, &op, id).await;
                finish(tx, &op, result).await
            })
            .await?;

        info!(operation = op.name(), order_id = %id, elapsed = ?op.elapsed(), "order deleted");
        Ok(())
    }
}

fn log_order(op: &Operation, status: OrderStatus, items: &[OrderItem]) {
    debug!(operation = op.name(), status = %status, items = items.len(), "writing order");
    for item in items {
        debug!(
            operation = op.name(),
            product_id = %item.product_id,
            quantity = item.quantity,
            price = %item.price,
            "order item"
        );
    }
}

// =============================================================================
// Transaction bodies
// =============================================================================

async fn insert_rows(
    conn: &mut PgConnection,
    op: &Operation,
    order: &NewOrder,
) -> Result<OrderId, RepositoryError> {
    let id = sqlx::query_scalar::<_, OrderId>(INSERT_ORDER)
        .bind(order.status.as_str())
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| op.fail("insert_order", e))?;

    for item in &order.items {
        sqlx::query(INSERT_ITEM)
            .bind(id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.price)
            .execute(&mut *conn)
            .await
            .map_err(|e| op.fail("insert_order_item", e))?;
    }

    Ok(id)
}

async fn select_rows(
    conn: &mut PgConnection,
    op: &Operation,
    id: OrderId,
) -> Result<Order, RepositoryError> {
    let header = sqlx::query_as::<_, OrderRow>(SELECT_ORDER)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| op.fail("get_by_id_order", e))?
        .ok_or_else(|| op.not_found("get_by_id_order"))?;

    let items = sqlx::query_as::<_, OrderItem>(SELECT_ITEMS)
        .bind(id)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| op.fail("get_by_order_id_order_items", e))?;

    header.into_order(items)
}

/// Returns how many stale items were deleted.
async fn reconcile_rows(
    conn: &mut PgConnection,
    op: &Operation,
    order: &Order,
) -> Result<u64, RepositoryError> {
    let header = sqlx::query(UPDATE_ORDER)
        .bind(order.id)
        .bind(order.status.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| op.fail("update_order", e))?;

    if header.rows_affected() == 0 {
        warn!(
            operation = op.name(),
            order_id = %order.id,
            "no order affected; it may not exist"
        );
    }

    for item in &order.items {
        sqlx::query(UPSERT_ITEM)
            .bind(order.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.price)
            .execute(&mut *conn)
            .await
            .map_err(|e| op.fail("upsert_order_item", e))?;
    }

    let keep = retained_product_ids(&order.items);
    let stale = sqlx::query(DELETE_STALE_ITEMS)
        .bind(order.id)
        .bind(keep)
        .execute(&mut *conn)
        .await
        .map_err(|e| op.fail("delete_order_items", e))?;

    Ok(stale.rows_affected())
}

async fn delete_rows(
    conn: &mut PgConnection,
    op: &Operation,
    id: OrderId,
) -> Result<(), RepositoryError> {
    let header = sqlx::query(DELETE_ORDER)
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| op.fail("delete_order", e))?;

    if header.rows_affected() == 0 {
        warn!(
            operation = op.name(),
            order_id = %id,
            "no order affected; it may not exist"
        );
    }

    let remaining = sqlx::query_scalar::<_, i64>(COUNT_ITEMS)
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| op.fail("count_order_items", e))?;

    if remaining > 0 {
        warn!(
            operation = op.name(),
            order_id = %id,
            remaining_items = remaining,
            "order items were not deleted with their order"
        );
    }

    Ok(())
}

/// Product ids bound as the `<> ALL($2)` array of the stale-item delete.
///
/// An empty set deletes every item of the order.
fn retained_product_ids(items: &[OrderItem]) -> Vec<i32> {
    items.iter().map(|item| item.product_id.as_i32()).collect()
}
