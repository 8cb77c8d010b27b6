//! Order service: validates item sets and prices them from the catalog.
//!
//! Prices never come from callers. They are stamped from the current catalog
//! when items are written, and replaced by the current catalog price again
//! when an order is read, so a read reflects today's prices rather than the
//! ones recorded at order time.

use std::collections::{HashMap, HashSet};

use tracing::instrument;

use bookstore_core::{OrderId, ProductId};

use super::ServiceError;
use crate::db::{CatalogRepository, Database, OrderRepository};
use crate::models::{
    BaseProduct, CreateOrder, NewOrder, NewOrderItem, Order, OrderItem, OrderPatch, PricedItem,
    PricedOrder,
};

/// Order service.
pub struct OrderService<'a> {
    orders: OrderRepository<'a>,
    catalog: CatalogRepository<'a>,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self {
            orders: OrderRepository::new(db),
            catalog: CatalogRepository::new(db),
        }
    }

    /// Place an order with catalog prices.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidOrder` for an unacceptable item set,
    /// `ServiceError::UnknownProduct` if any item names a product the catalog
    /// does not have, or `ServiceError::Repository`.
    #[instrument(skip(self, order), fields(items = order.items.len()))]
    pub async fn create(&self, order: CreateOrder) -> Result<OrderId, ServiceError> {
        let items = self.price_items(&order.items).await?;
        let order = NewOrder {
            status: order.status.unwrap_or_default(),
            items,
        };
        Ok(self.orders.create(&order).await?)
    }

    /// Read an order with every item resolved against the current catalog.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` (`NotFound` for an absent order) or
    /// `ServiceError::UnknownProduct` if an item's product has left the
    /// catalog.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_by_id(&self, id: OrderId) -> Result<PricedOrder, ServiceError> {
        let order = self.orders.get_by_id(id).await?;
        let ids: Vec<ProductId> = order.items.iter().map(|item| item.product_id).collect();
        let catalog = self.catalog.get_by_ids(&ids).await?;
        reprice(order, &catalog)
    }

    /// Change an order's status and/or replace its items.
    ///
    /// Replacement items are validated and priced from the catalog; the store
    /// then reconciles them against the stored set. Without replacement items
    /// the stored items are written back unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` (`NotFound` for an absent order),
    /// `ServiceError::InvalidOrder` or `ServiceError::UnknownProduct`.
    #[instrument(skip(self, patch), fields(order_id = %id))]
    pub async fn update(&self, id: OrderId, patch: OrderPatch) -> Result<Order, ServiceError> {
        let mut order = self.orders.get_by_id(id).await?;

        if let Some(status) = patch.status {
            order.status = status;
        }
        if let Some(items) = patch.items {
            order.items = self.price_items(&items).await?;
        }

        self.orders.update(&order).await?;
        Ok(order)
    }

    /// Remove an order and its items.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn delete(&self, id: OrderId) -> Result<(), ServiceError> {
        Ok(self.orders.delete(id).await?)
    }

    async fn price_items(&self, items: &[NewOrderItem]) -> Result<Vec<OrderItem>, ServiceError> {
        validate_items(items)?;
        let ids: Vec<ProductId> = items.iter().map(|item| item.product_id).collect();
        let catalog = self.catalog.get_by_ids(&ids).await?;
        stamp_prices(items, &catalog)
    }
}

/// Check an incoming item set: non-empty, positive quantities, one entry per
/// product.
///
/// # Errors
///
/// Returns `ServiceError::InvalidOrder` describing the first problem found.
pub fn validate_items(items: &[NewOrderItem]) -> Result<(), ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::InvalidOrder(
            "an order needs at least one item".to_owned(),
        ));
    }

    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if item.quantity < 1 {
            return Err(ServiceError::InvalidOrder(format!(
                "quantity for product {} must be at least 1",
                item.product_id
            )));
        }
        if !seen.insert(item.product_id) {
            return Err(ServiceError::InvalidOrder(format!(
                "product {} appears more than once",
                item.product_id
            )));
        }
    }

    Ok(())
}

/// Attach the catalog price to each item.
///
/// # Errors
///
/// Returns `ServiceError::UnknownProduct` for the first item whose product is
/// missing from `catalog`.
pub fn stamp_prices(
    items: &[NewOrderItem],
    catalog: &[BaseProduct],
) -> Result<Vec<OrderItem>, ServiceError> {
    let prices: HashMap<ProductId, _> = catalog.iter().map(|p| (p.id, p.price)).collect();

    items
        .iter()
        .map(|item| {
            prices
                .get(&item.product_id)
                .map(|&price| OrderItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price,
                })
                .ok_or(ServiceError::UnknownProduct(item.product_id))
        })
        .collect()
}

/// Replace each stored item's price with the current catalog price and
/// attach the product name.
///
/// # Errors
///
/// Returns `ServiceError::UnknownProduct` for the first item whose product is
/// missing from `catalog`.
pub fn reprice(order: Order, catalog: &[BaseProduct]) -> Result<PricedOrder, ServiceError> {
    let products: HashMap<ProductId, &BaseProduct> = catalog.iter().map(|p| (p.id, p)).collect();

    let items = order
        .items
        .iter()
        .map(|item| {
            products
                .get(&item.product_id)
                .map(|product| PricedItem::new(item, product))
                .ok_or(ServiceError::UnknownProduct(item.product_id))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PricedOrder {
        id: order.id,
        status: order.status,
        created_at: order.created_at,
        items,
    })
}
