//! Order domain types.

use chrono::{DateTime, Utc};

use bookstore_core::{OrderId, OrderStatus, Price, ProductId};

use super::product::BaseProduct;

/// A line item as supplied by a caller: product and quantity only.
///
/// The unit price is never taken from the caller; it is stamped from the
/// catalog when the order is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// A stored line item. An order has at most one item per product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: i32,
    /// Unit price recorded when the item was written.
    pub price: Price,
}

/// An order ready to be written: header plus priced items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
}

/// A stored order with its line items.
///
/// Item order is not significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// Input for placing an order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOrder {
    /// Defaults to [`OrderStatus::Created`] when absent.
    pub status: Option<OrderStatus>,
    pub items: Vec<NewOrderItem>,
}

/// A partial update of an order.
///
/// `items: Some(..)` replaces the whole item set; `None` leaves it as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub items: Option<Vec<NewOrderItem>>,
}

/// A line item joined with its catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedItem {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i32,
    /// Current catalog price.
    pub price: Price,
}

impl PricedItem {
    /// Combine a stored item with the catalog product it refers to.
    #[must_use]
    pub fn new(item: &OrderItem, product: &BaseProduct) -> Self {
        Self {
            product_id: item.product_id,
            name: product.name.clone(),
            quantity: item.quantity,
            price: product.price,
        }
    }
}

/// An order as returned to API callers, with items resolved against the
/// current catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub id: OrderId,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<PricedItem>,
}
