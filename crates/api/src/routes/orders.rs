//! Order route handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookstore_core::{OrderId, OrderStatus, Price, ProductId};

use super::{CreatedResponse, MessageResponse, invalid_body, parse_id};
use crate::error::{AppError, Result};
use crate::models::{CreateOrder, NewOrderItem, OrderPatch, PricedItem, PricedOrder};
use crate::services::OrderService;
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// One requested line item. Prices are never accepted from clients.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: i32,
    pub quantity: i32,
}

/// Body of `POST /orders`.
#[derive(Debug, Deserialize)]
pub struct OrderCreateRequest {
    pub items: Vec<OrderItemRequest>,
    /// Defaults to `created`.
    pub status: Option<String>,
}

impl OrderCreateRequest {
    /// Validate and convert into a service input.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an unknown status or a quantity
    /// below 1.
    pub fn into_create(self) -> Result<CreateOrder> {
        Ok(CreateOrder {
            status: self.status.as_deref().map(parse_status).transpose()?,
            items: convert_items(&self.items)?,
        })
    }
}

/// Body of `PUT /orders/{id}`; `items`, when present, replaces the whole set.
#[derive(Debug, Default, Deserialize)]
pub struct OrderUpdateRequest {
    pub items: Option<Vec<OrderItemRequest>>,
    pub status: Option<String>,
}

impl OrderUpdateRequest {
    /// Validate the present fields and convert into a patch.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an unknown status or a quantity
    /// below 1.
    pub fn into_patch(self) -> Result<OrderPatch> {
        Ok(OrderPatch {
            status: self.status.as_deref().map(parse_status).transpose()?,
            items: self.items.as_deref().map(convert_items).transpose()?,
        })
    }
}

/// A line item as returned to clients, priced from the current catalog.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub quantity: i32,
}

impl From<PricedItem> for OrderItemResponse {
    fn from(item: PricedItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name,
            price: item.price,
            quantity: item.quantity,
        }
    }
}

/// An order as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: OrderId,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
}

impl From<PricedOrder> for OrderResponse {
    fn from(order: PricedOrder) -> Self {
        Self {
            id: order.id,
            status: order.status,
            items: order.items.into_iter().map(Into::into).collect(),
            created_at: order.created_at,
        }
    }
}

/// Body of `GET /orders/{id}`.
#[derive(Debug, Serialize)]
pub struct GetOrderResponse {
    pub order: OrderResponse,
    pub message: String,
}

fn parse_status(raw: &str) -> Result<OrderStatus> {
    raw.parse::<OrderStatus>()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

fn convert_items(items: &[OrderItemRequest]) -> Result<Vec<NewOrderItem>> {
    items
        .iter()
        .map(|item| {
            if item.quantity < 1 {
                return Err(AppError::BadRequest(format!(
                    "quantity for product {} must be at least 1",
                    item.product_id
                )));
            }
            Ok(NewOrderItem {
                product_id: ProductId::new(item.product_id),
                quantity: item.quantity,
            })
        })
        .collect()
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /orders`
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an invalid body, or the service error
/// (`InvalidOrder`, `UnknownProduct`).
pub async fn create(
    State(state): State<AppState>,
    payload: std::result::Result<Json<OrderCreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let Json(request) = payload.map_err(|e| invalid_body(&e))?;
    let order = request.into_create()?;

    let id = OrderService::new(state.db()).create(order).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: id.as_i32(),
            message: "order created".to_string(),
        }),
    ))
}

/// `GET /orders/{id}`
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a malformed id, or the service error
/// (`NotFound`, `UnknownProduct`).
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GetOrderResponse>> {
    let id = OrderId::new(parse_id(&id)?);
    let order = OrderService::new(state.db()).get_by_id(id).await?;

    Ok(Json(GetOrderResponse {
        order: order.into(),
        message: "here is your order".to_string(),
    }))
}

/// `PUT /orders/{id}`
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a malformed id or body, or the
/// service error.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<OrderUpdateRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let id = OrderId::new(parse_id(&id)?);
    let Json(request) = payload.map_err(|e| invalid_body(&e))?;
    let patch = request.into_patch()?;

    OrderService::new(state.db()).update(id, patch).await?;

    Ok(Json(MessageResponse::new("order updated")))
}

/// `DELETE /orders/{id}`
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a malformed id, or the store error.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id = OrderId::new(parse_id(&id)?);
    OrderService::new(state.db()).delete(id).await?;

    Ok(Json(MessageResponse::new("order deleted")))
}
