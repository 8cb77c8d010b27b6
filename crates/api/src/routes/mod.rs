//! HTTP route handlers for the catalog and order API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /ping                 - Liveness check ("pong")
//!
//! # Books
//! POST   /books                - Create book
//! GET    /books/{id}           - Get book
//! PUT    /books/{id}           - Partial update
//! DELETE /books/{id}           - Delete book
//!
//! # Magazines
//! POST   /magazines            - Create magazine
//! GET    /magazines/{id}       - Get magazine
//! PUT    /magazines/{id}       - Partial update
//! DELETE /magazines/{id}       - Delete magazine
//!
//! # Orders
//! POST   /orders               - Place order (prices from catalog)
//! GET    /orders/{id}          - Get order with current catalog prices
//! PUT    /orders/{id}          - Change status and/or replace items
//! DELETE /orders/{id}          - Delete order
//! ```
//!
//! Bodies are camelCase JSON. Errors are `{"message": "..."}`.

pub mod books;
pub mod magazines;
pub mod orders;

use axum::{
    Router,
    extract::rejection::JsonRejection,
    routing::{get, post},
};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// Body returned by create handlers.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i32,
    pub message: String,
}

/// Body returned by update and delete handlers.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Parse an `{id}` path segment.
fn parse_id(raw: &str) -> Result<i32, AppError> {
    raw.parse::<i32>()
        .map_err(|_| AppError::BadRequest("invalid id format".to_string()))
}

/// Map a body that failed to parse to a 400.
fn invalid_body(rejection: &JsonRejection) -> AppError {
    tracing::debug!(error = %rejection, "failed to bind request");
    AppError::BadRequest("invalid request body".to_string())
}

/// Reject empty or whitespace-only text fields.
fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

/// Reject negative stock counts.
fn require_stock(stock: i32) -> Result<(), AppError> {
    if stock < 0 {
        return Err(AppError::BadRequest("stock cannot be negative".to_string()));
    }
    Ok(())
}

/// Convert a requested price, rejecting amounts a `Price` cannot hold.
fn require_price(amount: rust_decimal::Decimal) -> Result<bookstore_core::Price, AppError> {
    bookstore_core::Price::new(amount).map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Liveness check; answers `pong`.
async fn ping() -> &'static str {
    "pong"
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        // Books
        .route("/books", post(books::create))
        .route(
            "/books/{id}",
            get(books::show).put(books::update).delete(books::delete),
        )
        // Magazines
        .route("/magazines", post(magazines::create))
        .route(
            "/magazines/{id}",
            get(magazines::show)
                .put(magazines::update)
                .delete(magazines::delete),
        )
        // Orders
        .route("/orders", post(orders::create))
        .route(
            "/orders/{id}",
            get(orders::show).put(orders::update).delete(orders::delete),
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{ApiConfig, DatabaseConfig, LogFormat};

    /// A router whose pool never connects; only requests rejected before
    /// touching the database may be sent through it.
    fn offline_app() -> Router {
        let config = ApiConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 8080,
            database: DatabaseConfig {
                url: SecretString::from("postgres://localhost/unused"),
                max_connections: 1,
                max_lifetime: Duration::from_secs(60),
                acquire_timeout: Duration::from_secs(1),
            },
            operation_timeout: Duration::from_secs(1),
            log_format: LogFormat::Pretty,
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        routes().with_state(AppState::new(&config, pool))
    }

    async fn send(request: Request<Body>) -> (StatusCode, String) {
        let response = offline_app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let (status, body) = send(get_request("/ping")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "pong");
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_400() {
        for uri in ["/books/abc", "/magazines/1.5", "/orders/x"] {
            let (status, body) = send(get_request(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body, r#"{"message":"invalid id format"}"#);
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let (status, body) = send(post_json("/books", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, r#"{"message":"invalid request body"}"#);
    }

    #[tokio::test]
    async fn test_invalid_isbn_rejected_before_store() {
        let body = r#"{"name":"Dune","price":"9.99","stock":1,"author":"Herbert","isbn":"123"}"#;
        let (status, _) = send(post_json("/books", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_order_status_rejected_before_store() {
        let body = r#"{"status":"lost","items":[{"productId":1,"quantity":1}]}"#;
        let (status, body) = send(post_json("/orders", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, r#"{"message":"invalid order status: lost"}"#);
    }

    #[test]
    fn test_require_text_rejects_blank() {
        assert!(require_text("name", "  ").is_err());
        assert!(require_text("name", "Dune").is_ok());
    }
}
