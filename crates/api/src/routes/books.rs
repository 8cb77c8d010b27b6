//! Book route handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bookstore_core::{Isbn, Price, ProductId};

use super::{
    CreatedResponse, MessageResponse, invalid_body, parse_id, require_price, require_stock,
    require_text,
};
use crate::error::{AppError, Result};
use crate::models::{Book, BookDetails, BookPatch, BookUpdate, NewBook};
use crate::services::BookService;
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Body of `POST /books`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookCreateRequest {
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub author: String,
    pub isbn: String,
}

impl BookCreateRequest {
    /// Validate and convert into a store input.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the first invalid field.
    pub fn into_new_book(self) -> Result<NewBook> {
        require_text("name", &self.name)?;
        require_text("author", &self.author)?;
        require_stock(self.stock)?;
        let price = require_price(self.price)?;
        let isbn = parse_isbn(&self.isbn)?;

        Ok(NewBook {
            name: self.name,
            price,
            stock: self.stock,
            details: BookDetails {
                author: self.author,
                isbn,
            },
        })
    }
}

/// Body of `PUT /books/{id}`; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookUpdateRequest {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub author: Option<String>,
    pub isbn: Option<String>,
}

impl BookUpdateRequest {
    /// Validate the present fields and convert into a patch.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the first invalid field.
    pub fn into_patch(self) -> Result<BookUpdate> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        if let Some(author) = &self.author {
            require_text("author", author)?;
        }
        if let Some(stock) = self.stock {
            require_stock(stock)?;
        }

        Ok(BookUpdate {
            name: self.name,
            price: self.price.map(require_price).transpose()?,
            stock: self.stock,
            details: BookPatch {
                author: self.author,
                isbn: self.isbn.as_deref().map(parse_isbn).transpose()?,
            },
        })
    }
}

/// A book as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub stock: i32,
    pub author: String,
    pub isbn: Isbn,
    pub created_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            name: book.name,
            price: book.price,
            stock: book.stock,
            author: book.details.author,
            isbn: book.details.isbn,
            created_at: book.created_at,
        }
    }
}

/// Body of `GET /books/{id}`.
#[derive(Debug, Serialize)]
pub struct GetBookResponse {
    pub book: BookResponse,
    pub message: String,
}

fn parse_isbn(raw: &str) -> Result<Isbn> {
    Isbn::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /books`
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an invalid body, or the service error
/// (e.g. a uniqueness conflict).
pub async fn create(
    State(state): State<AppState>,
    payload: std::result::Result<Json<BookCreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let Json(request) = payload.map_err(|e| invalid_body(&e))?;
    let book = request.into_new_book()?;

    let id = BookService::new(state.db()).create(book).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: id.as_i32(),
            message: "book created".to_string(),
        }),
    ))
}

/// `GET /books/{id}`
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a malformed id, or the store error
/// (`NotFound`, `WrongProductType`).
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GetBookResponse>> {
    let id = ProductId::new(parse_id(&id)?);
    let book = BookService::new(state.db()).get_by_id(id).await?;

    Ok(Json(GetBookResponse {
        book: book.into(),
        message: "here is your book".to_string(),
    }))
}

/// `PUT /books/{id}`
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a malformed id or body, or the
/// service error.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<BookUpdateRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let id = ProductId::new(parse_id(&id)?);
    let Json(request) = payload.map_err(|e| invalid_body(&e))?;
    let patch = request.into_patch()?;

    BookService::new(state.db()).update(id, patch).await?;

    Ok(Json(MessageResponse::new("book updated")))
}

/// `DELETE /books/{id}`
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a malformed id, or the store error.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id = ProductId::new(parse_id(&id)?);
    BookService::new(state.db()).delete(id).await?;

    Ok(Json(MessageResponse::new("book deleted")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn valid_request() -> BookCreateRequest {
        serde_json::from_str(
            r#"{"name":"Dune","price":"9.99","stock":4,"author":"Frank Herbert","isbn":"978-0441172719"}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_create_request_converts() {
        let book = valid_request().into_new_book().unwrap();
        assert_eq!(book.name, "Dune");
        assert_eq!(book.price.amount(), Decimal::new(999, 2));
        assert_eq!(book.details.isbn.as_str(), "978-0441172719");
    }

    #[test]
    fn test_create_request_rejects_missing_author() {
        let request = BookCreateRequest {
            author: String::new(),
            ..valid_request()
        };
        let err = request.into_new_book().unwrap_err();
        assert_eq!(err.public_message(), "author is required");
    }

    #[test]
    fn test_create_request_rejects_negative_values() {
        let request = BookCreateRequest {
            stock: -1,
            ..valid_request()
        };
        assert!(request.into_new_book().is_err());

        let request = BookCreateRequest {
            price: Decimal::new(-1, 0),
            ..valid_request()
        };
        assert!(request.into_new_book().is_err());
    }

    #[test]
    fn test_create_request_rejects_unstorable_price() {
        let request = BookCreateRequest {
            price: Decimal::new(9999, 3),
            ..valid_request()
        };
        let err = request.into_new_book().unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.public_message(),
            "price cannot have more than 2 decimal places: 9.999"
        );
    }

    #[test]
    fn test_update_request_keeps_absent_fields_absent() {
        let request: BookUpdateRequest = serde_json::from_str(r#"{"stock":7}"#).unwrap();
        let patch = request.into_patch().unwrap();

        assert_eq!(patch.stock, Some(7));
        assert!(patch.name.is_none());
        assert!(patch.price.is_none());
        assert!(patch.details.author.is_none());
        assert!(patch.details.isbn.is_none());
    }

    #[test]
    fn test_update_request_validates_isbn() {
        let request = BookUpdateRequest {
            isbn: Some("short".to_string()),
            ..Default::default()
        };
        assert!(request.into_patch().is_err());
    }

    #[test]
    fn test_response_uses_camel_case() {
        let book = valid_request()
            .into_new_book()
            .unwrap()
            .into_product(ProductId::new(3), Utc::now());
        let json = serde_json::to_value(BookResponse::from(book)).unwrap();

        assert_eq!(json["id"], 3);
        assert_eq!(json["price"], "9.99");
        assert!(json.get("createdAt").is_some());
    }
}
