//! Magazine route handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bookstore_core::{Price, ProductId};

use super::{
    CreatedResponse, MessageResponse, invalid_body, parse_id, require_price, require_stock,
    require_text,
};
use crate::error::Result;
use crate::models::{Magazine, MagazineDetails, MagazinePatch, MagazineUpdate, NewMagazine};
use crate::services::MagazineService;
use crate::state::AppState;

/// Body of `POST /magazines`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagazineCreateRequest {
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub issue_number: i32,
    pub publication_date: NaiveDate,
}

impl MagazineCreateRequest {
    /// Validate and convert into a store input.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the first invalid field.
    pub fn into_new_magazine(self) -> Result<NewMagazine> {
        require_text("name", &self.name)?;
        require_stock(self.stock)?;
        let price = require_price(self.price)?;

        Ok(NewMagazine {
            name: self.name,
            price,
            stock: self.stock,
            details: MagazineDetails {
                issue_number: self.issue_number,
                publication_date: self.publication_date,
            },
        })
    }
}

/// Body of `PUT /magazines/{id}`; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagazineUpdateRequest {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub issue_number: Option<i32>,
    pub publication_date: Option<NaiveDate>,
}

impl MagazineUpdateRequest {
    /// Validate the present fields and convert into a patch.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the first invalid field.
    pub fn into_patch(self) -> Result<MagazineUpdate> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        if let Some(stock) = self.stock {
            require_stock(stock)?;
        }

        Ok(MagazineUpdate {
            name: self.name,
            price: self.price.map(require_price).transpose()?,
            stock: self.stock,
            details: MagazinePatch {
                issue_number: self.issue_number,
                publication_date: self.publication_date,
            },
        })
    }
}

/// A magazine as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MagazineResponse {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub stock: i32,
    pub issue_number: i32,
    pub publication_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<Magazine> for MagazineResponse {
    fn from(magazine: Magazine) -> Self {
        Self {
            id: magazine.id,
            name: magazine.name,
            price: magazine.price,
            stock: magazine.stock,
            issue_number: magazine.details.issue_number,
            publication_date: magazine.details.publication_date,
            created_at: magazine.created_at,
        }
    }
}

/// Body of `GET /magazines/{id}`.
#[derive(Debug, Serialize)]
pub struct GetMagazineResponse {
    pub magazine: MagazineResponse,
    pub message: String,
}

/// `POST /magazines`
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an invalid body, or the service error
/// (e.g. a uniqueness conflict).
pub async fn create(
    State(state): State<AppState>,
    payload: std::result::Result<Json<MagazineCreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let Json(request) = payload.map_err(|e| invalid_body(&e))?;
    let magazine = request.into_new_magazine()?;

    let id = MagazineService::new(state.db()).create(magazine).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: id.as_i32(),
            message: "magazine created".to_string(),
        }),
    ))
}

/// `GET /magazines/{id}`
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a malformed id, or the store error
/// (`NotFound`, `WrongProductType`).
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GetMagazineResponse>> {
    let id = ProductId::new(parse_id(&id)?);
    let magazine = MagazineService::new(state.db()).get_by_id(id).await?;

    Ok(Json(GetMagazineResponse {
        magazine: magazine.into(),
        message: "here is your magazine".to_string(),
    }))
}

/// `PUT /magazines/{id}`
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a malformed id or body, or the
/// service error.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<MagazineUpdateRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let id = ProductId::new(parse_id(&id)?);
    let Json(request) = payload.map_err(|e| invalid_body(&e))?;
    let patch = request.into_patch()?;

    MagazineService::new(state.db()).update(id, patch).await?;

    Ok(Json(MessageResponse::new("magazine updated")))
}

/// `DELETE /magazines/{id}`
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a malformed id, or the store error.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id = ProductId::new(parse_id(&id)?);
    MagazineService::new(state.db()).delete(id).await?;

    Ok(Json(MessageResponse::new("magazine deleted")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_reads_camel_case_date() {
        let request: MagazineCreateRequest = serde_json::from_str(
            r#"{"name":"Wired","price":5.5,"stock":20,"issueNumber":42,"publicationDate":"2024-03-01"}"#,
        )
        .unwrap();
        let magazine = request.into_new_magazine().unwrap();

        assert_eq!(magazine.details.issue_number, 42);
        assert_eq!(
            magazine.details.publication_date,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert_eq!(magazine.price.amount(), Decimal::new(55, 1));
    }

    #[test]
    fn test_create_request_rejects_blank_name() {
        let request: MagazineCreateRequest = serde_json::from_str(
            r#"{"name":"","price":"1","stock":0,"issueNumber":1,"publicationDate":"2024-03-01"}"#,
        )
        .unwrap();
        assert!(request.into_new_magazine().is_err());
    }

    #[test]
    fn test_update_request_partial() {
        let request: MagazineUpdateRequest = serde_json::from_str(r#"{"issueNumber":43}"#).unwrap();
        let patch = request.into_patch().unwrap();

        assert_eq!(patch.details.issue_number, Some(43));
        assert!(patch.details.publication_date.is_none());
        assert!(patch.name.is_none());
    }
}
