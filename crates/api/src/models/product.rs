//! Catalog domain types.
//!
//! A product is a shared base (name, price, stock, creation time) plus the
//! attributes of its kind. [`Product`] is generic over those attributes so
//! that books and magazines share one representation and one store.

use chrono::{DateTime, NaiveDate, Utc};

use bookstore_core::{Isbn, Price, ProductId};

/// The base attributes shared by every catalog item.
///
/// This is what the catalog resolver returns; the kind tag is not part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
}

/// A stored product of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product<D> {
    /// Server-assigned identity.
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub stock: i32,
    /// Set once when the product is created.
    pub created_at: DateTime<Utc>,
    /// Kind-specific attributes.
    pub details: D,
}

/// Input for creating a product; id and creation time are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct<D> {
    pub name: String,
    pub price: Price,
    pub stock: i32,
    pub details: D,
}

impl<D> NewProduct<D> {
    /// The product this input describes once the store has assigned an id
    /// and creation time.
    #[must_use]
    pub fn into_product(self, id: ProductId, created_at: DateTime<Utc>) -> Product<D> {
        Product {
            id,
            name: self.name,
            price: self.price,
            stock: self.stock,
            created_at,
            details: self.details,
        }
    }
}

/// Book attributes, stored in `books`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BookDetails {
    pub author: String,
    pub isbn: Isbn,
}

/// Magazine attributes, stored in `magazines`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MagazineDetails {
    pub issue_number: i32,
    pub publication_date: NaiveDate,
}

pub type Book = Product<BookDetails>;
pub type Magazine = Product<MagazineDetails>;
pub type NewBook = NewProduct<BookDetails>;
pub type NewMagazine = NewProduct<MagazineDetails>;

/// A partial update: `None` fields keep their stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPatch<P> {
    pub name: Option<String>,
    pub price: Option<Price>,
    pub stock: Option<i32>,
    pub details: P,
}

/// Partial update of a kind's attributes.
pub trait DetailsPatch {
    /// Attributes this patch applies to.
    type Target;

    /// Overwrite the fields present in the patch.
    fn apply_to(self, target: &mut Self::Target);
}

impl<P: DetailsPatch> ProductPatch<P> {
    /// Overwrite the fields present in the patch, leaving id and creation
    /// time untouched.
    pub fn apply_to(self, product: &mut Product<P::Target>) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        self.details.apply_to(&mut product.details);
    }
}

/// Partial update of [`BookDetails`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub author: Option<String>,
    pub isbn: Option<Isbn>,
}

impl DetailsPatch for BookPatch {
    type Target = BookDetails;

    fn apply_to(self, target: &mut BookDetails) {
        if let Some(author) = self.author {
            target.author = author;
        }
        if let Some(isbn) = self.isbn {
            target.isbn = isbn;
        }
    }
}

/// Partial update of [`MagazineDetails`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MagazinePatch {
    pub issue_number: Option<i32>,
    pub publication_date: Option<NaiveDate>,
}

impl DetailsPatch for MagazinePatch {
    type Target = MagazineDetails;

    fn apply_to(self, target: &mut MagazineDetails) {
        if let Some(issue_number) = self.issue_number {
            target.issue_number = issue_number;
        }
        if let Some(publication_date) = self.publication_date {
            target.publication_date = publication_date;
        }
    }
}

pub type BookUpdate = ProductPatch<BookPatch>;
pub type MagazineUpdate = ProductPatch<MagazinePatch>;
