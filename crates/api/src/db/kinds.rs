//! Book and magazine descriptors for the product store, and their
//! uniqueness checks.

use sqlx::Postgres;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;

use bookstore_core::{Isbn, ProductKind};

use super::RepositoryError;
use super::products::{BookRepository, MagazineRepository, ProductSchema, SpecializationTable};
use crate::models::{BookDetails, MagazineDetails};

/// Books: `books(product_id, author, isbn)`, ISBN unique.
#[derive(Debug, Clone, Copy)]
pub struct Books;

impl ProductSchema for Books {
    const KIND: ProductKind = ProductKind::Book;

    const TABLE: SpecializationTable = SpecializationTable {
        name: "books",
        columns: &["author", "isbn"],
        unique_column: "isbn",
        insert_step: "insert_book",
        select_step: "get_by_id_book",
        update_step: "update_book",
        delete_step: "delete_book",
        exists_step: "isbn_exists",
    };

    type Details = BookDetails;
    type Key = Isbn;

    fn key(details: &BookDetails) -> &Isbn {
        &details.isbn
    }

    fn bind_details<'q>(
        query: Query<'q, Postgres, PgArguments>,
        details: &'q BookDetails,
    ) -> Query<'q, Postgres, PgArguments> {
        query.bind(&details.author).bind(&details.isbn)
    }
}

/// Magazines: `magazines(product_id, issue_number, publication_date)`,
/// issue number unique.
#[derive(Debug, Clone, Copy)]
pub struct Magazines;

impl ProductSchema for Magazines {
    const KIND: ProductKind = ProductKind::Magazine;

    const TABLE: SpecializationTable = SpecializationTable {
        name: "magazines",
        columns: &["issue_number", "publication_date"],
        unique_column: "issue_number",
        insert_step: "insert_magazine",
        select_step: "get_by_id_magazine",
        update_step: "update_magazine",
        delete_step: "delete_magazine",
        exists_step: "issue_number_exists",
    };

    type Details = MagazineDetails;
    type Key = i32;

    fn key(details: &MagazineDetails) -> &i32 {
        &details.issue_number
    }

    fn bind_details<'q>(
        query: Query<'q, Postgres, PgArguments>,
        details: &'q MagazineDetails,
    ) -> Query<'q, Postgres, PgArguments> {
        query
            .bind(details.issue_number)
            .bind(details.publication_date)
    }
}

impl BookRepository<'_> {
    /// Whether any book already has this ISBN.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` or `Timeout`.
    pub async fn isbn_exists(&self, isbn: &Isbn) -> Result<bool, RepositoryError> {
        self.key_exists(isbn).await
    }
}

impl MagazineRepository<'_> {
    /// Whether any magazine already has this issue number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` or `Timeout`.
    pub async fn issue_number_exists(&self, issue_number: i32) -> Result<bool, RepositoryError> {
        self.key_exists(&issue_number).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_statements() {
        assert_eq!(
            Books::TABLE.insert_sql(),
            "INSERT INTO books (product_id, author, isbn) VALUES ($1, $2, $3)"
        );
        assert_eq!(
            Books::TABLE.select_sql(),
            "SELECT author, isbn FROM books WHERE product_id = $1"
        );
        assert_eq!(
            Books::TABLE.exists_sql(),
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)"
        );
    }

    #[test]
    fn test_magazine_statements() {
        assert_eq!(
            Magazines::TABLE.update_sql(),
            "UPDATE magazines SET issue_number = $2, publication_date = $3 WHERE product_id = $1"
        );
        assert_eq!(
            Magazines::TABLE.exists_sql(),
            "SELECT EXISTS(SELECT 1 FROM magazines WHERE issue_number = $1)"
        );
    }

    #[test]
    fn test_kind_tags_differ() {
        assert_ne!(Books::KIND, Magazines::KIND);
        assert_eq!(Books::KIND.as_str(), "book");
        assert_eq!(Magazines::KIND.as_str(), "magazine");
    }
}
