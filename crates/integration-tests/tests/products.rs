//! Integration tests for the product store and the book/magazine services.
//!
//! These tests require a `PostgreSQL` database reachable through
//! `TEST_DATABASE_URL`. Run with: `cargo test -- --ignored`

#![allow(clippy::unwrap_used)]

use bookstore_api::db::{BookRepository, MagazineRepository, OrderRepository, RepositoryError};
use bookstore_api::models::{
    BookPatch, BookUpdate, MagazinePatch, MagazineUpdate, NewOrder, OrderItem,
};
use bookstore_api::services::{BookService, MagazineService, ServiceError};
use bookstore_core::{Isbn, OrderStatus, Price, PriceError, ProductId, ProductKind};
use bookstore_integration_tests::{TestDb, new_book, new_magazine, price};
use rust_decimal::Decimal;

async fn count(ctx: &TestDb, sql: &str, id: ProductId) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .bind(id.as_i32())
        .fetch_one(ctx.pool())
        .await
        .unwrap()
}

// ============================================================================
// Product Store
// ============================================================================

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn test_book_create_then_get_returns_input() {
    let ctx = TestDb::new().await;
    let books = BookRepository::new(&ctx.db);
    let input = new_book("Dune", 999, "978-0441172719");

    let id = books.create(&input).await.unwrap();
    let stored = books.get_by_id(id).await.unwrap();

    assert_eq!(stored.id, id);
    assert_eq!(stored.name, input.name);
    assert_eq!(stored.price, input.price);
    assert_eq!(stored.stock, input.stock);
    assert_eq!(stored.details, input.details);

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn test_magazine_create_then_get_returns_input() {
    let ctx = TestDb::new().await;
    let magazines = MagazineRepository::new(&ctx.db);
    let input = new_magazine("Wired", 550, 301);

    let id = magazines.create(&input).await.unwrap();
    let stored = magazines.get_by_id(id).await.unwrap();

    assert_eq!(stored.name, input.name);
    assert_eq!(stored.price, input.price);
    assert_eq!(stored.details, input.details);

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn test_price_round_trips_exactly() {
    let ctx = TestDb::new().await;
    let books = BookRepository::new(&ctx.db);

    for amount in [
        Decimal::new(9990, 3),
        Decimal::new(1, 2),
        Decimal::new(999_999_999_999, 2),
    ] {
        let mut input = new_book("Dune", 0, "978-0441172719");
        input.price = Price::new(amount).unwrap();

        let id = books.create(&input).await.unwrap();
        let stored = books.get_by_id(id).await.unwrap();
        assert_eq!(stored.price, input.price, "{amount}");

        books.delete(id).await.unwrap();
    }

    // Amounts the column would round or overflow never become a Price.
    assert!(matches!(
        Price::new(Decimal::new(9999, 3)),
        Err(PriceError::TooPrecise(_))
    ));
    assert!(matches!(
        Price::new(Decimal::new(100_000_000_000, 0)),
        Err(PriceError::TooLarge(_))
    ));

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn test_get_missing_product_is_not_found() {
    let ctx = TestDb::new().await;

    let err = BookRepository::new(&ctx.db)
        .get_by_id(ProductId::new(424_242))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn test_get_as_other_kind_is_wrong_type_not_not_found() {
    let ctx = TestDb::new().await;
    let id = MagazineRepository::new(&ctx.db)
        .create(&new_magazine("Wired", 550, 302))
        .await
        .unwrap();

    let err = BookRepository::new(&ctx.db).get_by_id(id).await.unwrap_err();
    match err {
        RepositoryError::WrongProductType {
            operation,
            expected,
            actual,
            ..
        } => {
            assert_eq!(operation, "get_by_id_product");
            assert_eq!(expected, ProductKind::Book);
            assert_eq!(actual, ProductKind::Magazine);
        }
        other => panic!("expected WrongProductType, got {other:?}"),
    }

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn test_missing_specialization_row_is_corruption() {
    let ctx = TestDb::new().await;
    let books = BookRepository::new(&ctx.db);
    let id = books.create(&new_book("Dune", 999, "978-0441172719")).await.unwrap();

    sqlx::query("DELETE FROM books WHERE product_id = $1")
        .bind(id.as_i32())
        .execute(ctx.pool())
        .await
        .unwrap();

    let err = books.get_by_id(id).await.unwrap_err();
    assert!(matches!(err, RepositoryError::DataCorruption(_)));

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn test_unknown_kind_tag_is_corruption() {
    let ctx = TestDb::new().await;
    let books = BookRepository::new(&ctx.db);
    let id = books.create(&new_book("Dune", 999, "978-0441172719")).await.unwrap();

    sqlx::raw_sql("ALTER TABLE products DROP CONSTRAINT products_type_check")
        .execute(ctx.pool())
        .await
        .unwrap();
    sqlx::query("UPDATE products SET type = 'pamphlet' WHERE id = $1")
        .bind(id.as_i32())
        .execute(ctx.pool())
        .await
        .unwrap();

    let err = books.get_by_id(id).await.unwrap_err();
    assert!(matches!(err, RepositoryError::DataCorruption(_)), "{err:?}");

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn test_failed_specialization_insert_rolls_back_base_row() {
    let ctx = TestDb::new().await;
    let books = BookRepository::new(&ctx.db);
    books.create(&new_book("Dune", 999, "978-0441172719")).await.unwrap();

    // Same ISBN: the base insert succeeds, the books insert violates UNIQUE.
    let err = books
        .create(&new_book("Dune (copy)", 999, "978-0441172719"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    let products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(ctx.pool())
        .await
        .unwrap();
    assert_eq!(products, 1);

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn test_delete_removes_both_rows() {
    let ctx = TestDb::new().await;
    let books = BookRepository::new(&ctx.db);
    let id = books.create(&new_book("Dune", 999, "978-0441172719")).await.unwrap();

    books.delete(id).await.unwrap();

    let err = books.get_by_id(id).await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
    let products_left = count(&ctx, "SELECT COUNT(*) FROM products WHERE id = $1", id).await;
    let books_left = count(&ctx, "SELECT COUNT(*) FROM books WHERE product_id = $1", id).await;
    assert_eq!(products_left, 0);
    assert_eq!(books_left, 0);

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn test_delete_of_ordered_product_is_integrity_error() {
    let ctx = TestDb::new().await;
    let books = BookRepository::new(&ctx.db);
    let id = books.create(&new_book("Dune", 999, "978-0441172719")).await.unwrap();
    OrderRepository::new(&ctx.db)
        .create(&NewOrder {
            status: OrderStatus::Created,
            items: vec![OrderItem {
                product_id: id,
                quantity: 1,
                price: price(999),
            }],
        })
        .await
        .unwrap();

    let err = books.delete(id).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Integrity(_)), "{err:?}");

    // Rolled back: the book is intact.
    assert_eq!(books.get_by_id(id).await.unwrap().name, "Dune");

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn test_delete_under_other_kind_is_integrity_error() {
    let ctx = TestDb::new().await;
    let magazines = MagazineRepository::new(&ctx.db);
    let id = magazines.create(&new_magazine("Wired", 550, 310)).await.unwrap();

    let err = BookRepository::new(&ctx.db).delete(id).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Integrity(_)), "{err:?}");
    assert_eq!(magazines.get_by_id(id).await.unwrap().details.issue_number, 310);

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn test_update_and_delete_of_missing_product_are_not_errors() {
    let ctx = TestDb::new().await;
    let books = BookRepository::new(&ctx.db);
    let ghost = new_book("Ghost", 100, "000-0000000000")
        .into_product(ProductId::new(777), chrono::Utc::now());

    books.update(&ghost).await.unwrap();
    books.delete(ghost.id).await.unwrap();

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn test_existence_checks() {
    let ctx = TestDb::new().await;
    let books = BookRepository::new(&ctx.db);
    let magazines = MagazineRepository::new(&ctx.db);
    books.create(&new_book("Dune", 999, "978-0441172719")).await.unwrap();
    magazines.create(&new_magazine("Wired", 550, 303)).await.unwrap();

    let taken = Isbn::parse("978-0441172719").unwrap();
    let free = Isbn::parse("978-0000000000").unwrap();
    assert!(books.isbn_exists(&taken).await.unwrap());
    assert!(!books.isbn_exists(&free).await.unwrap());
    assert!(magazines.issue_number_exists(303).await.unwrap());
    assert!(!magazines.issue_number_exists(304).await.unwrap());

    ctx.cleanup().await;
}

// ============================================================================
// Services
// ============================================================================

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn test_service_rejects_duplicate_isbn() {
    let ctx = TestDb::new().await;
    let service = BookService::new(&ctx.db);
    service.create(new_book("Dune", 999, "978-0441172719")).await.unwrap();

    let err = service
        .create(new_book("Dune Messiah", 899, "978-0441172719"))
        .await
        .unwrap_err();
    match err {
        ServiceError::UniquenessConflict { kind, field, value } => {
            assert_eq!(kind, ProductKind::Book);
            assert_eq!(field, "isbn");
            assert_eq!(value, "978-0441172719");
        }
        other => panic!("expected UniquenessConflict, got {other:?}"),
    }

    let products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(ctx.pool())
        .await
        .unwrap();
    assert_eq!(products, 1);

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn test_service_rejects_duplicate_issue_number() {
    let ctx = TestDb::new().await;
    let service = MagazineService::new(&ctx.db);
    service.create(new_magazine("Wired", 550, 305)).await.unwrap();

    let err = service
        .create(new_magazine("Wired (reprint)", 550, 305))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::UniquenessConflict {
            field: "issue_number",
            ..
        }
    ));

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn test_partial_update_keeps_other_fields() {
    let ctx = TestDb::new().await;
    let service = BookService::new(&ctx.db);
    let input = new_book("Dune", 999, "978-0441172719");
    let id = service.create(input.clone()).await.unwrap();

    // Keeping the same ISBN must not collide with the book itself.
    let patch = BookUpdate {
        price: Some(price(1299)),
        details: BookPatch {
            isbn: Some(input.details.isbn.clone()),
            ..Default::default()
        },
        ..Default::default()
    };
    service.update(id, patch).await.unwrap();

    let stored = service.get_by_id(id).await.unwrap();
    assert_eq!(stored.price, price(1299));
    assert_eq!(stored.name, input.name);
    assert_eq!(stored.stock, input.stock);
    assert_eq!(stored.details, input.details);

    ctx.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn test_update_to_taken_issue_number_conflicts() {
    let ctx = TestDb::new().await;
    let service = MagazineService::new(&ctx.db);
    service.create(new_magazine("Wired", 550, 306)).await.unwrap();
    let id = service.create(new_magazine("Wired", 550, 307)).await.unwrap();

    let patch = MagazineUpdate {
        details: MagazinePatch {
            issue_number: Some(306),
            ..Default::default()
        },
        ..Default::default()
    };
    let err = service.update(id, patch).await.unwrap_err();
    assert!(matches!(err, ServiceError::UniquenessConflict { .. }));

    let stored = service.get_by_id(id).await.unwrap();
    assert_eq!(stored.details.issue_number, 307);

    ctx.cleanup().await;
}

/// Two concurrent creates with one ISBN can both pass the advisory check;
/// the UNIQUE constraint lets exactly one of them commit.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires a PostgreSQL database (TEST_DATABASE_URL)"]
async fn test_concurrent_duplicate_isbn_creates_one_book() {
    let ctx = TestDb::new().await;
    let service = BookService::new(&ctx.db);

    let (first, second) = tokio::join!(
        service.create(new_book("Race A", 100, "978-1111111111")),
        service.create(new_book("Race B", 100, "978-1111111111")),
    );

    let outcomes = [first, second];
    let created = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(created, 1, "exactly one create must win: {outcomes:?}");
    for outcome in &outcomes {
        if let Err(err) = outcome {
            assert!(
                matches!(
                    err,
                    ServiceError::UniquenessConflict { .. }
                        | ServiceError::Repository(RepositoryError::Conflict(_))
                ),
                "unexpected error: {err:?}"
            );
        }
    }

    let books: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
        .fetch_one(ctx.pool())
        .await
        .unwrap();
    assert_eq!(books, 1);

    ctx.cleanup().await;
}
