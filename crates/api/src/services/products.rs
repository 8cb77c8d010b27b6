//! Book and magazine services.

use tracing::{instrument, warn};

use bookstore_core::ProductId;

use super::ServiceError;
use crate::db::kinds::{Books, Magazines};
use crate::db::{Database, ProductRepository, ProductSchema};
use crate::models::{DetailsPatch, NewProduct, Product, ProductPatch};

/// Catalog service for products of kind `K`.
///
/// Guards writes with the kind's uniqueness check before handing them to the
/// product store. The check is advisory; the schema's unique constraint
/// catches writes that race past it.
pub struct ProductService<'a, K> {
    products: ProductRepository<'a, K>,
}

/// Service for books (unique ISBN).
pub type BookService<'a> = ProductService<'a, Books>;

/// Service for magazines (unique issue number).
pub type MagazineService<'a> = ProductService<'a, Magazines>;

impl<'a, K: ProductSchema> ProductService<'a, K> {
    /// Create a new product service.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self {
            products: ProductRepository::new(db),
        }
    }

    /// Add a product to the catalog.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::UniquenessConflict` if another product of this
    /// kind already uses the unique key, or `ServiceError::Repository` if the
    /// store fails.
    #[instrument(skip(self, product), fields(kind = K::KIND.as_str()))]
    pub async fn create(&self, product: NewProduct<K::Details>) -> Result<ProductId, ServiceError> {
        self.ensure_unique(K::key(&product.details)).await?;
        Ok(self.products.create(&product).await?)
    }

    /// Fetch a product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` with `NotFound` or
    /// `WrongProductType` when the id does not name a product of this kind.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Product<K::Details>, ServiceError> {
        Ok(self.products.get_by_id(id).await?)
    }

    /// Apply a partial update and return the stored result.
    ///
    /// The uniqueness check only runs when the patch changes the unique key,
    /// so a product never collides with itself.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the product cannot be read or
    /// written, or `ServiceError::UniquenessConflict`.
    #[instrument(skip(self, patch), fields(kind = K::KIND.as_str(), product_id = %id))]
    pub async fn update<P>(
        &self,
        id: ProductId,
        patch: ProductPatch<P>,
    ) -> Result<Product<K::Details>, ServiceError>
    where
        P: DetailsPatch<Target = K::Details> + Send,
    {
        let mut product = self.products.get_by_id(id).await?;
        let previous_key = K::key(&product.details).clone();

        patch.apply_to(&mut product);

        if K::key(&product.details) != &previous_key {
            self.ensure_unique(K::key(&product.details)).await?;
        }

        self.products.update(&product).await?;
        Ok(product)
    }

    /// Remove a product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn delete(&self, id: ProductId) -> Result<(), ServiceError> {
        Ok(self.products.delete(id).await?)
    }

    async fn ensure_unique(&self, key: &K::Key) -> Result<(), ServiceError> {
        if self.products.key_exists(key).await? {
            warn!(
                kind = K::KIND.as_str(),
                field = K::TABLE.unique_column,
                value = %key,
                "uniqueness check failed"
            );
            return Err(ServiceError::UniquenessConflict {
                kind: K::KIND,
                field: K::TABLE.unique_column,
                value: key.to_string(),
            });
        }
        Ok(())
    }
}
