//! Product catalog lookups.
//!
//! The wishlist only ever needs a thin slice of product data: existence,
//! title for notice substitution, price and stock state for row rendering.
//! The postgres implementation caches lookups with `moka` since wishlist
//! pages hit the same handful of products repeatedly.

use std::collections::HashMap;

use async_trait::async_trait;
use moka::future::Cache;
use sqlx::PgPool;
use thiserror::Error;

use wishlist_core::ProductId;

/// Cache capacity for product lookups.
const CACHE_MAX_CAPACITY: u64 = 4096;

/// Cache entry lifetime.
const CACHE_TTL: std::time::Duration = std::time::Duration::from_secs(60);

/// Errors that can occur during catalog lookups.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Cached lookup failed.
    #[error("cached lookup failed: {0}")]
    Cache(String),
}

/// The product fields the wishlist cares about.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub price_cents: i64,
    pub in_stock: bool,
    pub purchasable: bool,
}

impl Product {
    /// Display price, e.g. `$12.34`.
    #[must_use]
    pub fn display_price(&self) -> String {
        format!("${}.{:02}", self.price_cents / 100, self.price_cents % 100)
    }
}

/// Read-only product lookup.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch a product by ID. Unknown IDs are `None`, not an error.
    async fn product(&self, id: ProductId) -> Result<Option<Product>, CatalogError>;
}

/// `PostgreSQL` catalog with an in-process cache.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
    cache: Cache<ProductId, Option<Product>>,
}

impl PgCatalog {
    /// Create a new catalog over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            cache: Cache::builder()
                .max_capacity(CACHE_MAX_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    async fn fetch(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, title, slug, price_cents, in_stock, purchasable
             FROM products
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        self.cache
            .try_get_with(id, self.fetch(id))
            .await
            .map_err(|e| CatalogError::Cache(e.to_string()))
    }
}

/// Fixed in-memory catalog for local development and tests.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    products: HashMap<ProductId, Product>,
}

impl StaticCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product; replaces any existing product with the same ID.
    #[must_use]
    pub fn with_product(mut self, product: Product) -> Self {
        self.products.insert(product.id, product);
        self
    }

    /// A handful of products for the memory backend.
    #[must_use]
    pub fn demo() -> Self {
        let demo = |id: i64, title: &str, slug: &str, price_cents: i64, in_stock: bool| Product {
            id: ProductId::new(id),
            title: title.to_owned(),
            slug: slug.to_owned(),
            price_cents,
            in_stock,
            purchasable: in_stock,
        };

        Self::new()
            .with_product(demo(1, "Canvas Tote", "canvas-tote", 2400, true))
            .with_product(demo(2, "Enamel Mug", "enamel-mug", 1800, true))
            .with_product(demo(3, "Wool Blanket", "wool-blanket", 9500, true))
            .with_product(demo(4, "Field Notebook", "field-notebook", 900, false))
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(self.products.get(&id).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn display_price_pads_cents() {
        let product = Product {
            id: ProductId::new(1),
            title: "Mug".to_owned(),
            slug: "mug".to_owned(),
            price_cents: 1805,
            in_stock: true,
            purchasable: true,
        };
        assert_eq!(product.display_price(), "$18.05");
    }

    #[tokio::test]
    async fn static_catalog_returns_none_for_unknown() {
        let catalog = StaticCatalog::demo();
        assert!(catalog.product(ProductId::new(1)).await.unwrap().is_some());
        assert!(catalog.product(ProductId::new(999)).await.unwrap().is_none());
    }
}
