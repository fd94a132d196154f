//! Product Catalog
//!
//! The read side of the storefront catalog, consumed when pricing lines and
//! reconciling stored carts.

use async_trait::async_trait;
use mockall::automock;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::{ids::ProductUuid, products::Product};

/// Catalog lookup errors.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    /// The catalog could not be reached.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    /// The catalog returned data that could not be used.
    #[error("invalid catalog data for product {product}: {message}")]
    InvalidData {
        /// Product being looked up
        product: ProductUuid,

        /// What was wrong
        message: String,
    },
}

/// Source of current product data.
#[automock]
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Current data for a product, or `None` when it no longer exists.
    async fn get_product(&self, product: ProductUuid) -> Result<Option<Product>, CatalogError>;
}

/// Catalog held in memory, used by the CLI and tests.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<FxHashMap<ProductUuid, Product>>,
}

impl InMemoryCatalog {
    /// A catalog containing `products`.
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: RwLock::new(
                products
                    .into_iter()
                    .map(|product| (product.id, product))
                    .collect(),
            ),
        }
    }

    /// Insert or replace a product.
    pub async fn upsert(&self, product: Product) {
        self.products.write().await.insert(product.id, product);
    }

    /// Remove a product, returning it if it was present.
    pub async fn remove(&self, product: ProductUuid) -> Option<Product> {
        self.products.write().await.remove(&product)
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn get_product(&self, product: ProductUuid) -> Result<Option<Product>, CatalogError> {
        Ok(self.products.read().await.get(&product).cloned())
    }
}
