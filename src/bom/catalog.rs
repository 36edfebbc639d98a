//! Product Catalog
//!
//! Snapshot of sellable products indexed by SKU and id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::SyncResult;

/// One catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// ERP product id.
    pub id: String,
    /// Stock keeping unit.
    pub sku: String,
    /// Raw bill-of-materials text.
    #[serde(rename = "estrutura", default)]
    pub structure: String,
}

impl Product {
    pub fn new(id: impl Into<String>, sku: impl Into<String>, structure: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sku: sku.into(),
            structure: structure.into(),
        }
    }
}

/// Catalog snapshot used for one run.
///
/// Ids and SKUs are expected to be unique; on a duplicate the first product
/// wins and the rest are logged and ignored for that lookup.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    products: Vec<Product>,
    by_sku: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
}

impl ProductCatalog {
    /// Build a catalog from products.
    pub fn new(products: Vec<Product>) -> Self {
        let mut by_sku = HashMap::with_capacity(products.len());
        let mut by_id = HashMap::with_capacity(products.len());

        for (index, product) in products.iter().enumerate() {
            if by_sku.contains_key(&product.sku) {
                tracing::warn!(sku = %product.sku, id = %product.id, "Duplicate SKU in catalog; keeping first");
            } else {
                by_sku.insert(product.sku.clone(), index);
            }

            if by_id.contains_key(&product.id) {
                tracing::warn!(sku = %product.sku, id = %product.id, "Duplicate id in catalog; keeping first");
            } else {
                by_id.insert(product.id.clone(), index);
            }
        }

        Self {
            products,
            by_sku,
            by_id,
        }
    }

    /// Product with a SKU.
    pub fn by_sku(&self, sku: &str) -> Option<&Product> {
        self.by_sku.get(sku).map(|&index| &self.products[index])
    }

    /// Product with an id.
    pub fn by_id(&self, id: &str) -> Option<&Product> {
        self.by_id.get(id).map(|&index| &self.products[index])
    }

    /// SKU of the product with an id.
    pub fn sku_for_id(&self, id: &str) -> Option<&str> {
        self.by_id(id).map(|product| product.sku.as_str())
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl FromIterator<Product> for ProductCatalog {
    fn from_iter<T: IntoIterator<Item = Product>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Source of catalog snapshots.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Load the current catalog.
    async fn load(&self) -> SyncResult<ProductCatalog>;
}

/// Fixed in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Vec<Product>,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalog {
    async fn load(&self) -> SyncResult<ProductCatalog> {
        Ok(ProductCatalog::new(self.products.clone()))
    }
}
