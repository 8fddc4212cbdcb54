//! In-memory catalog store.
//!
//! Backs the engine's tests and database-less embedding. Semantics mirror
//! the Postgres store: same scope rules, same ordering, same breadcrumb
//! behavior.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::filter::price::PriceBucket;
use crate::models::{
    Brand, BreadcrumbCache, BreadcrumbEntry, Category, CategoryTree, PriceAgg, Product,
    ProductFacetRow,
};

use super::CatalogStore;

#[derive(Default)]
struct MemoryInner {
    tree: CategoryTree,
    products: Vec<Product>,
    brands: HashMap<i64, Brand>,
}

/// Catalog held entirely in process memory.
#[derive(Default)]
pub struct MemoryCatalogStore {
    inner: RwLock<MemoryInner>,
    /// Read-operation counter, lets tests assert a cache hit did zero reads.
    reads: AtomicU64,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_category(&self, parent_id: Option<i64>, name: &str, slug: &str) -> i64 {
        self.inner.write().tree.get_or_create(parent_id, name, slug)
    }

    pub fn deactivate_category(&self, id: i64) {
        self.inner.write().tree.deactivate(id);
    }

    pub fn add_brand(&self, brand: Brand) {
        self.inner.write().brands.insert(brand.id, brand);
    }

    pub fn add_product(&self, product: Product) {
        self.inner.write().products.push(product);
    }

    /// Number of read operations served so far.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    fn track_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    fn in_scope(product: &Product, category_ids: &[i64]) -> bool {
        product.active
            && product.published
            && product
                .category_id
                .is_some_and(|id| category_ids.contains(&id))
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        self.track_read();
        Ok(self.inner.read().tree.resolve(slug).cloned())
    }

    async fn descendant_categories(&self, category: &Category) -> Result<Vec<Category>> {
        self.track_read();
        Ok(self
            .inner
            .read()
            .tree
            .descendants(category)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn count_products(&self, category_ids: &[i64]) -> Result<i64> {
        self.track_read();
        Ok(self
            .inner
            .read()
            .products
            .iter()
            .filter(|p| Self::in_scope(p, category_ids))
            .count() as i64)
    }

    async fn product_counts_by_category(&self, category_ids: &[i64]) -> Result<HashMap<i64, i64>> {
        self.track_read();
        let inner = self.inner.read();
        let mut counts = HashMap::new();
        for product in inner.products.iter().filter(|p| Self::in_scope(p, category_ids)) {
            if let Some(category_id) = product.category_id {
                *counts.entry(category_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn product_page(
        &self,
        category_ids: &[i64],
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<ProductFacetRow>> {
        self.track_read();
        let inner = self.inner.read();
        let mut rows: Vec<&Product> = inner
            .products
            .iter()
            .filter(|p| Self::in_scope(p, category_ids) && p.id > after_id)
            .collect();
        rows.sort_by_key(|p| p.id);
        rows.truncate(limit.max(0) as usize);
        Ok(rows.into_iter().map(Product::facet_row).collect())
    }

    async fn brands_for_scope(&self, category_ids: &[i64]) -> Result<HashMap<i64, Brand>> {
        self.track_read();
        let inner = self.inner.read();
        let mut brands = HashMap::new();
        for product in inner.products.iter().filter(|p| Self::in_scope(p, category_ids)) {
            if let Some(brand_id) = product.brand_id {
                if let Some(brand) = inner.brands.get(&brand_id).filter(|b| b.active) {
                    brands.entry(brand_id).or_insert_with(|| brand.clone());
                }
            }
        }
        Ok(brands)
    }

    async fn product_counts_by_brand(&self, category_ids: &[i64]) -> Result<HashMap<i64, i64>> {
        self.track_read();
        let inner = self.inner.read();
        let mut counts = HashMap::new();
        for product in inner.products.iter().filter(|p| Self::in_scope(p, category_ids)) {
            if let Some(brand_id) = product.brand_id {
                *counts.entry(brand_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn price_stats(&self, category_ids: &[i64]) -> Result<Option<PriceAgg>> {
        self.track_read();
        let inner = self.inner.read();
        let prices: Vec<f64> = inner
            .products
            .iter()
            .filter(|p| Self::in_scope(p, category_ids) && p.price_value != 0.0)
            .map(|p| p.price_value)
            .collect();
        if prices.is_empty() {
            return Ok(None);
        }
        let count = prices.len() as i64;
        let sum: f64 = prices.iter().sum();
        let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(Some(PriceAgg {
            min,
            max,
            average: sum / count as f64,
            count,
        }))
    }

    async fn price_values(&self, category_ids: &[i64]) -> Result<Vec<f64>> {
        self.track_read();
        Ok(self
            .inner
            .read()
            .products
            .iter()
            .filter(|p| Self::in_scope(p, category_ids) && p.price_value != 0.0)
            .map(|p| p.price_value)
            .collect())
    }

    async fn price_bucket_counts(
        &self,
        category_ids: &[i64],
        buckets: &[&PriceBucket],
    ) -> Result<HashMap<String, i64>> {
        self.track_read();
        let inner = self.inner.read();
        let mut counts = HashMap::new();
        for product in inner
            .products
            .iter()
            .filter(|p| Self::in_scope(p, category_ids) && p.price_value != 0.0)
        {
            if let Some(bucket) = buckets.iter().find(|b| b.contains(product.price_value)) {
                *counts.entry(bucket.id.to_string()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn get_or_create_breadcrumb(
        &self,
        trail: &[BreadcrumbEntry],
        cache: &mut BreadcrumbCache,
    ) -> Result<Option<Category>> {
        Ok(self
            .inner
            .write()
            .tree
            .get_or_create_from_breadcrumb(trail, cache))
    }
}
