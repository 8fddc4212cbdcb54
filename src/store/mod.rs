//! Catalog storage abstraction.
//!
//! The filter engine reads the catalog through [`CatalogStore`]; the Postgres
//! implementation backs production and the in-memory one backs tests and
//! embedding without a database.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::filter::price::PriceBucket;
use crate::models::{Brand, BreadcrumbCache, BreadcrumbEntry, Category, PriceAgg, ProductFacetRow};

pub mod memory;
pub mod postgres;

pub use memory::MemoryCatalogStore;
pub use postgres::PgCatalogStore;

/// Read/write access to the catalog, scoped to what the filter engine needs.
///
/// "In scope" throughout means: product is active and published, its
/// category id is in the given id set, and for price operations its price is
/// non-zero.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Resolve an active category by slug or full path slug,
    /// case-insensitively. Full-path matches win.
    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// `category` itself plus all its active descendants.
    async fn descendant_categories(&self, category: &Category) -> Result<Vec<Category>>;

    /// In-scope product count across the id set.
    async fn count_products(&self, category_ids: &[i64]) -> Result<i64>;

    /// In-scope product count per category id.
    async fn product_counts_by_category(&self, category_ids: &[i64]) -> Result<HashMap<i64, i64>>;

    /// One keyset page of the extraction scan: in-scope rows with
    /// `id > after_id`, ordered by id, at most `limit` rows.
    async fn product_page(
        &self,
        category_ids: &[i64],
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<ProductFacetRow>>;

    /// Active brands having at least one in-scope product, by brand id.
    async fn brands_for_scope(&self, category_ids: &[i64]) -> Result<HashMap<i64, Brand>>;

    /// In-scope product count per brand id.
    async fn product_counts_by_brand(&self, category_ids: &[i64]) -> Result<HashMap<i64, i64>>;

    /// Min/max/average/count over in-scope non-zero prices; `None` when the
    /// scope has no priced products.
    async fn price_stats(&self, category_ids: &[i64]) -> Result<Option<PriceAgg>>;

    /// Every in-scope non-zero price, for exact median computation on small
    /// scopes.
    async fn price_values(&self, category_ids: &[i64]) -> Result<Vec<f64>>;

    /// In-scope product count per applicable price bucket, one grouped
    /// aggregation. Buckets with no products are absent from the map.
    async fn price_bucket_counts(
        &self,
        category_ids: &[i64],
        buckets: &[&PriceBucket],
    ) -> Result<HashMap<String, i64>>;

    /// Walk a root→leaf breadcrumb trail, creating missing nodes, and
    /// return the leaf. `cache` is shared across a bulk import.
    async fn get_or_create_breadcrumb(
        &self,
        trail: &[BreadcrumbEntry],
        cache: &mut BreadcrumbCache,
    ) -> Result<Option<Category>>;
}
