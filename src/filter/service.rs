//! Filter orchestration: resolve scope, extract, build, cache.
//!
//! One entry point, [`FilterService::get_filters`]. The cache stores the
//! full superset of a computed result; every response, fresh or cached, is a
//! [`CachedFilters::view`] shaped by the request flags, so both paths return
//! byte-identical payloads.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::FilterCache;
use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::models::Category;
use crate::store::CatalogStore;

use super::builder::{BuildContext, FacetRegistry};
use super::extract::VariantAccumulator;
use super::price::{self, applicable_buckets};
use super::profiles::{self, CACHE_PREFIX};
use super::types::{
    CachedFilters, FilterRequest, FilterResponse, SubcategorySummary, Variants,
};

/// The dynamic filter engine.
pub struct FilterService<S: CatalogStore> {
    store: Arc<S>,
    cache: Arc<dyn FilterCache>,
    registry: FacetRegistry,
    ttl_secs: u64,
    large_category_threshold: i64,
    exact_median_threshold: i64,
    scan_chunk_size: i64,
}

impl<S: CatalogStore> FilterService<S> {
    pub fn new(store: Arc<S>, cache: Arc<dyn FilterCache>, config: &Config) -> Self {
        Self {
            store,
            cache,
            registry: FacetRegistry::default(),
            ttl_secs: config.cache_ttl_secs,
            large_category_threshold: config.large_category_threshold,
            exact_median_threshold: config.exact_median_threshold,
            scan_chunk_size: config.scan_chunk_size,
        }
    }

    fn cache_key(slug: &str) -> String {
        format!("{CACHE_PREFIX}:{slug}")
    }

    /// Compute (or serve from cache) the filter payload for a category.
    pub async fn get_filters(
        &self,
        slug: &str,
        request: &FilterRequest,
    ) -> EngineResult<FilterResponse> {
        let slug = slug.trim().trim_end_matches('/');
        let key = Self::cache_key(slug);

        if request.use_cache {
            if let Some(raw) = self.cache.get(&key).await {
                match serde_json::from_str::<CachedFilters>(&raw) {
                    Ok(cached) => {
                        debug!(slug = %slug, "serving filters from cache");
                        return Ok(cached.view(request));
                    }
                    Err(e) => {
                        warn!(slug = %slug, error = %e, "discarding unparseable cache entry");
                        self.cache.delete(&key).await;
                    }
                }
            }
        }

        let category = self
            .store
            .category_by_slug(slug)
            .await?
            .ok_or_else(|| EngineError::CategoryNotFound(slug.to_string()))?;

        let scope = self.store.descendant_categories(&category).await?;
        let scope_ids: Vec<i64> = scope.iter().map(|c| c.id).collect();

        let product_count = self.store.count_products(&scope_ids).await?;
        let subcategories = self.subcategory_summaries(&category, &scope).await?;

        if product_count > self.large_category_threshold {
            debug!(
                slug = %slug,
                product_count,
                "category over extraction limit, returning navigation only"
            );
            let response = FilterResponse {
                category_slug: category.public_slug().to_string(),
                category_name: category.display_name().to_string(),
                product_count,
                has_subcategories: !subcategories.is_empty(),
                subcategories,
                over_limit: true,
                variants: None,
                filters: None,
            };
            // Over-limit results are cheap to recompute and likely to shrink
            // soon; they are never cached.
            return Ok(CachedFilters {
                response,
                value_counts: BTreeMap::new(),
            }
            .view(request));
        }

        let cached = self
            .compute(&category, &scope_ids, product_count, subcategories)
            .await?;

        match serde_json::to_string(&cached) {
            Ok(raw) => self.cache.set(&key, &raw, self.ttl_secs).await,
            Err(e) => warn!(slug = %slug, error = %e, "failed to serialize filters for cache"),
        }

        Ok(cached.view(request))
    }

    /// Drop the cached payload for one category slug.
    pub async fn invalidate(&self, slug: &str) {
        let slug = slug.trim().trim_end_matches('/');
        self.cache.delete(&Self::cache_key(slug)).await;
        debug!(slug = %slug, "filter cache invalidated");
    }

    /// Full extraction and facet assembly for an in-limit category.
    async fn compute(
        &self,
        category: &Category,
        scope_ids: &[i64],
        product_count: i64,
        subcategories: Vec<SubcategorySummary>,
    ) -> EngineResult<CachedFilters> {
        // Single streaming pass over the scope, one keyset page at a time.
        let mut acc = VariantAccumulator::default();
        let mut after_id = 0;
        loop {
            let page = self
                .store
                .product_page(scope_ids, after_id, self.scan_chunk_size)
                .await?;
            let Some(last) = page.last() else { break };
            after_id = last.id;
            for row in &page {
                acc.observe(row);
            }
            if (page.len() as i64) < self.scan_chunk_size {
                break;
            }
        }

        // Brand and country facets come from the brand join, with counts
        // folded from the per-brand aggregation.
        let brands = self.store.brands_for_scope(scope_ids).await?;
        let by_brand = self.store.product_counts_by_brand(scope_ids).await?;
        let mut brand_counts: BTreeMap<String, i64> = BTreeMap::new();
        let mut country_counts: BTreeMap<String, i64> = BTreeMap::new();
        for (brand_id, brand) in &brands {
            let count = by_brand.get(brand_id).copied().unwrap_or(0);
            *brand_counts.entry(brand.name.clone()).or_insert(0) += count;
            if let Some(country) = brand.country.as_deref().map(str::trim) {
                if !country.is_empty() {
                    *country_counts.entry(country.to_string()).or_insert(0) += count;
                }
            }
        }

        // Price: one aggregate row, exact values only for small scopes.
        let agg = self.store.price_stats(scope_ids).await?;
        let (price_stats, buckets) = match agg {
            Some(agg) => {
                let exact = if agg.count <= self.exact_median_threshold {
                    Some(self.store.price_values(scope_ids).await?)
                } else {
                    None
                };
                let stats = price::stats(&agg, exact.as_deref(), self.exact_median_threshold);
                (Some(stats), applicable_buckets(agg.min, agg.max))
            }
            None => (None, Vec::new()),
        };
        let bucket_counts = if buckets.is_empty() {
            std::collections::HashMap::new()
        } else {
            self.store.price_bucket_counts(scope_ids, &buckets).await?
        };

        let variants = Variants {
            countries: country_counts.keys().cloned().collect(),
            brands: brand_counts.keys().cloned().collect(),
            price_ranges: buckets.iter().map(|b| b.id.to_string()).collect(),
            price_stats,
            target_audiences: acc.values(super::types::FacetId::TargetAudience),
            flavors: acc.values(super::types::FacetId::Flavor),
            indications: acc.values(super::types::FacetId::Indication),
            skin_types: acc.values(super::types::FacetId::SkinType),
            medicine_types: acc.values(super::types::FacetId::MedicineType),
            ingredients: acc.values(super::types::FacetId::Ingredients),
        };

        let catalog_type = profiles::catalog_type_for_root_slug(category.root_slug());
        debug!(
            slug = %category.public_slug(),
            ?catalog_type,
            product_count,
            "building facets"
        );

        let mut value_counts = acc.into_counts();
        let cx = BuildContext {
            variants: &variants,
            value_counts: &value_counts,
            brand_counts: &brand_counts,
            country_counts: &country_counts,
            bucket_counts: &bucket_counts,
        };
        let filters = self.registry.build_all(catalog_type, &cx);

        value_counts.insert("brand".to_string(), brand_counts);
        value_counts.insert("country".to_string(), country_counts);
        value_counts.insert(
            "priceRange".to_string(),
            bucket_counts.into_iter().collect(),
        );

        let response = FilterResponse {
            category_slug: category.public_slug().to_string(),
            category_name: category.display_name().to_string(),
            product_count,
            has_subcategories: !subcategories.is_empty(),
            subcategories,
            over_limit: false,
            variants: Some(variants),
            filters: Some(filters),
        };

        Ok(CachedFilters {
            response,
            value_counts,
        })
    }

    /// Direct children of the category, each with its whole-subtree product
    /// count, most products first, name as tiebreaker.
    async fn subcategory_summaries(
        &self,
        category: &Category,
        scope: &[Category],
    ) -> EngineResult<Vec<SubcategorySummary>> {
        let scope_ids: Vec<i64> = scope.iter().map(|c| c.id).collect();
        let per_category = self.store.product_counts_by_category(&scope_ids).await?;

        let mut summaries: Vec<SubcategorySummary> = scope
            .iter()
            .filter(|c| c.parent_id == Some(category.id))
            .map(|child| {
                let prefix = format!("{}/", child.path_slug);
                let count = scope
                    .iter()
                    .filter(|c| c.id == child.id || c.path_slug.starts_with(&prefix))
                    .filter_map(|c| per_category.get(&c.id))
                    .sum();
                SubcategorySummary {
                    slug: child.public_slug().to_string(),
                    name: child.display_name().to_string(),
                    product_count: count,
                    level: child.level,
                }
            })
            .collect();
        summaries.sort_by(|a, b| {
            b.product_count
                .cmp(&a.product_count)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(summaries)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use crate::cache::MemoryCache;
    use crate::models::{Brand, Product};
    use crate::store::MemoryCatalogStore;

    use super::super::types::FacetId;
    use super::*;

    fn service(
        store: Arc<MemoryCatalogStore>,
        config: &Config,
    ) -> FilterService<MemoryCatalogStore> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        let cache = Arc::new(MemoryCache::new(config.cache_ttl_secs));
        FilterService::new(store, cache, config)
    }

    fn product(id: i64, category_id: i64, brand_id: i64, price: f64) -> Product {
        Product {
            id,
            name: format!("Product {id}"),
            category_id: Some(category_id),
            price_value: price,
            published: true,
            active: true,
            brand_id: Some(brand_id),
            specifications: json!({}),
            usage: None,
            description: None,
        }
    }

    /// Supplements catalog: root → vitamins child, 40 priced products
    /// spanning every bucket, three brands from two countries.
    fn seed_vitamins(store: &MemoryCatalogStore) -> i64 {
        let root = store.add_category(None, "Thực phẩm chức năng", "thuc-pham-chuc-nang");
        let vitamins = store.add_category(Some(root), "Vitamin & Khoáng chất", "vitamin-khoang-chat");

        store.add_brand(Brand {
            id: 1,
            name: "Blackmores".to_string(),
            country: Some("Úc".to_string()),
            active: true,
        });
        store.add_brand(Brand {
            id: 2,
            name: "DHC".to_string(),
            country: Some("Nhật Bản".to_string()),
            active: true,
        });
        store.add_brand(Brand {
            id: 3,
            name: "Abipha".to_string(),
            country: Some("Việt Nam".to_string()),
            active: true,
        });

        // 40 products: prices cycle through all four buckets.
        for i in 0..40_i64 {
            let price = match i % 4 {
                0 => 20_000.0 + (i as f64),
                1 => 150_000.0,
                2 => 420_000.0,
                _ => 650_000.0,
            };
            let brand_id = (i % 3) + 1;
            let mut p = product(i + 1, vitamins, brand_id, price);
            p.specifications = json!({
                "targetAudience": if i % 2 == 0 { "Người lớn" } else { "Trẻ em" },
                "flavor": "Cam",
            });
            store.add_product(p);
        }
        vitamins
    }

    #[tokio::test]
    async fn unknown_slug_is_not_found() {
        let store = Arc::new(MemoryCatalogStore::new());
        let svc = service(Arc::clone(&store), &Config::default());
        let err = svc
            .get_filters("khong-ton-tai", &FilterRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::CategoryNotFound(_)));
    }

    #[tokio::test]
    async fn vitamins_category_builds_supplements_facets() {
        let store = Arc::new(MemoryCatalogStore::new());
        seed_vitamins(&store);
        let svc = service(Arc::clone(&store), &Config::default());

        let response = svc
            .get_filters("thuc-pham-chuc-nang/vitamin-khoang-chat", &FilterRequest::default())
            .await
            .unwrap();

        assert_eq!(response.category_slug, "thuc-pham-chuc-nang/vitamin-khoang-chat");
        assert_eq!(
            response.category_name,
            "Thực phẩm chức năng > Vitamin & Khoáng chất"
        );
        assert_eq!(response.product_count, 40);
        assert!(!response.over_limit);
        assert!(!response.has_subcategories);

        let variants = response.variants.as_ref().unwrap();
        assert_eq!(
            variants.price_ranges,
            vec!["under_100k", "100k_to_300k", "300k_to_500k", "over_500k"]
        );
        assert_eq!(variants.brands, vec!["Abipha", "Blackmores", "DHC"]);
        assert_eq!(variants.flavors, vec!["Cam"]);
        let stats = variants.price_stats.as_ref().unwrap();
        assert_eq!(stats.min, 20_000);
        assert_eq!(stats.max, 650_000);

        let filters = response.filters.as_ref().unwrap();
        let price = filters.iter().find(|f| f.id == FacetId::PriceRange).unwrap();
        let brand = filters.iter().find(|f| f.id == FacetId::Brand).unwrap();
        assert_eq!(price.priority, 1);
        assert_eq!(brand.priority, 2);
        assert!(price.priority < brand.priority);

        // Bucket counts partition the priced scope.
        let total: i64 = price.options.iter().map(|o| o.count.unwrap()).sum();
        assert_eq!(total, 40);
        assert_eq!(price.options.len(), 4);
        assert!(!price.show_more);

        let audience = filters
            .iter()
            .find(|f| f.id == FacetId::TargetAudience)
            .unwrap();
        assert_eq!(audience.options.len(), 2);
    }

    #[tokio::test]
    async fn bare_slug_and_trailing_slash_resolve() {
        let store = Arc::new(MemoryCatalogStore::new());
        seed_vitamins(&store);
        let svc = service(Arc::clone(&store), &Config::default());

        let response = svc
            .get_filters("vitamin-khoang-chat/", &FilterRequest::default())
            .await
            .unwrap();
        assert_eq!(response.category_slug, "thuc-pham-chuc-nang/vitamin-khoang-chat");
    }

    #[tokio::test]
    async fn root_category_lists_subcategories_with_subtree_counts() {
        let store = Arc::new(MemoryCatalogStore::new());
        let vitamins = seed_vitamins(&store);
        // A deeper grandchild contributes to the child's subtree count.
        let omega = store.add_category(Some(vitamins), "Omega 3", "omega-3");
        store.add_product(product(100, omega, 1, 90_000.0));

        let svc = service(Arc::clone(&store), &Config::default());
        let response = svc
            .get_filters("thuc-pham-chuc-nang", &FilterRequest::default())
            .await
            .unwrap();

        assert!(response.has_subcategories);
        assert_eq!(response.category_name, "Thực phẩm chức năng");
        assert_eq!(response.subcategories.len(), 1);
        let sub = &response.subcategories[0];
        assert_eq!(sub.slug, "thuc-pham-chuc-nang/vitamin-khoang-chat");
        assert_eq!(sub.name, "Thực phẩm chức năng > Vitamin & Khoáng chất");
        assert_eq!(sub.product_count, 41);
        assert_eq!(response.product_count, 41);
    }

    #[tokio::test]
    async fn large_category_skips_extraction_and_is_not_cached() {
        let store = Arc::new(MemoryCatalogStore::new());
        let vitamins = seed_vitamins(&store);
        let omega = store.add_category(Some(vitamins), "Omega 3", "omega-3");
        store.add_product(product(100, omega, 1, 90_000.0));
        let config = Config {
            large_category_threshold: 10,
            ..Config::default()
        };
        let cache = Arc::new(MemoryCache::new(config.cache_ttl_secs));
        let svc = FilterService::new(Arc::clone(&store), Arc::clone(&cache) as Arc<dyn FilterCache>, &config);

        let response = svc
            .get_filters("vitamin-khoang-chat", &FilterRequest::default())
            .await
            .unwrap();
        assert!(response.over_limit);
        assert_eq!(response.product_count, 41);
        assert!(response.variants.is_none());
        assert!(response.filters.is_none());

        // Navigation data is still populated even though extraction was
        // skipped.
        assert!(response.has_subcategories);
        assert_eq!(response.subcategories.len(), 1);
        let sub = &response.subcategories[0];
        assert_eq!(
            sub.slug,
            "thuc-pham-chuc-nang/vitamin-khoang-chat/omega-3"
        );
        assert_eq!(sub.product_count, 1);

        // Nothing was cached.
        assert!(
            cache
                .get("catalog_filters:vitamin-khoang-chat")
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn cache_hit_serves_identical_response_with_zero_store_reads() {
        let store = Arc::new(MemoryCatalogStore::new());
        seed_vitamins(&store);
        let svc = service(Arc::clone(&store), &Config::default());

        let first = svc
            .get_filters("vitamin-khoang-chat", &FilterRequest::default())
            .await
            .unwrap();
        let reads_after_first = store.read_count();

        let second = svc
            .get_filters("vitamin-khoang-chat", &FilterRequest::default())
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.read_count(), reads_after_first);

        // use_cache = false forces a recompute.
        let third = svc
            .get_filters(
                "vitamin-khoang-chat",
                &FilterRequest {
                    use_cache: false,
                    ..FilterRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(first, third);
        assert!(store.read_count() > reads_after_first);
    }

    #[tokio::test]
    async fn request_flags_shape_cached_views() {
        let store = Arc::new(MemoryCatalogStore::new());
        seed_vitamins(&store);
        let svc = service(Arc::clone(&store), &Config::default());

        let full = svc
            .get_filters("vitamin-khoang-chat", &FilterRequest::default())
            .await
            .unwrap();
        assert!(full.variants.is_some());

        let slim = svc
            .get_filters(
                "vitamin-khoang-chat",
                &FilterRequest {
                    include_variants: false,
                    include_counts: false,
                    ..FilterRequest::default()
                },
            )
            .await
            .unwrap();
        assert!(slim.variants.is_none());
        let filters = slim.filters.unwrap();
        assert!(
            filters
                .iter()
                .all(|f| f.options.iter().all(|o| o.count.is_none()))
        );
    }

    #[tokio::test]
    async fn invalidate_forces_recompute() {
        let store = Arc::new(MemoryCatalogStore::new());
        seed_vitamins(&store);
        let svc = service(Arc::clone(&store), &Config::default());

        let _ = svc
            .get_filters("vitamin-khoang-chat", &FilterRequest::default())
            .await
            .unwrap();
        let reads = store.read_count();

        svc.invalidate("vitamin-khoang-chat").await;
        let _ = svc
            .get_filters("vitamin-khoang-chat", &FilterRequest::default())
            .await
            .unwrap();
        assert!(store.read_count() > reads);
    }

    #[tokio::test]
    async fn corrupt_cache_entry_is_discarded_and_recomputed() {
        let store = Arc::new(MemoryCatalogStore::new());
        seed_vitamins(&store);
        let config = Config::default();
        let cache = Arc::new(MemoryCache::new(config.cache_ttl_secs));
        let svc = FilterService::new(
            Arc::clone(&store),
            Arc::clone(&cache) as Arc<dyn FilterCache>,
            &config,
        );

        cache
            .set("catalog_filters:vitamin-khoang-chat", "not json", 60)
            .await;
        let response = svc
            .get_filters("vitamin-khoang-chat", &FilterRequest::default())
            .await
            .unwrap();
        assert_eq!(response.product_count, 40);
    }
}
