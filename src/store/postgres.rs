//! PostgreSQL catalog store.
//!
//! Plain parameterized sqlx for the row-shaped queries; SeaQuery for the
//! grouped price-bucket aggregation, where the CASE expression is built
//! programmatically from the applicable bucket ladder.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sea_query::{
    Alias, Asterisk, CaseStatement, Expr, PostgresQueryBuilder, Query, SimpleExpr,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::debug;

use crate::config::Config;
use crate::filter::price::PriceBucket;
use crate::models::category::child_paths;
use crate::models::{Brand, BreadcrumbCache, BreadcrumbEntry, Category, PriceAgg, ProductFacetRow};

use super::CatalogStore;

const CATEGORY_COLUMNS: &str = "id, name, slug, parent_id, level, path, path_slug, active";

/// Catalog store backed by PostgreSQL.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    /// Create a store over a new connection pool.
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await
            .context("failed to connect to PostgreSQL")?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check if the database connection is healthy.
    pub async fn check_health(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// CASE expression assigning each non-zero price to its bucket id.
fn bucket_case(buckets: &[&PriceBucket]) -> CaseStatement {
    let mut case = CaseStatement::new();
    for bucket in buckets {
        let col = Expr::col(Alias::new("price_value"));
        let cond = match bucket.max {
            Some(max) => col.gte(bucket.min).and(Expr::col(Alias::new("price_value")).lt(max)),
            None => col.gte(bucket.min),
        };
        case = case.case(cond, Expr::val(bucket.id));
    }
    case
}

/// Grouped bucket-count SQL over the priced in-scope product set.
fn bucket_count_sql(category_ids: &[i64], buckets: &[&PriceBucket]) -> String {
    let case = bucket_case(buckets);
    let mut query = Query::select();
    query
        .expr_as(case.clone(), Alias::new("bucket"))
        .expr(Expr::col(Asterisk).count())
        .from(Alias::new("product"))
        .and_where(Expr::col(Alias::new("active")).eq(true))
        .and_where(Expr::col(Alias::new("published")).eq(true))
        .and_where(Expr::col(Alias::new("price_value")).ne(0.0))
        .and_where(Expr::col(Alias::new("category_id")).is_in(category_ids.iter().copied()))
        .add_group_by([SimpleExpr::Case(Box::new(case))]);

    query.to_string(PostgresQueryBuilder)
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM category \
             WHERE active AND (lower(path_slug) = lower($1) OR lower(slug) = lower($1)) \
             ORDER BY (lower(path_slug) = lower($1)) DESC, id \
             LIMIT 1"
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .context("failed to resolve category by slug")
    }

    async fn descendant_categories(&self, category: &Category) -> Result<Vec<Category>> {
        // path_slug is globally unique, so the subtree is exactly the prefix
        // match plus the node itself.
        let prefix = format!("{}/%", category.path_slug);
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM category \
             WHERE active AND (id = $1 OR path_slug LIKE $2) \
             ORDER BY id"
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(category.id)
            .bind(&prefix)
            .fetch_all(&self.pool)
            .await
            .context("failed to load descendant categories")
    }

    async fn count_products(&self, category_ids: &[i64]) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM product \
             WHERE active AND published AND category_id = ANY($1)",
        )
        .bind(category_ids)
        .fetch_one(&self.pool)
        .await
        .context("failed to count products in scope")?;
        Ok(count)
    }

    async fn product_counts_by_category(&self, category_ids: &[i64]) -> Result<HashMap<i64, i64>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT category_id, COUNT(*) FROM product \
             WHERE active AND published AND category_id = ANY($1) \
             GROUP BY category_id",
        )
        .bind(category_ids)
        .fetch_all(&self.pool)
        .await
        .context("failed to count products per category")?;
        Ok(rows.into_iter().collect())
    }

    async fn product_page(
        &self,
        category_ids: &[i64],
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<ProductFacetRow>> {
        sqlx::query_as::<_, ProductFacetRow>(
            "SELECT id, brand_id, specifications, usage, description FROM product \
             WHERE active AND published AND category_id = ANY($1) AND id > $2 \
             ORDER BY id \
             LIMIT $3",
        )
        .bind(category_ids)
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch product page")
    }

    async fn brands_for_scope(&self, category_ids: &[i64]) -> Result<HashMap<i64, Brand>> {
        let brands: Vec<Brand> = sqlx::query_as(
            "SELECT DISTINCT b.id, b.name, b.country, b.active \
             FROM brand b \
             JOIN product p ON p.brand_id = b.id \
             WHERE b.active AND p.active AND p.published AND p.category_id = ANY($1)",
        )
        .bind(category_ids)
        .fetch_all(&self.pool)
        .await
        .context("failed to load brands in scope")?;
        Ok(brands.into_iter().map(|b| (b.id, b)).collect())
    }

    async fn product_counts_by_brand(&self, category_ids: &[i64]) -> Result<HashMap<i64, i64>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT brand_id, COUNT(*) FROM product \
             WHERE active AND published AND brand_id IS NOT NULL \
               AND category_id = ANY($1) \
             GROUP BY brand_id",
        )
        .bind(category_ids)
        .fetch_all(&self.pool)
        .await
        .context("failed to count products per brand")?;
        Ok(rows.into_iter().collect())
    }

    async fn price_stats(&self, category_ids: &[i64]) -> Result<Option<PriceAgg>> {
        let row: (Option<f64>, Option<f64>, Option<f64>, i64) = sqlx::query_as(
            "SELECT MIN(price_value), MAX(price_value), AVG(price_value), COUNT(*) \
             FROM product \
             WHERE active AND published AND price_value <> 0 \
               AND category_id = ANY($1)",
        )
        .bind(category_ids)
        .fetch_one(&self.pool)
        .await
        .context("failed to aggregate price stats")?;

        let (Some(min), Some(max), Some(average)) = (row.0, row.1, row.2) else {
            return Ok(None);
        };
        Ok(Some(PriceAgg {
            min,
            max,
            average,
            count: row.3,
        }))
    }

    async fn price_values(&self, category_ids: &[i64]) -> Result<Vec<f64>> {
        let rows: Vec<(f64,)> = sqlx::query_as(
            "SELECT price_value FROM product \
             WHERE active AND published AND price_value <> 0 \
               AND category_id = ANY($1)",
        )
        .bind(category_ids)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch price values")?;
        Ok(rows.into_iter().map(|(v,)| v).collect())
    }

    async fn price_bucket_counts(
        &self,
        category_ids: &[i64],
        buckets: &[&PriceBucket],
    ) -> Result<HashMap<String, i64>> {
        if category_ids.is_empty() || buckets.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = bucket_count_sql(category_ids, buckets);
        debug!(sql = %sql, "price bucket aggregation");
        let rows: Vec<(Option<String>, i64)> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .context("failed to count products per price bucket")?;
        Ok(rows
            .into_iter()
            .filter_map(|(bucket, count)| bucket.map(|b| (b, count)))
            .collect())
    }

    async fn get_or_create_breadcrumb(
        &self,
        trail: &[BreadcrumbEntry],
        cache: &mut BreadcrumbCache,
    ) -> Result<Option<Category>> {
        let mut parent: Option<Category> = None;

        for entry in trail {
            let name = entry.name.trim();
            let slug = entry.slug.trim();
            if name.is_empty() || slug.is_empty() {
                continue;
            }

            let key = (parent.as_ref().map(|p| p.id), slug.to_string());
            if let Some(cached) = cache.get(&key) {
                parent = Some(cached.clone());
                continue;
            }

            let parent_id = key.0;
            let sql = format!(
                "SELECT {CATEGORY_COLUMNS} FROM category \
                 WHERE parent_id IS NOT DISTINCT FROM $1 AND slug = $2 \
                 LIMIT 1"
            );
            let existing = sqlx::query_as::<_, Category>(&sql)
                .bind(parent_id)
                .bind(slug)
                .fetch_optional(&self.pool)
                .await
                .context("failed to look up breadcrumb category")?;

            let node = match existing {
                Some(node) => node,
                None => {
                    let (level, path, path_slug) = child_paths(parent.as_ref(), name, slug);
                    let sql = format!(
                        "INSERT INTO category \
                         (name, slug, parent_id, level, path, path_slug, active) \
                         VALUES ($1, $2, $3, $4, $5, $6, TRUE) \
                         RETURNING {CATEGORY_COLUMNS}"
                    );
                    sqlx::query_as::<_, Category>(&sql)
                        .bind(name)
                        .bind(slug)
                        .bind(parent_id)
                        .bind(level)
                        .bind(&path)
                        .bind(&path_slug)
                        .fetch_one(&self.pool)
                        .await
                        .context("failed to insert breadcrumb category")?
                }
            };

            cache.insert(key, node.clone());
            parent = Some(node);
        }

        Ok(parent)
    }
}

impl std::fmt::Debug for PgCatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgCatalogStore").finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use crate::filter::price::applicable_buckets;

    use super::*;

    #[test]
    fn bucket_count_sql_groups_by_case() {
        let buckets = applicable_buckets(20_000.0, 650_000.0);
        let sql = bucket_count_sql(&[1, 2, 3], &buckets);

        assert!(sql.contains("CASE"));
        assert!(sql.contains("'under_100k'"));
        assert!(sql.contains("'over_500k'"));
        // Grouping is on the CASE expression itself, not a column.
        assert!(sql.contains("GROUP BY CASE"));
        assert!(sql.contains("\"category_id\" IN (1, 2, 3)"));
        // The unbounded top bucket has no upper comparison of its own.
        assert!(sql.contains(">= 500000"));
    }

    #[test]
    fn bucket_count_sql_scopes_to_published_priced_rows() {
        let buckets = applicable_buckets(50_000.0, 60_000.0);
        let sql = bucket_count_sql(&[7], &buckets);
        assert!(sql.contains("\"active\" = TRUE"));
        assert!(sql.contains("\"published\" = TRUE"));
        assert!(sql.contains("\"price_value\" <> 0"));
    }
}
