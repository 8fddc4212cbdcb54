//! Product model and the narrow row used during facet extraction.

use serde::{Deserialize, Serialize};

/// A sellable catalog product.
///
/// `specifications` is a semi-structured JSON object (string keys to string
/// or array-of-string values) whose schema is not enforced; extractors probe
/// it by known key spellings and fall back to the free-text fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,

    /// Leaf category; `None` means uncategorized and excluded from every
    /// category-scoped query.
    pub category_id: Option<i64>,

    /// Numeric price used for filtering and stats; 0 means unpriced.
    pub price_value: f64,

    pub published: bool,
    pub active: bool,

    pub brand_id: Option<i64>,

    /// Semi-structured specification map.
    pub specifications: serde_json::Value,

    /// Free-text usage/indication description, extraction fallback.
    pub usage: Option<String>,

    /// Free-text product description, extraction fallback.
    pub description: Option<String>,
}

impl Product {
    /// The subset of fields the extraction pass reads.
    pub fn facet_row(&self) -> ProductFacetRow {
        ProductFacetRow {
            id: self.id,
            brand_id: self.brand_id,
            specifications: self.specifications.clone(),
            usage: self.usage.clone(),
            description: self.description.clone(),
        }
    }
}

/// One row of the cursor scan over the in-scope product set.
///
/// Kept narrow on purpose: the extraction pass is the only per-product cost
/// in the engine, and it never needs prices or media.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductFacetRow {
    pub id: i64,
    pub brand_id: Option<i64>,
    pub specifications: serde_json::Value,
    pub usage: Option<String>,
    pub description: Option<String>,
}

/// Aggregated price statistics over the non-zero-priced scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceAgg {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    /// Number of in-scope products with a non-zero price.
    pub count: i64,
}
