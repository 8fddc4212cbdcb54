//! Price buckets and price statistics.
//!
//! Bucket thresholds are storefront configuration, not business law; the
//! mechanism is currency-agnostic. The default ladder matches the
//! Vietnamese storefront (₫).

use crate::models::PriceAgg;

use super::types::PriceStats;

/// One half-open price bucket `[min, max)`; `max = None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBucket {
    pub id: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: Option<f64>,
}

/// The configured bucket ladder, in display order.
pub const PRICE_BUCKETS: [PriceBucket; 4] = [
    PriceBucket {
        id: "under_100k",
        label: "Dưới 100.000₫",
        min: 0.0,
        max: Some(100_000.0),
    },
    PriceBucket {
        id: "100k_to_300k",
        label: "100.000₫ - 300.000₫",
        min: 100_000.0,
        max: Some(300_000.0),
    },
    PriceBucket {
        id: "300k_to_500k",
        label: "300.000₫ - 500.000₫",
        min: 300_000.0,
        max: Some(500_000.0),
    },
    PriceBucket {
        id: "over_500k",
        label: "Trên 500.000₫",
        min: 500_000.0,
        max: None,
    },
];

impl PriceBucket {
    pub fn by_id(id: &str) -> Option<&'static PriceBucket> {
        PRICE_BUCKETS.iter().find(|b| b.id == id)
    }

    /// Whether a single price falls in this bucket.
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && self.max.is_none_or(|max| price < max)
    }

    /// Whether the observed `[min, max]` price span overlaps this bucket.
    pub fn overlaps(&self, min: f64, max: f64) -> bool {
        max >= self.min && self.max.is_none_or(|upper| min < upper)
    }
}

/// Buckets whose range overlaps the observed `[min, max]` span, in ladder
/// order.
pub fn applicable_buckets(min: f64, max: f64) -> Vec<&'static PriceBucket> {
    PRICE_BUCKETS
        .iter()
        .filter(|b| b.overlaps(min, max))
        .collect()
}

/// The bucket a single price belongs to. A price lands in at most one
/// bucket, so bucket counts partition the non-zero-priced scope.
pub fn bucket_for(price: f64) -> Option<&'static PriceBucket> {
    PRICE_BUCKETS.iter().find(|b| b.contains(price))
}

/// Exact median of a set of prices; 0 for an empty set.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| *v != 0.0).collect();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Assemble price statistics from the aggregate row, with the median exact
/// only for small scopes. `exact_values` is consulted when `agg.count` is
/// within `exact_threshold`; larger scopes approximate the median by the
/// average to bound latency.
pub fn stats(agg: &PriceAgg, exact_values: Option<&[f64]>, exact_threshold: i64) -> PriceStats {
    let median = if agg.count <= exact_threshold {
        exact_values.map_or(agg.average, median)
    } else {
        agg.average
    };
    PriceStats {
        min: agg.min as i64,
        max: agg.max as i64,
        average: agg.average,
        median,
    }
}
