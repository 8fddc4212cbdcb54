//! Wire and intermediate types for the dynamic filter engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifier of a facet kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FacetId {
    Country,
    Brand,
    PriceRange,
    TargetAudience,
    Flavor,
    Indication,
    SkinType,
    MedicineType,
    Ingredients,
}

impl FacetId {
    pub const ALL: [FacetId; 9] = [
        FacetId::Country,
        FacetId::Brand,
        FacetId::PriceRange,
        FacetId::TargetAudience,
        FacetId::Flavor,
        FacetId::Indication,
        FacetId::SkinType,
        FacetId::MedicineType,
        FacetId::Ingredients,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FacetId::Country => "country",
            FacetId::Brand => "brand",
            FacetId::PriceRange => "priceRange",
            FacetId::TargetAudience => "targetAudience",
            FacetId::Flavor => "flavor",
            FacetId::Indication => "indication",
            FacetId::SkinType => "skinType",
            FacetId::MedicineType => "medicineType",
            FacetId::Ingredients => "ingredients",
        }
    }
}

impl std::fmt::Display for FacetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static per-facet configuration.
#[derive(Debug, Clone, Copy)]
pub struct FacetDefinition {
    pub id: FacetId,
    /// Field name clients filter on.
    pub field: &'static str,
    /// Display label (Vietnamese storefront copy).
    pub label: &'static str,
    /// Widget kind.
    pub kind: &'static str,
    /// Whether the UI offers an option search box.
    pub searchable: bool,
    /// Maximum options surfaced; `None` means unlimited.
    pub option_limit: Option<usize>,
}

/// Coarse classification of a root category, selects the facet profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogType {
    Medicine,
    Cosmetics,
    Supplements,
    Default,
}

/// Per-catalog-type facet selection and display order.
#[derive(Debug, Clone, Copy)]
pub struct TypeProfile {
    pub enabled: &'static [FacetId],
    /// Display priority, highest first. Positions here (1-based) become the
    /// `priority` field on emitted facets.
    pub priority: &'static [FacetId],
}

/// One selectable option of a facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetOption {
    pub value: String,
    pub label: String,
    /// Occurrence count in scope; stripped when the caller asks for a
    /// countless view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

/// A fully-built facet ready for the storefront UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facet {
    pub id: FacetId,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    pub field: String,
    pub searchable: bool,
    pub options: Vec<FacetOption>,
    pub default_selected: Vec<String>,
    /// True iff the distinct value count exceeds the surfaced option count.
    pub show_more: bool,
    /// 1-based position in the profile's priority list, stable even when
    /// other facets are absent for this category.
    pub priority: usize,
}

/// Price statistics over the non-zero-priced scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    pub min: i64,
    pub max: i64,
    pub average: f64,
    pub median: f64,
}

/// Raw distinct facet values observed across the in-scope product set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variants {
    pub countries: Vec<String>,
    pub brands: Vec<String>,
    /// Applicable price bucket ids.
    pub price_ranges: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_stats: Option<PriceStats>,
    pub target_audiences: Vec<String>,
    pub flavors: Vec<String>,
    pub indications: Vec<String>,
    pub skin_types: Vec<String>,
    pub medicine_types: Vec<String>,
    pub ingredients: Vec<String>,
}

impl Variants {
    /// Distinct values for a facet; used to decide whether a facet is worth
    /// building at all.
    pub fn values_for(&self, id: FacetId) -> &[String] {
        match id {
            FacetId::Country => &self.countries,
            FacetId::Brand => &self.brands,
            FacetId::PriceRange => &self.price_ranges,
            FacetId::TargetAudience => &self.target_audiences,
            FacetId::Flavor => &self.flavors,
            FacetId::Indication => &self.indications,
            FacetId::SkinType => &self.skin_types,
            FacetId::MedicineType => &self.medicine_types,
            FacetId::Ingredients => &self.ingredients,
        }
    }
}

/// Immediate child of the requested category, with its whole-subtree
/// product count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubcategorySummary {
    pub slug: String,
    pub name: String,
    pub product_count: i64,
    pub level: i32,
}

/// The filter response served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterResponse {
    pub category_slug: String,
    pub category_name: String,
    pub product_count: i64,
    pub has_subcategories: bool,
    pub subcategories: Vec<SubcategorySummary>,
    /// True when the category tripped the large-category guard; `variants`
    /// and `filters` are absent in that case, not approximated.
    pub over_limit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variants: Option<Variants>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<Facet>>,
}

/// Superset stored in the cache: the response plus the per-facet frequency
/// maps the builders worked from. The frequency maps never leave the cache
/// entry; responses are always a [`CachedFilters::view`] of this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedFilters {
    pub response: FilterResponse,
    /// facet id → value → occurrences.
    pub value_counts: BTreeMap<String, BTreeMap<String, i64>>,
}

/// Per-request response shaping flags.
#[derive(Debug, Clone, Copy)]
pub struct FilterRequest {
    pub use_cache: bool,
    pub include_variants: bool,
    pub include_counts: bool,
}

impl Default for FilterRequest {
    fn default() -> Self {
        Self {
            use_cache: true,
            include_variants: true,
            include_counts: true,
        }
    }
}

impl CachedFilters {
    /// Shape the stored superset into a response, per request flags.
    ///
    /// Pure post-processing, applied identically to fresh and cached
    /// results.
    pub fn view(&self, request: &FilterRequest) -> FilterResponse {
        let mut response = self.response.clone();
        if !request.include_variants {
            response.variants = None;
        }
        if !request.include_counts {
            if let Some(filters) = response.filters.as_mut() {
                for facet in filters {
                    for option in &mut facet.options {
                        option.count = None;
                    }
                }
            }
        }
        response
    }
}
