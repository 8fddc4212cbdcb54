//! Facet builders and the builder registry.
//!
//! Each facet kind is assembled by its own [`FacetBuilder`]; the registry
//! maps facet ids to builders so adding a facet means registering a builder,
//! not growing a dispatch chain.

use std::collections::{BTreeMap, HashMap};

use super::price::PriceBucket;
use super::profiles;
use super::types::{CatalogType, Facet, FacetId, FacetOption, Variants};

/// Everything a builder may consult: the distinct values, the per-value
/// frequency maps, and the aggregate counts computed outside the row scan.
pub struct BuildContext<'a> {
    pub variants: &'a Variants,
    /// facet wire name → value → occurrences, for scanned facets.
    pub value_counts: &'a BTreeMap<String, BTreeMap<String, i64>>,
    /// brand name → in-scope product count.
    pub brand_counts: &'a BTreeMap<String, i64>,
    /// country name → in-scope product count.
    pub country_counts: &'a BTreeMap<String, i64>,
    /// price bucket id → in-scope product count.
    pub bucket_counts: &'a HashMap<String, i64>,
}

pub trait FacetBuilder: Send + Sync {
    fn id(&self) -> FacetId;

    /// Build the facet, or `None` when there is nothing to offer.
    fn build(&self, cx: &BuildContext<'_>) -> Option<Facet>;
}

/// Shared assembly: definition lookup, option truncation, showMore.
fn assemble(id: FacetId, options: Vec<FacetOption>, distinct: usize) -> Option<Facet> {
    if options.is_empty() {
        return None;
    }
    let def = profiles::definition(id);
    let limit = def.option_limit.unwrap_or(usize::MAX);
    let mut options = options;
    options.truncate(limit);
    Some(Facet {
        id,
        kind: def.kind.to_string(),
        label: def.label.to_string(),
        field: def.field.to_string(),
        searchable: def.searchable,
        options,
        default_selected: Vec::new(),
        show_more: distinct > limit,
        priority: 0,
    })
}

/// Countries, alphabetical. Zero-count countries are kept: a country can be
/// present on a brand none of whose in-scope products survive other joins.
struct CountryBuilder;

impl FacetBuilder for CountryBuilder {
    fn id(&self) -> FacetId {
        FacetId::Country
    }

    fn build(&self, cx: &BuildContext<'_>) -> Option<Facet> {
        let distinct = cx.variants.countries.len();
        let options = cx
            .variants
            .countries
            .iter()
            .map(|name| FacetOption {
                value: name.clone(),
                label: name.clone(),
                count: Some(cx.country_counts.get(name).copied().unwrap_or(0)),
            })
            .collect();
        assemble(self.id(), options, distinct)
    }
}

/// Brands, most products first, name as tiebreaker. Brands with no counted
/// products are dropped.
struct BrandBuilder;

impl FacetBuilder for BrandBuilder {
    fn id(&self) -> FacetId {
        FacetId::Brand
    }

    fn build(&self, cx: &BuildContext<'_>) -> Option<Facet> {
        let mut counted: Vec<(&String, i64)> = cx
            .variants
            .brands
            .iter()
            .filter_map(|name| {
                let count = cx.brand_counts.get(name).copied().unwrap_or(0);
                (count > 0).then_some((name, count))
            })
            .collect();
        counted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let distinct = counted.len();
        let options = counted
            .into_iter()
            .map(|(name, count)| FacetOption {
                value: name.clone(),
                label: name.clone(),
                count: Some(count),
            })
            .collect();
        assemble(self.id(), options, distinct)
    }
}

/// Price buckets in ladder order, zero-filled so an applicable-but-empty
/// bucket still renders.
struct PriceRangeBuilder;

impl FacetBuilder for PriceRangeBuilder {
    fn id(&self) -> FacetId {
        FacetId::PriceRange
    }

    fn build(&self, cx: &BuildContext<'_>) -> Option<Facet> {
        let options: Vec<FacetOption> = cx
            .variants
            .price_ranges
            .iter()
            .filter_map(|id| PriceBucket::by_id(id))
            .map(|bucket| FacetOption {
                value: bucket.id.to_string(),
                label: bucket.label.to_string(),
                count: Some(cx.bucket_counts.get(bucket.id).copied().unwrap_or(0)),
            })
            .collect();
        let distinct = options.len();
        assemble(self.id(), options, distinct)
    }
}

/// Generic builder for the scanned text facets: alphabetical options with
/// their observed counts, zero-count values dropped.
struct ScannedFacetBuilder {
    id: FacetId,
}

impl FacetBuilder for ScannedFacetBuilder {
    fn id(&self) -> FacetId {
        self.id
    }

    fn build(&self, cx: &BuildContext<'_>) -> Option<Facet> {
        let counts = cx.value_counts.get(self.id.as_str())?;
        let options: Vec<FacetOption> = counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(value, count)| FacetOption {
                value: value.clone(),
                label: value.clone(),
                count: Some(*count),
            })
            .collect();
        let distinct = options.len();
        assemble(self.id, options, distinct)
    }
}

/// Facet-id-keyed builder registry.
pub struct FacetRegistry {
    builders: HashMap<FacetId, Box<dyn FacetBuilder>>,
}

impl Default for FacetRegistry {
    fn default() -> Self {
        let mut builders: HashMap<FacetId, Box<dyn FacetBuilder>> = HashMap::new();
        builders.insert(FacetId::Country, Box::new(CountryBuilder));
        builders.insert(FacetId::Brand, Box::new(BrandBuilder));
        builders.insert(FacetId::PriceRange, Box::new(PriceRangeBuilder));
        for id in [
            FacetId::TargetAudience,
            FacetId::Flavor,
            FacetId::Indication,
            FacetId::SkinType,
            FacetId::MedicineType,
            FacetId::Ingredients,
        ] {
            builders.insert(id, Box::new(ScannedFacetBuilder { id }));
        }
        Self { builders }
    }
}

impl FacetRegistry {
    /// Build every facet the catalog type's profile enables, in profile
    /// priority order. A facet's priority is its 1-based position in that
    /// order, kept stable even when earlier facets produce nothing.
    pub fn build_all(&self, catalog_type: CatalogType, cx: &BuildContext<'_>) -> Vec<Facet> {
        let profile = profiles::profile(catalog_type);
        let mut facets = Vec::new();
        for (index, id) in profile.priority.iter().enumerate() {
            if cx.variants.values_for(*id).is_empty() {
                continue;
            }
            let Some(builder) = self.builders.get(id) else {
                continue;
            };
            if let Some(mut facet) = builder.build(cx) {
                facet.priority = index + 1;
                facets.push(facet);
            }
        }
        facets
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn context_fixture() -> (
        Variants,
        BTreeMap<String, BTreeMap<String, i64>>,
        BTreeMap<String, i64>,
        BTreeMap<String, i64>,
        HashMap<String, i64>,
    ) {
        let variants = Variants {
            countries: vec!["Việt Nam".to_string(), "Đức".to_string()],
            brands: vec![
                "Abipha".to_string(),
                "DHG Pharma".to_string(),
                "Traphaco".to_string(),
            ],
            price_ranges: vec!["under_100k".to_string(), "100k_to_300k".to_string()],
            price_stats: None,
            target_audiences: vec!["trẻ em".to_string()],
            flavors: vec![],
            indications: vec![],
            skin_types: vec![],
            medicine_types: vec![],
            ingredients: vec![],
        };
        let mut value_counts = BTreeMap::new();
        value_counts.insert(
            "targetAudience".to_string(),
            BTreeMap::from([("trẻ em".to_string(), 4)]),
        );
        let brand_counts = BTreeMap::from([
            ("Abipha".to_string(), 3),
            ("DHG Pharma".to_string(), 3),
            ("Traphaco".to_string(), 9),
        ]);
        let country_counts = BTreeMap::from([("Việt Nam".to_string(), 12)]);
        let bucket_counts = HashMap::from([("under_100k".to_string(), 5)]);
        (variants, value_counts, brand_counts, country_counts, bucket_counts)
    }

    #[test]
    fn brand_options_sorted_by_count_then_name() {
        let (variants, value_counts, brand_counts, country_counts, bucket_counts) =
            context_fixture();
        let cx = BuildContext {
            variants: &variants,
            value_counts: &value_counts,
            brand_counts: &brand_counts,
            country_counts: &country_counts,
            bucket_counts: &bucket_counts,
        };
        let facet = BrandBuilder.build(&cx).unwrap();
        let order: Vec<&str> = facet.options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(order, vec!["Traphaco", "Abipha", "DHG Pharma"]);
        assert!(!facet.show_more);
    }

    #[test]
    fn price_options_keep_ladder_order_and_zero_fill() {
        let (variants, value_counts, brand_counts, country_counts, bucket_counts) =
            context_fixture();
        let cx = BuildContext {
            variants: &variants,
            value_counts: &value_counts,
            brand_counts: &brand_counts,
            country_counts: &country_counts,
            bucket_counts: &bucket_counts,
        };
        let facet = PriceRangeBuilder.build(&cx).unwrap();
        assert_eq!(facet.options.len(), 2);
        assert_eq!(facet.options[0].value, "under_100k");
        assert_eq!(facet.options[0].count, Some(5));
        assert_eq!(facet.options[1].count, Some(0));
        assert!(!facet.searchable);
        assert!(!facet.show_more);
    }

    #[test]
    fn registry_orders_and_numbers_by_profile_priority() {
        let (variants, value_counts, brand_counts, country_counts, bucket_counts) =
            context_fixture();
        let cx = BuildContext {
            variants: &variants,
            value_counts: &value_counts,
            brand_counts: &brand_counts,
            country_counts: &country_counts,
            bucket_counts: &bucket_counts,
        };
        let registry = FacetRegistry::default();
        let facets = registry.build_all(CatalogType::Supplements, &cx);

        let ids: Vec<FacetId> = facets.iter().map(|f| f.id).collect();
        assert_eq!(
            ids,
            vec![
                FacetId::PriceRange,
                FacetId::Brand,
                FacetId::Country,
                FacetId::TargetAudience,
            ]
        );
        // Supplements priority: priceRange, brand, country, targetAudience,
        // flavor, indication. Absent facets keep later ones' numbers stable.
        let priorities: Vec<usize> = facets.iter().map(|f| f.priority).collect();
        assert_eq!(priorities, vec![1, 2, 3, 4]);
    }

    #[test]
    fn empty_variants_build_nothing() {
        let variants = Variants::default();
        let value_counts = BTreeMap::new();
        let brand_counts = BTreeMap::new();
        let country_counts = BTreeMap::new();
        let bucket_counts = HashMap::new();
        let cx = BuildContext {
            variants: &variants,
            value_counts: &value_counts,
            brand_counts: &brand_counts,
            country_counts: &country_counts,
            bucket_counts: &bucket_counts,
        };
        let registry = FacetRegistry::default();
        assert!(registry.build_all(CatalogType::Default, &cx).is_empty());
    }
}
