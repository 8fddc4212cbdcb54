//! Facet value extraction from product rows.
//!
//! Extraction runs in a single streaming pass: every in-scope product row is
//! observed exactly once and the accumulator carries distinct values plus
//! frequency counts for every text facet. The specification map wins over
//! free text; free text is only consulted when the map yields nothing.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use tracing::debug;

use crate::models::ProductFacetRow;

use super::profiles::{self, PatternDict};
use super::types::FacetId;

/// Values for a facet read from the specification map, probing alternate
/// key spellings in order. `split_list` additionally splits string values on
/// comma/semicolon, for list-valued facets stored as one string.
pub fn spec_values(row: &ProductFacetRow, keys: &[&str], split_list: bool) -> Vec<String> {
    let Value::Object(map) = &row.specifications else {
        if !row.specifications.is_null() {
            debug!(product_id = row.id, "non-object specification map skipped");
        }
        return Vec::new();
    };
    for key in keys {
        let Some(value) = map.get(*key) else {
            continue;
        };
        let raw: Vec<&str> = match value {
            Value::String(s) => vec![s.as_str()],
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            _ => continue,
        };
        let mut out = Vec::new();
        for piece in raw {
            if split_list {
                for part in piece.split([',', ';']) {
                    push_clean(&mut out, part);
                }
            } else {
                push_clean(&mut out, piece);
            }
        }
        if !out.is_empty() {
            return out;
        }
    }
    Vec::new()
}

fn push_clean(out: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() && !out.iter().any(|v| v == trimmed) {
        out.push(trimmed.to_string());
    }
}

/// Dictionary match against free-text fields. Fields are tried in order and
/// the first field with any match wins; matching is case-insensitive
/// substring search.
pub fn text_pattern_values(texts: &[Option<&str>], patterns: PatternDict) -> Vec<String> {
    for text in texts.iter().flatten() {
        let haystack = text.to_lowercase();
        let mut found = Vec::new();
        for (value, keywords) in patterns {
            if keywords.iter().any(|kw| haystack.contains(kw)) {
                found.push((*value).to_string());
            }
        }
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// Extract the values of one facet from a product row, combining the
/// specification-map probe and the free-text fallback per facet.
pub fn facet_values(id: FacetId, row: &ProductFacetRow) -> Vec<String> {
    let keys = profiles::specification_keys(id);
    let usage = row.usage.as_deref();
    let description = row.description.as_deref();
    match id {
        FacetId::TargetAudience => {
            let from_spec = spec_values(row, keys, false);
            if !from_spec.is_empty() {
                return from_spec;
            }
            text_pattern_values(&[usage], profiles::TARGET_AUDIENCE_PATTERNS)
        }
        FacetId::Flavor => spec_values(row, keys, false),
        FacetId::Indication => {
            text_pattern_values(&[usage, description], profiles::INDICATION_PATTERNS)
        }
        FacetId::SkinType => {
            let from_spec = spec_values(row, keys, false);
            if !from_spec.is_empty() {
                return from_spec;
            }
            text_pattern_values(&[description], profiles::SKIN_TYPE_PATTERNS)
        }
        FacetId::MedicineType => {
            text_pattern_values(&[usage, description], profiles::MEDICINE_TYPE_PATTERNS)
        }
        FacetId::Ingredients => {
            let from_spec = spec_values(row, keys, true);
            if !from_spec.is_empty() {
                return from_spec;
            }
            text_pattern_values(&[description], profiles::INGREDIENT_PATTERNS)
        }
        // Country, brand and price come from joins and aggregates, not from
        // the row scan.
        FacetId::Country | FacetId::Brand | FacetId::PriceRange => Vec::new(),
    }
}

/// Facets populated by the row scan, in accumulation order.
pub const SCANNED_FACETS: [FacetId; 6] = [
    FacetId::TargetAudience,
    FacetId::Flavor,
    FacetId::Indication,
    FacetId::SkinType,
    FacetId::MedicineType,
    FacetId::Ingredients,
];

/// Streaming accumulator for the extraction pass.
///
/// Distinct values and their occurrence counts per facet. Brand and country
/// counts come from the grouped store aggregation, not from this scan.
#[derive(Debug, Default)]
pub struct VariantAccumulator {
    counts: HashMap<FacetId, BTreeMap<String, i64>>,
}

impl VariantAccumulator {
    pub fn observe(&mut self, row: &ProductFacetRow) {
        for id in SCANNED_FACETS {
            for value in facet_values(id, row) {
                *self
                    .counts
                    .entry(id)
                    .or_default()
                    .entry(value)
                    .or_insert(0) += 1;
            }
        }
    }

    /// Distinct values for a facet, sorted.
    pub fn values(&self, id: FacetId) -> Vec<String> {
        self.counts
            .get(&id)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn counts(&self, id: FacetId) -> BTreeMap<String, i64> {
        self.counts.get(&id).cloned().unwrap_or_default()
    }

    /// All per-facet frequency maps, keyed by the facet's wire name.
    pub fn into_counts(self) -> BTreeMap<String, BTreeMap<String, i64>> {
        self.counts
            .into_iter()
            .map(|(id, m)| (id.as_str().to_string(), m))
            .collect()
    }
}
