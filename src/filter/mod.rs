//! The dynamic filter engine.
//!
//! Facet configuration lives in [`profiles`], value extraction in
//! [`extract`], price bucketing in [`price`], facet assembly in [`builder`],
//! and orchestration plus caching in [`service`].

pub mod builder;
pub mod extract;
pub mod price;
pub mod profiles;
pub mod service;
pub mod types;

pub use service::FilterService;
pub use types::{
    CachedFilters, CatalogType, Facet, FacetId, FacetOption, FilterRequest, FilterResponse,
    PriceStats, SubcategorySummary, Variants,
};
