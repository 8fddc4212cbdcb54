//! Apoteca — category-aware dynamic filter engine for a pharmacy storefront.
//!
//! Given a node in the product category tree, the engine assembles the full
//! in-scope product set (descendants included), derives the distinct facet
//! values present in that set (brand, country, price bucket, target audience,
//! flavor, indication, ...), counts occurrences per value, and builds a
//! category-type-specific ordered facet list. Categories above a configured
//! product count skip extraction entirely (hard latency guard), and finished
//! results are cached with a fixed TTL.
//!
//! The persistence layer is abstracted behind [`store::CatalogStore`]; the
//! cache behind [`cache::FilterCache`]. Production wiring uses PostgreSQL and
//! a two-tier Moka/Redis cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod store;
