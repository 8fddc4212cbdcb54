//! Catalog data models: categories, products, brands.

pub mod brand;
pub mod category;
pub mod product;

pub use brand::Brand;
pub use category::{BreadcrumbCache, BreadcrumbEntry, Category, CategoryTree, slugify};
pub use product::{PriceAgg, Product, ProductFacetRow};
