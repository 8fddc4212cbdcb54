//! Brand model.

use serde::{Deserialize, Serialize};

/// A product brand. Country lives here, not on the product — brand country
/// is the only reliable source for the country facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Brand {
    pub id: i64,
    pub name: String,
    pub country: Option<String>,
    pub active: bool,
}
