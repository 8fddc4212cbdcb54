//! Engine error types.

use thiserror::Error;

/// Errors surfaced by the filter service.
///
/// A missing category is a normal negative result for callers serving HTTP
/// (map it to a 404); everything else means the request failed and nothing
/// was cached.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("category not found: {0}")]
    CategoryNotFound(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Result type alias using EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
