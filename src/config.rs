//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result};

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Redis connection URL.
    pub redis_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// TTL for cached filter results in seconds (default: 3600).
    pub cache_ttl_secs: u64,

    /// Categories with more in-scope products than this skip facet
    /// extraction entirely (default: 1000).
    pub large_category_threshold: i64,

    /// Exact median is computed when the non-zero-priced scope is at most
    /// this large; bigger scopes approximate the median by the average
    /// (default: 1000).
    pub exact_median_threshold: i64,

    /// Page size for the cursor scan over in-scope products (default: 500).
    pub scan_chunk_size: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let cache_ttl_secs = env::var("FILTER_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .context("FILTER_CACHE_TTL_SECS must be a valid u64")?;

        let large_category_threshold = env::var("LARGE_CATEGORY_THRESHOLD")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .context("LARGE_CATEGORY_THRESHOLD must be a valid i64")?;

        let exact_median_threshold = env::var("EXACT_MEDIAN_THRESHOLD")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .context("EXACT_MEDIAN_THRESHOLD must be a valid i64")?;

        let scan_chunk_size = env::var("SCAN_CHUNK_SIZE")
            .unwrap_or_else(|_| "500".to_string())
            .parse()
            .context("SCAN_CHUNK_SIZE must be a valid i64")?;

        Ok(Self {
            database_url,
            redis_url,
            database_max_connections,
            cache_ttl_secs,
            large_category_threshold,
            exact_median_threshold,
            scan_chunk_size,
        })
    }
}

impl Default for Config {
    /// Local-development defaults. `DATABASE_URL` still has to be set for
    /// any real deployment; see [`Config::from_env`].
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/apoteca".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            database_max_connections: 10,
            cache_ttl_secs: 3600,
            large_category_threshold: 1000,
            exact_median_threshold: 1000,
            scan_chunk_size: 500,
        }
    }
}
