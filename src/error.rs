use thiserror::Error;

use crate::cache::CacheError;

/// Failures surfaced by the top-level map statistics operations.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("failed to fetch {url}: {reason}")]
    Transport { url: String, reason: String },
    #[error("failed to write map names csv: {0}")]
    Csv(#[from] csv::Error),
}
