//! Storage for the flood hazard pipeline.
//!
//! Provides:
//! - [`ResponseCache`]: an on-disk HTTP response cache with an LRU memory
//!   front, TTL expiry and stale-if-error fallback
//! - [`RunCache`]: an explicit cache of fetched source data scoped to one run
//!   (or one backtest), keyed by source identifier and request date

pub mod error;
pub mod response_cache;
pub mod run_cache;

pub use error::{Result, StorageError};
pub use response_cache::{CacheKey, CacheStats, ResponseCache, DEFAULT_TTL};
pub use run_cache::{RunCache, RunCacheKey};
