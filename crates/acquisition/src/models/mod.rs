//! Acquisition models
//!
//! This module contains the data types shared across the layer:
//! - `types` - Type aliases for common identifiers (ProviderId)
//! - `key` - Namespaced, normalized cache keys (CacheKey, CacheNamespace)
//! - `request` - A single logical fetch (FetchRequest, OutputFormat)
//! - `outcome` - The typed result of any fetch (FetchOutcome, Provenance)

mod key;
mod outcome;
mod request;
mod types;

pub use key::{CacheKey, CacheNamespace};
pub use outcome::{is_empty_payload, FetchOutcome, Provenance};
pub use request::{FetchRequest, OutputFormat};
pub use types::{ProviderId, CACHE_SOURCE};
