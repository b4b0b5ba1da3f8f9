//! Content provider abstractions and implementations.
//!
//! This module contains:
//! - The `ContentProvider` trait every interchangeable provider implements
//! - `HttpContentProvider`, a reqwest-backed implementation for hosted scraping APIs
//!
//! Providers don't know about credits, caching, or each other. Ordering,
//! fallback, and accounting live in the orchestrator.

mod http;
mod traits;

pub use http::{classify_status, HttpContentProvider, HttpProviderConfig};
pub use traits::{ContentProvider, ProviderResponse};
