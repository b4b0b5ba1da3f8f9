//! Wayfarer Acquisition Crate
//!
//! Resilient multi-source data acquisition for Wayfarer's destination
//! intelligence: research, currency, community, video, and news sources are
//! fetched through interchangeable third-party providers with limited quotas.
//!
//! # Overview
//!
//! The acquisition crate supports:
//! - A bounded in-memory cache with per-entry TTL and true LRU eviction
//! - Per-provider credit accounting for metered APIs
//! - Cache-first, credit-aware sequential fallback across providers
//! - Concurrent fan-out over independent sources with partial-failure tolerance
//!
//! # Architecture
//!
//! ```text
//!                     +------------------------+
//!      query -------> | AggregationCoordinator |  (fan-out, confidence)
//!                     +------------------------+
//!                        |                  |
//!                        v                  v
//!          +----------------------+   +--------------+
//!          | ProviderOrchestrator |   | fetch_cached |  (direct sources)
//!          +----------------------+   +--------------+
//!             |        |       |             |
//!             v        v       v             v
//!     +--------+  +--------+  +------------------+
//!     | Ledger |  |Provider|  |    CacheStore    |
//!     +--------+  +--------+  +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`CacheStore`] - Bounded TTL + LRU key/value store
//! - [`ProviderCreditLedger`] - Remaining/used/total calls per provider
//! - [`ProviderOrchestrator`] - Satisfies one fetch from interchangeable providers
//! - [`AggregationCoordinator`] - Runs independent source tasks concurrently
//! - [`FetchOutcome`] - Success or typed failure, for every fetch
//! - [`PartialResult`] - Per-source outcomes plus a confidence score

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod credits;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod provider;

pub use aggregate::{
    fetch_cached, AggregateStatus, AggregationCoordinator, PartialResult, SourceTask,
};
pub use cache::{CacheStats, CacheStore, Clock, ManualClock, SystemClock};
pub use config::AcquisitionConfig;
pub use credits::{CreditSnapshot, ProviderCredit, ProviderCreditLedger};
pub use errors::{AcquisitionError, FailureKind, ProviderError};
pub use models::{
    CacheKey, CacheNamespace, FetchOutcome, FetchRequest, OutputFormat, Provenance, ProviderId,
    CACHE_SOURCE,
};
pub use orchestrator::{
    AttemptStatus, CachedFetch, FetchDiagnostics, OrchestratorConfig, ProviderAttempt,
    ProviderOrchestrator, SkipReason,
};
pub use provider::{ContentProvider, HttpContentProvider, HttpProviderConfig, ProviderResponse};
