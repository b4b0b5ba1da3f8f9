//! Provider orchestration.
//!
//! The orchestrator is the only component that calls content providers. It
//! consults the cache first, then walks eligible providers one at a time,
//! charging the credit ledger for every attempt that reaches a provider.

mod diagnostics;
#[allow(clippy::module_inception)]
mod orchestrator;

pub use diagnostics::{AttemptStatus, FetchDiagnostics, ProviderAttempt, SkipReason};
pub use orchestrator::{CachedFetch, OrchestratorConfig, ProviderOrchestrator};
