//! Error types and failure classification for the acquisition crate.
//!
//! This module provides:
//! - [`ProviderError`]: what a single provider attempt can fail with
//! - [`FailureKind`]: the classification that drives fallback and credit policy
//! - [`AcquisitionError`]: errors surfaced by the crate's own APIs

mod kind;

pub use kind::FailureKind;

use thiserror::Error;

/// Errors returned by a content provider for a single attempt.
///
/// Each variant maps onto a [`FailureKind`] via [`kind`](Self::kind), which the
/// orchestrator uses to decide whether to charge, skip, or surface the failure.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The provider reported that its quota for the current period is spent.
    #[error("Quota exhausted: {provider}")]
    QuotaExhausted {
        /// The provider whose quota is gone
        provider: String,
    },

    /// The provider rejected our credentials.
    #[error("Authentication failed: {provider} - {message}")]
    Auth {
        /// The provider that rejected the request
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// A transport-level failure or an unexpected upstream status.
    #[error("Network error: {provider} - {message}")]
    Network {
        /// The provider being called
        provider: String,
        /// Description of the failure
        message: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The provider can't serve this target or output format.
    #[error("Unsupported: {provider} - {message}")]
    Unsupported {
        /// The provider that declined the request
        provider: String,
        /// Why the request was declined
        message: String,
    },

    /// The provider answered successfully but with nothing usable.
    #[error("Empty result: {provider}")]
    EmptyResult {
        /// The provider that returned nothing
        provider: String,
    },

    /// The response body could not be decoded.
    #[error("Invalid response: {provider} - {message}")]
    InvalidResponse {
        /// The provider that sent the body
        provider: String,
        /// The decoding error
        message: String,
    },
}

impl ProviderError {
    /// Returns the failure classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use wayfarer_acquisition::errors::{FailureKind, ProviderError};
    ///
    /// let error = ProviderError::RateLimited { provider: "firecrawl".to_string() };
    /// assert_eq!(error.kind(), FailureKind::RateLimited);
    /// assert!(!error.kind().consumes_quota());
    /// ```
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::QuotaExhausted { .. } => FailureKind::QuotaExhausted,
            Self::Auth { .. } => FailureKind::AuthError,
            Self::Network { .. } => FailureKind::NetworkError,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Unsupported { .. } => FailureKind::UnsupportedProvider,
            Self::EmptyResult { .. } => FailureKind::EmptyResult,
            Self::InvalidResponse { .. } => FailureKind::InvalidResponse,
        }
    }

    /// The provider the error came from.
    pub fn provider(&self) -> &str {
        match self {
            Self::RateLimited { provider }
            | Self::QuotaExhausted { provider }
            | Self::Auth { provider, .. }
            | Self::Network { provider, .. }
            | Self::Timeout { provider }
            | Self::Unsupported { provider, .. }
            | Self::EmptyResult { provider }
            | Self::InvalidResponse { provider, .. } => provider,
        }
    }
}

/// Errors surfaced by the acquisition layer's own APIs.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// Every source in an aggregation failed.
    #[error("All {total} sources failed: {}", missing.join(", "))]
    AllSourcesFailed {
        /// Number of sources that were requested
        total: usize,
        /// Names of the failed sources
        missing: Vec<String>,
    },

    /// A configuration value could not be parsed.
    #[error("Invalid configuration for {key}: {message}")]
    Config {
        /// The offending setting
        key: String,
        /// What was wrong with it
        message: String,
    },
}
