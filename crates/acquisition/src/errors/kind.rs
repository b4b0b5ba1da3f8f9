use serde::{Deserialize, Serialize};

/// Classification of a failed fetch.
///
/// The kind decides how the orchestrator treats the attempt that produced it.
///
/// # Behavior Summary
///
/// | Kind | Transient? | Charged? | Terminal for provider? |
/// |------|-----------|----------|------------------------|
/// | `RateLimited` | Yes | No | No (skipped for this call only) |
/// | `QuotaExhausted` | No | Yes | Yes, until the next credit reset |
/// | `AuthError` | No | Yes | Yes, until the next credit reset |
/// | `NetworkError` | Yes | Yes | No |
/// | `Timeout` | Yes | Yes | No |
/// | `UnsupportedProvider` | No | Yes | No |
/// | `EmptyResult` | No | Yes | No |
/// | `InvalidResponse` | No | Yes | No |
/// | `Internal` | No | No | n/a (source task level) |
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// The provider signalled rate limiting (HTTP 429).
    RateLimited,
    /// The provider's quota is spent, or no provider had credit left.
    QuotaExhausted,
    /// Credentials were rejected.
    AuthError,
    /// Transport failure or an unexpected upstream status.
    NetworkError,
    /// The attempt or the source task ran past its deadline.
    Timeout,
    /// The provider cannot serve this target or output format.
    UnsupportedProvider,
    /// The provider answered with nothing usable.
    EmptyResult,
    /// The provider answered with a body that could not be decoded.
    InvalidResponse,
    /// A source task panicked or was cancelled.
    Internal,
}

impl FailureKind {
    /// Whether trying again later (or elsewhere) may succeed.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::RateLimited | Self::NetworkError | Self::Timeout)
    }

    /// Whether the failed call still consumed provider quota.
    ///
    /// Rate limited calls are rejected before doing work, so they are free.
    pub fn consumes_quota(self) -> bool {
        !matches!(self, Self::RateLimited | Self::Internal)
    }

    /// Whether the provider should not be used again until something outside
    /// the layer changes (credentials, quota period).
    pub fn is_terminal_for_provider(self) -> bool {
        matches!(self, Self::QuotaExhausted | Self::AuthError)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RateLimited => "RateLimited",
            Self::QuotaExhausted => "QuotaExhausted",
            Self::AuthError => "AuthError",
            Self::NetworkError => "NetworkError",
            Self::Timeout => "Timeout",
            Self::UnsupportedProvider => "UnsupportedProvider",
            Self::EmptyResult => "EmptyResult",
            Self::InvalidResponse => "InvalidResponse",
            Self::Internal => "Internal",
        };
        f.write_str(name)
    }
}
