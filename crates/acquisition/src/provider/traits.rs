//! Content provider trait definitions.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ProviderError;
use crate::models::{FetchRequest, OutputFormat};

/// A successful provider answer.
#[derive(Clone, Debug)]
pub struct ProviderResponse {
    /// The fetched content
    pub payload: Value,

    /// Credits the call consumed, as declared by the provider (normally 1)
    pub cost: u32,
}

impl ProviderResponse {
    pub fn new(payload: Value) -> Self {
        Self { payload, cost: 1 }
    }

    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }
}

/// Trait for interchangeable content providers.
///
/// Implement this trait to add a new scraping/content service. The
/// orchestrator decides when a provider is called; the provider only performs
/// the call and classifies what went wrong.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use wayfarer_acquisition::provider::{ContentProvider, ProviderResponse};
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl ContentProvider for MyProvider {
///     fn id(&self) -> &str {
///         "my_provider"
///     }
///
///     async fn fetch(&self, request: &FetchRequest) -> Result<ProviderResponse, ProviderError> {
///         // ... call the service
///     }
/// }
/// ```
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Used for credit accounting, priority configuration, and logging.
    fn id(&self) -> &str;

    /// Whether the provider can produce the requested output shape.
    ///
    /// Providers that can't are skipped without being charged.
    fn supports(&self, format: OutputFormat) -> bool {
        let _ = format;
        true
    }

    /// Fetch the request's target in the requested format.
    ///
    /// Rate limiting must be reported as [`ProviderError::RateLimited`] so the
    /// attempt is not charged.
    async fn fetch(&self, request: &FetchRequest) -> Result<ProviderResponse, ProviderError>;
}
