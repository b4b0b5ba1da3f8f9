use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::key::{CacheKey, CacheNamespace};
use super::types::ProviderId;

/// Output shape requested from a content provider.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Html,
    Text,
    Json,
    Links,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Text => "text",
            Self::Json => "json",
            Self::Links => "links",
        }
    }
}

/// One logical fetch that any of the interchangeable providers can satisfy.
#[derive(Clone, Debug)]
pub struct FetchRequest {
    /// Target to fetch (usually a URL)
    pub target: String,

    /// Requested output shape
    pub format: OutputFormat,

    /// Provider to try first, if it still has credit
    pub preferred_provider: Option<ProviderId>,

    /// Overrides the orchestrator's TTL for this request
    pub ttl: Option<Duration>,

    /// Whether an empty answer is meaningful enough to cache
    pub cache_empty: bool,
}

impl FetchRequest {
    pub fn new(target: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            target: target.into(),
            format,
            preferred_provider: None,
            ttl: None,
            cache_empty: false,
        }
    }

    pub fn prefer(mut self, provider: impl Into<ProviderId>) -> Self {
        self.preferred_provider = Some(provider.into());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn cache_empty(mut self, cache_empty: bool) -> Self {
        self.cache_empty = cache_empty;
        self
    }

    /// Cache identity: target plus output shape. The preference hint is not
    /// part of it, since any provider's answer satisfies the same request.
    pub fn cache_key(&self) -> String {
        CacheKey::new(CacheNamespace::Scrape)
            .param(&self.target)
            .param(self.format.as_str())
            .build()
    }
}
