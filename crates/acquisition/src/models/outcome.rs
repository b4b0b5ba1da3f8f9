use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{ProviderId, CACHE_SOURCE};
use crate::errors::{FailureKind, ProviderError};
use crate::orchestrator::ProviderAttempt;

/// Where a successful result came from and how it was obtained.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    /// When the data was originally fetched from a provider
    pub fetched_at: DateTime<Utc>,

    /// Whether this outcome was served from the cache
    pub from_cache: bool,

    /// Cache key the data lives under, if it was cached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,

    /// Provider attempts made while producing this outcome
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<ProviderAttempt>,
}

impl Provenance {
    pub fn fresh(fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetched_at,
            from_cache: false,
            cache_key: None,
            attempts: Vec::new(),
        }
    }

    pub fn cached(fetched_at: DateTime<Utc>, cache_key: impl Into<String>) -> Self {
        Self {
            fetched_at,
            from_cache: true,
            cache_key: Some(cache_key.into()),
            attempts: Vec::new(),
        }
    }
}

/// Typed result of any fetch in the layer.
///
/// Failures are data, never errors: every source and every orchestrated
/// fetch ends in one of these two variants.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FetchOutcome {
    #[serde(rename_all = "camelCase")]
    Success {
        data: Value,
        provenance: Provenance,
        /// Provider name, or `"cache"` for cache hits
        source: String,
    },
    #[serde(rename_all = "camelCase")]
    Failure {
        kind: FailureKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        provider: Option<ProviderId>,
        retryable: bool,
    },
}

impl FetchOutcome {
    pub fn success(data: Value, source: impl Into<String>, provenance: Provenance) -> Self {
        Self::Success {
            data,
            provenance,
            source: source.into(),
        }
    }

    pub fn from_cache(data: Value, fetched_at: DateTime<Utc>, cache_key: &str) -> Self {
        Self::success(data, CACHE_SOURCE, Provenance::cached(fetched_at, cache_key))
    }

    pub fn failure(kind: FailureKind, provider: Option<ProviderId>, retryable: bool) -> Self {
        Self::Failure {
            kind,
            provider,
            retryable,
        }
    }

    /// Failure whose retryability follows the kind's own classification.
    pub fn failed(kind: FailureKind) -> Self {
        Self::failure(kind, None, kind.is_transient())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Success { data, .. } => Some(data),
            Self::Failure { .. } => None,
        }
    }

    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Success { source, .. } => Some(source),
            Self::Failure { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failure { retryable: true, .. })
    }
}

impl From<ProviderError> for FetchOutcome {
    fn from(error: ProviderError) -> Self {
        let kind = error.kind();
        Self::failure(
            kind,
            Some(ProviderId::Owned(error.provider().to_string())),
            kind.is_transient(),
        )
    }
}

/// Whether a payload carries nothing usable: null, blank text, or an empty
/// array/object.
pub fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_payload_detection() {
        assert!(is_empty_payload(&Value::Null));
        assert!(is_empty_payload(&json!("   ")));
        assert!(is_empty_payload(&json!([])));
        assert!(is_empty_payload(&json!({})));
        assert!(!is_empty_payload(&json!("# Lisbon")));
        assert!(!is_empty_payload(&json!(0)));
        assert!(!is_empty_payload(&json!({ "markdown": "" })));
    }

    #[test]
    fn test_cache_outcome_is_tagged_cache() {
        let outcome =
            FetchOutcome::from_cache(json!({"rate": 1.08}), Utc::now(), "currency:eur:usd");
        assert_eq!(outcome.source(), Some(CACHE_SOURCE));
        match outcome {
            FetchOutcome::Success { provenance, .. } => {
                assert!(provenance.from_cache);
                assert_eq!(provenance.cache_key.as_deref(), Some("currency:eur:usd"));
            }
            FetchOutcome::Failure { .. } => panic!("expected success"),
        }
    }

    #[test]
    fn test_provider_error_conversion() {
        let outcome: FetchOutcome = ProviderError::Timeout {
            provider: "firecrawl".to_string(),
        }
        .into();
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Timeout));
        assert!(outcome.is_retryable());
        match outcome {
            FetchOutcome::Failure { provider, .. } => {
                assert_eq!(provider.as_deref(), Some("firecrawl"))
            }
            FetchOutcome::Success { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn test_outcome_serialization_shape() {
        let outcome = FetchOutcome::failed(FailureKind::AuthError);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "failure");
        assert_eq!(value["kind"], "AuthError");
        assert_eq!(value["retryable"], false);
        assert!(value.get("provider").is_none());
    }
}
