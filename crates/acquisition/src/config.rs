//! Configuration consumed by the acquisition layer.
//!
//! Loading it (env, file) is the host process's job; this module only holds
//! the values, their defaults, and parsers for the compact `id=value,...`
//! list syntax used in environment variables.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregationCoordinator, DEFAULT_TASK_TIMEOUT};
use crate::cache::CacheStore;
use crate::credits::ProviderCreditLedger;
use crate::errors::AcquisitionError;
use crate::models::CacheNamespace;
use crate::orchestrator::{CachedFetch, OrchestratorConfig};

const HOUR: u64 = 60 * 60;

/// Acquisition layer settings. Durations are in seconds.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AcquisitionConfig {
    /// Maximum number of cache entries
    pub cache_capacity: usize,

    /// TTL for namespaces without an override
    pub default_ttl_secs: u64,

    /// Per-namespace TTL overrides
    pub namespace_ttl_secs: HashMap<CacheNamespace, u64>,

    /// Default provider attempt order
    pub provider_order: Vec<String>,

    /// Total calls per period, per provider
    pub credits: HashMap<String, u32>,

    /// Per-provider attempt timeouts
    pub provider_timeout_secs: HashMap<String, u64>,

    pub default_provider_timeout_secs: u64,

    /// Per-source timeout inside an aggregation. `None` or `0` leaves
    /// tasks unbounded.
    pub task_timeout_secs: Option<u64>,

    /// How often expired cache entries are swept
    pub cleanup_interval_secs: u64,

    /// How often credit budgets roll over
    pub credit_reset_interval_secs: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        let namespace_ttl_secs = HashMap::from([
            (CacheNamespace::Research, 24 * HOUR),
            (CacheNamespace::Currency, HOUR),
            (CacheNamespace::Community, 6 * HOUR),
            (CacheNamespace::Video, 24 * HOUR),
            (CacheNamespace::News, HOUR / 2),
            (CacheNamespace::Scrape, 24 * HOUR),
        ]);

        Self {
            cache_capacity: 1000,
            default_ttl_secs: HOUR,
            namespace_ttl_secs,
            provider_order: Vec::new(),
            credits: HashMap::new(),
            provider_timeout_secs: HashMap::new(),
            default_provider_timeout_secs: 30,
            task_timeout_secs: Some(DEFAULT_TASK_TIMEOUT.as_secs()),
            cleanup_interval_secs: HOUR,
            credit_reset_interval_secs: 24 * HOUR,
        }
    }
}

impl AcquisitionConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// TTL for entries in a namespace, falling back to the default TTL.
    pub fn ttl_for(&self, namespace: CacheNamespace) -> Duration {
        self.namespace_ttl_secs
            .get(&namespace)
            .map(|secs| Duration::from_secs(*secs))
            .unwrap_or_else(|| self.default_ttl())
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn credit_reset_interval(&self) -> Duration {
        Duration::from_secs(self.credit_reset_interval_secs)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            provider_order: self.provider_order.clone(),
            cache_ttl: self.ttl_for(CacheNamespace::Scrape),
            default_timeout: Duration::from_secs(self.default_provider_timeout_secs),
            timeouts: self
                .provider_timeout_secs
                .iter()
                .map(|(id, secs)| (id.clone(), Duration::from_secs(*secs)))
                .collect(),
        }
    }

    pub fn build_cache(&self) -> Arc<CacheStore<CachedFetch>> {
        Arc::new(CacheStore::new(self.cache_capacity, self.default_ttl()))
    }

    pub fn build_ledger(&self) -> Arc<ProviderCreditLedger> {
        Arc::new(ProviderCreditLedger::with_budgets(
            self.credits.iter().map(|(id, total)| (id.clone(), *total)),
        ))
    }

    pub fn build_coordinator(&self) -> AggregationCoordinator {
        match self.task_timeout_secs {
            Some(secs) if secs > 0 => {
                AggregationCoordinator::with_task_timeout(Duration::from_secs(secs))
            }
            _ => AggregationCoordinator::unbounded(),
        }
    }
}

/// Split a comma-separated list, dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse `id=value,id=value` pairs.
///
/// # Examples
///
/// ```
/// use wayfarer_acquisition::config::parse_assignments;
///
/// let credits = parse_assignments::<u32>("WAYFARER_PROVIDER_CREDITS", "firecrawl=500, jina=1000").unwrap();
/// assert_eq!(credits["firecrawl"], 500);
/// assert_eq!(credits["jina"], 1000);
/// ```
pub fn parse_assignments<T>(key: &str, raw: &str) -> Result<HashMap<String, T>, AcquisitionError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let mut parsed = HashMap::new();
    for pair in parse_list(raw) {
        let (id, value) = pair.split_once('=').ok_or_else(|| AcquisitionError::Config {
            key: key.to_string(),
            message: format!("expected id=value, got '{}'", pair),
        })?;

        let id = id.trim();
        if id.is_empty() {
            return Err(AcquisitionError::Config {
                key: key.to_string(),
                message: format!("missing id in '{}'", pair),
            });
        }

        let value = value.trim().parse::<T>().map_err(|e| AcquisitionError::Config {
            key: key.to_string(),
            message: format!("bad value for '{}': {}", id, e),
        })?;
        parsed.insert(id.to_string(), value);
    }
    Ok(parsed)
}

/// Parse `namespace=secs` TTL overrides.
pub fn parse_namespace_ttls(
    key: &str,
    raw: &str,
) -> Result<HashMap<CacheNamespace, u64>, AcquisitionError> {
    parse_assignments::<u64>(key, raw)?
        .into_iter()
        .map(|(name, secs)| {
            CacheNamespace::parse(&name)
                .map(|ns| (ns, secs))
                .ok_or_else(|| AcquisitionError::Config {
                    key: key.to_string(),
                    message: format!("unknown cache namespace '{}'", name),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_ttl_falls_back_to_default() {
        let mut config = AcquisitionConfig::default();
        assert_eq!(config.ttl_for(CacheNamespace::Currency), Duration::from_secs(HOUR));

        config.namespace_ttl_secs.remove(&CacheNamespace::Video);
        config.default_ttl_secs = 120;
        assert_eq!(config.ttl_for(CacheNamespace::Video), Duration::from_secs(120));
    }

    #[test]
    fn test_orchestrator_config() {
        let config = AcquisitionConfig {
            provider_order: vec!["firecrawl".to_string(), "jina".to_string()],
            provider_timeout_secs: HashMap::from([("jina".to_string(), 10)]),
            ..AcquisitionConfig::default()
        };

        let orchestrator = config.orchestrator_config();
        assert_eq!(orchestrator.provider_order, vec!["firecrawl", "jina"]);
        assert_eq!(orchestrator.timeouts["jina"], Duration::from_secs(10));
        assert_eq!(orchestrator.default_timeout, Duration::from_secs(30));
        assert_eq!(orchestrator.cache_ttl, Duration::from_secs(24 * HOUR));
    }

    #[test]
    fn test_build_ledger_uses_credits() {
        let config = AcquisitionConfig {
            credits: HashMap::from([("firecrawl".to_string(), 500)]),
            ..AcquisitionConfig::default()
        };
        let ledger = config.build_ledger();
        assert_eq!(ledger.remaining(&"firecrawl".into()), 500);
        assert_eq!(ledger.remaining(&"jina".into()), 0);
    }

    #[test]
    fn test_default_coordinator_bounds_tasks() {
        let coordinator = AcquisitionConfig::default().build_coordinator();
        assert_eq!(coordinator.task_timeout(), Some(DEFAULT_TASK_TIMEOUT));

        let unbounded = AcquisitionConfig {
            task_timeout_secs: Some(0),
            ..AcquisitionConfig::default()
        };
        assert_eq!(unbounded.build_coordinator().task_timeout(), None);
    }

    #[test]
    fn test_parse_assignments_rejects_garbage() {
        assert!(parse_assignments::<u32>("K", "firecrawl").is_err());
        assert!(parse_assignments::<u32>("K", "=5").is_err());
        assert!(parse_assignments::<u32>("K", "firecrawl=lots").is_err());
        assert!(parse_assignments::<u32>("K", "").map(|m| m.is_empty()).unwrap_or(false));
    }

    #[test]
    fn test_parse_namespace_ttls() {
        let ttls = parse_namespace_ttls("K", "News=600,currency=3600").unwrap();
        assert_eq!(ttls[&CacheNamespace::News], 600);
        assert_eq!(ttls[&CacheNamespace::Currency], 3600);
        assert!(parse_namespace_ttls("K", "weather=60").is_err());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: AcquisitionConfig = serde_json::from_str(
            r#"{ "cacheCapacity": 50, "namespaceTtlSecs": { "news": 300 }, "credits": { "jina": 10 } }"#,
        )
        .unwrap();
        assert_eq!(config.cache_capacity, 50);
        assert_eq!(config.ttl_for(CacheNamespace::News), Duration::from_secs(300));
        assert_eq!(config.credits["jina"], 10);
        assert_eq!(config.default_provider_timeout_secs, 30);
    }
}
