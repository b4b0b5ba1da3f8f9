//! Credit-aware provider orchestration with cache-first short-circuiting.
//!
//! For one logical fetch the orchestrator:
//! - Serves a live cache entry without touching any provider or credit
//! - Orders providers: preferred first (if it has credit), then the configured default order
//! - Attempts them strictly one at a time, charging the ledger per attempt
//! - Falls back on failure and reports a typed outcome when everything fails

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{FetchDiagnostics, SkipReason};
use crate::cache::CacheStore;
use crate::credits::ProviderCreditLedger;
use crate::errors::{FailureKind, ProviderError};
use crate::models::{is_empty_payload, FetchOutcome, FetchRequest, ProviderId, Provenance};
use crate::provider::ContentProvider;

/// Default TTL for fetched content: 24 hours.
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default per-attempt timeout.
const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// What the orchestrator stores in the cache for a request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CachedFetch {
    pub data: Value,
    pub provider: String,
    pub fetched_at: DateTime<Utc>,
    /// Negative cache entry: every provider came back empty.
    pub empty: bool,
}

/// Orchestrator configuration.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Default attempt order by provider id. Unlisted providers follow in
    /// registration order.
    pub provider_order: Vec<String>,

    /// TTL for cached results unless the request overrides it.
    pub cache_ttl: Duration,

    /// Timeout for providers without an entry in `timeouts`.
    pub default_timeout: Duration,

    /// Per-provider attempt timeouts.
    pub timeouts: HashMap<String, Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            provider_order: Vec::new(),
            cache_ttl: DEFAULT_CACHE_TTL,
            default_timeout: DEFAULT_PROVIDER_TIMEOUT,
            timeouts: HashMap::new(),
        }
    }
}

/// Satisfies one logical fetch from a set of interchangeable providers.
pub struct ProviderOrchestrator {
    /// Sorted into the configured default order at construction.
    providers: Vec<Arc<dyn ContentProvider>>,
    cache: Arc<CacheStore<CachedFetch>>,
    ledger: Arc<ProviderCreditLedger>,
    config: OrchestratorConfig,
}

impl ProviderOrchestrator {
    /// Create an orchestrator over shared cache and ledger instances.
    ///
    /// # Arguments
    ///
    /// * `providers` - Interchangeable providers for this capability
    /// * `cache` - Process-wide cache for fetched content
    /// * `ledger` - Process-wide credit ledger
    /// * `config` - Default order, TTL, and timeouts
    pub fn new(
        providers: Vec<Arc<dyn ContentProvider>>,
        cache: Arc<CacheStore<CachedFetch>>,
        ledger: Arc<ProviderCreditLedger>,
        config: OrchestratorConfig,
    ) -> Self {
        let mut providers = providers;
        // Stable sort: ties keep registration order.
        providers.sort_by_key(|p| {
            config
                .provider_order
                .iter()
                .position(|id| id == p.id())
                .unwrap_or(usize::MAX)
        });

        for provider in &providers {
            let id: ProviderId = Cow::Owned(provider.id().to_string());
            if ledger.credit(&id).is_none() {
                warn!(
                    "Provider '{}' has no credit budget configured and will never be attempted",
                    id
                );
            }
        }

        Self {
            providers,
            cache,
            ledger,
            config,
        }
    }

    /// Fetch the request's target, returning a typed outcome. Never fails.
    pub async fn execute(&self, request: &FetchRequest) -> FetchOutcome {
        self.execute_with_diagnostics(request).await.0
    }

    /// Like [`execute`](Self::execute), also returning the attempt trail.
    pub async fn execute_with_diagnostics(
        &self,
        request: &FetchRequest,
    ) -> (FetchOutcome, FetchDiagnostics) {
        let key = request.cache_key();
        let mut diagnostics = FetchDiagnostics::new();

        if let Some(hit) = self.cache.get(&key) {
            debug!("Cache hit for '{}' (from '{}')", key, hit.provider);
            let outcome = if hit.empty {
                FetchOutcome::failure(
                    FailureKind::EmptyResult,
                    Some(Cow::Owned(hit.provider)),
                    false,
                )
            } else {
                FetchOutcome::from_cache(hit.data, hit.fetched_at, &key)
            };
            return (outcome, diagnostics);
        }

        let providers = self.ordered_providers(request, &mut diagnostics);

        if providers.is_empty() {
            let kind = if diagnostics
                .skip_reasons()
                .iter()
                .any(|(_, reason)| **reason == SkipReason::NoCredit)
            {
                FailureKind::QuotaExhausted
            } else {
                FailureKind::UnsupportedProvider
            };
            warn!(
                "No providers available for '{}'. Diagnostics: {}",
                request.target,
                diagnostics.summary()
            );
            return (FetchOutcome::failure(kind, None, false), diagnostics);
        }

        let mut last_failure: Option<(FailureKind, ProviderId)> = None;
        let mut any_transient = false;
        let mut empty_from: Option<ProviderId> = None;

        for provider in providers {
            let provider_id: ProviderId = Cow::Owned(provider.id().to_string());

            // Concurrent fetches may have spent the budget since ordering.
            if !self.ledger.can_afford(&provider_id, 1) {
                diagnostics.record_skip(provider_id.clone(), SkipReason::NoCredit);
                continue;
            }

            debug!("Fetching '{}' from provider '{}'", request.target, provider_id);

            let timeout = self.timeout_for(&provider_id);
            let result = match tokio::time::timeout(timeout, provider.fetch(request)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    provider: provider_id.to_string(),
                }),
            };

            let result = result.and_then(|response| {
                if is_empty_payload(&response.payload) {
                    Err(ProviderError::EmptyResult {
                        provider: provider_id.to_string(),
                    })
                } else {
                    Ok(response)
                }
            });

            match result {
                Ok(response) => {
                    let charged = self.charge_success(&provider_id, response.cost);
                    diagnostics.record_success(provider_id.clone(), charged);

                    let fetched_at = Utc::now();
                    let ttl = request.ttl.unwrap_or(self.config.cache_ttl);
                    self.cache.set_with_ttl(
                        key.clone(),
                        CachedFetch {
                            data: response.payload.clone(),
                            provider: provider_id.to_string(),
                            fetched_at,
                            empty: false,
                        },
                        ttl,
                    );

                    info!(
                        "Fetched '{}' from '{}'. Diagnostics: {}",
                        request.target,
                        provider_id,
                        diagnostics.summary()
                    );

                    let mut provenance = Provenance::fresh(fetched_at);
                    provenance.cache_key = Some(key);
                    provenance.attempts = diagnostics.attempts.clone();
                    let outcome = FetchOutcome::success(response.payload, provider_id, provenance);
                    return (outcome, diagnostics);
                }
                Err(e) => {
                    let kind = e.kind();
                    any_transient |= kind.is_transient();

                    match kind {
                        FailureKind::RateLimited => {
                            // Not charged: the call never consumed real quota.
                            diagnostics.record_rate_limited(provider_id.clone());
                            debug!("Provider '{}' rate limited, trying next provider", provider_id);
                        }
                        _ => {
                            let charged = if self.ledger.charge(&provider_id, 1) { 1 } else { 0 };

                            // Out of rotation until the next credit reset.
                            if kind.is_terminal_for_provider() {
                                self.ledger.exhaust(&provider_id);
                            }

                            match kind {
                                FailureKind::AuthError => error!(
                                    "Provider '{}' rejected credentials, disabled until reset: {}",
                                    provider_id, e
                                ),
                                FailureKind::QuotaExhausted => {
                                    warn!("Provider '{}' reports its quota is spent", provider_id)
                                }
                                FailureKind::EmptyResult => {
                                    empty_from = Some(provider_id.clone());
                                    debug!("Provider '{}' returned nothing", provider_id);
                                }
                                _ => debug!(
                                    "Provider '{}' failed with {:?}, trying next provider",
                                    provider_id, e
                                ),
                            }

                            diagnostics.record_failure(
                                provider_id.clone(),
                                kind,
                                e.to_string(),
                                charged,
                            );
                        }
                    }

                    last_failure = Some((kind, provider_id));
                }
            }
        }

        if request.cache_empty {
            if let Some(provider) = empty_from {
                let ttl = request.ttl.unwrap_or(self.config.cache_ttl);
                self.cache.set_with_ttl(
                    key.clone(),
                    CachedFetch {
                        data: Value::Null,
                        provider: provider.to_string(),
                        fetched_at: Utc::now(),
                        empty: true,
                    },
                    ttl,
                );
                debug!("Cached empty result for '{}'", key);
            }
        }

        warn!(
            "All providers failed for '{}' ({} credits charged). Diagnostics: {}",
            request.target,
            diagnostics.total_charged(),
            diagnostics.summary()
        );

        let outcome = match last_failure {
            Some((kind, provider)) => FetchOutcome::failure(kind, Some(provider), any_transient),
            None => FetchOutcome::failure(FailureKind::QuotaExhausted, None, false),
        };
        (outcome, diagnostics)
    }

    /// Providers eligible for this request, in attempt order.
    ///
    /// 1. Preferred provider first, if registered, capable, and affordable
    /// 2. Every other capable, affordable provider in the default order
    fn ordered_providers(
        &self,
        request: &FetchRequest,
        diagnostics: &mut FetchDiagnostics,
    ) -> Vec<&Arc<dyn ContentProvider>> {
        let mut ordered = Vec::with_capacity(self.providers.len());
        let preferred = request.preferred_provider.as_deref();

        if let Some(preferred) = preferred {
            match self.providers.iter().find(|p| p.id() == preferred) {
                Some(provider) => {
                    if self.is_eligible(provider, request, diagnostics) {
                        ordered.push(provider);
                    }
                }
                None => {
                    debug!("Preferred provider '{}' is not registered", preferred);
                    diagnostics.record_skip(preferred.to_string(), SkipReason::UnknownProvider);
                }
            }
        }

        for provider in &self.providers {
            if Some(provider.id()) == preferred {
                continue;
            }
            if self.is_eligible(provider, request, diagnostics) {
                ordered.push(provider);
            }
        }

        ordered
    }

    fn is_eligible(
        &self,
        provider: &Arc<dyn ContentProvider>,
        request: &FetchRequest,
        diagnostics: &mut FetchDiagnostics,
    ) -> bool {
        let provider_id: ProviderId = Cow::Owned(provider.id().to_string());

        if !provider.supports(request.format) {
            diagnostics.record_skip(provider_id, SkipReason::UnsupportedFormat);
            return false;
        }
        if !self.ledger.can_afford(&provider_id, 1) {
            diagnostics.record_skip(provider_id, SkipReason::NoCredit);
            return false;
        }
        true
    }

    /// Charge a successful call its declared cost, capped at what remains so
    /// the balance never goes negative. Returns the amount charged.
    fn charge_success(&self, provider: &ProviderId, cost: u32) -> u32 {
        let remaining = self.ledger.remaining(provider);
        let cost = if cost > remaining {
            warn!(
                "Provider '{}' declared cost {} with only {} remaining, charging {}",
                provider, cost, remaining, remaining
            );
            remaining
        } else {
            cost
        };

        if cost > 0 && self.ledger.charge(provider, cost) {
            cost
        } else {
            0
        }
    }

    fn timeout_for(&self, provider: &ProviderId) -> Duration {
        self.config
            .timeouts
            .get(provider.as_ref())
            .copied()
            .unwrap_or(self.config.default_timeout)
    }

    /// Registered provider ids in default order.
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    pub fn cache(&self) -> &Arc<CacheStore<CachedFetch>> {
        &self.cache
    }

    pub fn ledger(&self) -> &Arc<ProviderCreditLedger> {
        &self.ledger
    }
}
