use std::future::Future;
use std::time::Duration;

use log::debug;

use crate::cache::CacheStore;
use crate::models::{FetchOutcome, Provenance, CACHE_SOURCE};
use crate::orchestrator::CachedFetch;

/// Read-through cache for sources that cache directly instead of going
/// through the orchestrator (e.g. a free exchange-rate API).
///
/// A live entry is returned as a `"cache"` success without running `fetch`.
/// Otherwise `fetch` runs and a successful outcome is stored under `key` for
/// `ttl`, or the store's default TTL. Failures are never cached.
pub async fn fetch_cached<F>(
    cache: &CacheStore<CachedFetch>,
    key: &str,
    ttl: Option<Duration>,
    fetch: F,
) -> FetchOutcome
where
    F: Future<Output = FetchOutcome>,
{
    if let Some(hit) = cache.get(key) {
        if !hit.empty {
            debug!("Cache hit for '{}'", key);
            return FetchOutcome::from_cache(hit.data, hit.fetched_at, key);
        }
    }

    let outcome = fetch.await;

    if let FetchOutcome::Success {
        data,
        provenance,
        source,
    } = outcome
    {
        if source != CACHE_SOURCE {
            let ttl = ttl.unwrap_or_else(|| cache.default_ttl());
            cache.set_with_ttl(
                key,
                CachedFetch {
                    data: data.clone(),
                    provider: source.clone(),
                    fetched_at: provenance.fetched_at,
                    empty: false,
                },
                ttl,
            );
        }

        let provenance = Provenance {
            cache_key: Some(key.to_string()),
            ..provenance
        };
        return FetchOutcome::success(data, source, provenance);
    }

    outcome
}
