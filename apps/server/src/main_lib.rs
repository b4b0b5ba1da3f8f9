use std::sync::Arc;

use crate::config::Config;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use wayfarer_acquisition::{
    AcquisitionConfig, AggregationCoordinator, CacheStore, CachedFetch, ContentProvider,
    HttpContentProvider, ProviderCreditLedger, ProviderOrchestrator,
};

pub struct AppState {
    pub cache: Arc<CacheStore<CachedFetch>>,
    pub ledger: Arc<ProviderCreditLedger>,
    pub orchestrator: Arc<ProviderOrchestrator>,
    pub coordinator: AggregationCoordinator,
    pub acquisition: AcquisitionConfig,
}

pub fn init_tracing() {
    let log_format = std::env::var("WAYFARER_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let acquisition = config.acquisition.clone();

    // One cache and one ledger per process, shared by every consumer.
    let cache = acquisition.build_cache();
    let ledger = acquisition.build_ledger();

    let providers: Vec<Arc<dyn ContentProvider>> = config
        .providers
        .iter()
        .cloned()
        .map(|provider| Arc::new(HttpContentProvider::new(provider)) as Arc<dyn ContentProvider>)
        .collect();
    tracing::info!(
        "Registered {} content providers: [{}]",
        providers.len(),
        providers
            .iter()
            .map(|p| p.id())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let orchestrator = Arc::new(ProviderOrchestrator::new(
        providers,
        cache.clone(),
        ledger.clone(),
        acquisition.orchestrator_config(),
    ));
    let coordinator = acquisition.build_coordinator();

    tracing::info!(
        "Cache capacity {} entries, default TTL {}s",
        cache.capacity(),
        cache.default_ttl().as_secs()
    );

    Ok(Arc::new(AppState {
        cache,
        ledger,
        orchestrator,
        coordinator,
        acquisition,
    }))
}
