use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use wayfarer_acquisition::{
    fetch_cached, AcquisitionConfig, AggregateStatus, CacheKey, CacheNamespace, ContentProvider,
    FailureKind, FetchOutcome, FetchRequest, OutputFormat, ProviderError, ProviderOrchestrator,
    ProviderResponse, SourceTask, CACHE_SOURCE,
};

/// Provider that fails its first `failures` calls, then succeeds.
struct FlakyProvider {
    id: &'static str,
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyProvider {
    fn new(id: &'static str, failures: usize) -> Arc<Self> {
        Arc::new(Self {
            id,
            failures,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentProvider for FlakyProvider {
    fn id(&self) -> &str {
        self.id
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<ProviderResponse, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(ProviderError::Network {
                provider: self.id.to_string(),
                message: "connection reset".to_string(),
            });
        }
        Ok(ProviderResponse::new(json!({
            "markdown": format!("# {}", request.target),
        })))
    }
}

fn config() -> AcquisitionConfig {
    AcquisitionConfig {
        cache_capacity: 32,
        provider_order: vec!["firecrawl".to_string(), "jina".to_string()],
        credits: [("firecrawl".to_string(), 2), ("jina".to_string(), 10)]
            .into_iter()
            .collect(),
        task_timeout_secs: Some(5),
        ..AcquisitionConfig::default()
    }
}

#[tokio::test]
async fn aggregation_survives_failed_sources_and_reuses_cache() {
    let config = config();
    let cache = config.build_cache();
    let ledger = config.build_ledger();

    // firecrawl always fails; jina always works.
    let firecrawl = FlakyProvider::new("firecrawl", usize::MAX);
    let jina = FlakyProvider::new("jina", 0);
    let orchestrator = Arc::new(ProviderOrchestrator::new(
        vec![
            firecrawl.clone() as Arc<dyn ContentProvider>,
            jina.clone() as Arc<dyn ContentProvider>,
        ],
        cache.clone(),
        ledger.clone(),
        config.orchestrator_config(),
    ));
    let coordinator = config.build_coordinator();

    let rate_calls = Arc::new(AtomicUsize::new(0));
    let build_tasks = || {
        let scrape = orchestrator.clone();
        let currency_cache = cache.clone();
        let currency_calls = rate_calls.clone();
        let currency_ttl = config.ttl_for(CacheNamespace::Currency);

        vec![
            SourceTask::new("research", async move {
                scrape
                    .execute(&FetchRequest::new(
                        "https://visitlisbon.com",
                        OutputFormat::Markdown,
                    ))
                    .await
            }),
            SourceTask::new("currency", async move {
                let key = CacheKey::new(CacheNamespace::Currency)
                    .param("EUR")
                    .param("USD")
                    .build();
                fetch_cached(&currency_cache, &key, Some(currency_ttl), async {
                    currency_calls.fetch_add(1, Ordering::SeqCst);
                    FetchOutcome::success(
                        json!({ "rate": 1.08 }),
                        "exchangerate_host",
                        wayfarer_acquisition::Provenance::fresh(chrono::Utc::now()),
                    )
                })
                .await
            }),
            SourceTask::new("video", async { FetchOutcome::failed(FailureKind::QuotaExhausted) }),
        ]
    };

    let first = coordinator.aggregate(build_tasks()).await;
    assert_eq!(first.status, AggregateStatus::Partial);
    assert_eq!(first.succeeded(), vec!["currency", "research"]);
    assert_eq!(first.missing(), vec!["video"]);
    assert_eq!(first.outcome("research").and_then(FetchOutcome::source), Some("jina"));
    assert_eq!(firecrawl.calls(), 1);
    assert_eq!(ledger.remaining(&Cow::Borrowed("firecrawl")), 1);
    assert_eq!(ledger.remaining(&Cow::Borrowed("jina")), 9);

    let second = coordinator.aggregate(build_tasks()).await;
    assert_eq!(second.outcome("research").and_then(FetchOutcome::source), Some(CACHE_SOURCE));
    assert_eq!(second.outcome("currency").and_then(FetchOutcome::source), Some(CACHE_SOURCE));
    assert_eq!(firecrawl.calls(), 1);
    assert_eq!(jina.calls(), 1);
    assert_eq!(rate_calls.load(Ordering::SeqCst), 1);
    assert_eq!(ledger.remaining(&Cow::Borrowed("jina")), 9);
    assert!((second.confidence - 2.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn exhausted_budgets_fail_without_calls_until_reset() {
    let config = AcquisitionConfig {
        credits: [("firecrawl".to_string(), 1)].into_iter().collect(),
        ..config()
    };
    let cache = config.build_cache();
    let ledger = config.build_ledger();
    let firecrawl = FlakyProvider::new("firecrawl", 1);
    let orchestrator = ProviderOrchestrator::new(
        vec![
            firecrawl.clone() as Arc<dyn ContentProvider>,
            FlakyProvider::new("jina", 0) as Arc<dyn ContentProvider>,
        ],
        cache,
        ledger.clone(),
        config.orchestrator_config(),
    );
    let request = FetchRequest::new("https://visitporto.travel", OutputFormat::Markdown);

    // The only budgeted provider burns its single credit on a failure.
    let first = orchestrator.execute(&request).await;
    assert_eq!(first.failure_kind(), Some(FailureKind::NetworkError));
    assert!(first.is_retryable());

    let second = orchestrator.execute(&request).await;
    assert_eq!(second.failure_kind(), Some(FailureKind::QuotaExhausted));
    assert!(!second.is_retryable());
    assert_eq!(firecrawl.calls(), 1);

    ledger.reset_all();
    let third = orchestrator.execute(&request).await;
    assert_eq!(third.source(), Some("firecrawl"));
}

#[tokio::test(start_paused = true)]
async fn slow_source_does_not_hold_up_the_rest() {
    let coordinator = config().build_coordinator();

    let result = coordinator
        .aggregate(vec![
            SourceTask::new("news", async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                FetchOutcome::failed(FailureKind::NetworkError)
            }),
            SourceTask::new("community", async {
                FetchOutcome::success(
                    json!(["r/portugal"]),
                    "reddit",
                    wayfarer_acquisition::Provenance::fresh(chrono::Utc::now()),
                )
            }),
        ])
        .await;

    assert_eq!(result.succeeded(), vec!["community"]);
    assert_eq!(
        result.outcome("news").and_then(FetchOutcome::failure_kind),
        Some(FailureKind::Timeout)
    );
}
