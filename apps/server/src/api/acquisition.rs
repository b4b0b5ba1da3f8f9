use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use wayfarer_acquisition::{
    CacheStats, CreditSnapshot, FetchOutcome, FetchRequest, OutputFormat, PartialResult,
    ProviderId, SourceTask,
};

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FetchBody {
    target: String,
    #[serde(default)]
    format: OutputFormat,
    preferred_provider: Option<String>,
    #[serde(default)]
    cache_empty: bool,
    ttl_secs: Option<u64>,
}

impl FetchBody {
    fn into_request(self) -> ApiResult<FetchRequest> {
        let target = self.target.trim();
        if target.is_empty() {
            return Err(ApiError::BadRequest("target must not be empty".to_string()));
        }

        let mut request = FetchRequest::new(target, self.format).cache_empty(self.cache_empty);
        if let Some(provider) = self.preferred_provider.filter(|p| !p.trim().is_empty()) {
            request = request.prefer(provider);
        }
        if let Some(secs) = self.ttl_secs {
            request = request.with_ttl(Duration::from_secs(secs));
        }
        Ok(request)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceBody {
    name: String,
    #[serde(flatten)]
    fetch: FetchBody,
}

#[derive(Debug, Deserialize)]
struct AggregateBody {
    sources: Vec<SourceBody>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    cache: CacheStats,
    credits: Vec<CreditSnapshot>,
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        cache: state.cache.stats(),
        credits: state.ledger.snapshot(),
    })
}

async fn fetch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FetchBody>,
) -> ApiResult<Json<FetchOutcome>> {
    let request = body.into_request()?;
    Ok(Json(state.orchestrator.execute(&request).await))
}

/// Fetch several targets concurrently. Responds 502 only when every source failed.
async fn aggregate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AggregateBody>,
) -> ApiResult<Json<PartialResult>> {
    let mut names = HashSet::new();
    let mut tasks = Vec::with_capacity(body.sources.len());

    for source in body.sources {
        if !names.insert(source.name.clone()) {
            return Err(ApiError::BadRequest(format!(
                "duplicate source name '{}'",
                source.name
            )));
        }
        let request = source.fetch.into_request()?;
        let orchestrator = state.orchestrator.clone();
        tasks.push(SourceTask::new(source.name, async move {
            orchestrator.execute(&request).await
        }));
    }

    if tasks.is_empty() {
        return Err(ApiError::BadRequest("no sources given".to_string()));
    }

    let result = state.coordinator.aggregate(tasks).await.into_result()?;
    Ok(Json(result))
}

async fn reset_credits(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> ApiResult<Json<CreditSnapshot>> {
    let provider: ProviderId = Cow::Owned(provider);
    if state.ledger.credit(&provider).is_none() {
        return Err(ApiError::NotFound);
    }

    state.ledger.reset(&provider);
    tracing::info!("Credits reset for provider '{}'", provider);

    state
        .ledger
        .credit(&provider)
        .map(|credit| Json(CreditSnapshot::from(&credit)))
        .ok_or(ApiError::NotFound)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/acquisition/stats", get(get_stats))
        .route("/acquisition/fetch", post(fetch))
        .route("/acquisition/aggregate", post(aggregate))
        .route("/acquisition/credits/{provider}/reset", post(reset_credits))
}
