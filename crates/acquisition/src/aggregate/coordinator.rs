use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::time::Duration;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use log::{debug, info, warn};

use super::PartialResult;
use crate::errors::FailureKind;
use crate::models::FetchOutcome;

/// One independent source fetch inside an aggregation.
pub struct SourceTask {
    pub name: String,
    pub run: BoxFuture<'static, FetchOutcome>,
}

impl SourceTask {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Future<Output = FetchOutcome> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: run.boxed(),
        }
    }
}

impl std::fmt::Debug for SourceTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceTask").field("name", &self.name).finish()
    }
}

/// Default bound on a single source task.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs independent source tasks concurrently and collects whatever succeeds.
///
/// No retries happen here; each source is expected to do its own fallback
/// (usually through a [`ProviderOrchestrator`](crate::orchestrator::ProviderOrchestrator)).
#[derive(Clone, Debug)]
pub struct AggregationCoordinator {
    task_timeout: Option<Duration>,
}

impl Default for AggregationCoordinator {
    fn default() -> Self {
        Self::with_task_timeout(DEFAULT_TASK_TIMEOUT)
    }
}

impl AggregationCoordinator {
    /// Coordinator bounding each task by [`DEFAULT_TASK_TIMEOUT`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every task; an overrun becomes a retryable `Timeout` for that source.
    pub fn with_task_timeout(timeout: Duration) -> Self {
        Self {
            task_timeout: Some(timeout),
        }
    }

    /// Let tasks run for as long as they take.
    pub fn unbounded() -> Self {
        Self { task_timeout: None }
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout
    }

    /// Run all tasks concurrently and wait for every one of them to settle.
    ///
    /// A failing, panicking, or slow task only affects its own entry in the
    /// result. Later tasks reusing an earlier task's name are dropped.
    pub async fn aggregate(&self, tasks: Vec<SourceTask>) -> PartialResult {
        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(tasks.len());
        let mut handles = Vec::with_capacity(tasks.len());

        for task in tasks {
            if !seen.insert(task.name.clone()) {
                warn!("Duplicate source '{}' dropped from aggregation", task.name);
                continue;
            }

            let limit = self.task_timeout;
            let run = task.run;
            handles.push(tokio::spawn(async move {
                match limit {
                    Some(limit) => match tokio::time::timeout(limit, run).await {
                        Ok(outcome) => outcome,
                        Err(_) => FetchOutcome::failure(FailureKind::Timeout, None, true),
                    },
                    None => run.await,
                }
            }));
            names.push(task.name);
        }

        debug!("Aggregating {} sources", names.len());
        let results = join_all(handles).await;

        let outcomes: BTreeMap<String, FetchOutcome> = names
            .into_iter()
            .zip(results)
            .map(|(name, joined)| {
                let outcome = match joined {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("Source '{}' did not finish: {}", name, e);
                        FetchOutcome::failure(FailureKind::Internal, None, false)
                    }
                };
                (name, outcome)
            })
            .collect();

        let result = PartialResult::from_outcomes(outcomes);
        if result.is_failed() {
            warn!(
                "All {} sources failed: {}",
                result.total(),
                result.missing().join(", ")
            );
        } else {
            info!(
                "Aggregated {}/{} sources (confidence {:.2}), missing: [{}]",
                result.succeeded().len(),
                result.total(),
                result.confidence,
                result.missing().join(", ")
            );
        }
        result
    }
}
