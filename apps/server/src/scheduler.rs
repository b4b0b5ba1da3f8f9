//! Background schedulers for cache maintenance and credit rollover.
//!
//! The acquisition layer runs no timers of its own; the server owns them.

use std::sync::Arc;
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::main_lib::AppState;

/// Starts the periodic sweep of expired cache entries.
pub fn start_cache_cleanup_scheduler(state: Arc<AppState>) {
    let period = state.acquisition.cleanup_interval();
    tokio::spawn(async move {
        info!("Cache cleanup scheduler started ({}s interval)", period.as_secs());
        let mut ticker = periodic(period);

        loop {
            ticker.tick().await;
            run_cache_cleanup(&state);
        }
    });
}

/// Starts the periodic reset of every provider's credit budget.
pub fn start_credit_reset_scheduler(state: Arc<AppState>) {
    let period = state.acquisition.credit_reset_interval();
    tokio::spawn(async move {
        info!("Credit reset scheduler started ({}s interval)", period.as_secs());
        let mut ticker = periodic(period);

        loop {
            ticker.tick().await;
            state.ledger.reset_all();
            info!("Provider credit budgets reset for the new period");
        }
    });
}

/// Longest supported scheduler period.
const MAX_PERIOD: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// Interval whose first tick fires one full period from now.
fn periodic(period: Duration) -> Interval {
    let period = period.clamp(Duration::from_secs(1), MAX_PERIOD);
    let start = Instant::now()
        .checked_add(period)
        .unwrap_or_else(Instant::now);
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Runs a single sweep.
pub fn run_cache_cleanup(state: &AppState) -> usize {
    let removed = state.cache.cleanup_expired();
    let stats = state.cache.stats();
    if removed > 0 {
        info!(
            "Cache cleanup removed {} expired entries ({} remain)",
            removed, stats.size
        );
    } else {
        debug!("Cache cleanup found nothing to remove ({} entries)", stats.size);
    }
    removed
}
