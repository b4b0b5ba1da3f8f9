//! Concurrent fan-out over independent sources.
//!
//! - [`AggregationCoordinator`] runs [`SourceTask`]s concurrently and tolerates partial failure
//! - [`PartialResult`] holds per-source outcomes plus a confidence score
//! - [`fetch_cached`] is a read-through helper for sources that cache directly

mod cached;
mod coordinator;
mod result;

pub use cached::fetch_cached;
pub use coordinator::{AggregationCoordinator, SourceTask, DEFAULT_TASK_TIMEOUT};
pub use result::{AggregateStatus, PartialResult};
