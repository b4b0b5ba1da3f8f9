use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::errors::AcquisitionError;
use crate::models::FetchOutcome;

/// Overall state of an aggregation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregateStatus {
    /// Every source succeeded.
    Complete,
    /// Some sources succeeded.
    Partial,
    /// No source succeeded.
    Failed,
}

/// Per-source outcomes of one aggregation, tagged with a confidence score.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialResult {
    pub outcomes: BTreeMap<String, FetchOutcome>,
    /// Fraction of sources that succeeded, in `[0.0, 1.0]`
    pub confidence: f64,
    pub status: AggregateStatus,
}

impl PartialResult {
    pub fn from_outcomes(outcomes: BTreeMap<String, FetchOutcome>) -> Self {
        let total = outcomes.len();
        let successes = outcomes.values().filter(|o| o.is_success()).count();

        let confidence = if total == 0 {
            0.0
        } else {
            successes as f64 / total as f64
        };
        let status = if successes == 0 {
            AggregateStatus::Failed
        } else if successes == total {
            AggregateStatus::Complete
        } else {
            AggregateStatus::Partial
        };

        Self {
            outcomes,
            confidence,
            status,
        }
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Names of sources that produced data, in name order.
    pub fn succeeded(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.is_success())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Names of sources that failed, in name order.
    pub fn missing(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| !o.is_success())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn outcome(&self, name: &str) -> Option<&FetchOutcome> {
        self.outcomes.get(name)
    }

    /// Data from a source, if it succeeded.
    pub fn success(&self, name: &str) -> Option<&Value> {
        self.outcomes.get(name).and_then(FetchOutcome::data)
    }

    pub fn is_failed(&self) -> bool {
        self.status == AggregateStatus::Failed
    }

    /// Turn a total failure into an error; partial results pass through.
    pub fn into_result(self) -> Result<Self, AcquisitionError> {
        if self.is_failed() {
            return Err(AcquisitionError::AllSourcesFailed {
                total: self.total(),
                missing: self.missing().into_iter().map(String::from).collect(),
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureKind;
    use crate::models::Provenance;
    use chrono::Utc;
    use serde_json::json;

    fn ok(value: Value) -> FetchOutcome {
        FetchOutcome::success(value, "tavily", Provenance::fresh(Utc::now()))
    }

    fn outcomes(entries: Vec<(&str, FetchOutcome)>) -> BTreeMap<String, FetchOutcome> {
        entries
            .into_iter()
            .map(|(name, outcome)| (name.to_string(), outcome))
            .collect()
    }

    #[test]
    fn test_partial_confidence() {
        let result = PartialResult::from_outcomes(outcomes(vec![
            ("research", ok(json!({ "summary": "Sintra day trip" }))),
            ("currency", FetchOutcome::failed(FailureKind::Timeout)),
            ("community", ok(json!(["r/lisbon"]))),
            ("video", FetchOutcome::failed(FailureKind::QuotaExhausted)),
        ]));

        assert_eq!(result.status, AggregateStatus::Partial);
        assert!((result.confidence - 0.5).abs() < f64::EPSILON);
        assert_eq!(result.succeeded(), vec!["community", "research"]);
        assert_eq!(result.missing(), vec!["currency", "video"]);
        assert_eq!(result.success("community"), Some(&json!(["r/lisbon"])));
        assert!(result.success("video").is_none());
        assert!(result.into_result().is_ok());
    }

    #[test]
    fn test_complete() {
        let result = PartialResult::from_outcomes(outcomes(vec![("news", ok(json!("headline")))]));
        assert_eq!(result.status, AggregateStatus::Complete);
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
        assert!(result.missing().is_empty());
    }

    #[test]
    fn test_all_failed_converts_to_error() {
        let result = PartialResult::from_outcomes(outcomes(vec![
            ("research", FetchOutcome::failed(FailureKind::AuthError)),
            ("news", FetchOutcome::failed(FailureKind::NetworkError)),
        ]));

        assert!(result.is_failed());
        assert_eq!(result.confidence, 0.0);
        match result.into_result() {
            Err(AcquisitionError::AllSourcesFailed { total, missing }) => {
                assert_eq!(total, 2);
                assert_eq!(missing, vec!["news".to_string(), "research".to_string()]);
            }
            other => panic!("expected AllSourcesFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_is_failed() {
        let result = PartialResult::from_outcomes(BTreeMap::new());
        assert_eq!(result.status, AggregateStatus::Failed);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.total(), 0);
    }
}
