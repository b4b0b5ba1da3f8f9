//! Attempt tracking for provider selection diagnostics.

use serde::{Deserialize, Serialize};

use crate::errors::FailureKind;

/// Why a provider was passed over without being called.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// No credit left for this period.
    NoCredit,

    /// Provider can't produce the requested output format.
    UnsupportedFormat,

    /// Preferred provider isn't registered.
    UnknownProvider,
}

/// What happened to one provider during a fetch.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AttemptStatus {
    Skipped { reason: SkipReason },
    RateLimited,
    #[serde(rename_all = "camelCase")]
    Failed { kind: FailureKind, message: String },
    Succeeded,
}

/// Record of a single provider attempt during a fetch.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAttempt {
    pub provider: String,
    #[serde(flatten)]
    pub status: AttemptStatus,
    /// Credits charged for this attempt
    pub charged: u32,
}

/// Ordered trail of provider attempts for one `execute` call.
#[derive(Clone, Debug, Default)]
pub struct FetchDiagnostics {
    pub attempts: Vec<ProviderAttempt>,
}

impl FetchDiagnostics {
    pub fn new() -> Self {
        Self {
            attempts: Vec::new(),
        }
    }

    pub fn record_skip(&mut self, provider: impl Into<String>, reason: SkipReason) {
        self.push(provider, AttemptStatus::Skipped { reason }, 0);
    }

    pub fn record_rate_limited(&mut self, provider: impl Into<String>) {
        self.push(provider, AttemptStatus::RateLimited, 0);
    }

    pub fn record_failure(
        &mut self,
        provider: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
        charged: u32,
    ) {
        self.push(
            provider,
            AttemptStatus::Failed {
                kind,
                message: message.into(),
            },
            charged,
        );
    }

    pub fn record_success(&mut self, provider: impl Into<String>, charged: u32) {
        self.push(provider, AttemptStatus::Succeeded, charged);
    }

    fn push(&mut self, provider: impl Into<String>, status: AttemptStatus, charged: u32) {
        self.attempts.push(ProviderAttempt {
            provider: provider.into(),
            status,
            charged,
        });
    }

    /// Summary for logging/debugging.
    pub fn summary(&self) -> String {
        if self.attempts.is_empty() {
            return "no providers".to_string();
        }
        self.attempts
            .iter()
            .map(|a| match &a.status {
                AttemptStatus::Succeeded => format!("{}: SUCCESS", a.provider),
                AttemptStatus::Skipped { reason } => {
                    format!("{}: SKIPPED ({:?})", a.provider, reason)
                }
                AttemptStatus::RateLimited => format!("{}: RATE LIMITED", a.provider),
                AttemptStatus::Failed { kind, .. } => format!("{}: ERROR ({})", a.provider, kind),
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub fn skip_reasons(&self) -> Vec<(&str, &SkipReason)> {
        self.attempts
            .iter()
            .filter_map(|a| match &a.status {
                AttemptStatus::Skipped { reason } => Some((a.provider.as_str(), reason)),
                _ => None,
            })
            .collect()
    }

    pub fn total_charged(&self) -> u32 {
        self.attempts.iter().map(|a| a.charged).sum()
    }
}
