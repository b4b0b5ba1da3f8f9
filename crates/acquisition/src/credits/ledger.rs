//! Per-provider call budgets.
//!
//! Each provider gets a finite number of calls per period. The ledger only
//! counts; period rollovers come from an external scheduler calling
//! [`ProviderCreditLedger::reset`] or [`ProviderCreditLedger::reset_all`].

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use log::{debug, info, warn};
use serde::Serialize;

use crate::models::ProviderId;

/// Budget state for one provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProviderCredit {
    pub provider: String,
    pub total: u32,
    pub used: u32,
}

impl ProviderCredit {
    fn new(provider: impl Into<String>, total: u32) -> Self {
        Self {
            provider: provider.into(),
            total,
            used: 0,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.used)
    }
}

/// Point-in-time view of one provider's budget.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditSnapshot {
    pub provider: String,
    pub total: u32,
    pub used: u32,
    pub remaining: u32,
}

impl From<&ProviderCredit> for CreditSnapshot {
    fn from(credit: &ProviderCredit) -> Self {
        Self {
            provider: credit.provider.clone(),
            total: credit.total,
            used: credit.used,
            remaining: credit.remaining(),
        }
    }
}

/// Thread-safe ledger of remaining/used/total calls per provider.
///
/// Providers without a configured budget have nothing to spend.
pub struct ProviderCreditLedger {
    credits: Mutex<HashMap<String, ProviderCredit>>,
}

impl ProviderCreditLedger {
    pub fn new() -> Self {
        Self {
            credits: Mutex::new(HashMap::new()),
        }
    }

    /// Create a ledger with a budget for each `(provider, total)` pair.
    pub fn with_budgets<I, S>(budgets: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let ledger = Self::new();
        for (provider, total) in budgets {
            ledger.set_budget(provider, total);
        }
        ledger
    }

    /// Lock the credits mutex, recovering from poison if necessary.
    fn lock_credits(&self) -> MutexGuard<'_, HashMap<String, ProviderCredit>> {
        self.credits.lock().unwrap_or_else(|poisoned| {
            warn!("Credit ledger mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Set the total budget for a provider. Usage already recorded is kept.
    pub fn set_budget(&self, provider: impl Into<String>, total: u32) {
        let provider = provider.into();
        let mut credits = self.lock_credits();
        credits
            .entry(provider.clone())
            .and_modify(|credit| credit.total = total)
            .or_insert_with(|| ProviderCredit::new(provider, total));
    }

    pub fn remaining(&self, provider: &ProviderId) -> u32 {
        self.lock_credits()
            .get(provider.as_ref())
            .map(ProviderCredit::remaining)
            .unwrap_or(0)
    }

    pub fn can_afford(&self, provider: &ProviderId, cost: u32) -> bool {
        self.remaining(provider) >= cost
    }

    /// Record `cost` calls against a provider.
    ///
    /// Charging past zero is a caller bug (it should have checked
    /// [`can_afford`](Self::can_afford)); the charge is refused and `false`
    /// returned, leaving the ledger untouched.
    pub fn charge(&self, provider: &ProviderId, cost: u32) -> bool {
        let mut credits = self.lock_credits();

        let Some(credit) = credits.get_mut(provider.as_ref()) else {
            warn!("Credit ledger: charge for unbudgeted provider '{}' refused", provider);
            return false;
        };

        if credit.remaining() < cost {
            warn!(
                "Credit ledger: refusing to charge {} to '{}' with {} remaining",
                cost,
                provider,
                credit.remaining()
            );
            return false;
        }

        credit.used += cost;
        debug!(
            "Credit ledger: charged {} to '{}' ({}/{} used)",
            cost, provider, credit.used, credit.total
        );
        true
    }

    /// Mark a provider's budget as spent, e.g. after the provider itself said so.
    pub fn exhaust(&self, provider: &ProviderId) {
        if let Some(credit) = self.lock_credits().get_mut(provider.as_ref()) {
            credit.used = credit.total;
            info!("Credit ledger: '{}' marked exhausted until reset", provider);
        }
    }

    /// Start a new period for one provider.
    pub fn reset(&self, provider: &ProviderId) {
        if let Some(credit) = self.lock_credits().get_mut(provider.as_ref()) {
            credit.used = 0;
            debug!("Credit ledger: reset '{}'", provider);
        }
    }

    /// Start a new period for every provider.
    pub fn reset_all(&self) {
        let mut credits = self.lock_credits();
        for credit in credits.values_mut() {
            credit.used = 0;
        }
        info!("Credit ledger: reset {} providers", credits.len());
    }

    pub fn credit(&self, provider: &ProviderId) -> Option<ProviderCredit> {
        self.lock_credits().get(provider.as_ref()).cloned()
    }

    /// Every configured provider's budget, sorted by provider.
    pub fn snapshot(&self) -> Vec<CreditSnapshot> {
        let credits = self.lock_credits();
        let mut rows: Vec<CreditSnapshot> = credits.values().map(CreditSnapshot::from).collect();
        rows.sort_by(|a, b| a.provider.cmp(&b.provider));
        rows
    }
}

impl Default for ProviderCreditLedger {
    fn default() -> Self {
        Self::new()
    }
}
