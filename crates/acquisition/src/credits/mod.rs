//! Provider credit accounting.

mod ledger;

pub use ledger::{CreditSnapshot, ProviderCredit, ProviderCreditLedger};
