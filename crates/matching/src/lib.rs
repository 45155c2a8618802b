pub mod catalog;
pub mod cycles;
pub mod matcher;
pub mod normalize;
pub mod pairing;
pub mod reconcile;
pub mod similarity;
pub mod sql;
pub(crate) mod util;

pub use catalog::{CatalogEntry, CatalogError, CatalogPattern, PatternCatalog};
pub use cycles::{BillingPeriod, CardCycles, CycleFit, CycleTotals, NearbyCycle};
pub use matcher::{AccountMatcher, MatchConfig, MatchResult, TransactionDescriptor};
pub use normalize::normalize_text;
pub use pairing::{AccountPairing, CardVendor, MatchStrength};
pub use reconcile::{FeeStats, LedgerEntry, Reconciliation, RepaymentAllocation};
pub use similarity::calculate_similarity;
pub use sql::{LikeClause, SqlDialect};

/// Shortcuts over the built-in catalog and default thresholds.
pub mod builtin {
    use crate::*;

    pub fn match_account(
        account_name: &str,
        account_type: &str,
        transactions: &[TransactionDescriptor],
    ) -> MatchResult {
        AccountMatcher::new(PatternCatalog::builtin()).match_account(
            account_name,
            account_type,
            transactions,
        )
    }

    pub fn detect_account_type(account_name: &str) -> Option<&'static str> {
        AccountMatcher::new(PatternCatalog::builtin()).detect_account_type(account_name)
    }

    pub fn build_sql_patterns(account_type: &str) -> Vec<String> {
        crate::sql::build_sql_patterns(PatternCatalog::builtin(), account_type)
    }

    pub fn all_patterns() -> Vec<CatalogPattern<'static>> {
        PatternCatalog::builtin().all_patterns()
    }

}
