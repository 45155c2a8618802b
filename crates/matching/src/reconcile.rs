use chrono::NaiveDate;
use clarify_core::Money;
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

/// Bills rarely land on the exact agora; ₪2 either way still counts.
pub fn default_tolerance() -> Money {
    Money::from_agorot(200)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub date: NaiveDate,
    pub amount: Money,
}

impl LedgerEntry {
    pub fn new(id: impl Into<String>, date: NaiveDate, amount: Money) -> Self {
        Self {
            id: id.into(),
            date,
            amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepaymentAllocation {
    pub repayment_id: String,
    pub repayment_date: NaiveDate,
    pub repayment_amount: Money,
    pub matched_amount: Money,
    /// Repayment minus matched; positive when the bill is under-covered.
    pub difference: Money,
    pub expense_ids: Vec<String>,
}

impl RepaymentAllocation {
    pub fn is_balanced(&self, tolerance: Money) -> bool {
        self.difference.abs() <= tolerance
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub allocations: Vec<RepaymentAllocation>,
    /// Repayments for which no expense could be taken.
    pub unallocated_repayment_ids: Vec<String>,
    pub unmatched_expense_ids: Vec<String>,
}

impl Reconciliation {
    /// Spread of the per-repayment differences. A steady non-zero median
    /// usually means the issuer adds a fixed fee to each bill.
    pub fn fee_stats(&self) -> Option<FeeStats> {
        let differences: Vec<Money> = self.allocations.iter().map(|a| a.difference).collect();
        fee_stats(&differences)
    }
}

/// Walks repayments oldest first and, for each, takes still-unclaimed
/// expenses dated on or before it in date order. An expense is taken while
/// the running total stays within `repayment + tolerance`; larger ones are
/// skipped and stay available. A repayment stops collecting once the total is
/// within `tolerance` of its amount.
///
/// Amounts are compared as magnitudes, so charge-negative exports work as-is.
/// Repayments that take nothing are listed in `unallocated_repayment_ids`
/// instead of producing an allocation.
pub fn reconcile_chronologically(
    expenses: &[LedgerEntry],
    repayments: &[LedgerEntry],
    tolerance: Money,
) -> Reconciliation {
    let tolerance = tolerance.abs();

    let mut expenses: Vec<&LedgerEntry> = expenses.iter().collect();
    expenses.sort_by_key(|e| e.date);
    let mut repayments: Vec<&LedgerEntry> = repayments.iter().collect();
    repayments.sort_by_key(|r| r.date);

    let mut claimed = vec![false; expenses.len()];
    let mut result = Reconciliation::default();

    for repayment in repayments {
        let target = repayment.amount.abs();
        let ceiling = target + tolerance;
        let mut running = Money::zero();
        let mut expense_ids = Vec::new();

        for (idx, expense) in expenses.iter().enumerate() {
            if expense.date > repayment.date {
                break;
            }
            if claimed[idx] {
                continue;
            }
            let amount = expense.amount.abs();
            if running + amount > ceiling {
                continue;
            }
            claimed[idx] = true;
            running = running + amount;
            expense_ids.push(expense.id.clone());

            if (running - target).abs() <= tolerance {
                break;
            }
        }

        if expense_ids.is_empty() {
            tracing::debug!("Repayment {} matched no expenses", repayment.id);
            result.unallocated_repayment_ids.push(repayment.id.clone());
            continue;
        }

        let allocation = RepaymentAllocation {
            repayment_id: repayment.id.clone(),
            repayment_date: repayment.date,
            repayment_amount: target,
            matched_amount: running,
            difference: target - running,
            expense_ids,
        };
        if !allocation.is_balanced(tolerance) {
            tracing::debug!(
                "Repayment {} left {} unallocated",
                allocation.repayment_id,
                allocation.difference
            );
        }
        result.allocations.push(allocation);
    }

    result.unmatched_expense_ids = expenses
        .iter()
        .zip(&claimed)
        .filter(|(_, taken)| !**taken)
        .map(|(e, _)| e.id.clone())
        .collect();
    result
}

/// Robust summary of a set of bank-vs-card differences, rounded to agorot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeStats {
    pub count: usize,
    pub median: Money,
    /// Median absolute deviation from the median.
    pub mad: Money,
    /// Population standard deviation.
    pub stdev: Money,
    pub min: Money,
    pub max: Money,
}

/// `None` for an empty slice. Spread measures are zero for a single value.
pub fn fee_stats(differences: &[Money]) -> Option<FeeStats> {
    let mut values: Vec<Decimal> = differences.iter().map(|d| d.as_decimal()).collect();
    values.sort();
    let (&min, &max) = (values.first()?, values.last()?);

    let median = median_of_sorted(&values);
    let (mad, stdev) = if values.len() < 2 {
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        let mut deviations: Vec<Decimal> = values.iter().map(|v| (v - median).abs()).collect();
        deviations.sort();

        let count = Decimal::from(values.len());
        let mean = values.iter().sum::<Decimal>() / count;
        let variance = values
            .iter()
            .map(|v| (v - mean) * (v - mean))
            .sum::<Decimal>()
            / count;
        (
            median_of_sorted(&deviations),
            variance.sqrt().unwrap_or_default(),
        )
    };

    Some(FeeStats {
        count: values.len(),
        median: Money::from_decimal(median),
        mad: Money::from_decimal(mad),
        stdev: Money::from_decimal(stdev),
        min: Money::from_decimal(min),
        max: Money::from_decimal(max),
    })
}

fn median_of_sorted(values: &[Decimal]) -> Decimal {
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / Decimal::TWO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn entry(id: &str, d: u32, agorot: i64) -> LedgerEntry {
        LedgerEntry::new(id, day(d), Money::from_agorot(agorot))
    }

    fn money(agorot: &[i64]) -> Vec<Money> {
        agorot.iter().copied().map(Money::from_agorot).collect()
    }

    #[test]
    fn exact_bill_is_fully_allocated() {
        let expenses = vec![
            entry("e1", 1, -10_000),
            entry("e2", 3, -5_000),
            entry("e3", 5, -2_550),
        ];
        let repayments = vec![entry("r1", 10, -17_550)];

        let result = reconcile_chronologically(&expenses, &repayments, default_tolerance());
        let alloc = &result.allocations[0];
        assert_eq!(alloc.expense_ids, vec!["e1", "e2", "e3"]);
        assert_eq!(alloc.matched_amount, Money::from_agorot(17_550));
        assert!(alloc.difference.is_zero());
        assert!(result.unmatched_expense_ids.is_empty());
    }

    #[test]
    fn oversized_expense_is_skipped_not_consumed() {
        let expenses = vec![
            entry("small", 1, -4_000),
            entry("huge", 2, -90_000),
            entry("medium", 3, -6_000),
        ];
        let repayments = vec![entry("r1", 10, -10_000)];

        let result = reconcile_chronologically(&expenses, &repayments, default_tolerance());
        assert_eq!(result.allocations[0].expense_ids, vec!["small", "medium"]);
        assert_eq!(result.unmatched_expense_ids, vec!["huge"]);
    }

    #[test]
    fn stops_once_within_tolerance() {
        let expenses = vec![
            entry("e1", 1, -9_900),
            entry("e2", 2, -50),
            entry("e3", 3, -30),
        ];
        let repayments = vec![entry("r1", 5, -10_000)];

        let result = reconcile_chronologically(&expenses, &repayments, default_tolerance());
        let alloc = &result.allocations[0];
        assert_eq!(alloc.expense_ids, vec!["e1"]);
        assert_eq!(alloc.difference, Money::from_agorot(100));
        assert!(alloc.is_balanced(default_tolerance()));
        assert_eq!(result.unmatched_expense_ids, vec!["e2", "e3"]);
    }

    #[test]
    fn later_expenses_wait_for_later_repayments() {
        let expenses = vec![entry("feb", 2, -3_000), entry("mar", 12, -7_000)];
        // Given out of order on purpose.
        let repayments = vec![entry("r2", 20, -7_000), entry("r1", 10, -3_000)];

        let result = reconcile_chronologically(&expenses, &repayments, Money::zero());
        assert_eq!(result.allocations[0].repayment_id, "r1");
        assert_eq!(result.allocations[0].expense_ids, vec!["feb"]);
        assert_eq!(result.allocations[1].repayment_id, "r2");
        assert_eq!(result.allocations[1].expense_ids, vec!["mar"]);
    }

    #[test]
    fn short_repayment_reports_positive_difference() {
        let expenses = vec![entry("e1", 1, -1_000)];
        let repayments = vec![entry("r1", 2, -5_000)];

        let result = reconcile_chronologically(&expenses, &repayments, default_tolerance());
        let alloc = &result.allocations[0];
        assert_eq!(alloc.difference, Money::from_agorot(4_000));
        assert!(!alloc.is_balanced(default_tolerance()));
    }

    #[test]
    fn repayment_with_nothing_to_take_is_not_allocated() {
        let expenses = vec![entry("late", 20, -1_000)];
        let repayments = vec![entry("r1", 5, -1_000), entry("r2", 25, -1_000)];

        let result = reconcile_chronologically(&expenses, &repayments, Money::zero());
        assert_eq!(result.allocations.len(), 1);
        assert_eq!(result.allocations[0].repayment_id, "r2");
        assert_eq!(result.unallocated_repayment_ids, vec!["r1"]);
    }

    #[test]
    fn duplicate_expense_ids_are_tracked_separately() {
        let expenses = vec![entry("dup", 1, -1_000), entry("dup", 2, -9_000)];
        let repayments = vec![entry("r1", 5, -1_000)];

        let result = reconcile_chronologically(&expenses, &repayments, Money::zero());
        assert_eq!(result.allocations[0].expense_ids, vec!["dup"]);
        assert_eq!(result.unmatched_expense_ids, vec!["dup"]);
    }

    #[test]
    fn no_repayments_leaves_everything_unmatched() {
        let expenses = vec![entry("e1", 1, -1_000), entry("e2", 2, -2_000)];
        let result = reconcile_chronologically(&expenses, &[], default_tolerance());
        assert!(result.allocations.is_empty());
        assert_eq!(result.unmatched_expense_ids, vec!["e1", "e2"]);
    }

    #[test]
    fn serializes_camel_case() {
        let result = reconcile_chronologically(
            &[entry("e1", 1, -1_000)],
            &[entry("r1", 2, -1_000)],
            Money::zero(),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["allocations"][0].get("matchedAmount").is_some());
        assert_eq!(json["allocations"][0]["expenseIds"], serde_json::json!(["e1"]));
        assert_eq!(json["unmatchedExpenseIds"], serde_json::json!([]));
        assert_eq!(json["unallocatedRepaymentIds"], serde_json::json!([]));
    }

    #[test]
    fn fee_stats_of_empty_is_none() {
        assert_eq!(fee_stats(&[]), None);
    }

    #[test]
    fn fee_stats_single_value_has_no_spread() {
        let stats = fee_stats(&money(&[-350])).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.median, Money::from_agorot(-350));
        assert!(stats.mad.is_zero());
        assert!(stats.stdev.is_zero());
        assert_eq!(stats.min, stats.max);
    }

    #[test]
    fn fee_stats_odd_count() {
        // 1, 2, 3, 4, 100 shekels: one outlier barely moves the median.
        let stats = fee_stats(&money(&[300, 10_000, 100, 400, 200])).unwrap();
        assert_eq!(stats.count, 5);
        assert_eq!(stats.median, Money::from_agorot(300));
        // Deviations 2, 1, 0, 1, 97 -> median 1.
        assert_eq!(stats.mad, Money::from_agorot(100));
        assert_eq!(stats.min, Money::from_agorot(100));
        assert_eq!(stats.max, Money::from_agorot(10_000));
    }

    #[test]
    fn fee_stats_even_count_averages_middle() {
        // 2, 4, 4, 4, 5, 5, 7, 9: mean 5, population stdev exactly 2.
        let stats = fee_stats(&money(&[200, 400, 400, 400, 500, 500, 700, 900])).unwrap();
        assert_eq!(stats.median, Money::from_agorot(450));
        assert_eq!(stats.stdev, Money::from_agorot(200));
    }

    #[test]
    fn reconciliation_fee_stats_use_differences() {
        let expenses = vec![entry("e1", 1, -9_900), entry("e2", 12, -4_950)];
        let repayments = vec![entry("r1", 10, -10_000), entry("r2", 20, -5_000)];

        let result = reconcile_chronologically(&expenses, &repayments, default_tolerance());
        let stats = result.fee_stats().unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.median, Money::from_agorot(75));
        assert_eq!(stats.min, Money::from_agorot(50));
        assert_eq!(stats.max, Money::from_agorot(100));
    }
}
