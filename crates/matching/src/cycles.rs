use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use clarify_core::Money;
use rust_decimal::Decimal;
use serde::Serialize;

/// Charge totals keyed by billing-cycle (repayment) date.
pub type CycleTotals = BTreeMap<NaiveDate, Money>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BillingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BillingPeriod {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Israeli cards bill the previous calendar month, so a 9 November
/// repayment covers 1-31 October.
pub fn billing_period(repayment_date: NaiveDate) -> BillingPeriod {
    let month_start = repayment_date - Duration::days(i64::from(repayment_date.day0()));
    let end = month_start - Duration::days(1);
    let start = end - Duration::days(i64::from(end.day0()));
    BillingPeriod { start, end }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyCycle {
    pub date: NaiveDate,
    pub total: Money,
    pub days_apart: i64,
}

/// Up to `limit` cycles closest to `target`, nearest first; equal distances
/// are ordered by date.
pub fn nearest_cycle_dates(totals: &CycleTotals, target: NaiveDate, limit: usize) -> Vec<NearbyCycle> {
    let mut nearby: Vec<NearbyCycle> = totals
        .iter()
        .map(|(&date, &total)| NearbyCycle {
            date,
            total,
            days_apart: (date - target).num_days().abs(),
        })
        .collect();
    nearby.sort_by_key(|c| (c.days_apart, c.date));
    nearby.truncate(limit);
    nearby
}

/// One card account's charge history, as a candidate for a bank repayment
/// stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardCycles {
    pub account_number: Option<String>,
    pub totals: CycleTotals,
}

/// How well a card account's cycle totals line up with the bank repayments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleFit {
    pub account_number: Option<String>,
    pub overlap_cycles: usize,
    pub mean_abs_error: Money,
    /// Summed absolute error as a percentage of the card total.
    pub rel_abs_error: Decimal,
    pub sum_abs_error: Money,
    pub sum_bank_matched: Money,
    pub sum_card_matched: Money,
}

/// Picks the card account whose cycles best explain `bank_cycles`: most
/// shared cycle dates, then lowest relative error, then lowest mean absolute
/// error. The earlier candidate wins a full tie. `None` when no candidate
/// shares a cycle date with the bank.
pub fn choose_best_card_account(bank_cycles: &CycleTotals, candidates: &[CardCycles]) -> Option<CycleFit> {
    let mut best: Option<((usize, Reverse<Decimal>, Reverse<Decimal>), CycleFit)> = None;

    for candidate in candidates {
        let overlap: Vec<(Money, Money)> = bank_cycles
            .iter()
            .filter_map(|(date, &bank)| candidate.totals.get(date).map(|&card| (bank, card)))
            .collect();
        if overlap.is_empty() {
            continue;
        }

        let sum_abs_error: Money = overlap.iter().map(|&(bank, card)| (bank - card).abs()).sum();
        let sum_bank: Money = overlap.iter().map(|&(bank, _)| bank).sum();
        let sum_card: Money = overlap.iter().map(|&(_, card)| card).sum();

        let error = sum_abs_error.as_decimal();
        let mean_abs_error = error / Decimal::from(overlap.len());
        let rel_error = error / sum_card.as_decimal().max(Decimal::ONE);
        let key = (overlap.len(), Reverse(rel_error), Reverse(mean_abs_error));

        if best.as_ref().map_or(true, |(top, _)| key > *top) {
            let fit = CycleFit {
                account_number: candidate.account_number.clone(),
                overlap_cycles: overlap.len(),
                mean_abs_error: Money::from_decimal(mean_abs_error),
                rel_abs_error: (rel_error * Decimal::ONE_HUNDRED).round_dp(2),
                sum_abs_error,
                sum_bank_matched: sum_bank,
                sum_card_matched: sum_card,
            };
            best = Some((key, fit));
        }
    }

    best.map(|(_, fit)| fit)
}
