use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::normalize::normalize_text;

static LAST4: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]{4}").expect("valid regex"));
static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{4,}").expect("valid regex"));

/// Credit-card issuer, named by its scraper code. A card bill is paid from a
/// bank account as one repayment line naming the issuer and often the card's
/// last four digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardVendor {
    Max,
    VisaCal,
    Isracard,
    Amex,
    Leumi,
    Diners,
}

impl CardVendor {
    pub const ALL: [CardVendor; 6] = [
        CardVendor::Max,
        CardVendor::VisaCal,
        CardVendor::Isracard,
        CardVendor::Amex,
        CardVendor::Leumi,
        CardVendor::Diners,
    ];

    /// Scraper vendor code.
    pub fn code(self) -> &'static str {
        match self {
            CardVendor::Max => "max",
            CardVendor::VisaCal => "visaCal",
            CardVendor::Isracard => "isracard",
            CardVendor::Amex => "amex",
            CardVendor::Leumi => "leumi",
            CardVendor::Diners => "diners",
        }
    }

    /// Terms that appear in bank memos for this issuer.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            CardVendor::Max => &["מקס", "max"],
            CardVendor::VisaCal => &["כ.א.ל", "cal", "ויזה כאל", "visa cal"],
            CardVendor::Isracard => &["ישראכרט", "isracard"],
            CardVendor::Amex => &["אמקס", "אמריקן אקספרס", "amex", "american express"],
            CardVendor::Leumi => &["לאומי כרט", "leumi card"],
            CardVendor::Diners => &["דיינרס", "diners"],
        }
    }

    fn named_in(self, normalized_name: &str) -> bool {
        self.keywords().iter().any(|kw| {
            let kw = normalize_text(kw);
            !kw.is_empty() && normalized_name.contains(&kw)
        })
    }
}

impl fmt::Display for CardVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CardVendor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CardVendor::ALL
            .into_iter()
            .find(|v| v.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown card vendor: '{s}'"))
    }
}

/// First issuer, in [`CardVendor::ALL`] order, named in `name`.
pub fn detect_card_vendor(name: &str) -> Option<CardVendor> {
    let normalized = normalize_text(name);
    if normalized.is_empty() {
        return None;
    }
    CardVendor::ALL.into_iter().find(|v| v.named_in(&normalized))
}

/// The last four-digit group in `name`.
pub fn extract_last4(name: &str) -> Option<String> {
    LAST4.find_iter(name).last().map(|m| m.as_str().to_string())
}

/// Last four characters of an account number, or the whole trimmed value when
/// it is that short.
pub fn account_last4(account_number: Option<&str>) -> Option<String> {
    let trimmed = account_number?.trim();
    if trimmed.is_empty() {
        return None;
    }
    let chars: Vec<char> = trimmed.chars().collect();
    let start = chars.len().saturating_sub(4);
    Some(chars[start..].iter().collect())
}

/// Every run of four or more digits, plus the last four digits of the longer
/// runs. Sorted and de-duplicated.
pub fn extract_digit_sequences(text: &str) -> Vec<String> {
    let mut out = BTreeSet::new();
    for m in DIGIT_RUN.find_iter(text) {
        let run = m.as_str();
        if run.len() > 4 {
            out.insert(run[run.len() - 4..].to_string());
        }
        out.insert(run.to_string());
    }
    out.into_iter().collect()
}

/// Memo fragments identifying a card: the vendor keywords, then the account
/// number and its last four digits.
pub fn build_match_patterns(vendor: CardVendor, card_account_number: Option<&str>) -> Vec<String> {
    let mut candidates: Vec<String> = vendor.keywords().iter().map(|k| k.to_string()).collect();
    if let Some(number) = card_account_number.map(str::trim).filter(|n| !n.is_empty()) {
        candidates.push(number.to_string());
        if let Some(last4) = account_last4(Some(number)) {
            candidates.push(last4);
        }
    }

    let mut seen = BTreeSet::new();
    candidates
        .into_iter()
        .filter(|p| !p.is_empty() && seen.insert(p.clone()))
        .collect()
}

/// How confidently a repayment memo points at a specific card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrength {
    None,
    /// The issuer is named but not the card.
    Weak,
    /// The card number or its last four digits appear.
    Strong,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPairing {
    #[serde(default)]
    pub id: Option<i64>,
    pub credit_card_vendor: CardVendor,
    pub credit_card_account_number: Option<String>,
    pub bank_vendor: String,
    pub bank_account_number: Option<String>,
    #[serde(default)]
    pub match_patterns: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl AccountPairing {
    pub fn new(
        credit_card_vendor: CardVendor,
        credit_card_account_number: Option<&str>,
        bank_vendor: &str,
        bank_account_number: Option<&str>,
    ) -> Self {
        Self {
            id: None,
            credit_card_vendor,
            credit_card_account_number: credit_card_account_number.map(str::to_string),
            bank_vendor: bank_vendor.to_string(),
            bank_account_number: bank_account_number.map(str::to_string),
            match_patterns: build_match_patterns(credit_card_vendor, credit_card_account_number),
            is_active: true,
        }
    }

    pub fn card_last4(&self) -> Option<String> {
        account_last4(self.credit_card_account_number.as_deref())
    }

    pub fn name_match_strength(&self, name: &str) -> MatchStrength {
        let hints = extract_digit_sequences(name);
        let card = self
            .credit_card_account_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        if let Some(card) = card {
            if hints.iter().any(|h| h == card) {
                return MatchStrength::Strong;
            }
        }
        if let Some(last4) = self.card_last4() {
            if hints.contains(&last4) {
                return MatchStrength::Strong;
            }
        }
        if self.credit_card_vendor.named_in(&normalize_text(name)) {
            return MatchStrength::Weak;
        }
        MatchStrength::None
    }

    /// Whether a bank repayment memo could be this card's bill: the card's
    /// last four digits appear, or the issuer is named.
    pub fn matches_repayment(&self, name: &str) -> bool {
        if name.trim().is_empty() {
            return false;
        }
        if self.card_last4().is_some_and(|last4| name.contains(&last4)) {
            return true;
        }
        self.credit_card_vendor.named_in(&normalize_text(name))
    }

    fn pattern_in(&self, normalized_name: &str) -> bool {
        self.match_patterns.iter().any(|p| {
            let p = normalize_text(p);
            !p.is_empty() && normalized_name.contains(&p)
        })
    }
}

/// First active pairing with a match pattern found in the repayment memo.
pub fn find_pairing_for_repayment<'a>(
    pairings: &'a [AccountPairing],
    repayment_name: &str,
) -> Option<&'a AccountPairing> {
    let normalized = normalize_text(repayment_name);
    if normalized.is_empty() {
        return None;
    }
    pairings
        .iter()
        .filter(|p| p.is_active)
        .find(|p| p.pattern_in(&normalized))
}
