use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::PatternCatalog;
use crate::normalize::normalize_text;
use crate::similarity::normalized_similarity;

/// Tunable knobs for [`AccountMatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// A transaction matches when its score exceeds this. A detected type and
    /// the overall confidence only need to reach it.
    pub threshold: f64,
    /// Share of the overall confidence taken by the account-name score when
    /// transactions are supplied. The rest comes from the matching ratio.
    pub name_weight: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            name_weight: 0.6,
        }
    }
}

/// A transaction as callers hand it over: either the bare description or a
/// record that carries it in `name`. Anything else is kept verbatim and
/// never matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransactionDescriptor {
    Text(String),
    Record {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Other(Value),
}

impl TransactionDescriptor {
    pub fn named(name: &str) -> Self {
        TransactionDescriptor::Record {
            name: Some(name.to_string()),
            extra: Map::new(),
        }
    }

    /// The description to score, if this entry has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            TransactionDescriptor::Text(s) => Some(s),
            TransactionDescriptor::Record { name, .. } => name.as_deref(),
            TransactionDescriptor::Other(_) => None,
        }
    }
}

impl From<&str> for TransactionDescriptor {
    fn from(s: &str) -> Self {
        TransactionDescriptor::Text(s.to_string())
    }
}

impl From<String> for TransactionDescriptor {
    fn from(s: String) -> Self {
        TransactionDescriptor::Text(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub account_name: String,
    pub account_type: String,
    #[serde(rename = "match")]
    pub is_match: bool,
    pub confidence: f64,
    pub match_count: usize,
    pub matches: Vec<TransactionDescriptor>,
}

impl MatchResult {
    fn no_match(account_name: &str, account_type: &str) -> Self {
        Self {
            account_name: account_name.to_string(),
            account_type: account_type.to_string(),
            is_match: false,
            confidence: 0.0,
            match_count: 0,
            matches: Vec::new(),
        }
    }
}

/// Classifies account names and transaction descriptions against a
/// [`PatternCatalog`].
pub struct AccountMatcher<'a> {
    catalog: &'a PatternCatalog,
    config: MatchConfig,
}

impl<'a> AccountMatcher<'a> {
    pub fn new(catalog: &'a PatternCatalog) -> Self {
        Self::with_config(catalog, MatchConfig::default())
    }

    pub fn with_config(catalog: &'a PatternCatalog, config: MatchConfig) -> Self {
        Self { catalog, config }
    }

    pub fn config(&self) -> MatchConfig {
        self.config
    }

    /// Scores `account_name` and each transaction against the patterns of
    /// `account_type` and blends both signals into one confidence.
    ///
    /// With no transactions (an empty slice) the confidence is the name score
    /// alone. Otherwise it is
    /// `name_weight * name_score + (1 - name_weight) * matched / total`.
    pub fn match_account(
        &self,
        account_name: &str,
        account_type: &str,
        transactions: &[TransactionDescriptor],
    ) -> MatchResult {
        let patterns = self.normalized_patterns(account_type);
        if patterns.is_empty() {
            tracing::debug!("No catalog patterns for account type '{account_type}'");
            return MatchResult::no_match(account_name, account_type);
        }

        let name_score = best_score(&normalize_text(account_name), &patterns);

        let matches: Vec<TransactionDescriptor> = transactions
            .iter()
            .filter(|tx| {
                tx.name().is_some_and(|name| {
                    best_score(&normalize_text(name), &patterns) > self.config.threshold
                })
            })
            .cloned()
            .collect();

        let confidence = if transactions.is_empty() {
            name_score
        } else {
            let ratio = matches.len() as f64 / transactions.len() as f64;
            let weight = self.config.name_weight.clamp(0.0, 1.0);
            weight * name_score + (1.0 - weight) * ratio
        };

        tracing::debug!(
            "Matched '{}' as {}: confidence={:.3}, {}/{} transactions",
            account_name,
            account_type,
            confidence,
            matches.len(),
            transactions.len()
        );

        MatchResult {
            account_name: account_name.to_string(),
            account_type: account_type.to_string(),
            is_match: confidence >= self.config.threshold,
            confidence,
            match_count: matches.len(),
            matches,
        }
    }

    /// Guesses the account type of a free-text name. Returns the type owning
    /// the single best-scoring pattern when it clears the threshold; on ties
    /// the earlier catalog entry wins.
    pub fn detect_account_type(&self, name: &str) -> Option<&'a str> {
        let normalized = normalize_text(name);
        if normalized.is_empty() {
            return None;
        }

        let catalog: &'a PatternCatalog = self.catalog;
        let mut best: Option<(&'a str, f64)> = None;
        for entry in catalog.entries() {
            for pattern in entry.patterns() {
                let score = normalized_similarity(&normalized, &normalize_text(pattern));
                if best.map_or(true, |(_, top)| score > top) {
                    best = Some((entry.account_type.as_str(), score));
                }
            }
        }

        let detected = best
            .filter(|(_, score)| *score >= self.config.threshold)
            .map(|(ty, _)| ty);
        tracing::debug!("Detected account type for '{name}': {detected:?}");
        detected
    }

    fn normalized_patterns(&self, account_type: &str) -> Vec<String> {
        self.catalog
            .patterns_for_type(account_type)
            .into_iter()
            .map(normalize_text)
            .filter(|p| !p.is_empty())
            .collect()
    }
}

fn best_score(candidate: &str, patterns: &[String]) -> f64 {
    patterns
        .iter()
        .map(|p| normalized_similarity(candidate, p))
        .fold(0.0, f64::max)
}
