use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use clarify_core::AccountType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalize::normalize_text;

type TermTable = (AccountType, &'static [&'static str], &'static [&'static str], &'static [&'static str]);

/// `(type, hebrew, english, keywords)`. Keywords are the high-precision subset
/// used for SQL `LIKE` lookups; each must also appear among the type's terms.
pub const BUILTIN_TERMS: &[TermTable] = &[
    (
        AccountType::Savings,
        &["חיסכון", "חסכון", "פיקדון", "פקדון", "תוכנית חיסכון", "קופת חיסכון"],
        &["savings", "saving", "deposit", "fixed deposit", "savings plan"],
        &["חיסכון", "חסכון", "פיקדון", "פקדון", "savings"],
    ),
    (
        AccountType::StudyFund,
        &["קרן השתלמות", "השתלמות", "קופת גמל"],
        &["study fund", "education fund", "keren hishtalmut", "hishtalmut"],
        &["קרן השתלמות", "השתלמות", "study fund", "hishtalmut"],
    ),
    (
        AccountType::Provident,
        &["קופת גמל להשקעה", "גמל להשקעה", "קופת גמל", "גמל"],
        &["provident fund", "provident", "kupat gemel", "gemel"],
        &["גמל להשקעה", "קופת גמל", "provident"],
    ),
    (
        AccountType::Pension,
        &["פנסיה", "קרן פנסיה", "ביטוח מנהלים", "פנסיוני"],
        &["pension", "pension fund", "retirement", "managers insurance"],
        &["פנסיה", "קרן פנסיה", "pension"],
    ),
    (
        AccountType::Brokerage,
        &["ברוקר", "תיק השקעות", "ניירות ערך", "מסחר בבורסה", "מיטב טרייד"],
        &["brokerage", "broker", "interactive brokers", "ibkr", "securities", "trading account"],
        &["ניירות ערך", "תיק השקעות", "brokerage", "interactive brokers", "ibkr"],
    ),
    (
        AccountType::Crypto,
        &["קריפטו", "ביטקוין", "מטבע דיגיטלי"],
        &["crypto", "bitcoin", "ethereum", "binance", "coinbase", "kraken"],
        &["קריפטו", "ביטקוין", "crypto", "bitcoin", "binance", "coinbase"],
    ),
    (
        AccountType::MutualFund,
        &["קרן נאמנות", "קרנות נאמנות", "תעודת סל", "קרן מחקה"],
        &["mutual fund", "etf", "index fund", "fund units"],
        &["קרן נאמנות", "תעודת סל", "mutual fund", "etf"],
    ),
];

static BUILTIN: LazyLock<PatternCatalog> = LazyLock::new(|| {
    let entries = BUILTIN_TERMS
        .iter()
        .map(|(ty, hebrew, english, keywords)| CatalogEntry {
            account_type: ty.as_str().to_string(),
            hebrew: owned_terms(hebrew),
            english: owned_terms(english),
            keywords: owned_terms(keywords),
        })
        .collect();
    PatternCatalog { entries }
});

fn owned_terms(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| t.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub account_type: String,
    #[serde(default)]
    pub hebrew: Vec<String>,
    #[serde(default)]
    pub english: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl CatalogEntry {
    /// Hebrew terms followed by English terms.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.hebrew.iter().chain(self.english.iter()).map(String::as_str)
    }
}

/// One catalog term tagged with the type that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogPattern<'a> {
    pub pattern: &'a str,
    #[serde(rename = "type")]
    pub account_type: &'a str,
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse catalog TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Catalog entry has an empty account type")]
    EmptyAccountType,
    #[error("Duplicate account type: {0}")]
    DuplicateAccountType(String),
    #[error("Keyword '{keyword}' of '{account_type}' is not one of its patterns")]
    KeywordNotInPatterns { account_type: String, keyword: String },
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    entries: Vec<CatalogEntry>,
}

/// Read-only term table keyed by account type, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatternCatalog {
    entries: Vec<CatalogEntry>,
}

impl PatternCatalog {
    /// The catalog compiled into the binary, built on first use.
    pub fn builtin() -> &'static PatternCatalog {
        &BUILTIN
    }

    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self, CatalogError> {
        let catalog = PatternCatalog { entries };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(toml_content)?;
        Self::new(file.entries)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml(&content)?;
        tracing::info!(
            "Loaded pattern catalog from {} ({} types)",
            path.display(),
            catalog.len()
        );
        Ok(catalog)
    }

    /// Checks that type keys are non-empty and unique, and that every keyword
    /// is one of its own type's patterns once normalized.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if entry.account_type.trim().is_empty() {
                return Err(CatalogError::EmptyAccountType);
            }
            if !seen.insert(entry.account_type.as_str()) {
                return Err(CatalogError::DuplicateAccountType(entry.account_type.clone()));
            }

            let normalized: HashSet<String> = entry.patterns().map(normalize_text).collect();
            if let Some(keyword) = entry
                .keywords
                .iter()
                .find(|k| !normalized.contains(&normalize_text(k)))
            {
                return Err(CatalogError::KeywordNotInPatterns {
                    account_type: entry.account_type.clone(),
                    keyword: keyword.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn entry(&self, account_type: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.account_type == account_type)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn account_types(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.account_type.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hebrew then English terms; empty for an unknown type.
    pub fn patterns_for_type(&self, account_type: &str) -> Vec<&str> {
        self.entry(account_type)
            .map(|e| e.patterns().collect())
            .unwrap_or_default()
    }

    /// The keyword subset; empty for an unknown type.
    pub fn keywords_for_type(&self, account_type: &str) -> Vec<&str> {
        self.entry(account_type)
            .map(|e| e.keywords.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn all_patterns(&self) -> Vec<CatalogPattern<'_>> {
        self.entries
            .iter()
            .flat_map(|e| {
                e.patterns().map(|pattern| CatalogPattern {
                    pattern,
                    account_type: e.account_type.as_str(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_every_account_type() {
        let catalog = PatternCatalog::builtin();
        for ty in AccountType::ALL {
            assert!(catalog.entry(ty.as_str()).is_some(), "missing {ty}");
        }
        assert_eq!(catalog.len(), AccountType::ALL.len());
    }

    #[test]
    fn builtin_passes_validation() {
        PatternCatalog::builtin().validate().unwrap();
    }

    #[test]
    fn patterns_are_hebrew_then_english() {
        let patterns = PatternCatalog::builtin().patterns_for_type("crypto");
        assert_eq!(patterns.first(), Some(&"קריפטו"));
        assert_eq!(patterns.last(), Some(&"kraken"));
    }

    #[test]
    fn unknown_type_is_empty_not_an_error() {
        let catalog = PatternCatalog::builtin();
        assert!(catalog.patterns_for_type("unknown").is_empty());
        assert!(catalog.keywords_for_type("unknown").is_empty());
    }

    #[test]
    fn all_patterns_tags_owning_type() {
        let catalog = PatternCatalog::builtin();
        let all = catalog.all_patterns();
        assert!(all.len() > catalog.len());
        assert!(all.contains(&CatalogPattern { pattern: "קופת גמל", account_type: "study_fund" }));
        assert!(all.contains(&CatalogPattern { pattern: "etf", account_type: "mutual_fund" }));
        assert!(all.contains(&CatalogPattern {
            pattern: "interactive brokers",
            account_type: "brokerage"
        }));
    }

    #[test]
    fn catalog_pattern_serializes_type_field() {
        let p = CatalogPattern { pattern: "etf", account_type: "mutual_fund" };
        let json = serde_json::to_value(p).unwrap();
        assert_eq!(json, serde_json::json!({ "pattern": "etf", "type": "mutual_fund" }));
    }

    #[test]
    fn from_toml_loads_custom_types() {
        let catalog = PatternCatalog::from_toml(
            r#"
            [[entries]]
            account_type = "real_estate"
            hebrew = ["נדל\"ן"]
            english = ["real estate", "reit"]
            keywords = ["נדלן", "reit"]
            "#,
        )
        .unwrap();
        assert_eq!(catalog.account_types().collect::<Vec<_>>(), vec!["real_estate"]);
        assert_eq!(catalog.keywords_for_type("real_estate"), vec!["נדלן", "reit"]);
    }

    #[test]
    fn from_toml_rejects_stray_keyword() {
        let err = PatternCatalog::from_toml(
            r#"
            [[entries]]
            account_type = "savings"
            english = ["savings"]
            keywords = ["checking"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::KeywordNotInPatterns { .. }));
    }

    #[test]
    fn from_toml_rejects_duplicate_types() {
        let err = PatternCatalog::from_toml(
            r#"
            [[entries]]
            account_type = "crypto"
            [[entries]]
            account_type = "crypto"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateAccountType(t) if t == "crypto"));
    }

    #[test]
    fn from_toml_rejects_blank_type() {
        let err = PatternCatalog::from_toml("[[entries]]\naccount_type = \" \"\n").unwrap_err();
        assert!(matches!(err, CatalogError::EmptyAccountType));
    }

    #[test]
    fn from_toml_reports_parse_errors() {
        assert!(matches!(
            PatternCatalog::from_toml("entries = 3"),
            Err(CatalogError::Parse(_))
        ));
    }
}
