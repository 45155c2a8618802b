use serde::{Deserialize, Serialize};

use crate::catalog::PatternCatalog;

/// Wraps each keyword of `account_type` as `%keyword%`. Empty for an unknown
/// type. The result is meant for bind parameters, never for splicing into a
/// statement.
pub fn build_sql_patterns(catalog: &PatternCatalog, account_type: &str) -> Vec<String> {
    catalog
        .keywords_for_type(account_type)
        .into_iter()
        .map(|keyword| format!("%{keyword}%"))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlDialect {
    /// `LIKE` with `?` placeholders. SQLite's `LIKE` already ignores ASCII case.
    #[default]
    Sqlite,
    /// `ILIKE` with `$n` placeholders.
    Postgres,
}

/// A parenthesized `column LIKE ? OR ...` fragment and the values to bind to
/// it, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LikeClause {
    pub sql: String,
    pub params: Vec<String>,
}

impl LikeClause {
    pub fn any(column: &str, patterns: Vec<String>, dialect: SqlDialect) -> Option<Self> {
        Self::any_from(column, patterns, dialect, 1)
    }

    /// Like [`LikeClause::any`], numbering Postgres placeholders from
    /// `first_placeholder` so the clause can follow other bound parameters.
    pub fn any_from(
        column: &str,
        patterns: Vec<String>,
        dialect: SqlDialect,
        first_placeholder: usize,
    ) -> Option<Self> {
        if patterns.is_empty() {
            return None;
        }
        if !is_column_reference(column) {
            tracing::warn!("Refusing to build LIKE clause for column {column:?}");
            return None;
        }

        let terms: Vec<String> = (0..patterns.len())
            .map(|i| match dialect {
                SqlDialect::Sqlite => format!("{column} LIKE ?"),
                SqlDialect::Postgres => format!("{column} ILIKE ${}", first_placeholder + i),
            })
            .collect();

        Some(LikeClause {
            sql: format!("({})", terms.join(" OR ")),
            params: patterns,
        })
    }
}

/// `name` or `t.name`: ASCII identifiers, at most one qualifier.
fn is_column_reference(column: &str) -> bool {
    let parts: Vec<&str> = column.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
