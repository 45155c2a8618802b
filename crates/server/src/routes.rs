use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use clarify_matching::pairing::{detect_card_vendor, extract_last4};
use clarify_matching::sql::build_sql_patterns;
use clarify_matching::{
    AccountMatcher, CardVendor, CatalogPattern, MatchConfig, MatchResult, PatternCatalog,
    TransactionDescriptor,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub catalog: PatternCatalog,
    pub matching: MatchConfig,
}

impl AppState {
    fn matcher(&self) -> AccountMatcher<'_> {
        AccountMatcher::with_config(&self.catalog, self.matching)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/accounts/match", post(match_account))
        .route("/api/accounts/detect", get(detect_account_type))
        .route("/api/accounts/sql-patterns", get(sql_patterns))
        .route("/api/accounts/patterns", get(all_patterns))
        .route("/api/pairings/detect", get(detect_pairing))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchRequest {
    account_name: String,
    account_type: String,
    #[serde(default)]
    transactions: Option<Vec<TransactionDescriptor>>,
}

async fn match_account(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MatchRequest>,
) -> Json<MatchResult> {
    let transactions = req.transactions.unwrap_or_default();
    Json(
        state
            .matcher()
            .match_account(&req.account_name, &req.account_type, &transactions),
    )
}

#[derive(Debug, Deserialize)]
struct NameQuery {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectResponse {
    account_type: Option<String>,
}

async fn detect_account_type(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NameQuery>,
) -> Json<DetectResponse> {
    let account_type = state
        .matcher()
        .detect_account_type(&query.name)
        .map(str::to_string);
    Json(DetectResponse { account_type })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountTypeQuery {
    #[serde(default)]
    account_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SqlPatternsResponse {
    account_type: String,
    patterns: Vec<String>,
}

async fn sql_patterns(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccountTypeQuery>,
) -> Json<SqlPatternsResponse> {
    let patterns = build_sql_patterns(&state.catalog, &query.account_type);
    Json(SqlPatternsResponse {
        account_type: query.account_type,
        patterns,
    })
}

#[derive(Debug, Serialize)]
struct PatternEntry {
    pattern: String,
    #[serde(rename = "type")]
    account_type: String,
}

impl From<CatalogPattern<'_>> for PatternEntry {
    fn from(p: CatalogPattern<'_>) -> Self {
        Self {
            pattern: p.pattern.to_string(),
            account_type: p.account_type.to_string(),
        }
    }
}

async fn all_patterns(State(state): State<Arc<AppState>>) -> Json<Vec<PatternEntry>> {
    Json(
        state
            .catalog
            .all_patterns()
            .into_iter()
            .map(PatternEntry::from)
            .collect(),
    )
}

#[derive(Debug, Serialize)]
struct PairingDetectResponse {
    vendor: Option<CardVendor>,
    last4: Option<String>,
}

async fn detect_pairing(Query(query): Query<NameQuery>) -> Json<PairingDetectResponse> {
    Json(PairingDetectResponse {
        vendor: detect_card_vendor(&query.name),
        last4: extract_last4(&query.name),
    })
}
