use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiResult;
use crate::search::{AdvancedQuery, DEFAULT_LIMIT, DEFAULT_SUGGEST_LIMIT, Page, SearchResults};
use crate::util::coerce_int;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(search))
        .route("/suggest", get(suggest))
        .route("/advanced", post(advanced))
}

/// Query-string values are kept as text so a malformed number falls back to
/// its default instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    /// Accepted by the main search when `q` is absent or empty.
    query: Option<String>,
    module: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> ApiResult<Json<SearchResults>> {
    let page = Page::from_query(params.limit.as_deref(), params.offset.as_deref(), DEFAULT_LIMIT);
    let query = params
        .q
        .filter(|q| !q.is_empty())
        .or(params.query)
        .unwrap_or_default();
    let module = params.module.as_deref().filter(|m| !m.is_empty());
    Ok(Json(state.search.search(&query, module, page).await?))
}

async fn suggest(State(state): State<AppState>, Query(params): Query<SearchParams>) -> ApiResult<Json<Value>> {
    let query = params.q.unwrap_or_default();
    let limit = params
        .limit
        .as_deref()
        .and_then(coerce_int)
        .map_or(DEFAULT_SUGGEST_LIMIT, |l| l.max(0) as usize);
    let suggestions = state.search.suggest(&query, limit).await?;
    Ok(Json(json!({ "query": query, "suggestions": suggestions })))
}

async fn advanced(
    State(state): State<AppState>,
    body: Result<Json<AdvancedQuery>, JsonRejection>,
) -> ApiResult<Json<SearchResults>> {
    let Json(request) = body?;
    Ok(Json(state.search.advanced(request).await?))
}
