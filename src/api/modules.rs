use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiResult;
use crate::modules::{self, ComplexityReport};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(details))
        .route("/{id}/stats", get(stats))
        .route("/{id}/complexity", get(complexity))
}

async fn list(State(state): State<AppState>) -> Json<Value> {
    let modules = modules::list(&state.flows).await;
    Json(json!({ "count": modules.len(), "modules": modules }))
}

async fn details(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let module = modules::details(&state.flows, &id).await?;
    Ok(Json(json!({ "module": module })))
}

async fn stats(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let (module, statistics) = modules::stats(&state.flows, &id).await?;
    Ok(Json(json!({ "module": module, "statistics": statistics })))
}

async fn complexity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ComplexityReport>> {
    Ok(Json(modules::complexity(&state.flows, &id).await?))
}
