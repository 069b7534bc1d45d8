use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiResult;
use crate::diagram::{self, Diagram};
use crate::ordering::order_flows;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/{module}", get(list).post(create))
        .route(
            "/{module}/{flow_id}",
            get(show).put(replace).patch(patch).delete(remove),
        )
        .route("/{module}/{flow_id}/diagram", get(diagram))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    ordered: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    Path(module): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Value>> {
    let mut flows = state.flows.read_module(&module).await?;
    if params.ordered.as_deref() == Some("true") {
        flows = order_flows(flows, &module);
    }
    Ok(Json(json!({
        "module": module,
        "count": flows.len(),
        "flows": flows,
    })))
}

async fn show(
    State(state): State<AppState>,
    Path((module, flow_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let flow = state.flows.find_flow(&module, &flow_id).await?;
    Ok(Json(json!({ "module": module, "flow": flow })))
}

async fn create(
    State(state): State<AppState>,
    Path(module): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(body) = body?;
    let flow = state.flows.insert_flow(&module, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Flow created successfully",
            "module": module,
            "flow": flow,
        })),
    ))
}

async fn replace(
    State(state): State<AppState>,
    Path((module, flow_id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    let flow = state.flows.replace_flow(&module, &flow_id, body).await?;
    Ok(Json(json!({
        "message": "Flow updated successfully",
        "module": module,
        "flow": flow,
    })))
}

async fn patch(
    State(state): State<AppState>,
    Path((module, flow_id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    let flow = state.flows.patch_flow(&module, &flow_id, body).await?;
    Ok(Json(json!({
        "message": "Flow patched successfully",
        "module": module,
        "flow": flow,
    })))
}

async fn remove(
    State(state): State<AppState>,
    Path((module, flow_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let deleted = state.flows.delete_flow(&module, &flow_id).await?;
    Ok(Json(json!({
        "message": "Flow deleted successfully",
        "module": module,
        "deletedFlow": deleted,
    })))
}

async fn diagram(
    State(state): State<AppState>,
    Path((module, flow_id)): Path<(String, String)>,
) -> ApiResult<Json<Diagram>> {
    let flow = state.flows.find_flow(&module, &flow_id).await?;
    Ok(Json(diagram::build(&flow)))
}
