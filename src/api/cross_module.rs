use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiResult;
use crate::cross_module::ValidationReport;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{workflow_id}", get(show).put(replace).delete(remove))
        .route("/{workflow_id}/validate", get(validate))
}

async fn list(State(state): State<AppState>) -> Json<Value> {
    let workflows = state.workflows.list().await;
    Json(json!({ "count": workflows.len(), "workflows": workflows }))
}

async fn show(State(state): State<AppState>, Path(workflow_id): Path<String>) -> ApiResult<Json<Value>> {
    let workflow = state.workflows.find(&workflow_id).await?;
    Ok(Json(json!({ "workflow": workflow })))
}

async fn create(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(body) = body?;
    let workflow = state.workflows.create(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Cross-module workflow created successfully",
            "workflow": workflow,
        })),
    ))
}

async fn replace(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    let workflow = state.workflows.replace(&workflow_id, body).await?;
    Ok(Json(json!({
        "message": "Cross-module workflow updated successfully",
        "workflow": workflow,
    })))
}

async fn remove(State(state): State<AppState>, Path(workflow_id): Path<String>) -> ApiResult<Json<Value>> {
    let (workflow, backup) = state.workflows.delete(&workflow_id).await?;
    Ok(Json(json!({
        "message": "Cross-module workflow deleted successfully",
        "deletedWorkflow": workflow,
        "backup": backup.map(|p| p.display().to_string()),
    })))
}

async fn validate(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> ApiResult<Json<ValidationReport>> {
    Ok(Json(state.workflows.validate(&workflow_id).await?))
}
