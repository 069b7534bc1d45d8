use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::AppState;
use super::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFlowRequest {
    #[serde(default)]
    module: Option<String>,
    #[serde(default)]
    flow_id: Option<String>,
    #[serde(default)]
    source_docs: Vec<String>,
}

/// Replace the source documents of a flow addressed by module and flow
/// display names.
pub async fn update_flow(
    State(state): State<AppState>,
    body: Result<Json<UpdateFlowRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = body?;
    let (Some(module), Some(flow_name)) = (
        request.module.filter(|m| !m.is_empty()),
        request.flow_id.filter(|f| !f.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Module and flowId are required"));
    };

    let backup = state
        .flows
        .update_source_documents(&module, &flow_name, request.source_docs)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Source documents updated successfully",
        "backup": backup.map(|p| p.display().to_string()),
    })))
}
