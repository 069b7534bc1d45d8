use axum::Json;
use serde_json::{Value, json};

use crate::util::now_rfc3339;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "OK", "timestamp": now_rfc3339() }))
}
