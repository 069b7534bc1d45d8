use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use regex::Regex;
use serde_json::{Value, json};
use tower::ServiceExt; // for `app.oneshot()`

use flowdocs::api::{AppState, router};
use flowdocs::testing::Fixture;

fn app(fx: &Fixture) -> Router {
    router(AppState::from_settings(&fx.settings))
}

async fn send(fx: &Fixture, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
    };
    let response = app(fx)
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn get(fx: &Fixture, uri: &str) -> (StatusCode, Value) {
    send(fx, "GET", uri, None).await
}

fn new_flow(name: &str) -> Value {
    json!({
        "flow_name": name,
        "description": "Queue a post for later",
        "steps": ["Open composer", "Pick a time"]
    })
}

#[tokio::test]
async fn health_and_fallback() {
    let fx = Fixture::new();
    let (status, body) = get(&fx, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert!(body["timestamp"].is_string());

    let (status, body) = get(&fx, "/api/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Not Found" }));
}

#[tokio::test]
async fn module_listing_survives_missing_files() {
    let fx = Fixture::new();
    let (status, body) = get(&fx, "/api/modules").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 11);
    let modules = body["modules"].as_array().unwrap();
    let listen = modules.iter().find(|m| m["id"] == "listen").unwrap();
    assert_eq!(listen["flowCount"], 4);
    assert!(listen.get("error").is_none());
    let advertise = modules.iter().find(|m| m["id"] == "advertise").unwrap();
    assert_eq!(advertise["flowCount"], 0);
    assert_eq!(advertise["error"], "Unable to load flows");
}

#[tokio::test]
async fn module_details_stats_and_complexity() {
    let fx = Fixture::new();
    let (status, body) = get(&fx, "/api/modules/listen").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["module"]["flowCount"], 4);
    assert_eq!(body["module"]["categories"][0]["name"], "Getting Started");

    let (status, body) = get(&fx, "/api/modules/listen/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["module"]["id"], "listen");
    assert_eq!(body["statistics"]["totalFlows"], 4);

    let (status, body) = get(&fx, "/api/modules/measure/complexity").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalFlows"], 3);

    let (status, _) = get(&fx, "/api/modules/nothing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn flows_in_file_or_display_order() {
    let fx = Fixture::new();
    let (status, body) = get(&fx, "/api/flows/measure").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["flows"][0]["flow_id"], "flow_2");

    let (_, body) = get(&fx, "/api/flows/measure?ordered=true").await;
    assert_eq!(body["flows"][0]["flow_id"], "flow_1");
    assert!(
        body["flows"]
            .as_array()
            .unwrap()
            .iter()
            .all(|f| f["isPrerequisite"].is_boolean())
    );

    let (status, body) = get(&fx, "/api/flows/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("unknown"));
}

#[tokio::test]
async fn single_flow_by_slug() {
    let fx = Fixture::new();
    let (status, body) = get(&fx, "/api/flows/listen/create_a_query").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flow"]["flow_id"], "flow_001");

    let (status, _) = get(&fx, "/api/flows/listen/not_here").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_generates_prefixed_ids_and_rejects_duplicates() {
    let fx = Fixture::new();
    let (status, body) = send(&fx, "POST", "/api/flows/publish", Some(new_flow("Queue a Post"))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["flow"]["flow_id"].as_str().unwrap();
    assert!(Regex::new("^PUB_[A-Z0-9]+$").unwrap().is_match(id), "{id}");
    assert_eq!(body["flow"]["version"], "1.0.0");

    let mut explicit = new_flow("Queue Twice");
    explicit["flow_id"] = json!("PUB_TWICE");
    let (status, _) = send(&fx, "POST", "/api/flows/publish", Some(explicit.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(&fx, "POST", "/api/flows/publish", Some(explicit)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_bodies_are_rejected_with_details() {
    let fx = Fixture::new();
    let (status, body) = send(
        &fx,
        "POST",
        "/api/flows/publish",
        Some(json!({ "flow_name": "No steps", "description": "d", "steps": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["details"].as_array().unwrap().is_empty());

    let response = app(&fx)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/flows/publish")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn put_bumps_version_and_logs_the_change() {
    let fx = Fixture::new();
    let (status, body) = send(
        &fx,
        "PUT",
        "/api/flows/publish/BW_PUB_001",
        Some(new_flow("Compose a Post")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flow"]["flow_id"], "BW_PUB_001");
    assert_eq!(body["flow"]["version"], "1.0.1");
    assert_eq!(body["flow"]["change_log"][0]["source"], "API");
}

#[tokio::test]
async fn patch_merges_over_the_stored_flow() {
    let fx = Fixture::new();
    let (status, body) = send(
        &fx,
        "PATCH",
        "/api/flows/publish/BW_PUB_005",
        Some(json!({ "description": "Queue it" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flow"]["description"], "Queue it");
    assert_eq!(body["flow"]["flow_name"], "Schedule a Post");
}

#[tokio::test]
async fn delete_backs_up_once_and_removes() {
    let fx = Fixture::new();
    let (status, body) = send(&fx, "DELETE", "/api/flows/measure/flow_1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deletedFlow"]["flow_name"], "Create Dashboard");
    assert_eq!(fx.backups().len(), 1);

    let (status, _) = get(&fx, "/api/flows/measure/flow_1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn diagram_marks_questions_as_decisions() {
    let fx = Fixture::new();
    let (status, body) = get(&fx, "/api/flows/listen/flow_007/diagram").await;
    assert_eq!(status, StatusCode::OK);
    let nodes = body["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 4);
    assert_eq!(nodes[0]["type"], "start");
    assert_eq!(nodes[2]["type"], "decision");
    assert_eq!(nodes[3]["type"], "end");
    assert_eq!(body["edges"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn search_ranks_and_validates_length() {
    let fx = Fixture::new();
    let (status, body) = get(&fx, "/api/search?q=query&module=listen").await;
    assert_eq!(status, StatusCode::OK);
    let first = &body["results"][0];
    assert_eq!(first["type"], "flow");
    assert_eq!(first["flow"]["flow_id"], "flow_001");
    assert!(
        first["matchedFields"]
            .as_array()
            .unwrap()
            .contains(&json!("flow_name"))
    );

    let (status, body) = get(&fx, "/api/search?q=q").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Search query must be at least 2 characters");

    let (_, body) = get(&fx, "/api/search?q=open&limit=-5&offset=abc").await;
    assert_eq!(body["limit"], 0);
    assert_eq!(body["offset"], 0);
    assert!(body["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn search_accepts_query_parameter() {
    let fx = Fixture::new();
    let (status, body) = get(&fx, "/api/search?query=keywords&module=listen").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "keywords");
    assert_eq!(body["total"], 1);
    assert_eq!(body["results"][0]["flow"]["flow_id"], "flow_001");

    let (_, body) = get(&fx, "/api/search?q=&query=keywords").await;
    assert_eq!(body["query"], "keywords");

    let (_, body) = get(&fx, "/api/search?q=dashboard&query=keywords").await;
    assert_eq!(body["query"], "dashboard");
}

#[tokio::test]
async fn suggestions_and_advanced_search() {
    let fx = Fixture::new();
    let (status, body) = get(&fx, "/api/search/suggest?q=dash").await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        body["suggestions"]
            .as_array()
            .unwrap()
            .contains(&json!("Create Dashboard"))
    );

    let (status, body) = send(
        &fx,
        "POST",
        "/api/search/advanced",
        Some(json!({ "query": "open", "modules": ["measure"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r["module"] == "measure"));
    assert_eq!(body["filters"]["modules"], json!(["measure"]));
}

#[tokio::test]
async fn cross_module_lifecycle() {
    let fx = Fixture::new();
    let (status, body) = get(&fx, "/api/cross-module").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (status, body) = get(&fx, "/api/cross-module/CROSS_CONTENT/validate").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    let failing: Vec<&Value> = body["validation"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|v| v["valid"] == false)
        .collect();
    assert_eq!(failing.len(), 1);

    let (status, body) = send(
        &fx,
        "POST",
        "/api/cross-module",
        Some(json!({
            "workflow_name": "Launch Review",
            "description": "Review a launch across modules",
            "modules_involved": ["listen", "measure"],
            "workflow_steps": [
                { "step_id": 1, "module": "listen", "step_description": "Track launch mentions" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["workflow"]["workflow_id"].as_str().unwrap().to_string();
    assert!(id.starts_with("CROSS_"));

    let (status, _) = get(&fx, &format!("/api/cross-module/{id}")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&fx, "DELETE", "/api/cross-module/CROSS_CRISIS", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["backup"].is_string());
    let (status, _) = get(&fx, "/api/cross-module/CROSS_CRISIS").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_flow_replaces_source_documents() {
    let fx = Fixture::new();
    let (status, body) = send(
        &fx,
        "POST",
        "/api/update-flow",
        Some(json!({ "module": "Listen", "flowId": "Create a Query", "sourceDocs": ["docs/new.pdf"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = get(&fx, "/api/flows/listen/flow_001").await;
    assert_eq!(body["flow"]["source_documents"], json!(["docs/new.pdf"]));

    let (status, body) = send(&fx, "POST", "/api/update-flow", Some(json!({ "flowId": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Module and flowId are required");
}
