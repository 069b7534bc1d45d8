use serde_json::{Value, json};
use tool_rpc::{Id, dispatch_line, jsonrpc};

use flowdocs::cross_module::CrossModuleStore;
use flowdocs::testing::Fixture;
use flowdocs::tools::ToolServer;

fn server(fx: &Fixture) -> ToolServer {
    let flows = fx.flow_store();
    let workflows = CrossModuleStore::new(flows.clone(), fx.settings.cross_module_files.clone());
    ToolServer::new(flows, workflows)
}

async fn call(srv: &ToolServer, id: i64, name: &str, arguments: Value) -> Value {
    let line = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
    .to_string();
    let response = dispatch_line(srv, &line).await.expect("a response");
    assert_eq!(response.id, Id::Number(id));
    response.result.expect("tool calls never fail at the protocol level")
}

fn text(result: &Value) -> &str {
    result["content"][0]["text"].as_str().unwrap()
}

#[tokio::test]
async fn handshake_and_listing() {
    let fx = Fixture::new();
    let srv = server(&fx);

    let init = dispatch_line(&srv, r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
        .await
        .unwrap();
    let result = init.result.unwrap();
    assert_eq!(result["serverInfo"]["name"], "flowdocs");
    assert_eq!(result["protocolVersion"], "2024-11-05");

    assert!(
        dispatch_line(&srv, r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .is_none()
    );

    let list = dispatch_line(&srv, r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
        .await
        .unwrap();
    let names: Vec<String> = list.result.unwrap()["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        names,
        [
            "search_flows",
            "get_flow",
            "list_flows",
            "get_cross_module_workflow",
            "find_flows_by_topic",
            "get_module_info",
            "list_all_modules"
        ]
    );
}

#[tokio::test]
async fn protocol_errors() {
    let fx = Fixture::new();
    let srv = server(&fx);

    let unknown = dispatch_line(&srv, r#"{"jsonrpc":"2.0","id":3,"method":"prompts/list"}"#)
        .await
        .unwrap();
    assert_eq!(unknown.error.unwrap().code, jsonrpc::METHOD_NOT_FOUND);

    let garbage = dispatch_line(&srv, "{oops").await.unwrap();
    assert_eq!(garbage.id, Id::Null);
    assert_eq!(garbage.error.unwrap().code, jsonrpc::PARSE_ERROR);
}

#[tokio::test]
async fn list_flows_groups_by_category() {
    let fx = Fixture::new();
    let srv = server(&fx);
    let result = call(&srv, 4, "list_flows", json!({ "module": "measure" })).await;
    let body = text(&result);
    assert!(body.starts_with("## Flows in MEASURE module (3 total)"), "{body}");
    assert!(body.contains("### Getting Started ("));
    assert!(body.contains("- **Create Dashboard** (flow_1)\n  Start an empty dashboard"));

    let filtered = call(&srv, 5, "list_flows", json!({ "module": "measure", "category": "Getting Started" })).await;
    assert!(text(&filtered).starts_with("## Flows in MEASURE module (1 total)"));
}

#[tokio::test]
async fn topic_search_merges_keyword_results() {
    let fx = Fixture::new();
    let srv = server(&fx);
    let result = call(&srv, 6, "find_flows_by_topic", json!({ "topic": "Dashboard" })).await;
    let body = text(&result);
    assert!(body.starts_with("Flows related to \"Dashboard\":"), "{body}");
    assert!(body.contains("📋 **Create Dashboard** (measure/flow_1)"));
    assert!(body.contains("📋 **Add a Widget** (measure/flow_2)"));
    assert!(!body.contains("Found "));
}

#[tokio::test]
async fn module_overview_lists_workflows() {
    let fx = Fixture::new();
    let srv = server(&fx);
    let result = call(&srv, 7, "list_all_modules", json!({})).await;
    let body = text(&result);
    assert!(body.starts_with("## Available Modules"));
    assert!(body.find("(`listen`)").unwrap() < body.find("(`vizia`)").unwrap());
    assert!(body.contains("- **Crisis Management** - Detect and respond to a brand crisis"));

    let unknown = call(&srv, 8, "get_module_info", json!({ "module": "gardening" })).await;
    assert_eq!(unknown["isError"], true);
    assert_eq!(text(&unknown), "Error: Unknown module: gardening");
}

#[tokio::test]
async fn bad_arguments_are_reported_in_band() {
    let fx = Fixture::new();
    let srv = server(&fx);
    let result = call(&srv, 9, "get_flow", json!({ "module": "listen" })).await;
    assert_eq!(result["isError"], true);
    assert!(text(&result).starts_with("Error: Invalid arguments"));
}
