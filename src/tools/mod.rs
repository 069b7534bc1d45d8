//! Stdio tool server: answers `tools/list` and `tools/call` with text
//! summaries of flows, modules and cross-module workflows.

pub mod args;
pub mod render;

use std::str::FromStr;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tool_rpc::{RpcHandler, ToolMethod, jsonrpc};
use tracing::debug;

use crate::cross_module::CrossModuleStore;
use crate::logger::RequestMetrics;
use crate::ordering::{group_by_category, order_flows};
use crate::search::SearchEngine;
use crate::store::FlowStore;

use args::{GetFlowArgs, GetWorkflowArgs, ListFlowsArgs, ModuleArgs, NoArgs, SearchFlowsArgs, TopicArgs};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "flowdocs";
const DEFAULT_TOOL_LIMIT: usize = 10;
const TOPIC_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    SearchFlows,
    GetFlow,
    ListFlows,
    GetCrossModuleWorkflow,
    FindFlowsByTopic,
    GetModuleInfo,
    ListAllModules,
}

impl ToolName {
    pub const ALL: [ToolName; 7] = [
        ToolName::SearchFlows,
        ToolName::GetFlow,
        ToolName::ListFlows,
        ToolName::GetCrossModuleWorkflow,
        ToolName::FindFlowsByTopic,
        ToolName::GetModuleInfo,
        ToolName::ListAllModules,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::SearchFlows => "search_flows",
            ToolName::GetFlow => "get_flow",
            ToolName::ListFlows => "list_flows",
            ToolName::GetCrossModuleWorkflow => "get_cross_module_workflow",
            ToolName::FindFlowsByTopic => "find_flows_by_topic",
            ToolName::GetModuleInfo => "get_module_info",
            ToolName::ListAllModules => "list_all_modules",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolName::SearchFlows => {
                "Search for flows across all modules. Returns flows that match the search query."
            }
            ToolName::GetFlow => "Get detailed information about a specific flow",
            ToolName::ListFlows => "List all flows in a specific module",
            ToolName::GetCrossModuleWorkflow => "Get details of cross-module workflows",
            ToolName::FindFlowsByTopic => {
                "Find flows related to a specific topic or use case (e.g. 'alerts', 'dashboard', 'reporting')"
            }
            ToolName::GetModuleInfo => "Get information about a specific module and its capabilities",
            ToolName::ListAllModules => "List all available modules with brief descriptions",
        }
    }

    pub fn input_schema(&self) -> Value {
        let schema = match self {
            ToolName::SearchFlows => schemars::schema_for!(SearchFlowsArgs),
            ToolName::GetFlow => schemars::schema_for!(GetFlowArgs),
            ToolName::ListFlows => schemars::schema_for!(ListFlowsArgs),
            ToolName::GetCrossModuleWorkflow => schemars::schema_for!(GetWorkflowArgs),
            ToolName::FindFlowsByTopic => schemars::schema_for!(TopicArgs),
            ToolName::GetModuleInfo => schemars::schema_for!(ModuleArgs),
            ToolName::ListAllModules => schemars::schema_for!(NoArgs),
        };
        serde_json::to_value(schema).unwrap_or_else(|_| json!({ "type": "object" }))
    }
}

impl FromStr for ToolName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| anyhow!("Unknown tool: {s}"))
    }
}

/// The `tools/list` result.
pub fn tool_list() -> Value {
    let tools: Vec<Value> = ToolName::ALL
        .iter()
        .map(|t| {
            json!({
                "name": t.as_str(),
                "description": t.description(),
                "inputSchema": t.input_schema(),
            })
        })
        .collect();
    json!({ "tools": tools })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// Result of one `tools/call`. Failures are reported in-band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolOutput {
    pub content: Vec<TextContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![TextContent {
                kind: "text".into(),
                text: text.into(),
            }],
            is_error: false,
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        let mut out = Self::text(format!("Error: {message:#}"));
        out.is_error = true;
        out
    }

    /// Concatenated text of every content item.
    pub fn body(&self) -> String {
        self.content.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join("\n")
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ToolServer {
    flows: FlowStore,
    workflows: CrossModuleStore,
    search: SearchEngine,
    metrics: RequestMetrics,
}

impl ToolServer {
    pub fn new(flows: FlowStore, workflows: CrossModuleStore) -> Self {
        let search = SearchEngine::new(flows.clone(), workflows.clone());
        Self {
            flows,
            workflows,
            search,
            metrics: RequestMetrics::new(),
        }
    }

    /// Run one tool. Never fails: errors become an `isError` output.
    pub async fn call(&self, name: &str, arguments: Option<Value>) -> ToolOutput {
        let request = format!("tool.{name}");
        let outcome = self
            .metrics
            .instrument_request(&request, self.dispatch(name, arguments))
            .await;
        match outcome {
            Ok(text) => ToolOutput::text(text),
            Err(e) => ToolOutput::error(e),
        }
    }

    async fn dispatch(&self, name: &str, arguments: Option<Value>) -> anyhow::Result<String> {
        let tool = ToolName::from_str(name)?;
        let arguments = arguments.unwrap_or_else(|| json!({}));
        match tool {
            ToolName::SearchFlows => self.search_flows(parse(arguments)?).await,
            ToolName::GetFlow => self.get_flow(parse(arguments)?).await,
            ToolName::ListFlows => self.list_flows(parse(arguments)?).await,
            ToolName::GetCrossModuleWorkflow => self.get_workflow(parse(arguments)?).await,
            ToolName::FindFlowsByTopic => self.find_by_topic(parse(arguments)?).await,
            ToolName::GetModuleInfo => self.module_info(parse(arguments)?),
            ToolName::ListAllModules => {
                let NoArgs {} = parse(arguments)?;
                self.list_modules().await
            }
        }
    }

    async fn search_flows(&self, args: SearchFlowsArgs) -> anyhow::Result<String> {
        let limit = args.limit.map(|l| l as usize).unwrap_or(DEFAULT_TOOL_LIMIT);
        Ok(self.search_text(&args.query, args.module.as_deref(), limit).await)
    }

    async fn search_text(&self, query: &str, module: Option<&str>, limit: usize) -> String {
        let mut hits = self.search.scan_flows(query, module).await;
        hits.truncate(limit);
        render::search_results(query, &hits)
    }

    async fn get_flow(&self, args: GetFlowArgs) -> anyhow::Result<String> {
        let flows = self.flows.read_module(&args.module).await?;
        // ordering fills in the category of flows that lack one
        let ordered = order_flows(flows, &args.module);
        let flow = crate::resolve::find(&ordered, &args.flow_id)
            .with_context(|| format!("Flow {} not found in module {}", args.flow_id, args.module))?;
        Ok(render::flow(&args.module, flow))
    }

    async fn list_flows(&self, args: ListFlowsArgs) -> anyhow::Result<String> {
        let flows = self.flows.read_module(&args.module).await?;
        let mut ordered = order_flows(flows, &args.module);
        if let Some(category) = args.category.as_deref() {
            ordered.retain(|f| f.flow_category.as_deref() == Some(category));
        }
        let groups = group_by_category(&ordered);
        Ok(render::flow_list(&args.module, ordered.len(), &groups))
    }

    async fn get_workflow(&self, args: GetWorkflowArgs) -> anyhow::Result<String> {
        let workflow = self.workflows.find_any(&args.workflow_name).await?;
        Ok(render::workflow(&workflow))
    }

    async fn find_by_topic(&self, args: TopicArgs) -> anyhow::Result<String> {
        let lowered = args.topic.to_lowercase();
        let keywords: Vec<&str> = match topic_keywords(&lowered) {
            Some(words) => words.to_vec(),
            None => vec![lowered.as_str()],
        };
        let mut sections = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            debug!(keyword, "topic search");
            sections.push(self.search_text(keyword, None, TOPIC_LIMIT).await);
        }
        Ok(render::topic(&args.topic, &sections))
    }

    fn module_info(&self, args: ModuleArgs) -> anyhow::Result<String> {
        let module = self
            .flows
            .catalog()
            .get(&args.module)
            .ok_or_else(|| anyhow!("Unknown module: {}", args.module))?;
        Ok(render::module_info(module))
    }

    async fn list_modules(&self) -> anyhow::Result<String> {
        let catalog = self.flows.catalog();
        let workflows = self.workflows.list().await;
        Ok(render::module_index(&catalog.sorted(), &workflows))
    }
}

fn parse<T: DeserializeOwned>(arguments: Value) -> anyhow::Result<T> {
    serde_json::from_value(arguments).context("Invalid arguments")
}

fn topic_keywords(topic: &str) -> Option<&'static [&'static str]> {
    let words: &'static [&'static str] = match topic {
        "alerts" => &["alert", "notification", "warning", "trigger"],
        "dashboard" => &["dashboard", "panel", "widget", "visualization"],
        "reporting" => &["report", "export", "analysis", "insight"],
        "social media" => &["facebook", "twitter", "instagram", "linkedin"],
        "monitoring" => &["monitor", "track", "watch", "observe"],
        "engagement" => &["engage", "respond", "reply", "interact"],
        "analytics" => &["analytics", "metrics", "measure", "data"],
        "influencer" => &["influencer", "influence", "creator", "ambassador"],
        _ => return None,
    };
    Some(words)
}

#[async_trait]
impl RpcHandler for ToolServer {
    async fn handle(&self, method: &str, params: Option<Value>) -> Result<Value, jsonrpc::Error> {
        let method = ToolMethod::from_str(method).map_err(|_| jsonrpc::Error::method_not_found(method))?;
        match method {
            ToolMethod::Initialize => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            })),
            ToolMethod::Ping | ToolMethod::Initialized => Ok(json!({})),
            ToolMethod::ToolsList => Ok(tool_list()),
            ToolMethod::ToolsCall => {
                let params = params.ok_or_else(|| jsonrpc::Error::invalid_params("missing params"))?;
                let call: CallParams =
                    serde_json::from_value(params).map_err(|e| jsonrpc::Error::invalid_params(e.to_string()))?;
                let output = self.call(&call.name, call.arguments).await;
                serde_json::to_value(output).map_err(|e| jsonrpc::Error::internal(e.to_string()))
            }
        }
    }

    async fn notify(&self, method: &str, _params: Option<Value>) {
        debug!(method, "notification");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    fn server(fx: &Fixture) -> ToolServer {
        let flows = fx.flow_store();
        let workflows = CrossModuleStore::new(flows.clone(), fx.settings.cross_module_files.clone());
        ToolServer::new(flows, workflows)
    }

    #[test]
    fn every_tool_advertises_an_object_schema() {
        let list = tool_list();
        let tools = list["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 7);
        for tool in tools {
            assert_eq!(tool["inputSchema"]["type"], "object", "{}", tool["name"]);
        }
        let search = tools.iter().find(|t| t["name"] == "search_flows").unwrap();
        assert!(search["inputSchema"]["properties"]["query"].is_object());
        let required = search["inputSchema"]["required"].as_array().unwrap();
        assert!(required.iter().any(|r| r == "query"));
    }

    #[test]
    fn topics_expand_to_keywords() {
        assert_eq!(topic_keywords("alerts").unwrap()[0], "alert");
        assert!(topic_keywords("gardening").is_none());
    }

    #[tokio::test]
    async fn unknown_tool_is_an_in_band_error() {
        let fx = Fixture::new();
        let out = server(&fx).call("make_coffee", None).await;
        assert!(out.is_error);
        assert_eq!(out.body(), "Error: Unknown tool: make_coffee");
    }

    #[tokio::test]
    async fn search_keeps_discovery_order_and_limit() {
        let fx = Fixture::new();
        let out = server(&fx)
            .call("search_flows", Some(json!({ "query": "open", "limit": 2 })))
            .await;
        assert!(!out.is_error);
        let body = out.body();
        assert!(body.starts_with("Found 2 flows matching \"open\":"), "{body}");
        assert!(body.contains("Matched in: steps"));
    }

    #[tokio::test]
    async fn get_flow_renders_markdown() {
        let fx = Fixture::new();
        let out = server(&fx)
            .call("get_flow", Some(json!({ "module": "listen", "flow_id": "create_a_query" })))
            .await;
        let body = out.body();
        assert!(body.starts_with("## Create a Query"), "{body}");
        assert!(body.contains("**ID**: flow_001"));
        assert!(body.contains("   1. Click New Query"));
        assert!(body.contains("   - docs/listen/create_query.pdf"));
    }

    #[tokio::test]
    async fn missing_flow_reports_error() {
        let fx = Fixture::new();
        let out = server(&fx)
            .call("get_flow", Some(json!({ "module": "listen", "flow_id": "nope" })))
            .await;
        assert!(out.is_error);
        assert!(out.body().contains("Flow nope not found in module listen"));
    }

    #[tokio::test]
    async fn workflow_by_file_stem() {
        let fx = Fixture::new();
        let out = server(&fx)
            .call("get_cross_module_workflow", Some(json!({ "workflow_name": "crisis_management" })))
            .await;
        assert!(!out.is_error, "{}", out.body());
        assert!(out.body().starts_with("## Crisis Management"));
    }

    #[tokio::test]
    async fn tools_call_over_rpc() {
        let fx = Fixture::new();
        let srv = server(&fx);
        let result = srv
            .handle("tools/call", Some(json!({ "name": "get_module_info", "arguments": { "module": "listen" } })))
            .await
            .unwrap();
        assert_eq!(result["isError"], false);
        assert!(result["content"][0]["text"].as_str().unwrap().contains("list_flows"));

        let err = srv.handle("resources/list", None).await.unwrap_err();
        assert_eq!(err.code, jsonrpc::METHOD_NOT_FOUND);
    }
}
