//! Argument types of each tool. Their JSON Schemas are what `tools/list`
//! advertises.

use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchFlowsArgs {
    /// Search term to find in flow names, descriptions, or steps
    pub query: String,
    /// Optional: filter by module id (e.g. 'listen', 'measure', 'engage')
    #[serde(default)]
    pub module: Option<String>,
    /// Maximum number of results to return (default: 10)
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetFlowArgs {
    /// Module id (e.g. 'listen', 'measure', 'engage')
    pub module: String,
    /// Flow id, legacy id, or the lower_snake_case flow name (e.g. 'flow_001')
    pub flow_id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListFlowsArgs {
    /// Module id (e.g. 'listen', 'measure', 'engage')
    pub module: String,
    /// Optional: only flows in this category
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetWorkflowArgs {
    /// Workflow id, lower_snake_case name, or file name such as 'crisis_management'
    pub workflow_name: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TopicArgs {
    /// Topic to search for (e.g. 'alerts', 'dashboard', 'reporting', 'social media')
    pub topic: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ModuleArgs {
    /// Module id (e.g. 'listen', 'measure', 'engage')
    pub module: String,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct NoArgs {}
