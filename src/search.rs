//! Free-text search over module flows and cross-module workflows.
//!
//! Matching is a case-insensitive substring test. A hit on the name scores
//! 2, anything else scores 1. Ranking is a stable sort on score, so equal
//! scores keep discovery order: modules in id order, then file order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::cross_module::CrossModuleStore;
use crate::error::{FlowError, Result};
use crate::model::{CrossModuleWorkflow, Flow};
use crate::ordering;
use crate::store::FlowStore;
use crate::util::{coerce_int, coerce_json_int};

pub const DEFAULT_LIMIT: usize = 50;
pub const DEFAULT_SUGGEST_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 500;
pub const MIN_QUERY_LEN: usize = 2;
pub const MIN_SUGGEST_LEN: usize = 1;

const NAME_SCORE: u8 = 2;
const FIELD_SCORE: u8 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct FlowHit {
    pub module: String,
    pub flow: Flow,
    #[serde(rename = "matchedFields")]
    pub matched_fields: Vec<&'static str>,
    pub score: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowHit {
    pub workflow: CrossModuleWorkflow,
    #[serde(rename = "matchedFields")]
    pub matched_fields: Vec<&'static str>,
    pub score: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum SearchHit {
    #[serde(rename = "flow")]
    Flow(FlowHit),
    #[serde(rename = "cross-module")]
    CrossModule(WorkflowHit),
}

impl SearchHit {
    pub fn score(&self) -> u8 {
        match self {
            SearchHit::Flow(h) => h.score,
            SearchHit::CrossModule(h) => h.score,
        }
    }
}

/// Clamped `offset`/`limit` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    /// Negative values clamp to zero, limits above [`MAX_LIMIT`] clamp down,
    /// missing or unparsable values use the defaults.
    pub fn new(limit: Option<i64>, offset: Option<i64>, default_limit: usize) -> Self {
        let limit = limit.map_or(default_limit, |l| l.clamp(0, MAX_LIMIT as i64) as usize);
        let offset = offset.map_or(0, |o| o.max(0) as usize);
        Self { limit, offset }
    }

    /// From query-string values.
    pub fn from_query(limit: Option<&str>, offset: Option<&str>, default_limit: usize) -> Self {
        Self::new(limit.and_then(coerce_int), offset.and_then(coerce_int), default_limit)
    }

    /// From JSON body values.
    pub fn from_json(limit: Option<&Value>, offset: Option<&Value>, default_limit: usize) -> Self {
        Self::new(
            limit.and_then(coerce_json_int),
            offset.and_then(coerce_json_int),
            default_limit,
        )
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Body of an advanced search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdvancedQuery {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(flatten)]
    pub filters: AdvancedFilters,
    #[serde(default)]
    pub limit: Option<Value>,
    #[serde(default)]
    pub offset: Option<Value>,
}

/// Post-filters of an advanced search. Each one present narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_prerequisites: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_dependencies: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_documentation: Option<bool>,
}

impl AdvancedFilters {
    fn accepts(&self, hit: &FlowHit) -> bool {
        let flow = &hit.flow;
        if let Some(modules) = self.modules.as_ref().filter(|m| !m.is_empty()) {
            if !modules.contains(&hit.module) {
                return false;
            }
        }
        if let Some(categories) = self.categories.as_ref().filter(|c| !c.is_empty()) {
            let category = flow.flow_category.as_deref();
            if !categories.iter().any(|c| Some(c.as_str()) == category) {
                return false;
            }
        }
        if let Some(want) = self.has_prerequisites {
            if flow.is_prerequisite.unwrap_or(false) != want {
                return false;
            }
        }
        if let Some(want) = self.has_dependencies {
            if flow.dependencies().is_empty() == want {
                return false;
            }
        }
        if let Some(want) = self.has_documentation {
            if flow.source_documents().is_empty() == want {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<AdvancedFilters>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone)]
pub struct SearchEngine {
    flows: FlowStore,
    workflows: CrossModuleStore,
}

impl SearchEngine {
    pub fn new(flows: FlowStore, workflows: CrossModuleStore) -> Self {
        Self { flows, workflows }
    }

    /// Every matching flow in discovery order, unranked, carrying the
    /// category and dependency data of the ordering tables. A module that
    /// fails to load contributes nothing. An unknown `module` filter
    /// matches no module at all.
    pub async fn scan_flows(&self, query: &str, module: Option<&str>) -> Vec<FlowHit> {
        let needle = query.to_lowercase();
        let mut hits = Vec::new();
        for descriptor in self.flows.catalog().iter() {
            if module.is_some_and(|m| m != descriptor.id) {
                continue;
            }
            let mut flows = match self.flows.read_module(descriptor.id).await {
                Ok(flows) => flows,
                Err(e) => {
                    warn!(module = descriptor.id, error = %e, "module skipped during search");
                    continue;
                }
            };
            ordering::annotate(&mut flows, descriptor.id);
            for flow in flows {
                if let Some(hit) = match_flow(&needle, descriptor.id, flow) {
                    hits.push(hit);
                }
            }
        }
        hits
    }

    /// Ranked flow matches.
    pub async fn rank_flows(&self, query: &str, module: Option<&str>) -> Vec<FlowHit> {
        let mut hits = self.scan_flows(query, module).await;
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits
    }

    pub async fn scan_workflows(&self, query: &str) -> Vec<WorkflowHit> {
        let needle = query.to_lowercase();
        self.workflows
            .list()
            .await
            .into_iter()
            .filter_map(|w| match_workflow(&needle, w))
            .collect()
    }

    /// Ranked and paginated search. Without a module filter the
    /// cross-module workflows are searched too.
    pub async fn search(&self, query: &str, module: Option<&str>, page: Page) -> Result<SearchResults> {
        require_len(query, MIN_QUERY_LEN, "Search query must be at least 2 characters")?;

        let mut all: Vec<SearchHit> = self
            .scan_flows(query, module)
            .await
            .into_iter()
            .map(SearchHit::Flow)
            .collect();
        if module.is_none() {
            all.extend(
                self.scan_workflows(query)
                    .await
                    .into_iter()
                    .map(SearchHit::CrossModule),
            );
        }
        all.sort_by(|a, b| b.score().cmp(&a.score()));

        Ok(SearchResults {
            query: query.to_string(),
            filters: None,
            total: all.len(),
            limit: page.limit,
            offset: page.offset,
            results: page.apply(all),
        })
    }

    /// Flow names and categories containing `query`, unique, in discovery
    /// order.
    pub async fn suggest(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        require_len(query, MIN_SUGGEST_LEN, "Query must be at least 1 character")?;

        let needle = query.to_lowercase();
        let mut suggestions: Vec<String> = Vec::new();
        for hit in self.rank_flows(query, None).await {
            let candidates = [hit.flow.flow_name, hit.flow.flow_category];
            for candidate in candidates.into_iter().flatten() {
                if !suggestions.contains(&candidate) {
                    suggestions.push(candidate);
                }
            }
        }
        Ok(suggestions
            .into_iter()
            .filter(|s| s.to_lowercase().contains(&needle))
            .take(limit)
            .collect())
    }

    /// Flow-only search with post-filters.
    pub async fn advanced(&self, request: AdvancedQuery) -> Result<SearchResults> {
        let query = request.query.unwrap_or_default();
        require_len(&query, MIN_QUERY_LEN, "Search query must be at least 2 characters")?;
        let page = Page::from_json(request.limit.as_ref(), request.offset.as_ref(), DEFAULT_LIMIT);

        let filtered: Vec<SearchHit> = self
            .rank_flows(&query, None)
            .await
            .into_iter()
            .filter(|h| request.filters.accepts(h))
            .map(SearchHit::Flow)
            .collect();

        Ok(SearchResults {
            query,
            filters: Some(request.filters),
            total: filtered.len(),
            limit: page.limit,
            offset: page.offset,
            results: page.apply(filtered),
        })
    }
}

fn require_len(query: &str, min: usize, message: &str) -> Result<()> {
    if query.trim().chars().count() < min {
        return Err(FlowError::InvalidQuery(message.to_string()));
    }
    Ok(())
}

fn contains(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

fn score_of(fields: &[&str], name_field: &str) -> u8 {
    if fields.contains(&name_field) {
        NAME_SCORE
    } else {
        FIELD_SCORE
    }
}

/// Score one flow against an already lower-cased needle.
pub fn match_flow(needle: &str, module: &str, flow: Flow) -> Option<FlowHit> {
    let mut fields = Vec::new();
    if contains(flow.display_name(), needle) {
        fields.push("flow_name");
    }
    if contains(flow.description.as_deref(), needle) {
        fields.push("description");
    }
    if flow.steps().iter().any(|s| contains(s.search_text(), needle)) {
        fields.push("steps");
    }
    if fields.is_empty() {
        return None;
    }
    Some(FlowHit {
        module: module.to_string(),
        score: score_of(&fields, "flow_name"),
        matched_fields: fields,
        flow,
    })
}

pub fn match_workflow(needle: &str, workflow: CrossModuleWorkflow) -> Option<WorkflowHit> {
    let mut fields = Vec::new();
    if contains(workflow.workflow_name.as_deref(), needle) {
        fields.push("workflow_name");
    }
    if contains(workflow.description.as_deref(), needle) {
        fields.push("description");
    }
    if contains(workflow.business_value.as_deref(), needle) {
        fields.push("business_value");
    }
    if workflow
        .steps()
        .iter()
        .any(|s| contains(s.step_description.as_deref(), needle))
    {
        fields.push("workflow_steps");
    }
    if fields.is_empty() {
        return None;
    }
    Some(WorkflowHit {
        score: score_of(&fields, "workflow_name"),
        matched_fields: fields,
        workflow,
    })
}
