//! Per-module listings, details, statistics and complexity reports.

use std::collections::BTreeMap;

use chrono::DateTime;
use serde::Serialize;
use tracing::warn;

use crate::catalog::ModuleDescriptor;
use crate::complexity::{self, FlowComplexity, ModuleComplexity};
use crate::error::{Entity, FlowError, Result};
use crate::model::Flow;
use crate::ordering::{self, OTHER_CATEGORY};
use crate::store::FlowStore;

const LOAD_FAILED: &str = "Unable to load flows";
const RECENT: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSummary {
    #[serde(flatten)]
    pub module: ModuleDescriptor,
    pub flow_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowOutline {
    pub flow_id: Option<String>,
    pub flow_name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "isPrerequisite")]
    pub is_prerequisite: bool,
    pub dependencies: Vec<String>,
    /// Number of linked documents.
    pub source_documents: usize,
}

impl From<&Flow> for FlowOutline {
    fn from(flow: &Flow) -> Self {
        Self {
            flow_id: flow.identifier().map(str::to_owned),
            flow_name: flow.display_name().map(str::to_owned),
            description: flow.description.clone(),
            is_prerequisite: flow.is_prerequisite.unwrap_or(false),
            dependencies: flow.dependencies().to_vec(),
            source_documents: flow.source_documents().len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryOutline {
    pub name: String,
    pub description: String,
    pub flows: Vec<FlowOutline>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDetails {
    #[serde(flatten)]
    pub module: ModuleDescriptor,
    pub flow_count: usize,
    pub categories: Vec<CategoryOutline>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentUpdate {
    pub flow_id: Option<String>,
    pub flow_name: Option<String>,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStats {
    pub total_flows: usize,
    pub total_steps: usize,
    pub average_steps_per_flow: f64,
    pub prerequisite_flows: usize,
    pub flows_with_dependencies: usize,
    pub flows_with_documentation: usize,
    pub categories: BTreeMap<String, usize>,
    pub recently_updated: Vec<RecentUpdate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityReport {
    pub module: String,
    pub total_flows: usize,
    pub flows: Vec<FlowComplexity>,
    pub summary: ModuleComplexity,
}

fn descriptor(store: &FlowStore, id: &str) -> Result<ModuleDescriptor> {
    store
        .catalog()
        .get(id)
        .cloned()
        .ok_or_else(|| FlowError::not_found(Entity::Module, id))
}

/// Every catalog module with its flow count. Modules whose file cannot be
/// read report zero flows and an error note.
pub async fn list(store: &FlowStore) -> Vec<ModuleSummary> {
    let mut out = Vec::new();
    for module in store.catalog().iter() {
        let summary = match store.read_module(module.id).await {
            Ok(flows) => ModuleSummary {
                module: module.clone(),
                flow_count: flows.len(),
                error: None,
            },
            Err(e) => {
                warn!(module = module.id, error = %e, "module listed without flows");
                ModuleSummary {
                    module: module.clone(),
                    flow_count: 0,
                    error: Some(LOAD_FAILED),
                }
            }
        };
        out.push(summary);
    }
    out
}

/// Module metadata with its flows grouped by display category.
pub async fn details(store: &FlowStore, id: &str) -> Result<ModuleDetails> {
    let module = descriptor(store, id)?;
    let flows = ordering::order_flows(store.read_module(id).await?, id);
    let categories = ordering::group_by_category(&flows)
        .into_iter()
        .map(|group| CategoryOutline {
            name: group.name.to_string(),
            description: group.description.to_string(),
            flows: group.flows.into_iter().map(FlowOutline::from).collect(),
        })
        .collect();
    Ok(ModuleDetails {
        module,
        flow_count: flows.len(),
        categories,
    })
}

/// Aggregate counts for one module. An unreadable file counts as empty.
pub async fn stats(store: &FlowStore, id: &str) -> Result<(ModuleDescriptor, ModuleStats)> {
    let module = descriptor(store, id)?;
    let flows = match store.read_module(id).await {
        Ok(flows) => ordering::order_flows(flows, id),
        Err(e) => {
            warn!(module = id, error = %e, "stats computed without flows");
            Vec::new()
        }
    };
    Ok((module, compute_stats(&flows)))
}

pub fn compute_stats(flows: &[Flow]) -> ModuleStats {
    let mut categories = BTreeMap::new();
    let mut recent = Vec::new();
    let mut total_steps = 0;
    let mut prerequisite_flows = 0;
    let mut flows_with_dependencies = 0;
    let mut flows_with_documentation = 0;

    for flow in flows {
        total_steps += flow.steps().len();
        if flow.is_prerequisite == Some(true) {
            prerequisite_flows += 1;
        }
        if !flow.dependencies().is_empty() {
            flows_with_dependencies += 1;
        }
        if !flow.source_documents().is_empty() {
            flows_with_documentation += 1;
        }
        let category = flow.flow_category.clone().unwrap_or_else(|| OTHER_CATEGORY.to_string());
        *categories.entry(category).or_insert(0) += 1;
        if let Some(updated_at) = &flow.updated_at {
            recent.push(RecentUpdate {
                flow_id: flow.identifier().map(str::to_owned),
                flow_name: flow.display_name().map(str::to_owned),
                updated_at: updated_at.clone(),
            });
        }
    }

    recent.sort_by_key(|r| {
        std::cmp::Reverse(
            DateTime::parse_from_rfc3339(&r.updated_at)
                .map(|t| t.timestamp_millis())
                .unwrap_or(i64::MIN),
        )
    });
    recent.truncate(RECENT);

    let average = if flows.is_empty() {
        0.0
    } else {
        (total_steps as f64 / flows.len() as f64 * 10.0).round() / 10.0
    };

    ModuleStats {
        total_flows: flows.len(),
        total_steps,
        average_steps_per_flow: average,
        prerequisite_flows,
        flows_with_dependencies,
        flows_with_documentation,
        categories,
        recently_updated: recent,
    }
}

pub async fn complexity(store: &FlowStore, id: &str) -> Result<ComplexityReport> {
    let module = descriptor(store, id)?;
    let flows: Vec<FlowComplexity> = store
        .read_module(id)
        .await?
        .iter()
        .map(complexity::analyze)
        .collect();
    Ok(ComplexityReport {
        module: module.name.to_string(),
        total_flows: flows.len(),
        summary: complexity::summarize(&flows),
        flows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[tokio::test]
    async fn list_marks_unreadable_modules() {
        let fx = Fixture::new();
        let all = list(&fx.flow_store()).await;
        assert_eq!(all.len(), 11);
        let listen = all.iter().find(|m| m.module.id == "listen").unwrap();
        assert_eq!(listen.flow_count, 4);
        assert!(listen.error.is_none());
        let vizia = all.iter().find(|m| m.module.id == "vizia").unwrap();
        assert_eq!(vizia.flow_count, 0);
        assert_eq!(vizia.error, Some(LOAD_FAILED));
    }

    #[tokio::test]
    async fn details_group_by_ordered_category() {
        let fx = Fixture::new();
        let d = details(&fx.flow_store(), "listen").await.unwrap();
        assert_eq!(d.flow_count, 4);
        let names: Vec<_> = d.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Getting Started", "Data Interaction", "Other"]);
        assert_eq!(d.categories[0].flows.len(), 2);
        assert_eq!(d.categories[0].flows[0].source_documents, 1);
        assert!(d.categories[0].flows[0].is_prerequisite);

        assert!(details(&fx.flow_store(), "nope").await.unwrap_err().is_not_found());
        assert!(matches!(
            details(&fx.flow_store(), "vizia").await,
            Err(FlowError::Storage { .. })
        ));
    }

    #[tokio::test]
    async fn stats_are_tolerant_and_sorted() {
        let fx = Fixture::new();
        let (_, s) = stats(&fx.flow_store(), "listen").await.unwrap();
        assert_eq!(s.total_flows, 4);
        assert_eq!(s.total_steps, 7);
        assert_eq!(s.average_steps_per_flow, 1.8);
        assert_eq!(s.flows_with_documentation, 2);
        assert_eq!(s.flows_with_dependencies, 3);
        assert_eq!(s.prerequisite_flows, 1);
        assert_eq!(s.categories.get("Getting Started"), Some(&2));
        let recent: Vec<_> = s.recently_updated.iter().filter_map(|r| r.flow_id.as_deref()).collect();
        assert_eq!(recent, ["flow_002", "flow_001"]);

        let (_, empty) = stats(&fx.flow_store(), "vizia").await.unwrap();
        assert_eq!(empty.total_flows, 0);
        assert_eq!(empty.average_steps_per_flow, 0.0);
    }

    #[tokio::test]
    async fn complexity_report() {
        let fx = Fixture::new();
        let report = complexity(&fx.flow_store(), "measure").await.unwrap();
        assert_eq!(report.module, "Measure");
        assert_eq!(report.total_flows, 3);
        assert_eq!(report.summary.total_steps, 5);
    }
}
