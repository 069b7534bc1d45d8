//! Offline consistency check over every data file.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::cross_module::CrossModuleStore;
use crate::docs::Docs;
use crate::store::FlowStore;
use crate::validation::{flow_problems, workflow_problems};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    /// `module/flow`, `module` or `workflow:ID`.
    pub scope: String,
    pub message: String,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.scope, self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub modules_checked: usize,
    pub flows_checked: usize,
    pub workflows_checked: usize,
    pub problems: Vec<Problem>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }

    fn push(&mut self, scope: impl Into<String>, message: impl Into<String>) {
        self.problems.push(Problem {
            scope: scope.into(),
            message: message.into(),
        });
    }
}

/// Check schema conformance, duplicate flow ids, cross-module references and
/// linked documents. Modules without a data file are skipped.
pub async fn run(flows: &FlowStore, workflows: &CrossModuleStore, docs: &Docs) -> AuditReport {
    let mut report = AuditReport::default();

    for module in flows.catalog().iter() {
        let Ok(path) = flows.module_path(module.id) else {
            continue;
        };
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!(module = module.id, "no data file");
            continue;
        }
        report.modules_checked += 1;

        let module_flows = match flows.read_module(module.id).await {
            Ok(f) => f,
            Err(e) => {
                report.push(module.id, e.to_string());
                continue;
            }
        };

        let mut seen = HashSet::new();
        for (index, flow) in module_flows.iter().enumerate() {
            report.flows_checked += 1;
            let label = flow
                .identifier()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("#{index}"));
            let scope = format!("{}/{label}", module.id);

            if let Some(id) = flow.identifier() {
                if !seen.insert(id.to_owned()) {
                    report.push(&scope, "duplicate flow id");
                }
            }
            match serde_json::to_value(flow) {
                Ok(value) => {
                    for problem in flow_problems(&value) {
                        report.push(&scope, format!("{} {}", problem.path, problem.message));
                    }
                }
                Err(e) => report.push(&scope, e.to_string()),
            }
            for reference in docs.missing(flow).await {
                report.push(&scope, format!("missing document {reference}"));
            }
        }
    }

    for workflow in workflows.list().await {
        report.workflows_checked += 1;
        let scope = format!("workflow:{}", workflow.workflow_id.as_deref().unwrap_or("?"));
        if let Ok(value) = serde_json::to_value(&workflow) {
            for problem in workflow_problems(&value) {
                report.push(&scope, format!("{} {}", problem.path, problem.message));
            }
        }
        let references = workflows.check_references(&workflow).await;
        for failure in references.failures() {
            let reason = failure.error.as_deref().unwrap_or("flow not found");
            report.push(
                &scope,
                format!("step {} ({}/{}): {reason}", failure.step, failure.module, failure.flow_id),
            );
        }
    }

    info!(
        modules = report.modules_checked,
        flows = report.flows_checked,
        workflows = report.workflows_checked,
        problems = report.problems.len(),
        "audit finished"
    );
    report
}
