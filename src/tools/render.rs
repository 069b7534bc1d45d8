//! Markdown-ish text returned by the tools.

use std::fmt::Write;

use serde_json::Value;

use crate::catalog::ModuleDescriptor;
use crate::model::{CrossModuleWorkflow, Flow};
use crate::ordering::{CategoryGroup, OTHER_CATEGORY};
use crate::search::FlowHit;

/// Header line of a search listing. [`find_flows_by_topic`] strips it.
pub fn search_header(count: usize, query: &str) -> String {
    format!("Found {count} flows matching \"{query}\":")
}

fn matched_label(field: &str) -> &str {
    match field {
        "flow_name" => "name",
        other => other,
    }
}

pub fn search_results(query: &str, hits: &[FlowHit]) -> String {
    let entries: Vec<String> = hits
        .iter()
        .map(|hit| {
            let fields: Vec<&str> = hit.matched_fields.iter().map(|f| matched_label(f)).collect();
            format!(
                "📋 **{}** ({}/{})\n   {}\n   Matched in: {}",
                hit.flow.display_name().unwrap_or(""),
                hit.module,
                hit.flow.identifier().unwrap_or(""),
                hit.flow.description.as_deref().unwrap_or("No description"),
                fields.join(", ")
            )
        })
        .collect();
    format!("{}\n\n{}", search_header(hits.len(), query), entries.join("\n\n"))
}

pub fn flow(module: &str, flow: &Flow) -> String {
    let steps = flow.steps();
    let mut out = String::new();
    let _ = writeln!(out, "## {}", flow.display_name().unwrap_or("Unnamed Flow"));
    let _ = writeln!(out, "**Module**: {module}");
    let _ = writeln!(out, "**ID**: {}", flow.identifier().unwrap_or(""));
    let _ = writeln!(
        out,
        "**Category**: {}",
        flow.flow_category.as_deref().unwrap_or("General")
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "**Description**: {}",
        flow.description.as_deref().unwrap_or("No description available")
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "**Steps** ({}):", steps.len());
    for (i, step) in steps.iter().enumerate() {
        let _ = writeln!(out, "   {}. {}", i + 1, step.display_text().unwrap_or(""));
    }
    let _ = writeln!(out);
    if !flow.prerequisites().is_empty() {
        let _ = writeln!(out, "**Prerequisites**: {}", flow.prerequisites().join(", "));
    }
    if !flow.dependencies().is_empty() {
        let _ = writeln!(out, "**Dependencies**: {}", flow.dependencies().join(", "));
    }
    if !flow.source_documents().is_empty() {
        let _ = writeln!(out, "**Source Documents**: ");
        for doc in flow.source_documents() {
            let _ = writeln!(out, "   - {doc}");
        }
    }
    out.trim_end().to_string()
}

pub fn flow_list(module: &str, total: usize, groups: &[CategoryGroup<'_>]) -> String {
    let mut out = format!("## Flows in {} module ({total} total)\n\n", module.to_uppercase());
    for group in groups {
        let name = if group.name.is_empty() { OTHER_CATEGORY } else { group.name };
        let _ = writeln!(out, "### {name} ({} flows)", group.flows.len());
        for f in &group.flows {
            let _ = writeln!(
                out,
                "- **{}** ({})\n  {}",
                f.display_name().unwrap_or("Unnamed"),
                f.identifier().unwrap_or(""),
                f.description.as_deref().unwrap_or("")
            );
        }
        out.push('\n');
    }
    out
}

fn step_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn workflow(workflow: &CrossModuleWorkflow) -> String {
    let steps: Vec<String> = workflow
        .steps()
        .iter()
        .map(|s| {
            let reference = s
                .module_flow_reference
                .as_ref()
                .map(|r| format!(" → {} ({})", r.flow_name.as_deref().unwrap_or(""), r.flow_id))
                .unwrap_or_default();
            format!(
                "**Step {}** ({}): {}{reference}",
                step_id(&s.step_id),
                s.module,
                s.step_description.as_deref().unwrap_or("")
            )
        })
        .collect();
    let prerequisites = match &workflow.prerequisites {
        Some(p) => p.join(", "),
        None => "None".to_string(),
    };
    format!(
        "## {}\n\n**Description**: {}\n\n**Modules Involved**: {}\n\n**Business Value**: {}\n\n**Workflow Steps**:\n{}\n\n**Prerequisites**: {}",
        workflow.workflow_name.as_deref().unwrap_or(""),
        workflow.description.as_deref().unwrap_or(""),
        workflow.modules_involved().join(", "),
        workflow.business_value.as_deref().unwrap_or(""),
        steps.join("\n\n"),
        prerequisites
    )
}

pub fn topic(topic: &str, sections: &[String]) -> String {
    let bodies: Vec<String> = sections
        .iter()
        .map(|s| s.lines().skip(1).collect::<Vec<_>>().join("\n"))
        .collect();
    format!("Flows related to \"{topic}\":\n\n{}", bodies.join("\n"))
}

pub fn module_info(module: &ModuleDescriptor) -> String {
    let features: Vec<String> = module.key_features.iter().map(|f| format!("- {f}")).collect();
    format!(
        "## {}\n\n**Description**: {}\n\n**Key Features**:\n{}\n\nTo see available flows, use: `list_flows` with module=\"{}\"",
        module.name,
        module.long_description,
        features.join("\n"),
        module.id
    )
}

pub fn module_index(modules: &[&ModuleDescriptor], workflows: &[CrossModuleWorkflow]) -> String {
    let modules: Vec<String> = modules
        .iter()
        .map(|m| format!("**{}** (`{}`)\n   {}", m.name, m.id, m.summary))
        .collect();
    let workflows: Vec<String> = workflows
        .iter()
        .map(|w| {
            format!(
                "- **{}** - {}",
                w.workflow_name.as_deref().unwrap_or(""),
                w.description.as_deref().unwrap_or("")
            )
        })
        .collect();
    format!(
        "## Available Modules\n\n{}\n\n## Cross-Module Workflows\n{}\n\nUse `get_module_info` for detailed information about any module.",
        modules.join("\n\n"),
        workflows.join("\n")
    )
}
