//! Records stored in the module and workflow documents.
//!
//! Every record keeps unknown keys in a flattened `extra` map so a
//! read-modify-write cycle never drops data it does not understand.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A documented user workflow belonging to one module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<String>,
    /// Legacy identifier used by older documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        rename = "flowCategory",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub flow_category: Option<String>,
    #[serde(
        rename = "categoryDescription",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub category_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Step>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerequisites: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_flows: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_documents: Option<Vec<String>>,
    #[serde(
        rename = "isPrerequisite",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_prerequisite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_log: Option<Vec<ChangeLogEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Flow {
    /// Decode a stored record, tolerating keys whose value has an unexpected
    /// JSON type. Such a key leaves its field unset and its raw value is kept
    /// in `extra`, so writing the record back reproduces it. Only a record
    /// that is not an object is rejected.
    pub fn from_record(record: &Value) -> serde_json::Result<Flow> {
        let strict = Flow::deserialize(record);
        if strict.is_ok() {
            return strict;
        }
        let Value::Object(fields) = record else {
            return strict;
        };

        let mut typed = Map::new();
        let mut raw = Map::new();
        for (key, value) in fields {
            let single = Value::Object(Map::from_iter([(key.clone(), value.clone())]));
            if Flow::deserialize(&single).is_ok() {
                typed.insert(key.clone(), value.clone());
            } else {
                raw.insert(key.clone(), value.clone());
            }
        }
        let mut flow = Flow::deserialize(&Value::Object(typed))?;
        flow.extra.extend(raw);
        Ok(flow)
    }

    /// Drop raw `extra` values shadowed by a field that is now set, so the
    /// key is serialised once.
    pub fn settle(&mut self) {
        let set = [
            ("flow_id", self.flow_id.is_some()),
            ("id", self.id.is_some()),
            ("flow_name", self.flow_name.is_some()),
            ("name", self.name.is_some()),
            ("description", self.description.is_some()),
            ("flowCategory", self.flow_category.is_some()),
            ("categoryDescription", self.category_description.is_some()),
            ("steps", self.steps.is_some()),
            ("prerequisites", self.prerequisites.is_some()),
            ("dependencies", self.dependencies.is_some()),
            ("related_flows", self.related_flows.is_some()),
            ("source_documents", self.source_documents.is_some()),
            ("isPrerequisite", self.is_prerequisite.is_some()),
            ("version", self.version.is_some()),
            ("change_log", self.change_log.is_some()),
            ("created_at", self.created_at.is_some()),
            ("updated_at", self.updated_at.is_some()),
        ];
        for (key, present) in set {
            if present {
                self.extra.shift_remove(key);
            }
        }
    }

    /// `flow_name`, falling back to the legacy `name`.
    pub fn display_name(&self) -> Option<&str> {
        self.flow_name.as_deref().or(self.name.as_deref())
    }

    /// The identifier shown to users: `flow_id`, else legacy `id`.
    pub fn identifier(&self) -> Option<&str> {
        self.flow_id.as_deref().or(self.id.as_deref())
    }

    /// Key used by the category tables: legacy `id` wins over `flow_id`.
    pub fn ordering_key(&self) -> Option<&str> {
        self.id.as_deref().or(self.flow_id.as_deref())
    }

    pub fn steps(&self) -> &[Step] {
        self.steps.as_deref().unwrap_or_default()
    }

    pub fn dependencies(&self) -> &[String] {
        self.dependencies.as_deref().unwrap_or_default()
    }

    pub fn prerequisites(&self) -> &[String] {
        self.prerequisites.as_deref().unwrap_or_default()
    }

    pub fn source_documents(&self) -> &[String] {
        self.source_documents.as_deref().unwrap_or_default()
    }

    /// `created_at`, falling back to the legacy `created_date` key.
    pub fn created(&self) -> Option<String> {
        self.created_at.clone().or_else(|| {
            self.extra
                .get("created_date")
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
    }
}

/// A flow step: either free text or a structured object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Text(String),
    Detailed(StepDetail),
    Raw(Value),
}

impl Step {
    /// Text used for searching: the string itself or `description`.
    pub fn search_text(&self) -> Option<&str> {
        match self {
            Step::Text(s) => Some(s),
            Step::Detailed(d) => d.description.as_deref(),
            Step::Raw(_) => None,
        }
    }

    /// Text used for display: the string, else `action`, `description`,
    /// `step_description`, in that order, skipping empty values.
    pub fn display_text(&self) -> Option<&str> {
        match self {
            Step::Text(s) if !s.is_empty() => Some(s),
            Step::Detailed(d) => [&d.action, &d.description, &d.step_description]
                .into_iter()
                .filter_map(|f| f.as_deref())
                .find(|s| !s.is_empty()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<Vec<Step>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub changes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A workflow whose steps are attributed to different modules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossModuleWorkflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules_involved: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_steps: Option<Vec<WorkflowStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerequisites: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_documents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CrossModuleWorkflow {
    pub fn steps(&self) -> &[WorkflowStep] {
        self.workflow_steps.as_deref().unwrap_or_default()
    }

    pub fn modules_involved(&self) -> &[String] {
        self.modules_involved.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    #[serde(default)]
    pub step_id: Value,
    #[serde(default)]
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_flow_reference: Option<FlowReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowReference {
    #[serde(default)]
    pub flow_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let raw = json!({
            "flow_id": "flow_001",
            "flow_name": "Create a Query",
            "steps": ["Click New Query", {"action": "Enter keywords", "screenshot": "a.png"}],
            "citations": [1, 2],
            "isPrerequisite": true
        });
        let flow: Flow = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(flow.extra.get("citations"), Some(&json!([1, 2])));
        assert_eq!(flow.is_prerequisite, Some(true));
        assert_eq!(serde_json::to_value(&flow).unwrap(), raw);
    }

    #[test]
    fn step_text_fallbacks() {
        let steps: Vec<Step> = serde_json::from_value(json!([
            "plain",
            {"action": "", "description": "described"},
            {"step_description": "from workflow"},
            {"step_id": 4},
            42
        ]))
        .unwrap();
        assert_eq!(steps[0].display_text(), Some("plain"));
        assert_eq!(steps[1].display_text(), Some("described"));
        assert_eq!(steps[2].display_text(), Some("from workflow"));
        assert_eq!(steps[3].display_text(), None);
        assert!(matches!(steps[4], Step::Raw(_)));
        assert_eq!(steps[2].search_text(), None);
    }

    #[test]
    fn wrongly_typed_fields_are_kept_raw() {
        let raw = json!({
            "id": 7,
            "flow_name": "Legacy",
            "description": "d",
            "version": 2,
            "prerequisites": "none",
            "change_log": [{"version": "1.0.0", "changes": "first cut"}],
            "steps": ["b"]
        });
        assert!(Flow::deserialize(&raw).is_err());

        let flow = Flow::from_record(&raw).unwrap();
        assert_eq!(flow.display_name(), Some("Legacy"));
        assert_eq!(flow.id, None);
        assert_eq!(flow.version, None);
        assert!(flow.prerequisites().is_empty());
        assert_eq!(flow.change_log, None);
        assert_eq!(flow.extra.get("id"), Some(&json!(7)));
        assert_eq!(flow.steps().len(), 1);
        assert_eq!(serde_json::to_value(&flow).unwrap(), raw);

        assert!(Flow::from_record(&json!("not a record")).is_err());
    }

    #[test]
    fn settle_prefers_the_typed_field() {
        let mut flow = Flow::from_record(&json!({"flow_name": "x", "dependencies": "none"})).unwrap();
        flow.dependencies = Some(vec!["flow_1".into()]);
        flow.settle();
        assert!(!flow.extra.contains_key("dependencies"));
        assert_eq!(
            serde_json::to_value(&flow).unwrap(),
            json!({"flow_name": "x", "dependencies": ["flow_1"]})
        );
    }

    #[test]
    fn identifiers_and_legacy_dates() {
        let flow: Flow = serde_json::from_value(json!({
            "id": "legacy",
            "name": "Old Name",
            "created_date": "2024-01-01"
        }))
        .unwrap();
        assert_eq!(flow.identifier(), Some("legacy"));
        assert_eq!(flow.display_name(), Some("Old Name"));
        assert_eq!(flow.created().as_deref(), Some("2024-01-01"));
    }
}
