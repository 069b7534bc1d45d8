//! Cross-module workflow files and reference checking.
//!
//! Workflows live one per file under the data directory. The set of files is
//! a registry seeded from configuration; create and delete keep it current.
//! A file may also hold a list of workflows or a `{ "workflows": [...] }`
//! wrapper, in which case edits happen in place inside that file.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{Entity, FlowError, Result};
use crate::model::CrossModuleWorkflow;
use crate::resolve::workflow_matches;
use crate::store::{FlowStore, files};
use crate::util::{base36, now_rfc3339, unix_millis};
use crate::validation::{decode, sanitize, validate_workflow};

const WORKFLOWS: &str = "workflows";
const FILE_PREFIX: &str = "cross_module_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Single,
    List,
    Wrapped,
}

impl Layout {
    fn detect(doc: &Value) -> Self {
        match doc {
            Value::Array(_) => Layout::List,
            Value::Object(obj) if obj.get(WORKFLOWS).is_some_and(Value::is_array) => Layout::Wrapped,
            _ => Layout::Single,
        }
    }

    fn records(self, doc: &Value) -> Vec<Value> {
        match self {
            Layout::Single => vec![doc.clone()],
            Layout::List => doc.as_array().cloned().unwrap_or_default(),
            Layout::Wrapped => doc
                .get(WORKFLOWS)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        }
    }

    fn rebuild(self, doc: &mut Value, mut records: Vec<Value>) {
        match self {
            Layout::Single => {
                if let Some(only) = records.pop() {
                    *doc = only;
                }
            }
            Layout::List => *doc = Value::Array(records),
            Layout::Wrapped => {
                if let Value::Object(obj) = doc {
                    obj.insert(WORKFLOWS.to_string(), Value::Array(records));
                }
            }
        }
    }
}

/// A workflow together with the registered file it was read from.
#[derive(Debug, Clone)]
pub struct StoredWorkflow {
    pub file: String,
    pub workflow: CrossModuleWorkflow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundFlow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Outcome of resolving one step's `module_flow_reference`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepValidation {
    pub step: Value,
    pub module: String,
    pub flow_id: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found: Option<FoundFlow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub workflow_id: Option<String>,
    pub workflow_name: Option<String>,
    pub valid: bool,
    pub validation: Vec<StepValidation>,
}

impl ValidationReport {
    pub fn failures(&self) -> impl Iterator<Item = &StepValidation> {
        self.validation.iter().filter(|v| !v.valid)
    }
}

#[derive(Debug, Clone)]
pub struct CrossModuleStore {
    data_dir: PathBuf,
    backup_dir: PathBuf,
    files: Arc<RwLock<Vec<String>>>,
    flows: FlowStore,
}

impl CrossModuleStore {
    pub fn new(flows: FlowStore, files: Vec<String>) -> Self {
        Self {
            data_dir: flows.data_dir().to_path_buf(),
            backup_dir: flows.backup_dir().to_path_buf(),
            files: Arc::new(RwLock::new(files)),
            flows,
        }
    }

    pub async fn registered_files(&self) -> Vec<String> {
        self.files.read().await.clone()
    }

    /// Every readable workflow. Unreadable files are logged and skipped.
    pub async fn list(&self) -> Vec<CrossModuleWorkflow> {
        let names = self.files.read().await.clone();
        self.load(&names)
            .await
            .into_iter()
            .map(|s| s.workflow)
            .collect()
    }

    /// Lookup by `workflow_id` or slug of `workflow_name`.
    pub async fn find(&self, ident: &str) -> Result<CrossModuleWorkflow> {
        let names = self.files.read().await.clone();
        locate(self.load(&names).await, ident)
            .map(|s| s.workflow)
            .ok_or_else(|| FlowError::not_found(Entity::Workflow, ident))
    }

    /// Like [`find`](Self::find), but also accepts the file stem without its
    /// `cross_module_` prefix, e.g. `crisis_management`.
    pub async fn find_any(&self, ident: &str) -> Result<CrossModuleWorkflow> {
        match self.find(ident).await {
            Err(e) if e.is_not_found() => {
                let file = format!("{FILE_PREFIX}{ident}.json");
                self.load(&[file])
                    .await
                    .into_iter()
                    .next()
                    .map(|s| s.workflow)
                    .ok_or(e)
            }
            other => other,
        }
    }

    pub async fn create(&self, body: Value) -> Result<CrossModuleWorkflow> {
        let mut body = sanitize(body);
        if let Value::Object(obj) = &mut body {
            let has_id = obj
                .get("workflow_id")
                .and_then(Value::as_str)
                .is_some_and(|s| !s.is_empty());
            if !has_id {
                obj.insert(
                    "workflow_id".to_string(),
                    Value::String(format!("CROSS_{}", base36(unix_millis()))),
                );
            }
        }
        validate_workflow(&body)?;
        let mut workflow: CrossModuleWorkflow = decode(body, "Invalid workflow data")?;
        let id = workflow.workflow_id.clone().unwrap_or_default();
        let now = now_rfc3339();
        workflow.created_at = Some(now.clone());
        workflow.updated_at = Some(now);

        let mut registry = self.files.write().await;
        let existing = self.load(&registry).await;
        if existing.iter().any(|s| s.workflow.workflow_id.as_deref() == Some(id.as_str())) {
            return Err(FlowError::DuplicateId {
                entity: Entity::Workflow,
                id,
            });
        }

        let file = format!("{FILE_PREFIX}{}.json", id.to_lowercase());
        let path = self.data_dir.join(&file);
        files::backup_file(&path, &self.backup_dir, &files::stem_of(&path)).await?;
        files::write_json(&path, &to_value(&path, &workflow)?).await?;
        if !registry.contains(&file) {
            registry.push(file.clone());
        }
        info!(workflow_id = %id, file = %file, "workflow created");
        Ok(workflow)
    }

    /// Full replacement. The stored id and creation time are kept.
    pub async fn replace(&self, ident: &str, body: Value) -> Result<CrossModuleWorkflow> {
        let registry = self.files.write().await;
        let stored = locate(self.load(&registry).await, ident)
            .ok_or_else(|| FlowError::not_found(Entity::Workflow, ident))?;

        let mut body = sanitize(body);
        if let (Value::Object(obj), Some(id)) = (&mut body, &stored.workflow.workflow_id) {
            obj.insert("workflow_id".to_string(), Value::String(id.clone()));
        }
        validate_workflow(&body)?;
        let mut workflow: CrossModuleWorkflow = decode(body, "Invalid workflow data")?;
        workflow.workflow_id = stored.workflow.workflow_id.clone();
        workflow.created_at = stored.workflow.created_at.clone();
        workflow.updated_at = Some(now_rfc3339());

        let path = self.data_dir.join(&stored.file);
        let mut doc = files::read_json(&path).await?;
        let layout = Layout::detect(&doc);
        let replacement = to_value(&path, &workflow)?;
        let records = layout
            .records(&doc)
            .into_iter()
            .map(|r| if record_matches(&r, ident) { replacement.clone() } else { r })
            .collect();
        layout.rebuild(&mut doc, records);

        files::backup_file(&path, &self.backup_dir, &files::stem_of(&path)).await?;
        files::write_json(&path, &doc).await?;
        info!(ident, file = %stored.file, "workflow replaced");
        Ok(workflow)
    }

    /// Remove a workflow. A file left without workflows is deleted and
    /// unregistered. Returns the removed workflow and its backup path.
    pub async fn delete(&self, ident: &str) -> Result<(CrossModuleWorkflow, Option<PathBuf>)> {
        let mut registry = self.files.write().await;
        let stored = locate(self.load(&registry).await, ident)
            .ok_or_else(|| FlowError::not_found(Entity::Workflow, ident))?;

        let path = self.data_dir.join(&stored.file);
        let backup = files::backup_file(&path, &self.backup_dir, &format!("deleted_{}", stored.file)).await?;

        let mut doc = files::read_json(&path).await?;
        let layout = Layout::detect(&doc);
        let remaining: Vec<Value> = layout
            .records(&doc)
            .into_iter()
            .filter(|r| !record_matches(r, ident))
            .collect();

        if layout == Layout::Single || remaining.is_empty() {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| FlowError::storage(&path, e))?;
            registry.retain(|f| f != &stored.file);
        } else {
            layout.rebuild(&mut doc, remaining);
            files::write_json(&path, &doc).await?;
        }

        info!(ident, file = %stored.file, "workflow deleted");
        Ok((stored.workflow, backup))
    }

    /// Resolve the workflow `ident` and check its flow references.
    pub async fn validate(&self, ident: &str) -> Result<ValidationReport> {
        let workflow = self.find(ident).await?;
        Ok(self.check_references(&workflow).await)
    }

    /// Look up every step's referenced flow. The report is valid when every
    /// reference resolves, which includes having no references at all.
    pub async fn check_references(&self, workflow: &CrossModuleWorkflow) -> ValidationReport {
        let mut validation = Vec::new();
        for step in workflow.steps() {
            let Some(reference) = &step.module_flow_reference else {
                continue;
            };
            let mut entry = StepValidation {
                step: step.step_id.clone(),
                module: step.module.clone(),
                flow_id: reference.flow_id.clone(),
                valid: false,
                found: None,
                error: None,
            };
            match self.flows.find_flow(&step.module, &reference.flow_id).await {
                Ok(flow) => {
                    entry.valid = true;
                    entry.found = Some(FoundFlow {
                        flow_name: flow.display_name().map(str::to_owned),
                        description: flow.description,
                    });
                }
                Err(e) => entry.error = Some(e.to_string()),
            }
            validation.push(entry);
        }

        ValidationReport {
            workflow_id: workflow.workflow_id.clone(),
            workflow_name: workflow.workflow_name.clone(),
            valid: validation.iter().all(|v| v.valid),
            validation,
        }
    }

    async fn load(&self, names: &[String]) -> Vec<StoredWorkflow> {
        let mut out = Vec::new();
        for file in names {
            let path = self.data_dir.join(file);
            let doc = match files::read_json(&path).await {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(file = %file, error = %e, "skipping unreadable cross-module file");
                    continue;
                }
            };
            for record in Layout::detect(&doc).records(&doc) {
                match CrossModuleWorkflow::deserialize(&record) {
                    Ok(workflow) => out.push(StoredWorkflow {
                        file: file.clone(),
                        workflow,
                    }),
                    Err(e) => warn!(file = %file, error = %e, "skipping malformed workflow"),
                }
            }
        }
        out
    }
}

fn locate(stored: Vec<StoredWorkflow>, ident: &str) -> Option<StoredWorkflow> {
    stored.into_iter().find(|s| workflow_matches(&s.workflow, ident))
}

fn record_matches(record: &Value, ident: &str) -> bool {
    CrossModuleWorkflow::deserialize(record).is_ok_and(|w| workflow_matches(&w, ident))
}

fn to_value(path: &Path, workflow: &CrossModuleWorkflow) -> Result<Value> {
    serde_json::to_value(workflow).map_err(|e| FlowError::storage(path, e))
}
