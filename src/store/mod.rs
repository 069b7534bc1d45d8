//! Per-module flow documents on disk.
//!
//! Every read goes back to the file, so the file stays the single source of
//! truth. Writes are read-modify-write cycles guarded by a per-file lock and
//! always preceded by a backup copy.

pub mod files;
pub mod shape;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::error::{Entity, FieldError, FlowError, Result};
use crate::model::{ChangeLogEntry, Flow};
use crate::resolve;
use crate::util::{base36, now_rfc3339, slugify, unix_millis};
use crate::validation::{decode, sanitize, validate_flow, validate_patched_flow};

pub use files::FileLocks;
pub use shape::{DocumentShape, NestedShape};

const INITIAL_VERSION: &str = "1.0.0";

#[derive(Debug, Clone)]
pub struct FlowStore {
    data_dir: PathBuf,
    backup_dir: PathBuf,
    catalog: Arc<Catalog>,
    locks: FileLocks,
}

impl FlowStore {
    pub fn new(data_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>, catalog: Arc<Catalog>) -> Self {
        Self {
            data_dir: data_dir.into(),
            backup_dir: backup_dir.into(),
            catalog,
            locks: FileLocks::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn module_path(&self, module: &str) -> Result<PathBuf> {
        self.catalog
            .get(module)
            .map(|m| self.data_dir.join(m.data_file()))
            .ok_or_else(|| FlowError::UnknownModule(module.to_string()))
    }

    /// All flows of `module`, whatever top-level layout its file uses.
    pub async fn read_module(&self, module: &str) -> Result<Vec<Flow>> {
        let path = self.module_path(module)?;
        let doc = files::read_json(&path).await?;
        Ok(decode_flows(&path, &doc))
    }

    /// Replace the module's flow list in place, keeping the file's layout and
    /// every unrelated key. Returns the backup written beforehand.
    pub async fn write_module(&self, module: &str, flows: &[Flow]) -> Result<Option<PathBuf>> {
        let path = self.module_path(module)?;
        let _guard = self.locks.lock(&path).await;
        self.write_flows(&path, flows).await
    }

    pub async fn find_flow(&self, module: &str, ident: &str) -> Result<Flow> {
        let flows = self.read_module(module).await?;
        resolve::find(&flows, ident)
            .cloned()
            .ok_or_else(|| FlowError::not_found(Entity::Flow, ident))
    }

    /// Create a flow, generating `{PREFIX}_{BASE36}` when it has no id.
    pub async fn insert_flow(&self, module: &str, body: Value) -> Result<Flow> {
        self.module_path(module)?;
        let body = sanitize(body);
        validate_flow(&body)?;
        let mut flow: Flow = decode(body, "Invalid flow data")?;

        let now = now_rfc3339();
        flow.created_at = Some(now.clone());
        flow.updated_at = Some(now);
        flow.version = Some(INITIAL_VERSION.to_string());
        let prefix = self.catalog.prefix_for(module);

        let created = self
            .mutate(module, move |flows| {
                match flow.flow_id.as_deref().filter(|id| !id.is_empty()) {
                    Some(id) => {
                        if flows.iter().any(|f| f.flow_id.as_deref() == Some(id)) {
                            return Err(FlowError::DuplicateId {
                                entity: Entity::Flow,
                                id: id.to_string(),
                            });
                        }
                    }
                    None => {
                        let mut millis = unix_millis();
                        let id = loop {
                            let candidate = format!("{prefix}_{}", base36(millis));
                            if !flows.iter().any(|f| f.flow_id.as_deref() == Some(candidate.as_str())) {
                                break candidate;
                            }
                            millis += 1;
                        };
                        flow.flow_id = Some(id);
                    }
                }
                flows.push(flow.clone());
                Ok(flow)
            })
            .await?;

        info!(module, flow_id = ?created.flow_id, "flow created");
        Ok(created)
    }

    /// Full replacement (PUT). Keeps id and creation time, bumps the patch
    /// version and appends a change-log entry.
    pub async fn replace_flow(&self, module: &str, ident: &str, body: Value) -> Result<Flow> {
        self.module_path(module)?;
        let body = sanitize(body);
        validate_flow(&body)?;
        let mut update: Flow = decode(body, "Invalid flow data")?;

        let updated = self
            .mutate(module, |flows| {
                let idx = resolve::position_of(flows, ident)
                    .ok_or_else(|| FlowError::not_found(Entity::Flow, ident))?;
                let original = &flows[idx];
                let now = now_rfc3339();
                let version = bump_patch(original.version.as_deref().unwrap_or(INITIAL_VERSION));

                update.flow_id = Some(original.flow_id.clone().unwrap_or_else(|| ident.to_string()));
                update.created_at = original.created();
                update.updated_at = Some(now.clone());
                update.version = Some(version.clone());

                let mut log = update
                    .change_log
                    .take()
                    .or_else(|| original.change_log.clone())
                    .unwrap_or_default();
                log.push(ChangeLogEntry {
                    version,
                    date: now,
                    changes: vec!["Flow updated via API".to_string()],
                    source: Some("API".to_string()),
                    extra: Map::new(),
                });
                update.change_log = Some(log);

                flows[idx] = update.clone();
                Ok(update)
            })
            .await?;

        info!(module, ident, version = ?updated.version, "flow replaced");
        Ok(updated)
    }

    /// Shallow merge (PATCH). The merged record must still validate.
    pub async fn patch_flow(&self, module: &str, ident: &str, partial: Value) -> Result<Flow> {
        let path = self.module_path(module)?;
        let Value::Object(partial) = sanitize(partial) else {
            return Err(FlowError::Validation {
                message: "Invalid flow data after patch".to_string(),
                details: vec![FieldError {
                    path: String::new(),
                    message: "patch body must be a JSON object".to_string(),
                }],
            });
        };

        let patched = self
            .mutate(module, |flows| {
                let idx = resolve::position_of(flows, ident)
                    .ok_or_else(|| FlowError::not_found(Entity::Flow, ident))?;
                let mut merged = match serde_json::to_value(&flows[idx]) {
                    Ok(Value::Object(map)) => map,
                    Ok(_) => Map::new(),
                    Err(e) => return Err(FlowError::storage(&path, e)),
                };
                merged.extend(partial);
                merged.insert("updated_at".to_string(), Value::String(now_rfc3339()));

                let merged = Value::Object(merged);
                validate_patched_flow(&merged)?;
                let flow = Flow::from_record(&merged).map_err(|e| FlowError::Validation {
                    message: "Invalid flow data after patch".to_string(),
                    details: vec![FieldError {
                        path: String::new(),
                        message: e.to_string(),
                    }],
                })?;
                flows[idx] = flow.clone();
                Ok(flow)
            })
            .await?;

        info!(module, ident, "flow patched");
        Ok(patched)
    }

    pub async fn delete_flow(&self, module: &str, ident: &str) -> Result<Flow> {
        let removed = self
            .mutate(module, |flows| {
                let idx = resolve::position_of(flows, ident)
                    .ok_or_else(|| FlowError::not_found(Entity::Flow, ident))?;
                Ok(flows.remove(idx))
            })
            .await?;
        info!(module, ident, "flow deleted");
        Ok(removed)
    }

    /// Replace only `source_documents` of the flow named `flow_name`.
    ///
    /// The module is addressed by display name, slugified to its catalog id.
    /// Matching is on `flow_name` or `name` equality.
    pub async fn update_source_documents(
        &self,
        module_name: &str,
        flow_name: &str,
        docs: Vec<String>,
    ) -> Result<Option<PathBuf>> {
        let slug = slugify(module_name);
        let path = self.module_path(&slug)?;
        if !tokio::fs::try_exists(&path)
            .await
            .map_err(|e| FlowError::storage(&path, e))?
        {
            return Err(FlowError::not_found(Entity::Module, module_name));
        }

        let _guard = self.locks.lock(&path).await;
        let mut doc = files::read_json(&path).await?;
        let shape = DocumentShape::detect(&doc);
        let mut records = shape.extract(&doc).to_vec();

        let named = |r: &Value, key: &str| r.get(key).and_then(Value::as_str) == Some(flow_name);
        let record = records
            .iter_mut()
            .find(|r| named(r, "flow_name") || named(r, "name"))
            .ok_or_else(|| FlowError::not_found(Entity::Flow, flow_name))?;
        if let Value::Object(obj) = record {
            obj.insert(
                "source_documents".to_string(),
                Value::Array(docs.into_iter().map(Value::String).collect()),
            );
        }

        shape.replace(&mut doc, records);
        let backup = files::backup_file(&path, &self.backup_dir, &slug).await?;
        files::write_json(&path, &doc).await?;
        info!(module = %slug, flow_name, "source documents updated");
        Ok(backup)
    }

    async fn mutate<T, F>(&self, module: &str, apply: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Flow>) -> Result<T>,
    {
        let path = self.module_path(module)?;
        let _guard = self.locks.lock(&path).await;
        let doc = files::read_json(&path).await?;
        let mut flows = decode_flows(&path, &doc);
        let out = apply(&mut flows)?;
        self.write_flows(&path, &flows).await?;
        Ok(out)
    }

    async fn write_flows(&self, path: &Path, flows: &[Flow]) -> Result<Option<PathBuf>> {
        let mut doc = files::read_json(path).await?;
        let shape = DocumentShape::detect(&doc);
        let unreadable: Vec<Value> = shape
            .extract(&doc)
            .iter()
            .filter(|v| !v.is_object())
            .cloned()
            .collect();
        let mut values = flows
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| FlowError::storage(path, e))?;
        values.extend(unreadable);
        shape.replace(&mut doc, values);

        let backup = files::backup_file(path, &self.backup_dir, &files::stem_of(path)).await?;
        files::write_json(path, &doc).await?;
        Ok(backup)
    }
}

/// Entries that are not JSON objects are skipped here and carried through
/// untouched when the module is written back.
fn decode_flows(path: &Path, doc: &Value) -> Vec<Flow> {
    DocumentShape::detect(doc)
        .extract(doc)
        .iter()
        .filter_map(|v| match Flow::from_record(v) {
            Ok(flow) => Some(flow),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping non-object flow entry");
                None
            }
        })
        .collect()
}

/// `"1.2.3"` becomes `"1.2.4"`. Missing or non-numeric parts count as zero.
pub fn bump_patch(version: &str) -> String {
    let mut parts = version.split('.').map(|p| p.trim().parse::<u64>().unwrap_or(0));
    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);
    let patch = parts.next().unwrap_or(0);
    format!("{major}.{minor}.{}", patch + 1)
}
