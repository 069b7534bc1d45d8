//! Filesystem primitives shared by the flow and workflow stores.

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::error::{FlowError, Result};
use crate::util::unix_millis;

/// One async mutex per file path, serialising read-modify-write cycles
/// within this process.
#[derive(Debug, Clone, Default)]
pub struct FileLocks {
    locks: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}

pub async fn read_json(path: &Path) -> Result<Value> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| FlowError::storage(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| FlowError::storage(path, e))
}

/// Pretty-print `value` (two-space indent, trailing newline) and swap it in
/// atomically via a temp file in the same directory.
pub async fn write_json(path: &Path, value: &Value) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|e| FlowError::storage(path, e))?;
    bytes.push(b'\n');

    let target = path.to_path_buf();
    let dir = target
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        std::fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| FlowError::storage(path, std::io::Error::other(e)))?
    .map_err(|e| FlowError::storage(path, e))?;

    debug!(path = %path.display(), "wrote document");
    Ok(())
}

/// Copy `source` into `backup_dir` as `{name}_{unix_millis}.json`.
///
/// Returns `None` when `source` does not exist. Names already taken within
/// the same millisecond move on to the next free millisecond.
pub async fn backup_file(source: &Path, backup_dir: &Path, name: &str) -> Result<Option<PathBuf>> {
    if !tokio::fs::try_exists(source)
        .await
        .map_err(|e| FlowError::storage(source, e))?
    {
        return Ok(None);
    }
    tokio::fs::create_dir_all(backup_dir)
        .await
        .map_err(|e| FlowError::storage(backup_dir, e))?;

    let mut millis = unix_millis();
    let target = loop {
        let candidate = backup_dir.join(format!("{name}_{millis}.json"));
        let taken = tokio::fs::try_exists(&candidate)
            .await
            .map_err(|e| FlowError::storage(&candidate, e))?;
        if !taken {
            break candidate;
        }
        millis += 1;
    };

    tokio::fs::copy(source, &target)
        .await
        .map_err(|e| FlowError::storage(&target, e))?;
    info!(source = %source.display(), backup = %target.display(), "backup written");
    Ok(Some(target))
}

/// File name without its `.json` extension.
pub fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn backup_of_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let res = backup_file(&dir.path().join("nope.json"), dir.path(), "nope")
            .await
            .unwrap();
        assert!(res.is_none());
    }

    #[tokio::test]
    async fn backups_never_collide() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("listen.json");
        write_json(&src, &json!({"flows": []})).await.unwrap();
        let backups = dir.path().join("backups");

        let a = backup_file(&src, &backups, "listen").await.unwrap().unwrap();
        let b = backup_file(&src, &backups, "listen").await.unwrap().unwrap();
        assert_ne!(a, b);
        assert_eq!(std::fs::read_dir(&backups).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/doc.json");
        write_json(&path, &json!({"b": 1, "a": [1, 2]})).await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \"b\": 1"));
        assert!(text.ends_with('\n'));
        assert_eq!(read_json(&path).await.unwrap(), json!({"b": 1, "a": [1, 2]}));
    }

    #[tokio::test]
    async fn unparsable_file_is_a_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(read_json(&path).await, Err(FlowError::Storage { .. })));
    }
}
