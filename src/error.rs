use std::{fmt, io, path::PathBuf};

use serde::Serialize;
use thiserror::Error;

/// What kind of record a lookup was about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Entity {
    Module,
    Flow,
    Workflow,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Module => "Module",
            Entity::Flow => "Flow",
            Entity::Workflow => "Cross-module workflow",
        })
    }
}

/// One schema violation, addressed by JSON pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum StorageFailure {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Invalid module: {0}")]
    UnknownModule(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },

    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<FieldError>,
    },

    #[error("{entity} with this ID already exists: {id}")]
    DuplicateId { entity: Entity, id: String },

    #[error("{0}")]
    InvalidQuery(String),

    #[error("storage error at {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: StorageFailure,
    },
}

impl FlowError {
    pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        FlowError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, source: impl Into<StorageFailure>) -> Self {
        FlowError::Storage {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FlowError::NotFound { .. })
    }
}

pub type Result<T, E = FlowError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_message_names_the_file() {
        let err = FlowError::storage(
            "/tmp/listen.json",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/listen.json"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn not_found_mentions_entity() {
        let err = FlowError::not_found(Entity::Workflow, "CROSS_1");
        assert_eq!(err.to_string(), "Cross-module workflow not found: CROSS_1");
        assert!(err.is_not_found());
    }
}
