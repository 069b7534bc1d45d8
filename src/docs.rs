//! Source documents (PDF and Markdown) referenced by flows.

use std::path::{Component, Path, PathBuf};

use crate::config::Settings;
use crate::model::Flow;

const SOURCE_PREFIX: &str = "Source: ";

#[derive(Debug, Clone)]
pub struct Docs {
    root: PathBuf,
}

impl Docs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn open(settings: &Settings) -> Self {
        Self::new(settings.docs_dir.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a `source_documents` entry to a file under the docs root.
    ///
    /// A leading `Source: ` label and leading slashes are ignored. Entries
    /// that would escape the root resolve to `None`.
    pub fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let cleaned = reference
            .strip_prefix(SOURCE_PREFIX)
            .unwrap_or(reference)
            .trim()
            .trim_start_matches('/');
        if cleaned.is_empty() {
            return None;
        }
        let relative = Path::new(cleaned);
        if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(self.root.join(relative))
    }

    pub async fn exists(&self, reference: &str) -> bool {
        match self.resolve(reference) {
            Some(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
            None => false,
        }
    }

    /// References of `flow` that do not point at an existing file.
    pub async fn missing(&self, flow: &Flow) -> Vec<String> {
        let mut missing = Vec::new();
        for reference in flow.source_documents() {
            if !self.exists(reference).await {
                missing.push(reference.clone());
            }
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[test]
    fn resolution_stays_under_the_root() {
        let docs = Docs::new("/srv/public");
        assert_eq!(
            docs.resolve("Source: docs/a.pdf"),
            Some(PathBuf::from("/srv/public/docs/a.pdf"))
        );
        assert_eq!(docs.resolve("/docs/a.pdf"), Some(PathBuf::from("/srv/public/docs/a.pdf")));
        assert_eq!(docs.resolve("../etc/passwd"), None);
        assert_eq!(docs.resolve("docs/../../x"), None);
        assert_eq!(docs.resolve("  "), None);
    }

    #[tokio::test]
    async fn missing_documents_are_reported() {
        let fx = Fixture::new();
        let docs = fx.docs();
        let flows = fx.flow_store().read_module("listen").await.unwrap();
        assert!(docs.missing(&flows[0]).await.is_empty());
        assert_eq!(docs.missing(&flows[2]).await, ["docs/listen/missing.pdf"]);
    }
}
