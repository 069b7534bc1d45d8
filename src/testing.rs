//! Throw-away data directories for unit and integration tests.

use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;

use crate::catalog::Catalog;
use crate::config::Settings;
use crate::docs::Docs;
use crate::store::FlowStore;

pub struct Fixture {
    pub dir: TempDir,
    pub settings: Settings,
}

impl Fixture {
    /// Data directory with four populated modules (each using a different
    /// top-level layout) and two of the three default workflow files.
    pub fn new() -> Self {
        let fx = Self::empty();
        fx.write_module("listen", listen_doc());
        fx.write_module("measure", measure_doc());
        fx.write_module("publish", publish_doc());
        fx.write_module("engage", engage_doc());
        fx.write_data_file("cross_module_crisis_management.json", &crisis_workflow());
        fx.write_data_file("cross_module_content_strategy.json", &content_workflow());
        fx.write_doc("docs/listen/create_query.pdf", "%PDF-1.4");
        fx
    }

    pub fn empty() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = dir.path();
        let settings = Settings {
            data_dir: root.join("data"),
            backup_dir: root.join("backups"),
            docs_dir: root.join("public"),
            log_dir: root.join("logs"),
            ..Settings::default()
        };
        std::fs::create_dir_all(&settings.data_dir).expect("data dir");
        std::fs::create_dir_all(&settings.docs_dir).expect("docs dir");
        Self { dir, settings }
    }

    pub fn data_dir(&self) -> &Path {
        &self.settings.data_dir
    }

    pub fn module_file(&self, module: &str) -> PathBuf {
        self.data_dir().join(format!("{module}_user_flows_with_citations.json"))
    }

    pub fn write_module(&self, module: &str, doc: Value) {
        self.write_json(&self.module_file(module), &doc);
    }

    pub fn write_data_file(&self, name: &str, doc: &Value) {
        self.write_json(&self.data_dir().join(name), doc);
    }

    pub fn write_doc(&self, relative: &str, contents: &str) {
        let path = self.settings.docs_dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("doc dir");
        }
        std::fs::write(path, contents).expect("doc file");
    }

    pub fn read_module_doc(&self, module: &str) -> Value {
        let text = std::fs::read_to_string(self.module_file(module)).expect("module file");
        serde_json::from_str(&text).expect("module json")
    }

    /// Backup files currently present, sorted by name.
    pub fn backups(&self) -> Vec<PathBuf> {
        let mut found: Vec<_> = match std::fs::read_dir(&self.settings.backup_dir) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        };
        found.sort();
        found
    }

    pub fn flow_store(&self) -> FlowStore {
        FlowStore::new(
            self.settings.data_dir.clone(),
            self.settings.backup_dir.clone(),
            Catalog::builtin(),
        )
    }

    pub fn docs(&self) -> Docs {
        Docs::open(&self.settings)
    }

    fn write_json(&self, path: &Path, doc: &Value) {
        let text = serde_json::to_string_pretty(doc).expect("serialise");
        std::fs::write(path, text).expect("write fixture");
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

/// `{ "user_flows": [...] }` with one flow outside the category table.
pub fn listen_doc() -> Value {
    json!({
        "module": "Listen",
        "user_flows": [
            {
                "flow_id": "flow_001",
                "flow_name": "Create a Query",
                "description": "Build a new search from scratch",
                "steps": ["Click New Query", "Enter keywords"],
                "source_documents": ["docs/listen/create_query.pdf"],
                "version": "1.2.3",
                "created_at": "2024-01-10T09:00:00Z",
                "updated_at": "2024-02-01T10:00:00Z"
            },
            {
                "flow_id": "flow_002",
                "flow_name": "Save a Search",
                "description": "Keep a query for later use",
                "steps": [{"description": "Press Save"}, {"description": "Name the search"}],
                "updated_at": "2024-03-05T08:30:00Z"
            },
            {
                "flow_id": "flow_007",
                "flow_name": "View Mentions",
                "description": "Browse what a search returns",
                "steps": [
                    {"action": "Open the Mentions tab", "description": "Click the Mentions tab"},
                    "If no results appear, widen the date range?"
                ],
                "source_documents": ["docs/listen/missing.pdf"]
            },
            {
                "flow_id": "flow_099",
                "flow_name": "Legacy Export",
                "description": "Old export path",
                "steps": ["Open settings"],
                "dependencies": ["flow_001"]
            }
        ]
    })
}

/// `{ "flows": [...] }`
pub fn measure_doc() -> Value {
    json!({
        "flows": [
            {
                "flow_id": "flow_2",
                "flow_name": "Add a Widget",
                "description": "Place a chart on a dashboard",
                "steps": ["Click Add Widget", "Choose a chart type"]
            },
            {
                "flow_id": "flow_1",
                "flow_name": "Create Dashboard",
                "description": "Start an empty dashboard",
                "steps": ["Open Measure", "Click Create"]
            },
            {
                "flow_id": "flow_6",
                "flow_name": "Filter Data",
                "description": "Narrow dashboard data",
                "steps": ["Open filters"]
            }
        ]
    })
}

/// `{ "<key>": { "flows": [...] } }` next to an unrelated top-level object.
pub fn publish_doc() -> Value {
    json!({
        "metadata": {"generated_by": "docs team"},
        "brandwatch_publish": {
            "module": "Publish",
            "flows": [
                {
                    "flow_id": "BW_PUB_005",
                    "flow_name": "Schedule a Post",
                    "description": "Pick a time to publish",
                    "steps": ["Open calendar", "Pick a slot"]
                },
                {
                    "flow_id": "BW_PUB_001",
                    "flow_name": "Compose a Post",
                    "description": "Write post content",
                    "steps": ["Open composer"]
                }
            ]
        }
    })
}

/// Bare list using the legacy `id`/`name` fields.
pub fn engage_doc() -> Value {
    json!([
        {
            "id": "FEED_001",
            "name": "View Feeds",
            "description": "See incoming messages",
            "steps": ["Open Engage"]
        },
        {
            "id": "MSG_001",
            "name": "Reply to a Message",
            "description": "Answer a customer",
            "steps": ["Select message", "Type reply"]
        }
    ])
}

pub fn crisis_workflow() -> Value {
    json!({
        "workflow_id": "CROSS_CRISIS",
        "workflow_name": "Crisis Management",
        "description": "Detect and respond to a brand crisis",
        "modules_involved": ["listen", "measure"],
        "business_value": "Faster response to negative spikes",
        "workflow_steps": [
            {
                "step_id": 1,
                "module": "listen",
                "step_description": "Create a query for brand mentions",
                "module_flow_reference": {"flow_id": "flow_001", "flow_name": "Create a Query"}
            },
            {
                "step_id": 2,
                "module": "measure",
                "step_description": "Build a crisis dashboard",
                "module_flow_reference": {"flow_id": "flow_1", "flow_name": "Create Dashboard"}
            }
        ],
        "prerequisites": ["Brand query"]
    })
}

pub fn content_workflow() -> Value {
    json!({
        "workflow_id": "CROSS_CONTENT",
        "workflow_name": "Content Strategy",
        "description": "Plan content from listening insights",
        "modules_involved": ["listen", "publish"],
        "business_value": "Content grounded in audience data",
        "workflow_steps": [
            {
                "step_id": 1,
                "module": "listen",
                "step_description": "Find trending topics",
                "module_flow_reference": {"flow_id": "flow_001"}
            },
            {
                "step_id": 2,
                "module": "publish",
                "step_description": "Schedule the posts",
                "module_flow_reference": {"flow_id": "BW_PUB_404"}
            },
            {
                "step_id": 3,
                "module": "publish",
                "step_description": "Review engagement"
            }
        ]
    })
}
