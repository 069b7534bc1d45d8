//! Category grouping and dependency annotation for a module's flows.
//!
//! The tables below are static display data. [`order_flows`] applies them:
//! flows are emitted category by category in declaration order, and anything
//! the table does not mention trails behind under "Other".

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::model::Flow;

pub const OTHER_CATEGORY: &str = "Other";
pub const OTHER_DESCRIPTION: &str = "Additional flows";

#[derive(Debug)]
pub struct Category {
    pub name: &'static str,
    pub description: &'static str,
    pub flows: &'static [&'static str],
}

#[derive(Debug)]
pub struct ModuleOrdering {
    pub categories: &'static [Category],
    dependencies: HashMap<&'static str, &'static [&'static str]>,
}

impl ModuleOrdering {
    fn new(categories: &'static [Category], deps: &[(&'static str, &'static [&'static str])]) -> Self {
        Self {
            categories,
            dependencies: deps.iter().copied().collect(),
        }
    }

    pub fn dependencies_of(&self, flow_id: &str) -> &'static [&'static str] {
        self.dependencies.get(flow_id).copied().unwrap_or_default()
    }
}

static TABLES: Lazy<HashMap<&'static str, ModuleOrdering>> = Lazy::new(|| {
    HashMap::from([
        ("listen", ModuleOrdering::new(LISTEN, LISTEN_DEPS)),
        ("measure", ModuleOrdering::new(MEASURE, MEASURE_DEPS)),
        ("publish", ModuleOrdering::new(PUBLISH, PUBLISH_DEPS)),
        ("engage", ModuleOrdering::new(ENGAGE, ENGAGE_DEPS)),
    ])
});

pub fn table_for(module: &str) -> Option<&'static ModuleOrdering> {
    TABLES.get(module)
}

type Slot = Option<(&'static Category, &'static str)>;

/// Display order (indices into `flows`) and the category each flow was
/// claimed by. Flows are matched on their legacy `id` first, then `flow_id`;
/// when two flows share a key only the first takes the declared slot.
fn place(flows: &[Flow], table: &'static ModuleOrdering) -> (Vec<usize>, Vec<Slot>) {
    let mut slots: Vec<Slot> = vec![None; flows.len()];
    let mut order = Vec::with_capacity(flows.len());
    for category in table.categories {
        for &id in category.flows {
            let hit = (0..flows.len()).find(|&i| slots[i].is_none() && flows[i].ordering_key() == Some(id));
            if let Some(i) = hit {
                slots[i] = Some((category, id));
                order.push(i);
            }
        }
    }
    order.extend((0..flows.len()).filter(|&i| slots[i].is_none()));
    (order, slots)
}

fn label(flow: &mut Flow, slot: Slot, table: &ModuleOrdering) {
    match slot {
        Some((category, id)) => {
            let deps = table.dependencies_of(id);
            flow.flow_category = Some(category.name.to_string());
            flow.category_description = Some(category.description.to_string());
            flow.dependencies = Some(deps.iter().map(|d| d.to_string()).collect());
            flow.is_prerequisite = Some(deps.is_empty());
        }
        None => {
            flow.flow_category = Some(OTHER_CATEGORY.to_string());
            flow.category_description = Some(OTHER_DESCRIPTION.to_string());
            let deps = flow.dependencies.take().unwrap_or_default();
            flow.is_prerequisite = Some(deps.is_empty());
            flow.dependencies = Some(deps);
        }
    }
    flow.settle();
}

/// Attach category and dependency data without moving anything. Modules
/// without a table are left untouched.
pub fn annotate(flows: &mut [Flow], module: &str) {
    let Some(table) = table_for(module) else {
        return;
    };
    let (_, slots) = place(flows, table);
    for (flow, slot) in flows.iter_mut().zip(slots) {
        label(flow, slot, table);
    }
}

/// Reorder `flows` for display and attach category and dependency data.
///
/// Consumes the list. Modules without a table come back untouched. Flows the
/// table does not claim land in "Other", so the result is always a
/// permutation of the input.
pub fn order_flows(flows: Vec<Flow>, module: &str) -> Vec<Flow> {
    let Some(table) = table_for(module) else {
        return flows;
    };
    let (order, slots) = place(&flows, table);
    let mut cells: Vec<Option<Flow>> = flows.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| {
            let mut flow = cells[i].take()?;
            label(&mut flow, slots[i], table);
            Some(flow)
        })
        .collect()
}

/// Flows sharing a category, in order of first appearance.
#[derive(Debug)]
pub struct CategoryGroup<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub flows: Vec<&'a Flow>,
}

/// Group already-ordered flows by `flowCategory`. Flows without one are
/// collected under "Other".
pub fn group_by_category(flows: &[Flow]) -> Vec<CategoryGroup<'_>> {
    let mut groups: Vec<CategoryGroup<'_>> = Vec::new();
    for flow in flows {
        let name = flow.flow_category.as_deref().unwrap_or(OTHER_CATEGORY);
        match groups.iter_mut().find(|g| g.name == name) {
            Some(group) => group.flows.push(flow),
            None => groups.push(CategoryGroup {
                name,
                description: flow.category_description.as_deref().unwrap_or(""),
                flows: vec![flow],
            }),
        }
    }
    groups
}

const LISTEN: &[Category] = &[
    Category {
        name: "Getting Started",
        description: "Basic setup and search creation",
        flows: &["flow_001", "flow_009", "flow_002", "flow_003"],
    },
    Category {
        name: "Data Sources Setup",
        description: "Configure content sources and authentication",
        flows: &["flow_004", "flow_012"],
    },
    Category {
        name: "Data Interaction",
        description: "View, filter, and analyze data",
        flows: &["flow_007", "flow_006", "flow_010", "flow_015"],
    },
    Category {
        name: "Comparison & Analysis",
        description: "Compare and analyze multiple sources",
        flows: &["flow_011"],
    },
    Category {
        name: "Export & Sharing",
        description: "Export data and share reports",
        flows: &["flow_008", "flow_013", "flow_014"],
    },
    Category {
        name: "Alerts & Automation",
        description: "Set up automated notifications",
        flows: &["flow_005"],
    },
];

const LISTEN_DEPS: &[(&str, &[&str])] = &[
    ("flow_002", &["flow_001"]),
    ("flow_003", &["flow_001"]),
    ("flow_005", &["flow_002"]),
    ("flow_006", &["flow_001"]),
    ("flow_007", &["flow_001"]),
    ("flow_008", &["flow_007"]),
    ("flow_010", &["flow_007"]),
    ("flow_011", &["flow_004"]),
    ("flow_013", &["flow_007"]),
    ("flow_014", &["flow_013"]),
    ("flow_015", &["flow_001"]),
];

const MEASURE: &[Category] = &[
    Category {
        name: "Getting Started",
        description: "Dashboard setup and basics",
        flows: &["flow_1", "flow_10"],
    },
    Category {
        name: "Widget Management",
        description: "Create and configure widgets",
        flows: &["flow_2", "flow_3", "flow_4", "flow_5"],
    },
    Category {
        name: "Data & Filters",
        description: "Configure data and filters",
        flows: &["flow_6", "flow_7"],
    },
    Category {
        name: "Export & Sharing",
        description: "Export and share dashboards",
        flows: &["flow_8", "flow_9"],
    },
];

const MEASURE_DEPS: &[(&str, &[&str])] = &[
    ("flow_2", &["flow_1"]),
    ("flow_3", &["flow_2"]),
    ("flow_4", &["flow_2"]),
    ("flow_5", &["flow_2"]),
    ("flow_6", &["flow_1"]),
    ("flow_7", &["flow_6"]),
    ("flow_8", &["flow_1"]),
    ("flow_9", &["flow_8"]),
    ("flow_10", &["flow_1"]),
];

const PUBLISH: &[Category] = &[
    Category {
        name: "Content Creation",
        description: "Create and compose posts",
        flows: &["BW_PUB_001", "BW_PUB_002", "BW_PUB_003", "BW_PUB_004"],
    },
    Category {
        name: "Scheduling & Publishing",
        description: "Schedule and publish content",
        flows: &["BW_PUB_005", "BW_PUB_006", "BW_PUB_007", "BW_PUB_008"],
    },
    Category {
        name: "Calendar Management",
        description: "Manage content calendar",
        flows: &["BW_PUB_009", "BW_PUB_010", "BW_PUB_011"],
    },
    Category {
        name: "Collaboration",
        description: "Team collaboration features",
        flows: &["BW_PUB_012", "BW_PUB_013", "BW_PUB_014", "BW_PUB_015"],
    },
    Category {
        name: "Analytics & Optimization",
        description: "Track performance and optimize",
        flows: &["BW_PUB_016", "BW_PUB_017", "BW_PUB_018"],
    },
    Category {
        name: "Advanced Features",
        description: "Labels, campaigns, and bulk actions",
        flows: &["BW_PUB_019", "BW_PUB_020", "BW_PUB_021", "BW_PUB_022"],
    },
    Category {
        name: "Settings & Configuration",
        description: "Configure Publish settings",
        flows: &["BW_PUB_023", "BW_PUB_024", "BW_PUB_025"],
    },
];

const PUBLISH_DEPS: &[(&str, &[&str])] = &[
    ("BW_PUB_002", &["BW_PUB_001"]),
    ("BW_PUB_003", &["BW_PUB_001"]),
    ("BW_PUB_004", &["BW_PUB_001"]),
    ("BW_PUB_005", &["BW_PUB_001"]),
    ("BW_PUB_006", &["BW_PUB_005"]),
    ("BW_PUB_007", &["BW_PUB_005"]),
    ("BW_PUB_008", &["BW_PUB_001"]),
    ("BW_PUB_009", &["BW_PUB_005"]),
    ("BW_PUB_010", &["BW_PUB_009"]),
    ("BW_PUB_011", &["BW_PUB_009"]),
    ("BW_PUB_012", &["BW_PUB_001"]),
    ("BW_PUB_013", &["BW_PUB_012"]),
    ("BW_PUB_014", &["BW_PUB_012"]),
    ("BW_PUB_015", &["BW_PUB_001"]),
    ("BW_PUB_016", &["BW_PUB_008"]),
    ("BW_PUB_017", &["BW_PUB_016"]),
    ("BW_PUB_018", &["BW_PUB_005"]),
    ("BW_PUB_019", &["BW_PUB_001"]),
    ("BW_PUB_020", &["BW_PUB_019"]),
    ("BW_PUB_021", &["BW_PUB_001"]),
    ("BW_PUB_022", &["BW_PUB_021"]),
    ("BW_PUB_023", &["BW_PUB_001"]),
    ("BW_PUB_024", &["BW_PUB_023"]),
    ("BW_PUB_025", &["BW_PUB_001"]),
];

const ENGAGE: &[Category] = &[
    Category {
        name: "Feed Management",
        description: "View and manage social feeds",
        flows: &["FEED_001", "FEED_002", "SEARCH_001"],
    },
    Category {
        name: "Engagement Actions",
        description: "Respond to and engage with content",
        flows: &["MSG_001", "DM_001", "SENTIMENT_001", "LABEL_001"],
    },
    Category {
        name: "Templates & Automation",
        description: "Create templates and automate responses",
        flows: &["TEMP_001", "AUTO_001", "AUTO_002"],
    },
    Category {
        name: "Case Management",
        description: "Manage customer cases",
        flows: &["CASE_001", "CASE_002"],
    },
    Category {
        name: "Team Collaboration",
        description: "Work with team members",
        flows: &["TEAM_001", "TEAM_002"],
    },
    Category {
        name: "Bulk Operations",
        description: "Perform bulk actions",
        flows: &["BULK_001", "BULK_002", "MOD_001"],
    },
    Category {
        name: "Reporting & Export",
        description: "Generate reports and export data",
        flows: &["REPORT_001", "EXPORT_001"],
    },
    Category {
        name: "Mobile & Integrations",
        description: "Mobile app and integrations",
        flows: &["MOBILE_001", "INTEGRATION_001", "NOTIFICATION_001", "PROFILE_001"],
    },
];

const ENGAGE_DEPS: &[(&str, &[&str])] = &[
    ("FEED_002", &["FEED_001"]),
    ("MSG_001", &["FEED_001"]),
    ("DM_001", &["FEED_001"]),
    ("TEMP_001", &["MSG_001"]),
    ("AUTO_001", &["TEMP_001"]),
    ("AUTO_002", &["AUTO_001"]),
    ("CASE_001", &["MSG_001"]),
    ("CASE_002", &["CASE_001"]),
    ("TEAM_001", &["FEED_001"]),
    ("TEAM_002", &["TEAM_001"]),
    ("BULK_001", &["FEED_001"]),
    ("BULK_002", &["BULK_001"]),
    ("MOD_001", &["FEED_001"]),
    ("SEARCH_001", &["FEED_001"]),
    ("LABEL_001", &["FEED_001"]),
    ("SENTIMENT_001", &["MSG_001"]),
    ("PROFILE_001", &["FEED_001"]),
    ("INTEGRATION_001", &["FEED_001"]),
    ("NOTIFICATION_001", &["FEED_001"]),
    ("EXPORT_001", &["FEED_001"]),
    ("REPORT_001", &["FEED_001"]),
    ("MOBILE_001", &["FEED_001"]),
];
