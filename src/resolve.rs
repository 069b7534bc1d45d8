//! Locating a flow or workflow by any of the identifiers users pass around.

use crate::model::{CrossModuleWorkflow, Flow};
use crate::util::slugify;

/// Position of the flow addressed by `ident`.
///
/// Tried in order: exact `flow_id`, legacy `id`, then the slug of
/// `flow_name`. The first tier with a hit wins.
pub fn position_of(flows: &[Flow], ident: &str) -> Option<usize> {
    flows
        .iter()
        .position(|f| f.flow_id.as_deref() == Some(ident))
        .or_else(|| flows.iter().position(|f| f.id.as_deref() == Some(ident)))
        .or_else(|| {
            flows
                .iter()
                .position(|f| f.flow_name.as_deref().map(slugify).as_deref() == Some(ident))
        })
}

pub fn find<'a>(flows: &'a [Flow], ident: &str) -> Option<&'a Flow> {
    position_of(flows, ident).map(|i| &flows[i])
}

/// `workflow_id` or the slug of `workflow_name`.
pub fn workflow_matches(workflow: &CrossModuleWorkflow, ident: &str) -> bool {
    workflow.workflow_id.as_deref() == Some(ident)
        || workflow.workflow_name.as_deref().map(slugify).as_deref() == Some(ident)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow(flow_id: Option<&str>, id: Option<&str>, name: Option<&str>) -> Flow {
        Flow {
            flow_id: flow_id.map(str::to_owned),
            id: id.map(str::to_owned),
            flow_name: name.map(str::to_owned),
            ..Flow::default()
        }
    }

    #[test]
    fn three_way_lookup() {
        let flows = vec![
            flow(Some("flow_001"), None, Some("Create a Query")),
            flow(None, Some("legacy_7"), Some("Export Data")),
        ];
        assert_eq!(position_of(&flows, "flow_001"), Some(0));
        assert_eq!(position_of(&flows, "legacy_7"), Some(1));
        assert_eq!(position_of(&flows, "create_a_query"), Some(0));
        assert_eq!(position_of(&flows, "export_data"), Some(1));
        assert_eq!(position_of(&flows, "Create a Query"), None);
        assert_eq!(position_of(&flows, "missing"), None);
    }

    #[test]
    fn explicit_id_beats_slug_of_another_flow() {
        let flows = vec![
            flow(Some("A"), None, Some("export")),
            flow(Some("export"), None, Some("Something")),
        ];
        assert_eq!(position_of(&flows, "export"), Some(1));
    }

    #[test]
    fn workflow_by_id_or_slug() {
        let wf = CrossModuleWorkflow {
            workflow_id: Some("CROSS_001".into()),
            workflow_name: Some("Crisis Management".into()),
            ..Default::default()
        };
        assert!(workflow_matches(&wf, "CROSS_001"));
        assert!(workflow_matches(&wf, "crisis_management"));
        assert!(!workflow_matches(&wf, "content_strategy"));
    }
}
