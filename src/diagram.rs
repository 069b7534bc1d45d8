//! Linear start → steps → end layout used by the flow diagram view.

use serde::Serialize;

use crate::model::{Flow, Step};

const CENTER_X: u32 = 400;
const FIRST_Y: u32 = 60;
const SPACING: u32 = 40;
const DECISION_EXTRA: u32 = 10;
const TERMINAL_HEIGHT: u32 = 50;
const DECISION_HEIGHT: u32 = 120;
const MIN_PROCESS_HEIGHT: u32 = 60;
const LINE_HEIGHT: u32 = 16;
const PROCESS_PADDING: u32 = 20;
pub const WRAP_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Decision,
    Process,
}

impl StepKind {
    /// Steps that read like a branch ("if ", "decide", "choose", or a
    /// question mark) are decisions.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("if ") || lower.contains("decide") || lower.contains("choose") || text.contains('?') {
            StepKind::Decision
        } else {
            StepKind::Process
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    Decision,
    Process,
    End,
}

impl From<StepKind> for NodeKind {
    fn from(kind: StepKind) -> Self {
        match kind {
            StepKind::Decision => NodeKind::Decision,
            StepKind::Process => NodeKind::Process,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub label: String,
    pub lines: Vec<String>,
    pub x: u32,
    pub y: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramEdge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagram {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_name: Option<String>,
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
}

/// Greedy word wrap. A single word longer than `width` gets its own line.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split(' ') {
        let grown = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if grown > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub fn step_label(step: &Step, index: usize) -> String {
    step.display_text()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("Step {}", index + 1))
}

fn terminal(id: &str, kind: NodeKind, label: &str, y: u32) -> DiagramNode {
    DiagramNode {
        id: id.to_string(),
        kind,
        label: label.to_string(),
        lines: vec![label.to_string()],
        x: CENTER_X,
        y,
        height: TERMINAL_HEIGHT,
    }
}

pub fn build(flow: &Flow) -> Diagram {
    let mut nodes = vec![terminal("start", NodeKind::Start, "Start", FIRST_Y)];
    let mut y = FIRST_Y + TERMINAL_HEIGHT + SPACING;

    for (index, step) in flow.steps().iter().enumerate() {
        let label = step_label(step, index);
        let kind = StepKind::classify(&label);
        let lines = wrap(&label, WRAP_WIDTH);
        let (height, gap) = match kind {
            StepKind::Decision => (DECISION_HEIGHT, SPACING + DECISION_EXTRA),
            StepKind::Process => (
                MIN_PROCESS_HEIGHT.max(lines.len() as u32 * LINE_HEIGHT + PROCESS_PADDING),
                SPACING,
            ),
        };
        nodes.push(DiagramNode {
            id: format!("step-{index}"),
            kind: kind.into(),
            label,
            lines,
            x: CENTER_X,
            y: y + height / 2,
            height,
        });
        y += height + gap;
    }
    nodes.push(terminal("end", NodeKind::End, "End", y));

    let edges = nodes
        .windows(2)
        .map(|pair| DiagramEdge {
            from: pair[0].id.clone(),
            to: pair[1].id.clone(),
        })
        .collect();

    Diagram {
        flow_id: flow.identifier().map(str::to_owned),
        flow_name: flow.display_name().map(str::to_owned),
        nodes,
        edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flow(steps: serde_json::Value) -> Flow {
        serde_json::from_value(json!({"flow_id": "F", "flow_name": "Flow", "steps": steps})).unwrap()
    }

    #[test]
    fn decision_heuristics() {
        assert_eq!(StepKind::classify("If the list is empty, refresh"), StepKind::Decision);
        assert_eq!(StepKind::classify("Choose a template"), StepKind::Decision);
        assert_eq!(StepKind::classify("Ready to go?"), StepKind::Decision);
        assert_eq!(StepKind::classify("Click Save"), StepKind::Process);
        assert_eq!(StepKind::classify("Modify settings"), StepKind::Process);
    }

    #[test]
    fn wrapping() {
        assert_eq!(wrap("short", 30), ["short"]);
        assert_eq!(
            wrap("Click the button labelled Create New Dashboard", 30),
            ["Click the button labelled", "Create New Dashboard"]
        );
        assert_eq!(wrap("", 30), Vec::<String>::new());
    }

    #[test]
    fn layout_positions() {
        let d = build(&flow(json!([
            "Open Measure",
            {"action": "Choose a chart type?"},
            {"step_id": 3}
        ])));
        let kinds: Vec<_> = d.nodes.iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            [NodeKind::Start, NodeKind::Process, NodeKind::Decision, NodeKind::Process, NodeKind::End]
        );
        assert_eq!(d.nodes[0].y, 60);
        // start 60 + 50 + 40 = 150; process height 60 centred at 180
        assert_eq!(d.nodes[1].y, 180);
        assert_eq!(d.nodes[1].height, 60);
        // 150 + 60 + 40 = 250; decision 120 centred at 310
        assert_eq!(d.nodes[2].y, 310);
        // 250 + 120 + 50 = 420
        assert_eq!(d.nodes[3].label, "Step 3");
        assert_eq!(d.nodes[3].y, 450);
        assert_eq!(d.nodes[4].y, 520);
        assert_eq!(d.edges.len(), 4);
        assert_eq!(d.edges[0].from, "start");
        assert_eq!(d.edges[3].to, "end");
    }

    #[test]
    fn long_steps_grow() {
        let text = "word ".repeat(30);
        let d = build(&flow(json!([text.trim()])));
        let node = &d.nodes[1];
        assert_eq!(node.height, node.lines.len() as u32 * 16 + 20);
        assert!(node.height > 60);
    }

    #[test]
    fn empty_flows_still_have_terminals() {
        let d = build(&Flow::default());
        assert_eq!(d.nodes.len(), 2);
        assert_eq!(d.nodes[1].y, 150);
    }
}
