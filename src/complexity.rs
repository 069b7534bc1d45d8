//! Step-count based complexity metrics for flows.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Flow, Step};

const USER_VERBS: [&str; 5] = ["user", "click", "select", "enter", "upload"];
const LOOP_WORDS: [&str; 2] = ["repeat", "loop"];
const SECONDS_PER_USER_ACTION: u64 = 15;
const SECONDS_PER_STEP: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowComplexity {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<String>,
    pub total_steps: u64,
    pub user_actions: u64,
    pub system_actions: u64,
    pub decision_points: u64,
    pub max_depth: u64,
    pub branches: u64,
    pub loops: u64,
    pub complexity_score: u64,
    /// Seconds.
    pub estimated_time: u64,
    pub source_docs: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleComplexity {
    pub avg_complexity: u64,
    pub max_complexity: u64,
    pub min_complexity: u64,
    pub total_steps: u64,
    pub avg_steps_per_flow: u64,
    pub total_user_actions: u64,
    pub total_decision_points: u64,
    pub estimated_total_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_complex_flow: Option<FlowComplexity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub least_complex_flow: Option<FlowComplexity>,
}

#[derive(Default)]
struct Tally {
    total_steps: u64,
    user_actions: u64,
    system_actions: u64,
    decision_points: u64,
    max_depth: u64,
    branches: u64,
    loops: u64,
}

impl Tally {
    fn visit(&mut self, step: &Step, depth: u64) {
        self.total_steps += 1;
        self.max_depth = self.max_depth.max(depth);

        let (text, kind) = match step {
            Step::Text(s) => (Some(s.as_str()), None),
            Step::Detailed(d) => (d.description.as_deref(), d.kind.as_deref()),
            Step::Raw(_) => (None, None),
        };
        let lower = text.map(str::to_lowercase).unwrap_or_default();

        if USER_VERBS.iter().any(|v| lower.contains(v)) {
            self.user_actions += 1;
        } else {
            self.system_actions += 1;
        }
        if kind == Some("decision") || text.is_some_and(|t| t.contains('?')) {
            self.decision_points += 1;
        }
        if LOOP_WORDS.iter().any(|w| lower.contains(w)) {
            self.loops += 1;
        }

        let Step::Detailed(detail) = step else {
            return;
        };
        if let Some(options) = &detail.options {
            self.branches += options.len() as u64;
            for option in options {
                for sub in nested_steps(option) {
                    self.visit(&sub, depth + 1);
                }
            }
        }
        for sub in detail.next_steps.iter().flatten() {
            self.visit(sub, depth + 1);
        }
    }
}

fn nested_steps(option: &Value) -> Vec<Step> {
    option
        .get("next_steps")
        .and_then(|v| Vec::<Step>::deserialize(v).ok())
        .unwrap_or_default()
}

pub fn analyze(flow: &Flow) -> FlowComplexity {
    let mut tally = Tally::default();
    for step in flow.steps() {
        tally.visit(step, 0);
    }

    let score = tally.total_steps as f64
        + tally.decision_points as f64 * 2.0
        + tally.max_depth as f64 * 1.5
        + tally.branches as f64 * 1.5
        + tally.loops as f64 * 2.0;

    FlowComplexity {
        name: flow.display_name().unwrap_or("Unnamed Flow").to_string(),
        flow_id: flow.identifier().map(str::to_owned),
        total_steps: tally.total_steps,
        user_actions: tally.user_actions,
        system_actions: tally.system_actions,
        decision_points: tally.decision_points,
        max_depth: tally.max_depth,
        branches: tally.branches,
        loops: tally.loops,
        complexity_score: score.round() as u64,
        estimated_time: (tally.user_actions * SECONDS_PER_USER_ACTION).max(tally.total_steps * SECONDS_PER_STEP),
        source_docs: flow.source_documents().len(),
    }
}

/// Aggregate over a module. The first flow wins ties for most and least
/// complex.
pub fn summarize(flows: &[FlowComplexity]) -> ModuleComplexity {
    let Some(first) = flows.first() else {
        return ModuleComplexity {
            avg_complexity: 0,
            max_complexity: 0,
            min_complexity: 0,
            total_steps: 0,
            avg_steps_per_flow: 0,
            total_user_actions: 0,
            total_decision_points: 0,
            estimated_total_time: 0,
            most_complex_flow: None,
            least_complex_flow: None,
        };
    };

    let count = flows.len() as f64;
    let total_score: u64 = flows.iter().map(|f| f.complexity_score).sum();
    let total_steps: u64 = flows.iter().map(|f| f.total_steps).sum();
    let mut most = first;
    let mut least = first;
    for f in flows {
        if f.complexity_score > most.complexity_score {
            most = f;
        }
        if f.complexity_score < least.complexity_score {
            least = f;
        }
    }

    ModuleComplexity {
        avg_complexity: (total_score as f64 / count).round() as u64,
        max_complexity: most.complexity_score,
        min_complexity: least.complexity_score,
        total_steps,
        avg_steps_per_flow: (total_steps as f64 / count).round() as u64,
        total_user_actions: flows.iter().map(|f| f.user_actions).sum(),
        total_decision_points: flows.iter().map(|f| f.decision_points).sum(),
        estimated_total_time: flows.iter().map(|f| f.estimated_time).sum(),
        most_complex_flow: Some(most.clone()),
        least_complex_flow: Some(least.clone()),
    }
}
