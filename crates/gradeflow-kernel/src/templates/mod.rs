//! Preset workflows
//!
//! A template is an ordered list of steps. Instantiating one appends the
//! steps to a store left to right and chains them with edges. Some steps
//! ship already configured, others are left for the user to confirm.

use crate::graph::GraphStore;
use crate::types::{Edge, Node, NodeKind, NodePatch, Point};
use serde::Serialize;

/// Horizontal distance between consecutive template steps
pub const STEP_SPACING: f32 = 260.0;
/// Model-space position of the first step
pub const FIRST_STEP: Point = Point::new(80.0, 120.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemplateStep {
    pub kind: NodeKind,
    pub label: &'static str,
    pub configured: bool,
}

const fn step(kind: NodeKind, label: &'static str, configured: bool) -> TemplateStep {
    TemplateStep {
        kind,
        label,
        configured,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkflowTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub popular: bool,
    /// ISO date, `YYYY-MM-DD`
    pub date: &'static str,
    pub steps: &'static [TemplateStep],
}

impl WorkflowTemplate {
    pub fn node_count(&self) -> usize {
        self.steps.len()
    }

    pub fn unconfigured_count(&self) -> usize {
        self.steps.iter().filter(|s| !s.configured).count()
    }
}

pub const BLANK: &str = "blank";

pub static TEMPLATES: [WorkflowTemplate; 4] = [
    WorkflowTemplate {
        id: "homework-grading",
        name: "Homework grading",
        description: "Fully automated homework grading with multi-format upload and feedback.",
        popular: true,
        date: "2025-12-15",
        steps: &[
            step(NodeKind::Upload, "Collect homework", true),
            step(NodeKind::Ocr, "Recognize content", true),
            step(NodeKind::AiGrading, "AI grading", false),
            step(NodeKind::Export, "Generate report", true),
        ],
    },
    WorkflowTemplate {
        id: "exam-analysis",
        name: "Exam analysis",
        description: "Analyze exam results and produce class and per-student reports.",
        popular: true,
        date: "2025-12-10",
        steps: &[
            step(NodeKind::Upload, "Scan papers", true),
            step(NodeKind::Ocr, "Read answers", true),
            step(NodeKind::AiGrading, "Score papers", true),
            step(NodeKind::Export, "Mistake statistics", false),
        ],
    },
    WorkflowTemplate {
        id: "practice-feedback",
        name: "Practice feedback",
        description: "Quick feedback on everyday practice to reinforce key points.",
        popular: false,
        date: "2025-11-28",
        steps: &[
            step(NodeKind::Upload, "Collect practice", true),
            step(NodeKind::AiGrading, "Quick grading", false),
            step(NodeKind::Export, "Instant feedback", true),
        ],
    },
    WorkflowTemplate {
        id: "error-collection",
        name: "Mistake book",
        description: "Find and classify mistakes, then build personalized review material.",
        popular: false,
        date: "2025-11-20",
        steps: &[
            step(NodeKind::Ocr, "Find mistakes", true),
            step(NodeKind::AiGrading, "Tag knowledge points", false),
            step(NodeKind::Export, "Build mistake book", true),
        ],
    },
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown template `{0}`")]
pub struct UnknownTemplate(pub String);

/// Every preset, newest first.
pub fn list() -> Vec<&'static WorkflowTemplate> {
    let mut templates: Vec<_> = TEMPLATES.iter().collect();
    templates.sort_by(|a, b| b.date.cmp(a.date));
    templates
}

pub fn find(id: &str) -> Option<&'static WorkflowTemplate> {
    TEMPLATES.iter().find(|t| t.id == id)
}

/// What a template produced in the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Instantiated {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Append the steps of template `id` to `store`. `blank` adds nothing.
pub fn instantiate(id: &str, store: &GraphStore) -> Result<Instantiated, UnknownTemplate> {
    if id == BLANK {
        return Ok(Instantiated::default());
    }
    let template = find(id).ok_or_else(|| UnknownTemplate(id.to_string()))?;

    let mut out = Instantiated::default();
    for (index, preset) in template.steps.iter().enumerate() {
        let position = FIRST_STEP + Point::new(STEP_SPACING * index as f32, 0.0);
        let created = store.add_node(preset.kind, position);
        let patch = NodePatch {
            label: Some(preset.label.to_string()),
            configured: Some(preset.configured),
            ..NodePatch::default()
        };
        // The node was added a moment ago; fall back to it if an observer
        // removed it in between.
        let node = store.update_node(created.id, patch).unwrap_or(created);
        if let Some(previous) = out.nodes.last() {
            if let Some(edge) = store.add_edge(previous.id, node.id) {
                out.edges.push(edge);
            }
        }
        out.nodes.push(node);
    }
    tracing::info!(
        "Instantiated template {} ({} steps, {} unconfigured)",
        template.id,
        template.node_count(),
        template.unconfigured_count()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_newest_first() {
        let ids: Vec<_> = list().iter().map(|t| t.id).collect();
        assert_eq!(
            ids,
            vec![
                "homework-grading",
                "exam-analysis",
                "practice-feedback",
                "error-collection"
            ]
        );
    }

    #[test]
    fn homework_grading_chains_four_steps() {
        let store = GraphStore::new();
        let made = instantiate("homework-grading", &store).unwrap();
        assert_eq!(made.nodes.len(), 4);
        assert_eq!(made.edges.len(), 3);
        let configured: Vec<_> = store.nodes().iter().map(|n| n.configured).collect();
        assert_eq!(configured, vec![true, true, false, true]);
        assert_eq!(store.nodes()[1].position, Point::new(340.0, 120.0));
    }

    #[test]
    fn blank_and_unknown() {
        let store = GraphStore::new();
        assert!(instantiate(BLANK, &store).unwrap().nodes.is_empty());
        assert_eq!(
            instantiate("nope", &store),
            Err(UnknownTemplate("nope".to_string()))
        );
        assert!(store.is_empty());
    }
}
