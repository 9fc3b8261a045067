//! Node palette: the static catalog of workflow steps
//!
//! Entries are read-only at runtime. The palette emits "add node" requests
//! by kind; everything else about a new node comes from here.

use crate::types::NodeKind;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub kind: NodeKind,
    pub name: &'static str,
    pub description: &'static str,
    pub usage_hint: &'static str,
    /// Icon reference understood by the front end
    pub icon: &'static str,
}

pub static CATALOG: [CatalogEntry; 6] = [
    CatalogEntry {
        kind: NodeKind::Upload,
        name: "Collect homework",
        description: "Students upload photos or documents of their work",
        usage_hint: "Accepts photos, PDF and other common formats",
        icon: "upload",
    },
    CatalogEntry {
        kind: NodeKind::Ocr,
        name: "Recognize content",
        description: "Extracts answers and student details from submissions",
        usage_hint: "Pulls text and answers out automatically",
        icon: "scan-text",
    },
    CatalogEntry {
        kind: NodeKind::AiGrading,
        name: "AI grading",
        description: "Scores answers against the reference solution",
        usage_hint: "Requires grading rules and a reference answer",
        icon: "sparkles",
    },
    CatalogEntry {
        kind: NodeKind::RuleMatch,
        name: "Rule match",
        description: "Checks answers against configured matching rules",
        usage_hint: "Works best for objective and fill-in questions",
        icon: "list-checks",
    },
    CatalogEntry {
        kind: NodeKind::Export,
        name: "Generate report",
        description: "Exports grading results and summary statistics",
        usage_hint: "Choose the export format and contents",
        icon: "file-text",
    },
    CatalogEntry {
        kind: NodeKind::ExportScore,
        name: "Export scores",
        description: "Exports per-student scores for the gradebook",
        usage_hint: "Spreadsheet formats keep one row per student",
        icon: "chart-bar",
    },
];

pub fn entry(kind: NodeKind) -> &'static CatalogEntry {
    // CATALOG holds exactly one entry per NodeKind, in declaration order.
    &CATALOG[kind as usize]
}

pub fn entries() -> &'static [CatalogEntry] {
    &CATALOG
}

/// Steps worth offering after `previous`; `None` means the canvas is empty.
pub fn recommended_after(previous: Option<NodeKind>) -> Vec<&'static CatalogEntry> {
    let only = |kind: NodeKind| vec![entry(kind)];
    match previous {
        None => only(NodeKind::Upload),
        Some(NodeKind::Upload) => only(NodeKind::Ocr),
        Some(NodeKind::Ocr) => only(NodeKind::AiGrading),
        Some(NodeKind::AiGrading) => only(NodeKind::Export),
        Some(NodeKind::RuleMatch | NodeKind::Export | NodeKind::ExportScore) => {
            CATALOG.iter().collect()
        }
    }
}
