//! Property panel
//!
//! Each node kind carries its own configuration variant. The panel edits a
//! draft copy of the selected node and writes it back only on confirm.

use crate::error::{GraphError, PanelError};
use crate::graph::GraphStore;
use crate::types::{Node, NodeId, NodeKind, NodePatch};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    #[default]
    Student,
    Batch,
    Scanner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Exact,
    Keyword,
    Fuzzy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Pdf,
    Excel,
    Csv,
}

/// Type-specific settings of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NodeConfig {
    Upload {
        mode: UploadMode,
    },
    Ocr {
        extract_student_info: bool,
        recognize_handwriting: bool,
    },
    AiGrading {
        grading_rules: String,
        key_points: String,
        auto_link_knowledge: bool,
        highlight_weakness: bool,
    },
    RuleMatch {
        rules: Vec<String>,
        match_mode: MatchMode,
    },
    Export {
        format: ExportFormat,
        include_statistics: bool,
    },
    ExportScore {
        format: ExportFormat,
        include_ranking: bool,
    },
}

impl NodeConfig {
    pub fn default_for(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Upload => NodeConfig::Upload {
                mode: UploadMode::default(),
            },
            NodeKind::Ocr => NodeConfig::Ocr {
                extract_student_info: true,
                recognize_handwriting: false,
            },
            NodeKind::AiGrading => NodeConfig::AiGrading {
                grading_rules: String::new(),
                key_points: String::new(),
                auto_link_knowledge: false,
                highlight_weakness: false,
            },
            NodeKind::RuleMatch => NodeConfig::RuleMatch {
                rules: Vec::new(),
                match_mode: MatchMode::default(),
            },
            NodeKind::Export => NodeConfig::Export {
                format: ExportFormat::default(),
                include_statistics: true,
            },
            NodeKind::ExportScore => NodeConfig::ExportScore {
                format: ExportFormat::Excel,
                include_ranking: false,
            },
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeConfig::Upload { .. } => NodeKind::Upload,
            NodeConfig::Ocr { .. } => NodeKind::Ocr,
            NodeConfig::AiGrading { .. } => NodeKind::AiGrading,
            NodeConfig::RuleMatch { .. } => NodeKind::RuleMatch,
            NodeConfig::Export { .. } => NodeKind::Export,
            NodeConfig::ExportScore { .. } => NodeKind::ExportScore,
        }
    }

    /// Apply one field edit. Unknown keys and mistyped values are rejected
    /// without touching the config.
    pub fn set_field(&mut self, key: &str, value: FieldValue) -> Result<(), PanelError> {
        let kind = self.kind();
        match (self, key) {
            (NodeConfig::Upload { mode }, "mode") => {
                *mode = parse_choice(key, &value, &[
                    ("student", UploadMode::Student),
                    ("batch", UploadMode::Batch),
                    ("scanner", UploadMode::Scanner),
                ])?;
            }
            (NodeConfig::Ocr { extract_student_info, .. }, "extract_student_info") => {
                *extract_student_info = expect_bool(key, value)?;
            }
            (NodeConfig::Ocr { recognize_handwriting, .. }, "recognize_handwriting") => {
                *recognize_handwriting = expect_bool(key, value)?;
            }
            (NodeConfig::AiGrading { grading_rules, .. }, "grading_rules") => {
                *grading_rules = expect_text(key, value)?;
            }
            (NodeConfig::AiGrading { key_points, .. }, "key_points") => {
                *key_points = expect_text(key, value)?;
            }
            (NodeConfig::AiGrading { auto_link_knowledge, .. }, "auto_link_knowledge") => {
                *auto_link_knowledge = expect_bool(key, value)?;
            }
            (NodeConfig::AiGrading { highlight_weakness, .. }, "highlight_weakness") => {
                *highlight_weakness = expect_bool(key, value)?;
            }
            (NodeConfig::RuleMatch { rules, .. }, "rules") => {
                *rules = match value {
                    FieldValue::List(items) => items,
                    FieldValue::Text(text) => text
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(str::to_string)
                        .collect(),
                    other => return Err(type_mismatch(key, "a list", &other)),
                };
            }
            (NodeConfig::RuleMatch { match_mode, .. }, "match_mode") => {
                *match_mode = parse_choice(key, &value, &[
                    ("exact", MatchMode::Exact),
                    ("keyword", MatchMode::Keyword),
                    ("fuzzy", MatchMode::Fuzzy),
                ])?;
            }
            (
                NodeConfig::Export { format, .. } | NodeConfig::ExportScore { format, .. },
                "format",
            ) => {
                *format = parse_choice(key, &value, &EXPORT_FORMATS)?;
            }
            (NodeConfig::Export { include_statistics, .. }, "include_statistics") => {
                *include_statistics = expect_bool(key, value)?;
            }
            (NodeConfig::ExportScore { include_ranking, .. }, "include_ranking") => {
                *include_ranking = expect_bool(key, value)?;
            }
            (_, _) => {
                return Err(PanelError::UnknownField {
                    kind,
                    field: key.to_string(),
                })
            }
        }
        Ok(())
    }
}

const EXPORT_FORMATS: [(&str, ExportFormat); 3] = [
    ("pdf", ExportFormat::Pdf),
    ("excel", ExportFormat::Excel),
    ("csv", ExportFormat::Csv),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
    List(Vec<String>),
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

fn type_mismatch(field: &str, expected: &str, got: &FieldValue) -> PanelError {
    PanelError::InvalidValue {
        field: field.to_string(),
        reason: format!("expected {expected}, got {got:?}"),
    }
}

fn expect_bool(field: &str, value: FieldValue) -> Result<bool, PanelError> {
    match value {
        FieldValue::Bool(b) => Ok(b),
        other => Err(type_mismatch(field, "a boolean", &other)),
    }
}

fn expect_text(field: &str, value: FieldValue) -> Result<String, PanelError> {
    match value {
        FieldValue::Text(text) => Ok(text),
        other => Err(type_mismatch(field, "text", &other)),
    }
}

fn parse_choice<T: Copy>(
    field: &str,
    value: &FieldValue,
    options: &[(&str, T)],
) -> Result<T, PanelError> {
    let FieldValue::Text(text) = value else {
        return Err(type_mismatch(field, "one of the listed options", value));
    };
    options
        .iter()
        .find(|(name, _)| *name == text)
        .map(|(_, v)| *v)
        .ok_or_else(|| PanelError::InvalidValue {
            field: field.to_string(),
            reason: format!(
                "`{text}` is not one of {}",
                options.iter().map(|(n, _)| *n).collect::<Vec<_>>().join(", ")
            ),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "input", content = "options", rename_all = "kebab-case")]
pub enum FieldType {
    Text,
    MultilineText,
    Toggle,
    Choice(&'static [&'static str]),
    ReadOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub field_type: FieldType,
}

const fn field(key: &'static str, label: &'static str, field_type: FieldType) -> FieldSpec {
    FieldSpec {
        key,
        label,
        field_type,
    }
}

/// Shown for every node regardless of kind
pub const GENERIC_FIELDS: &[FieldSpec] = &[
    field("name", "Node name", FieldType::Text),
    field("type", "Node type", FieldType::ReadOnly),
];

const FORMAT_CHOICES: &[&str] = &["pdf", "excel", "csv"];

const UPLOAD_FIELDS: &[FieldSpec] = &[field(
    "mode",
    "Upload method",
    FieldType::Choice(&["student", "batch", "scanner"]),
)];

const OCR_FIELDS: &[FieldSpec] = &[
    field("extract_student_info", "Extract student details", FieldType::Toggle),
    field("recognize_handwriting", "Recognize handwriting", FieldType::Toggle),
];

const AI_GRADING_FIELDS: &[FieldSpec] = &[
    field("grading_rules", "Grading rules", FieldType::MultilineText),
    field("key_points", "Scoring key points", FieldType::MultilineText),
    field("auto_link_knowledge", "Link knowledge points automatically", FieldType::Toggle),
    field("highlight_weakness", "Highlight weak areas", FieldType::Toggle),
];

const RULE_MATCH_FIELDS: &[FieldSpec] = &[
    field("rules", "Matching rules", FieldType::MultilineText),
    field(
        "match_mode",
        "Match mode",
        FieldType::Choice(&["exact", "keyword", "fuzzy"]),
    ),
];

const EXPORT_FIELDS: &[FieldSpec] = &[
    field("format", "Export format", FieldType::Choice(FORMAT_CHOICES)),
    field("include_statistics", "Include statistics", FieldType::Toggle),
];

const EXPORT_SCORE_FIELDS: &[FieldSpec] = &[
    field("format", "Export format", FieldType::Choice(FORMAT_CHOICES)),
    field("include_ranking", "Include class ranking", FieldType::Toggle),
];

/// Kind-specific fields, excluding the generic ones
pub fn fields_for(kind: NodeKind) -> &'static [FieldSpec] {
    match kind {
        NodeKind::Upload => UPLOAD_FIELDS,
        NodeKind::Ocr => OCR_FIELDS,
        NodeKind::AiGrading => AI_GRADING_FIELDS,
        NodeKind::RuleMatch => RULE_MATCH_FIELDS,
        NodeKind::Export => EXPORT_FIELDS,
        NodeKind::ExportScore => EXPORT_SCORE_FIELDS,
    }
}

/// Receiver of the panel's two callbacks
pub trait PanelHost {
    fn on_update(&mut self, node_id: NodeId, patch: NodePatch) -> Result<(), GraphError>;
    fn on_close(&mut self);
}

/// Writes confirmed panel edits straight into a [`GraphStore`]
pub struct StorePanelHost<'a> {
    store: &'a GraphStore,
    closed: bool,
}

impl<'a> StorePanelHost<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self {
            store,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl PanelHost for StorePanelHost<'_> {
    fn on_update(&mut self, node_id: NodeId, patch: NodePatch) -> Result<(), GraphError> {
        self.store.update_node(node_id, patch).map(|_| ())
    }

    fn on_close(&mut self) {
        self.closed = true;
    }
}

/// Draft editor bound to one node
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyPanel {
    node_id: NodeId,
    kind: NodeKind,
    label: String,
    config: NodeConfig,
}

impl PropertyPanel {
    pub fn open(node: &Node) -> Self {
        Self {
            node_id: node.id,
            kind: node.kind,
            label: node.label.clone(),
            config: node.config.clone(),
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Generic fields followed by the kind's own fields
    pub fn fields(&self) -> Vec<&'static FieldSpec> {
        GENERIC_FIELDS
            .iter()
            .chain(fields_for(self.kind).iter())
            .collect()
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn set_field(&mut self, key: &str, value: FieldValue) -> Result<(), PanelError> {
        match key {
            "name" => {
                self.label = expect_text(key, value)?;
                Ok(())
            }
            "type" => Err(PanelError::InvalidValue {
                field: key.to_string(),
                reason: "node type cannot be changed".to_string(),
            }),
            _ => self.config.set_field(key, value),
        }
    }

    /// The write-back performed on confirm
    pub fn patch(&self) -> NodePatch {
        NodePatch {
            label: Some(self.label.clone()),
            configured: Some(true),
            status: None,
            config: Some(self.config.clone()),
        }
    }

    /// Write the draft back and close. `on_close` fires even when the update
    /// fails, e.g. because the node was deleted while the panel was open.
    pub fn confirm<H: PanelHost + ?Sized>(self, host: &mut H) -> Result<(), GraphError> {
        let result = host.on_update(self.node_id, self.patch());
        host.on_close();
        if let Err(err) = &result {
            tracing::warn!("Panel confirm for {} failed: {}", self.node_id, err);
        }
        result
    }
}
