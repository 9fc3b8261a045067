//! Error types for the canvas kernel
//!
//! Gesture-level rejections (self connections, duplicate edges, releasing a
//! connection over empty canvas) are silent no-ops and never show up here.

use crate::types::{EdgeId, NodeId, NodeKind};

/// Top-level kernel error
#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    /// Graph store rejected a mutation
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Property panel rejected an edit
    #[error("panel error: {0}")]
    Panel(#[from] PanelError),

    /// Run could not start
    #[error("run error: {0}")]
    Run(#[from] RunError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CanvasError {
    /// Validation failures are surfaced to the user as a blocking state
    /// rather than as a crash.
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Run(RunError::EmptyWorkflow | RunError::Unconfigured { .. })
                | Self::Panel(_)
        )
    }

    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("configuration for {found} cannot be applied to a {expected} node")]
    ConfigKindMismatch { expected: NodeKind, found: NodeKind },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PanelError {
    #[error("field `{field}` does not exist on {kind} nodes")]
    UnknownField { kind: NodeKind, field: String },

    #[error("invalid value for field `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// A node that blocks a run because it was never confirmed in the panel
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UnconfiguredNode {
    pub id: NodeId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    #[error("workflow has no steps")]
    EmptyWorkflow,

    #[error("{} step(s) need configuration: {}", .nodes.len(), unconfigured_labels(.nodes))]
    Unconfigured { nodes: Vec<UnconfiguredNode> },

    #[error("workflow is already running")]
    AlreadyRunning,
}

impl RunError {
    /// Node ids named by a validation failure.
    pub fn unconfigured_ids(&self) -> Vec<NodeId> {
        match self {
            RunError::Unconfigured { nodes } => nodes.iter().map(|n| n.id).collect(),
            _ => Vec::new(),
        }
    }
}

fn unconfigured_labels(nodes: &[UnconfiguredNode]) -> String {
    nodes
        .iter()
        .map(|n| n.label.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    #[error("run log entry {sequence} is out of order")]
    OutOfOrder { sequence: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T, E = CanvasError> = std::result::Result<T, E>;
