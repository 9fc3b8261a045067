//! Connection interaction: drawing an edge between two connectors
//!
//! Two states, `Idle` and `Connecting`. Pointer events are consumed at the
//! whole-surface level, so the gesture survives the pointer leaving the
//! source node and has no timeout.

use crate::config::NodeGeometry;
use crate::graph::GraphStore;
use crate::types::{Edge, Node, NodeId, Point};
use serde::{Deserialize, Serialize};

/// Left (input) or right (output) hotspot of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorSide {
    Input,
    Output,
}

impl ConnectorSide {
    /// Anchor point of this connector on `node`, in model coordinates.
    pub fn anchor(self, node: &Node, geometry: &NodeGeometry) -> Point {
        let y = node.position.y + geometry.height / 2.0;
        match self {
            ConnectorSide::Input => Point::new(node.position.x, y),
            ConnectorSide::Output => Point::new(node.position.x + geometry.width, y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionState {
    Idle,
    Connecting {
        source: NodeId,
        side: ConnectorSide,
        /// Transient endpoint, model coordinates
        cursor: Point,
    },
}

/// Result of releasing the pointer during a gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectOutcome {
    /// A new edge was created
    Connected(Edge),
    /// Released on a connector, but the store refused the edge
    /// (same node, already joined, or an endpoint vanished)
    Rejected,
    /// Released away from any connector
    Cancelled,
    /// No gesture was in progress
    NotConnecting,
}

/// Dashed preview line from the source connector to the cursor
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PreviewEdge {
    pub source: NodeId,
    pub from: Point,
    pub to: Point,
}

#[derive(Debug, Clone)]
pub struct ConnectionInteraction {
    state: ConnectionState,
}

impl Default for ConnectionInteraction {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionInteraction {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Idle,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self.state, ConnectionState::Connecting { .. })
    }

    /// Pointer down on a connector. Ignored while a gesture is already open.
    pub fn begin(&mut self, source: NodeId, side: ConnectorSide, cursor: Point) -> bool {
        if self.is_connecting() {
            return false;
        }
        self.state = ConnectionState::Connecting {
            source,
            side,
            cursor,
        };
        true
    }

    /// Pointer move anywhere on the surface.
    pub fn update(&mut self, model_point: Point) {
        if let ConnectionState::Connecting { cursor, .. } = &mut self.state {
            *cursor = model_point;
        }
    }

    pub fn preview(&self, store: &GraphStore, geometry: &NodeGeometry) -> Option<PreviewEdge> {
        let ConnectionState::Connecting {
            source,
            side,
            cursor,
        } = self.state
        else {
            return None;
        };
        let node = store.node(source)?;
        Some(PreviewEdge {
            source,
            from: side.anchor(&node, geometry),
            to: cursor,
        })
    }

    /// Pointer up. `target` is the node owning the connector under the
    /// pointer, if any. Always returns to `Idle`.
    pub fn finish(&mut self, target: Option<NodeId>, store: &GraphStore) -> ConnectOutcome {
        let previous = std::mem::replace(&mut self.state, ConnectionState::Idle);
        let ConnectionState::Connecting { source, .. } = previous else {
            #[cfg(feature = "strict-debug")]
            panic!("connection finished while idle");
            #[cfg(not(feature = "strict-debug"))]
            return ConnectOutcome::NotConnecting;
        };
        match target {
            None => ConnectOutcome::Cancelled,
            Some(target) => match store.add_edge(source, target) {
                Some(edge) => {
                    tracing::debug!("Connected {} -> {}", source, target);
                    ConnectOutcome::Connected(edge)
                }
                None => ConnectOutcome::Rejected,
            },
        }
    }

    /// Drop the gesture without touching the store.
    pub fn cancel(&mut self) {
        self.state = ConnectionState::Idle;
    }
}
