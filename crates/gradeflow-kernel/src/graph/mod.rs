//! Graph store: the single owner of nodes and edges
//!
//! Nodes keep insertion (array) order, which is also the order the run
//! simulator walks. Every mutation notifies observers synchronously, after
//! the write lock has been released.

mod topology;

pub use topology::Topology;

use crate::catalog;
use crate::error::GraphError;
use crate::panel::NodeConfig;
use crate::types::{Edge, EdgeId, GraphSnapshot, Node, NodeId, NodeKind, NodePatch, NodeStatus, Point};
use parking_lot::RwLock;
use std::sync::Arc;

/// Change notification delivered to observers
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    NodeAdded(NodeId),
    NodeMoved(NodeId),
    NodeUpdated(NodeId),
    NodeRemoved { id: NodeId, edges: Vec<EdgeId> },
    EdgeAdded(EdgeId),
    EdgeRemoved(EdgeId),
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

#[derive(Debug, Default)]
struct GraphState {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    edge_stamp: u64,
}

impl GraphState {
    fn index_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(GraphError::NodeNotFound(id))
    }
}

#[derive(Default)]
struct Observers {
    next_id: u64,
    entries: Vec<(SubscriptionId, Observer)>,
}

#[derive(Default)]
pub struct GraphStore {
    inner: RwLock<GraphState>,
    observers: RwLock<Observers>,
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read();
        f.debug_struct("GraphStore")
            .field("nodes", &state.nodes.len())
            .field("edges", &state.edges.len())
            .field("observers", &self.observers.read().entries.len())
            .finish()
    }
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn new_node(kind: NodeKind, position: Point) -> Node {
        Node {
            id: NodeId::new(),
            kind,
            label: catalog::entry(kind).name.to_string(),
            position,
            configured: false,
            status: NodeStatus::Idle,
            config: NodeConfig::default_for(kind),
        }
    }

    pub fn add_node(&self, kind: NodeKind, position: Point) -> Node {
        let node = Self::new_node(kind, position);
        self.inner.write().nodes.push(node.clone());
        tracing::debug!("Added {} node {}", kind, node.id);
        self.notify(&StoreEvent::NodeAdded(node.id));
        node
    }

    /// Add a node directly after `after` in array order.
    pub fn insert_node_after(
        &self,
        after: NodeId,
        kind: NodeKind,
        position: Point,
    ) -> Result<Node, GraphError> {
        let node = Self::new_node(kind, position);
        {
            let mut state = self.inner.write();
            let index = state.index_of(after).ok_or(GraphError::NodeNotFound(after))?;
            state.nodes.insert(index + 1, node.clone());
        }
        tracing::debug!("Inserted {} node {} after {}", kind, node.id, after);
        self.notify(&StoreEvent::NodeAdded(node.id));
        Ok(node)
    }

    pub fn move_node(&self, id: NodeId, position: Point) -> Result<(), GraphError> {
        self.inner.write().node_mut(id)?.position = position;
        self.notify(&StoreEvent::NodeMoved(id));
        Ok(())
    }

    /// Remove a node together with every edge that touches it.
    pub fn remove_node(&self, id: NodeId) -> Result<Node, GraphError> {
        let (node, removed_edges) = {
            let mut state = self.inner.write();
            let index = state.index_of(id).ok_or(GraphError::NodeNotFound(id))?;
            let node = state.nodes.remove(index);
            let mut removed = Vec::new();
            state.edges.retain(|e| {
                if e.touches(id) {
                    removed.push(e.id);
                    false
                } else {
                    true
                }
            });
            (node, removed)
        };
        tracing::debug!("Removed node {} and {} edge(s)", id, removed_edges.len());
        self.notify(&StoreEvent::NodeRemoved {
            id,
            edges: removed_edges,
        });
        Ok(node)
    }

    pub fn update_node(&self, id: NodeId, patch: NodePatch) -> Result<Node, GraphError> {
        let updated = {
            let mut state = self.inner.write();
            let node = state.node_mut(id)?;
            if let Some(config) = &patch.config {
                if config.kind() != node.kind {
                    return Err(GraphError::ConfigKindMismatch {
                        expected: node.kind,
                        found: config.kind(),
                    });
                }
            }
            if let Some(label) = patch.label {
                node.label = label;
            }
            if let Some(configured) = patch.configured {
                node.configured = configured;
            }
            if let Some(status) = patch.status {
                node.status = status;
            }
            if let Some(config) = patch.config {
                node.config = config;
            }
            node.clone()
        };
        self.notify(&StoreEvent::NodeUpdated(id));
        Ok(updated)
    }

    /// Connect `source` to `target`.
    ///
    /// Returns `None` without touching the store for a self connection, a
    /// missing endpoint, or a pair that is already joined in either direction.
    pub fn add_edge(&self, source: NodeId, target: NodeId) -> Option<Edge> {
        if source == target {
            tracing::debug!("Rejected self connection on {}", source);
            return None;
        }
        let edge = {
            let mut state = self.inner.write();
            if state.index_of(source).is_none() || state.index_of(target).is_none() {
                tracing::debug!("Rejected edge {} -> {}: missing endpoint", source, target);
                return None;
            }
            if state.edges.iter().any(|e| e.joins(source, target)) {
                tracing::debug!("Rejected duplicate edge {} -> {}", source, target);
                return None;
            }
            state.edge_stamp += 1;
            let edge = Edge {
                id: EdgeId {
                    source,
                    target,
                    stamp: state.edge_stamp,
                },
                source,
                target,
            };
            state.edges.push(edge);
            edge
        };
        self.notify(&StoreEvent::EdgeAdded(edge.id));
        Some(edge)
    }

    pub fn remove_edge(&self, id: EdgeId) -> Result<Edge, GraphError> {
        let edge = {
            let mut state = self.inner.write();
            let index = state
                .edges
                .iter()
                .position(|e| e.id == id)
                .ok_or(GraphError::EdgeNotFound(id))?;
            state.edges.remove(index)
        };
        self.notify(&StoreEvent::EdgeRemoved(id));
        Ok(edge)
    }

    /// Put every node back to `idle`. Nodes already idle are not reported.
    pub fn reset_statuses(&self) {
        let touched: Vec<NodeId> = {
            let mut state = self.inner.write();
            state
                .nodes
                .iter_mut()
                .filter(|n| n.status != NodeStatus::Idle)
                .map(|n| {
                    n.status = NodeStatus::Idle;
                    n.id
                })
                .collect()
        };
        for id in touched {
            self.notify(&StoreEvent::NodeUpdated(id));
        }
    }

    pub fn clear(&self) {
        {
            let mut state = self.inner.write();
            state.nodes.clear();
            state.edges.clear();
        }
        self.notify(&StoreEvent::Cleared);
    }

    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.inner.read().nodes.iter().find(|n| n.id == id).cloned()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.inner.read().index_of(id).is_some()
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.inner.read().nodes.clone()
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.inner.read().edges.clone()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let state = self.inner.read();
        GraphSnapshot {
            nodes: state.nodes.clone(),
            edges: state.edges.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.read().edges.len()
    }

    pub fn topology(&self) -> Topology {
        Topology::analyze(&self.snapshot())
    }

    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let mut observers = self.observers.write();
        observers.next_id += 1;
        let id = SubscriptionId(observers.next_id);
        observers.entries.push((id, Arc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.entries.len();
        observers.entries.retain(|(sid, _)| *sid != id);
        observers.entries.len() != before
    }

    fn notify(&self, event: &StoreEvent) {
        // Clone the list so observers may subscribe, unsubscribe or read the
        // store from inside the callback.
        let observers: Vec<Observer> = self
            .observers
            .read()
            .entries
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect();
        for observer in observers {
            observer(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn new_nodes_start_unconfigured_and_idle() {
        let store = GraphStore::new();
        let node = store.add_node(NodeKind::Ocr, Point::new(10.0, 20.0));
        assert!(!node.configured);
        assert_eq!(node.status, NodeStatus::Idle);
        assert_eq!(node.label, catalog::entry(NodeKind::Ocr).name);
        assert_eq!(store.node(node.id), Some(node));
    }

    #[test]
    fn insert_after_keeps_array_order() {
        let store = GraphStore::new();
        let a = store.add_node(NodeKind::Upload, Point::ORIGIN);
        let c = store.add_node(NodeKind::Export, Point::ORIGIN);
        let b = store
            .insert_node_after(a.id, NodeKind::Ocr, Point::ORIGIN)
            .unwrap();
        let order: Vec<_> = store.nodes().into_iter().map(|n| n.id).collect();
        assert_eq!(order, vec![a.id, b.id, c.id]);
    }

    #[test]
    fn config_patch_must_match_kind() {
        let store = GraphStore::new();
        let node = store.add_node(NodeKind::Upload, Point::ORIGIN);
        let patch = NodePatch {
            config: Some(NodeConfig::default_for(NodeKind::Export)),
            ..NodePatch::default()
        };
        let err = store.update_node(node.id, patch).unwrap_err();
        assert_eq!(
            err,
            GraphError::ConfigKindMismatch {
                expected: NodeKind::Upload,
                found: NodeKind::Export
            }
        );
        assert_eq!(store.node(node.id).unwrap().config, node.config);
    }

    #[test]
    fn observers_see_cascade() {
        let store = GraphStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe(move |event| sink.lock().push(event.clone()));

        let a = store.add_node(NodeKind::Upload, Point::ORIGIN);
        let b = store.add_node(NodeKind::Ocr, Point::ORIGIN);
        let edge = store.add_edge(a.id, b.id).unwrap();
        store.remove_node(a.id).unwrap();

        let events = seen.lock().clone();
        assert_eq!(
            events,
            vec![
                StoreEvent::NodeAdded(a.id),
                StoreEvent::NodeAdded(b.id),
                StoreEvent::EdgeAdded(edge.id),
                StoreEvent::NodeRemoved {
                    id: a.id,
                    edges: vec![edge.id]
                },
            ]
        );
    }

    #[test]
    fn unsubscribed_observer_is_silent() {
        let store = GraphStore::new();
        let count = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&count);
        let id = store.subscribe(move |_| *sink.lock() += 1);
        store.add_node(NodeKind::Upload, Point::ORIGIN);
        assert!(store.unsubscribe(id));
        store.add_node(NodeKind::Upload, Point::ORIGIN);
        assert_eq!(*count.lock(), 1);
        assert!(!store.unsubscribe(id));
    }

    #[test]
    fn observer_may_read_store() {
        let store = Arc::new(GraphStore::new());
        let lens = Arc::new(Mutex::new(Vec::new()));
        let (weak, sink) = (Arc::downgrade(&store), Arc::clone(&lens));
        store.subscribe(move |_| {
            if let Some(store) = weak.upgrade() {
                sink.lock().push(store.len());
            }
        });
        store.add_node(NodeKind::Upload, Point::ORIGIN);
        store.add_node(NodeKind::Ocr, Point::ORIGIN);
        assert_eq!(*lens.lock(), vec![1, 2]);
    }
}
