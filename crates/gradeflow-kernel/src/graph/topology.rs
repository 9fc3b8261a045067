use crate::types::{GraphSnapshot, NodeId};
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use serde::Serialize;

/// Structural summary of the drawn workflow.
///
/// Purely informational: edges indicate intended sequence, they are never
/// enforced when the workflow runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topology {
    /// Nodes with outgoing but no incoming edges
    pub entry_nodes: Vec<NodeId>,
    /// Nodes with incoming but no outgoing edges
    pub exit_nodes: Vec<NodeId>,
    /// Nodes with no edges at all
    pub isolated_nodes: Vec<NodeId>,
    pub is_acyclic: bool,
    /// Edge-respecting order, ties broken by array order; `None` on cycles
    pub suggested_order: Option<Vec<NodeId>>,
}

impl Topology {
    pub fn analyze(snapshot: &GraphSnapshot) -> Self {
        let mut graph: DiGraphMap<NodeId, ()> = DiGraphMap::new();
        for node in &snapshot.nodes {
            graph.add_node(node.id);
        }
        for edge in &snapshot.edges {
            graph.add_edge(edge.source, edge.target, ());
        }

        let has = |id: NodeId, dir: Direction| graph.neighbors_directed(id, dir).next().is_some();
        let mut entry_nodes = Vec::new();
        let mut exit_nodes = Vec::new();
        let mut isolated_nodes = Vec::new();
        for node in &snapshot.nodes {
            match (has(node.id, Direction::Incoming), has(node.id, Direction::Outgoing)) {
                (false, false) => isolated_nodes.push(node.id),
                (false, true) => entry_nodes.push(node.id),
                (true, false) => exit_nodes.push(node.id),
                (true, true) => {}
            }
        }

        let is_acyclic = !is_cyclic_directed(&graph);
        let suggested_order = if is_acyclic {
            stable_order(snapshot, &graph)
        } else {
            None
        };

        Self {
            entry_nodes,
            exit_nodes,
            isolated_nodes,
            is_acyclic,
            suggested_order,
        }
    }
}

/// Kahn's algorithm seeded in array order, so an unconnected canvas keeps
/// the order the user built it in. Falls back to petgraph's toposort if the
/// two ever disagree on length.
fn stable_order(snapshot: &GraphSnapshot, graph: &DiGraphMap<NodeId, ()>) -> Option<Vec<NodeId>> {
    let mut indegree: std::collections::HashMap<NodeId, usize> = snapshot
        .nodes
        .iter()
        .map(|n| (n.id, graph.neighbors_directed(n.id, Direction::Incoming).count()))
        .collect();
    let mut order = Vec::with_capacity(snapshot.nodes.len());
    let mut placed = std::collections::HashSet::new();

    while order.len() < snapshot.nodes.len() {
        let next = snapshot
            .nodes
            .iter()
            .map(|n| n.id)
            .find(|id| !placed.contains(id) && indegree.get(id) == Some(&0));
        let Some(id) = next else { break };
        placed.insert(id);
        order.push(id);
        for succ in graph.neighbors_directed(id, Direction::Outgoing) {
            if let Some(d) = indegree.get_mut(&succ) {
                *d = d.saturating_sub(1);
            }
        }
    }

    if order.len() == snapshot.nodes.len() {
        Some(order)
    } else {
        toposort(graph, None).ok()
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::GraphStore;
    use crate::types::{NodeKind, Point};

    #[test]
    fn chain_topology() {
        let store = GraphStore::new();
        let a = store.add_node(NodeKind::Upload, Point::ORIGIN);
        let b = store.add_node(NodeKind::Ocr, Point::ORIGIN);
        let c = store.add_node(NodeKind::Export, Point::ORIGIN);
        let lonely = store.add_node(NodeKind::RuleMatch, Point::ORIGIN);
        store.add_edge(b.id, c.id).unwrap();
        store.add_edge(a.id, b.id).unwrap();

        let topo = store.topology();
        assert_eq!(topo.entry_nodes, vec![a.id]);
        assert_eq!(topo.exit_nodes, vec![c.id]);
        assert_eq!(topo.isolated_nodes, vec![lonely.id]);
        assert!(topo.is_acyclic);
        assert_eq!(topo.suggested_order, Some(vec![a.id, b.id, c.id, lonely.id]));
    }

    #[test]
    fn cycle_has_no_order() {
        let store = GraphStore::new();
        let a = store.add_node(NodeKind::Upload, Point::ORIGIN);
        let b = store.add_node(NodeKind::Ocr, Point::ORIGIN);
        let c = store.add_node(NodeKind::Export, Point::ORIGIN);
        store.add_edge(a.id, b.id).unwrap();
        store.add_edge(b.id, c.id).unwrap();
        store.add_edge(c.id, a.id).unwrap();

        let topo = store.topology();
        assert!(!topo.is_acyclic);
        assert_eq!(topo.suggested_order, None);
    }
}
