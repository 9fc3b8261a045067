use gradeflow_kernel::graph::{GraphStore, StoreEvent};
use gradeflow_kernel::panel::NodeConfig;
use gradeflow_kernel::types::*;
use gradeflow_kernel::GraphError;
use gradeflow_test_utils::{add_nodes, grading_chain, record_events};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::HashSet;

proptest! {
    #[test]
    fn prop_node_ids_are_unique(count in 1..60usize) {
        let store = GraphStore::new();
        for i in 0..count {
            store.add_node(NodeKind::ALL[i % NodeKind::ALL.len()], Point::ORIGIN);
        }
        let ids: HashSet<NodeId> = store.nodes().iter().map(|n| n.id).collect();
        prop_assert_eq!(ids.len(), count);
    }

    #[test]
    fn prop_edges_never_dangle(
        node_count in 1..12usize,
        edges in proptest::collection::vec((0..12usize, 0..12usize), 0..40),
        removals in proptest::collection::vec(0..12usize, 0..6),
    ) {
        let store = GraphStore::new();
        let ids: Vec<NodeId> = (0..node_count)
            .map(|_| store.add_node(NodeKind::Ocr, Point::ORIGIN).id)
            .collect();
        for (a, b) in edges {
            if a < ids.len() && b < ids.len() {
                let _ = store.add_edge(ids[a], ids[b]);
            }
        }
        for index in removals {
            if let Some(id) = ids.get(index) {
                let _ = store.remove_node(*id);
            }
        }

        let snapshot = store.snapshot();
        prop_assert!(snapshot.dangling_edges().is_empty());
        prop_assert!(snapshot.edges.iter().all(|e| e.source != e.target));

        let mut pairs = HashSet::new();
        for e in &snapshot.edges {
            let pair = if e.source < e.target { (e.source, e.target) } else { (e.target, e.source) };
            prop_assert!(pairs.insert(pair), "duplicate pair {}", e.id);
        }
    }
}

#[test]
fn test_new_node_defaults() {
    let store = GraphStore::new();
    let node = store.add_node(NodeKind::AiGrading, Point::new(10.0, 20.0));
    assert_eq!(node.label, "AI grading");
    assert!(!node.configured);
    assert_eq!(node.status, NodeStatus::Idle);
    assert_eq!(node.config, NodeConfig::default_for(NodeKind::AiGrading));
    assert_eq!(store.node(node.id), Some(node));
}

#[test]
fn test_remove_node_cascades_edges() {
    let store = GraphStore::new();
    let ids = grading_chain(&store);
    assert_eq!(store.edge_count(), 3);

    store.remove_node(ids[1]).unwrap();

    let edges = store.edges();
    assert_eq!(edges.len(), 1);
    assert!(edges[0].joins(ids[2], ids[3]));
    assert_eq!(store.len(), 3);
}

#[test]
fn test_self_and_duplicate_edges_are_rejected() {
    let store = GraphStore::new();
    let nodes = add_nodes(&store, &[(NodeKind::Upload, false), (NodeKind::Ocr, false)]);
    let (a, b) = (nodes[0].id, nodes[1].id);

    assert!(store.add_edge(a, a).is_none());
    assert!(store.add_edge(a, b).is_some());
    assert!(store.add_edge(a, b).is_none());
    assert!(store.add_edge(b, a).is_none(), "reverse direction joins the same pair");
    assert!(store.add_edge(a, NodeId::new()).is_none());
    assert_eq!(store.edge_count(), 1);
}

#[test]
fn test_insert_after_keeps_array_order() {
    let store = GraphStore::new();
    let nodes = add_nodes(&store, &[(NodeKind::Upload, true), (NodeKind::Export, true)]);
    let inserted = store
        .insert_node_after(nodes[0].id, NodeKind::Ocr, Point::ORIGIN)
        .unwrap();

    let kinds: Vec<NodeKind> = store.nodes().iter().map(|n| n.kind).collect();
    assert_eq!(kinds, vec![NodeKind::Upload, NodeKind::Ocr, NodeKind::Export]);
    assert_eq!(store.nodes()[1].id, inserted.id);

    let missing = NodeId::new();
    assert_eq!(
        store.insert_node_after(missing, NodeKind::Ocr, Point::ORIGIN),
        Err(GraphError::NodeNotFound(missing))
    );
}

#[test]
fn test_update_merges_shallowly() {
    let store = GraphStore::new();
    let node = store.add_node(NodeKind::Upload, Point::ORIGIN);
    store.update_node(node.id, NodePatch::label("Scan papers")).unwrap();
    let updated = store.update_node(node.id, NodePatch::configured(true)).unwrap();
    assert_eq!(updated.label, "Scan papers");
    assert!(updated.configured);
    assert_eq!(updated.position, node.position);
}

#[test]
fn test_update_rejects_config_of_other_kind() {
    let store = GraphStore::new();
    let node = store.add_node(NodeKind::Upload, Point::ORIGIN);
    let patch = NodePatch {
        config: Some(NodeConfig::default_for(NodeKind::Ocr)),
        ..NodePatch::default()
    };
    assert_eq!(
        store.update_node(node.id, patch),
        Err(GraphError::ConfigKindMismatch {
            expected: NodeKind::Upload,
            found: NodeKind::Ocr,
        })
    );
    assert_eq!(store.node(node.id), Some(node));
}

#[test]
fn test_observers_see_every_mutation() {
    let store = GraphStore::new();
    let events = record_events(&store);
    let a = store.add_node(NodeKind::Upload, Point::ORIGIN);
    let b = store.add_node(NodeKind::Ocr, Point::ORIGIN);
    let edge = store.add_edge(a.id, b.id).unwrap();
    store.move_node(a.id, Point::new(5.0, 5.0)).unwrap();
    store.remove_node(b.id).unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            StoreEvent::NodeAdded(a.id),
            StoreEvent::NodeAdded(b.id),
            StoreEvent::EdgeAdded(edge.id),
            StoreEvent::NodeMoved(a.id),
            StoreEvent::NodeRemoved {
                id: b.id,
                edges: vec![edge.id],
            },
        ]
    );
}

#[test]
fn test_rejected_edge_is_silent() {
    let store = GraphStore::new();
    let a = store.add_node(NodeKind::Upload, Point::ORIGIN);
    let events = record_events(&store);
    assert!(store.add_edge(a.id, a.id).is_none());
    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let store = GraphStore::new();
    let events = std::sync::Arc::new(std::sync::Mutex::new(0usize));
    let sink = std::sync::Arc::clone(&events);
    let id = store.subscribe(move |_| *sink.lock().unwrap() += 1);
    store.add_node(NodeKind::Ocr, Point::ORIGIN);
    assert!(store.unsubscribe(id));
    assert!(!store.unsubscribe(id));
    store.add_node(NodeKind::Ocr, Point::ORIGIN);
    assert_eq!(*events.lock().unwrap(), 1);
}

#[test]
fn test_topology_of_chain() {
    let store = GraphStore::new();
    let ids = grading_chain(&store);
    let isolated = store.add_node(NodeKind::RuleMatch, Point::ORIGIN);
    let topology = store.topology();
    assert!(topology.is_acyclic);
    assert_eq!(topology.entry_nodes, vec![ids[0]]);
    assert_eq!(topology.exit_nodes, vec![ids[3]]);
    assert_eq!(topology.isolated_nodes, vec![isolated.id]);
    let order = topology.suggested_order.unwrap();
    assert_eq!(&order[..4], &ids[..]);
}

#[test]
fn test_snapshot_serializes_kinds_in_kebab_case() {
    let store = GraphStore::new();
    store.add_node(NodeKind::ExportScore, Point::ORIGIN);
    let json = serde_json::to_value(store.snapshot()).unwrap();
    assert_eq!(json["nodes"][0]["kind"], "export-score");
    assert_eq!(json["nodes"][0]["status"], "idle");
    assert_eq!(json["nodes"][0]["config"]["type"], "export-score");
}
