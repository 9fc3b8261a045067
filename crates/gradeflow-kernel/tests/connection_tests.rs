use gradeflow_kernel::config::NodeGeometry;
use gradeflow_kernel::connection::*;
use gradeflow_kernel::graph::GraphStore;
use gradeflow_kernel::types::{NodeKind, Point};
use gradeflow_test_utils::add_nodes;

#[test]
fn test_connect_two_nodes() {
    let store = GraphStore::new();
    let nodes = add_nodes(&store, &[(NodeKind::Upload, false), (NodeKind::Ocr, false)]);
    let mut conn = ConnectionInteraction::new();

    assert!(conn.begin(nodes[0].id, ConnectorSide::Output, Point::new(220.0, 36.0)));
    assert!(conn.is_connecting());
    conn.update(Point::new(290.0, 40.0));

    match conn.finish(Some(nodes[1].id), &store) {
        ConnectOutcome::Connected(edge) => {
            assert_eq!(edge.source, nodes[0].id);
            assert_eq!(edge.target, nodes[1].id);
        }
        other => panic!("expected a connection, got {other:?}"),
    }
    assert_eq!(conn.state(), ConnectionState::Idle);
    assert_eq!(store.edge_count(), 1);
}

#[test]
fn test_release_on_source_is_rejected() {
    let store = GraphStore::new();
    let node = store.add_node(NodeKind::Upload, Point::ORIGIN);
    let mut conn = ConnectionInteraction::new();
    conn.begin(node.id, ConnectorSide::Output, Point::ORIGIN);
    assert_eq!(conn.finish(Some(node.id), &store), ConnectOutcome::Rejected);
    assert!(!conn.is_connecting());
    assert_eq!(store.edge_count(), 0);
}

#[test]
fn test_release_over_canvas_cancels() {
    let store = GraphStore::new();
    let node = store.add_node(NodeKind::Upload, Point::ORIGIN);
    let mut conn = ConnectionInteraction::new();
    conn.begin(node.id, ConnectorSide::Output, Point::ORIGIN);
    assert_eq!(conn.finish(None, &store), ConnectOutcome::Cancelled);
    assert_eq!(store.edge_count(), 0);
}

#[test]
fn test_duplicate_gesture_is_rejected() {
    let store = GraphStore::new();
    let nodes = add_nodes(&store, &[(NodeKind::Upload, false), (NodeKind::Ocr, false)]);
    let mut conn = ConnectionInteraction::new();
    for expected_edges in [1, 1] {
        conn.begin(nodes[1].id, ConnectorSide::Output, Point::ORIGIN);
        conn.finish(Some(nodes[0].id), &store);
        assert_eq!(store.edge_count(), expected_edges);
    }
}

#[test]
fn test_preview_follows_cursor() {
    let store = GraphStore::new();
    let node = store.add_node(NodeKind::Upload, Point::new(100.0, 50.0));
    let geometry = NodeGeometry::default();
    let mut conn = ConnectionInteraction::new();
    assert!(conn.preview(&store, &geometry).is_none());

    conn.begin(node.id, ConnectorSide::Output, Point::new(320.0, 86.0));
    conn.update(Point::new(500.0, 300.0));
    let preview = conn.preview(&store, &geometry).unwrap();
    assert_eq!(preview.from, Point::new(320.0, 86.0));
    assert_eq!(preview.to, Point::new(500.0, 300.0));

    store.remove_node(node.id).unwrap();
    assert!(conn.preview(&store, &geometry).is_none());
    assert_eq!(conn.finish(None, &store), ConnectOutcome::Cancelled);
}

#[test]
fn test_second_begin_is_ignored() {
    let store = GraphStore::new();
    let nodes = add_nodes(&store, &[(NodeKind::Upload, false), (NodeKind::Ocr, false)]);
    let mut conn = ConnectionInteraction::new();
    assert!(conn.begin(nodes[0].id, ConnectorSide::Output, Point::ORIGIN));
    assert!(!conn.begin(nodes[1].id, ConnectorSide::Input, Point::ORIGIN));
    match conn.state() {
        ConnectionState::Connecting { source, .. } => assert_eq!(source, nodes[0].id),
        ConnectionState::Idle => panic!("gesture lost"),
    }
}

#[cfg(not(feature = "strict-debug"))]
#[test]
fn test_finish_while_idle_is_noop() {
    let store = GraphStore::new();
    let mut conn = ConnectionInteraction::new();
    assert_eq!(conn.finish(None, &store), ConnectOutcome::NotConnecting);
}
