//! Testing utilities for the Gradeflow workspace
//!
//! Shared fixtures for stores, editors on a virtual clock, and event
//! recording.

#![allow(missing_docs)]

use gradeflow_kernel::editor::CanvasEditor;
use gradeflow_kernel::graph::{GraphStore, StoreEvent};
use gradeflow_kernel::scheduler::VirtualScheduler;
use gradeflow_kernel::types::{Node, NodeId, NodeKind, NodePatch, Point};
use gradeflow_kernel::EditorConfig;
use std::sync::{Arc, Mutex};

/// Editor wired to a manually driven clock
pub struct TestEditor {
    pub editor: CanvasEditor,
    pub clock: Arc<VirtualScheduler>,
}

impl TestEditor {
    pub fn store(&self) -> &Arc<GraphStore> {
        self.editor.store()
    }
}

pub fn setup_editor() -> TestEditor {
    setup_editor_with(EditorConfig::default())
}

/// Panics when `config` is rejected; use `CanvasEditor::new` directly to
/// test rejection.
pub fn setup_editor_with(config: EditorConfig) -> TestEditor {
    let clock = Arc::new(VirtualScheduler::new());
    let editor = CanvasEditor::new(Arc::new(GraphStore::new()), clock.clone(), config)
        .expect("test editor configuration is valid");
    TestEditor { editor, clock }
}

/// Nodes laid out left to right, `configured` as given, no edges.
pub fn add_nodes(store: &GraphStore, steps: &[(NodeKind, bool)]) -> Vec<Node> {
    steps
        .iter()
        .enumerate()
        .map(|(i, (kind, configured))| {
            let node = store.add_node(*kind, Point::new(300.0 * i as f32, 0.0));
            store
                .update_node(node.id, NodePatch::configured(*configured))
                .unwrap()
        })
        .collect()
}

pub fn configured_store(kinds: &[NodeKind]) -> Arc<GraphStore> {
    let store = Arc::new(GraphStore::new());
    let steps: Vec<_> = kinds.iter().map(|k| (*k, true)).collect();
    add_nodes(&store, &steps);
    store
}

/// The upload, ocr, ai-grading, export chain, fully configured and linked.
pub fn grading_chain(store: &GraphStore) -> Vec<NodeId> {
    let nodes = add_nodes(
        store,
        &[
            (NodeKind::Upload, true),
            (NodeKind::Ocr, true),
            (NodeKind::AiGrading, true),
            (NodeKind::Export, true),
        ],
    );
    for pair in nodes.windows(2) {
        store.add_edge(pair[0].id, pair[1].id).unwrap();
    }
    nodes.iter().map(|n| n.id).collect()
}

/// Collects every store event for later assertions.
pub fn record_events(store: &GraphStore) -> Arc<Mutex<Vec<StoreEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    store.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    events
}
