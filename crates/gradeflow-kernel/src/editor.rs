//! Canvas editor
//!
//! Routes surface-level pointer events to the viewport, node dragging, or
//! the connection gesture, and owns selection, the property panel, and the
//! run simulator. All screen coordinates go through the viewport before
//! touching the store.

use crate::catalog;
use crate::config::EditorConfig;
use crate::connection::{ConnectOutcome, ConnectionInteraction, ConnectorSide, PreviewEdge};
use crate::error::{CanvasError, ConfigError, GraphError, RunError};
use crate::graph::GraphStore;
use crate::logging::RunLog;
use crate::panel::{PropertyPanel, StorePanelHost};
use crate::scheduler::Scheduler;
use crate::simulator::{RunPlan, RunSimulator, WorkflowValidation};
use crate::types::{Node, NodeId, NodeKind, Point};
use crate::viewport::Viewport;
use std::sync::Arc;

/// Offset applied to each consecutive palette insertion
const CASCADE_STEP: Point = Point::new(24.0, 24.0);
const CASCADE_LEN: usize = 8;

/// What lies under a screen position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Canvas,
    Node(NodeId),
    Connector(NodeId, ConnectorSide),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    Pan,
    Drag { node: NodeId, grab: Point },
    Connect,
}

pub struct CanvasEditor {
    store: Arc<GraphStore>,
    viewport: Viewport,
    connection: ConnectionInteraction,
    gesture: Gesture,
    selection: Option<NodeId>,
    panel: Option<PropertyPanel>,
    simulator: RunSimulator,
    config: EditorConfig,
    /// Size of the visible canvas area in screen pixels
    surface: Point,
    cascade: usize,
}

impl std::fmt::Debug for CanvasEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasEditor")
            .field("store", &self.store)
            .field("viewport", &self.viewport.transform())
            .field("gesture", &self.gesture)
            .field("selection", &self.selection)
            .field("panel", &self.panel.as_ref().map(PropertyPanel::node_id))
            .field("simulator", &self.simulator)
            .finish()
    }
}

impl CanvasEditor {
    /// Build an editor over `store`. Fails when `config` does not pass
    /// [`EditorConfig::validate`].
    pub fn new(
        store: Arc<GraphStore>,
        scheduler: Arc<dyn Scheduler>,
        config: EditorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(store, scheduler, config))
    }

    /// Editor with the built-in configuration, which always validates.
    pub fn with_defaults(store: Arc<GraphStore>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self::build(store, scheduler, EditorConfig::default())
    }

    fn build(store: Arc<GraphStore>, scheduler: Arc<dyn Scheduler>, config: EditorConfig) -> Self {
        let simulator = RunSimulator::new(Arc::clone(&store), scheduler, config.run);
        Self {
            store,
            viewport: Viewport::new(config.viewport),
            connection: ConnectionInteraction::new(),
            gesture: Gesture::Idle,
            selection: None,
            panel: None,
            simulator,
            config,
            surface: Point::new(1280.0, 720.0),
            cascade: 0,
        }
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn selection(&self) -> Option<NodeId> {
        self.selection
    }

    pub fn panel(&self) -> Option<&PropertyPanel> {
        self.panel.as_ref()
    }

    pub fn panel_mut(&mut self) -> Option<&mut PropertyPanel> {
        self.panel.as_mut()
    }

    pub fn connection(&self) -> &ConnectionInteraction {
        &self.connection
    }

    pub fn run_log(&self) -> &Arc<RunLog> {
        self.simulator.log()
    }

    pub fn is_running(&self) -> bool {
        self.simulator.is_running()
    }

    pub fn set_surface_size(&mut self, width: f32, height: f32) {
        self.surface = Point::new(width.max(0.0), height.max(0.0));
    }

    /// Topmost node wins; connectors take priority over the node body.
    pub fn hit_test(&self, screen: Point) -> PointerTarget {
        let model = self.viewport.screen_to_model(screen);
        let geometry = &self.config.geometry;
        for node in self.store.nodes().iter().rev() {
            for side in [ConnectorSide::Input, ConnectorSide::Output] {
                if side.anchor(node, geometry).distance(model) <= geometry.connector_radius {
                    return PointerTarget::Connector(node.id, side);
                }
            }
            let local = model - node.position;
            if (0.0..=geometry.width).contains(&local.x) && (0.0..=geometry.height).contains(&local.y)
            {
                return PointerTarget::Node(node.id);
            }
        }
        PointerTarget::Canvas
    }

    /// Start a gesture on whatever lies under `screen`. While another gesture
    /// is open the target is reported but nothing starts.
    pub fn pointer_down(&mut self, screen: Point) -> PointerTarget {
        let target = self.hit_test(screen);
        if self.gesture != Gesture::Idle {
            return target;
        }
        let model = self.viewport.screen_to_model(screen);
        match target {
            PointerTarget::Canvas => {
                self.viewport.begin_pan(screen);
                self.gesture = Gesture::Pan;
            }
            PointerTarget::Node(id) => {
                self.selection = Some(id);
                if let Some(node) = self.store.node(id) {
                    self.gesture = Gesture::Drag {
                        node: id,
                        grab: model - node.position,
                    };
                }
            }
            PointerTarget::Connector(id, side) => {
                if self.connection.begin(id, side, model) {
                    self.gesture = Gesture::Connect;
                }
            }
        }
        target
    }

    pub fn pointer_move(&mut self, screen: Point) {
        match self.gesture {
            Gesture::Idle => {}
            Gesture::Pan => self.viewport.pan_to(screen),
            Gesture::Drag { node, grab } => {
                let model = self.viewport.screen_to_model(screen);
                if self.store.move_node(node, model - grab).is_err() {
                    self.gesture = Gesture::Idle;
                }
            }
            Gesture::Connect => self
                .connection
                .update(self.viewport.screen_to_model(screen)),
        }
    }

    /// Ends whichever gesture is active. Returns the connection outcome when
    /// a connection gesture was open.
    pub fn pointer_up(&mut self, screen: Point) -> Option<ConnectOutcome> {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        match gesture {
            Gesture::Idle | Gesture::Drag { .. } => None,
            Gesture::Pan => {
                self.viewport.end_pan();
                None
            }
            Gesture::Connect => {
                let target = match self.hit_test(screen) {
                    PointerTarget::Connector(id, _) => Some(id),
                    PointerTarget::Canvas | PointerTarget::Node(_) => None,
                };
                Some(self.connection.finish(target, &self.store))
            }
        }
    }

    pub fn wheel(&mut self, delta_y: f32) {
        self.viewport.zoom(delta_y);
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    pub fn preview(&self) -> Option<PreviewEdge> {
        self.connection.preview(&self.store, &self.config.geometry)
    }

    /// Add a step near the centre of the visible area. Consecutive additions
    /// are staggered so they do not stack exactly.
    pub fn add_from_palette(&mut self, kind: NodeKind) -> Node {
        let geometry = &self.config.geometry;
        let centre = self.viewport.screen_to_model(self.surface.scale(0.5));
        let offset = CASCADE_STEP.scale((self.cascade % CASCADE_LEN) as f32);
        self.cascade += 1;
        let position = centre - Point::new(geometry.width / 2.0, geometry.height / 2.0) + offset;
        let node = self.store.add_node(kind, position);
        tracing::info!("Added {} from palette", catalog::entry(kind).name);
        node
    }

    /// Add a step right after `after` in run order, placed to its right.
    pub fn add_after(&mut self, after: NodeId, kind: NodeKind) -> Result<Node, GraphError> {
        let anchor = self.store.node(after).ok_or(GraphError::NodeNotFound(after))?;
        let position = anchor.position + Point::new(self.config.geometry.width + 40.0, 0.0);
        let node = self.store.insert_node_after(after, kind, position)?;
        self.store.add_edge(after, node.id);
        Ok(node)
    }

    /// Select a node, or clear the selection with `None`.
    pub fn select(&mut self, id: Option<NodeId>) -> Result<(), GraphError> {
        if let Some(id) = id {
            if !self.store.contains(id) {
                return Err(GraphError::NodeNotFound(id));
            }
        }
        self.selection = id;
        Ok(())
    }

    pub fn open_panel(&mut self, id: NodeId) -> Result<&mut PropertyPanel, GraphError> {
        let node = self.store.node(id).ok_or(GraphError::NodeNotFound(id))?;
        self.selection = Some(id);
        Ok(self.panel.insert(PropertyPanel::open(&node)))
    }

    /// Write the open panel back into the store and close it. Returns false
    /// when no panel was open.
    pub fn confirm_panel(&mut self) -> Result<bool, CanvasError> {
        let Some(panel) = self.panel.take() else {
            return Ok(false);
        };
        let mut host = StorePanelHost::new(&self.store);
        panel.confirm(&mut host)?;
        Ok(true)
    }

    /// Discard the open panel's draft.
    pub fn close_panel(&mut self) -> bool {
        self.panel.take().is_some()
    }

    /// Remove a node and its edges, dropping any selection, panel, or
    /// gesture that referenced it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, GraphError> {
        let node = self.store.remove_node(id)?;
        if self.selection == Some(id) {
            self.selection = None;
        }
        if self.panel.as_ref().is_some_and(|p| p.node_id() == id) {
            self.panel = None;
        }
        if matches!(self.gesture, Gesture::Drag { node, .. } if node == id) {
            self.gesture = Gesture::Idle;
        }
        Ok(node)
    }

    pub fn validation(&self) -> WorkflowValidation {
        WorkflowValidation::of(&self.store.nodes())
    }

    pub fn run(&mut self) -> Result<RunPlan, RunError> {
        self.simulator.run()
    }

    pub fn cancel_run(&mut self) -> bool {
        self.simulator.cancel()
    }

    /// Tear the editor down. Pending timers are cancelled without touching
    /// the store.
    pub fn close(self) {
        tracing::debug!("Closing editor over {} node(s)", self.store.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::VirtualScheduler;

    fn editor() -> CanvasEditor {
        CanvasEditor::with_defaults(Arc::new(GraphStore::new()), Arc::new(VirtualScheduler::new()))
    }

    #[test]
    fn hit_test_prefers_connectors() {
        let ed = editor();
        let node = ed.store().add_node(NodeKind::Upload, Point::new(100.0, 100.0));
        assert_eq!(
            ed.hit_test(Point::new(320.0, 136.0)),
            PointerTarget::Connector(node.id, ConnectorSide::Output)
        );
        assert_eq!(ed.hit_test(Point::new(150.0, 120.0)), PointerTarget::Node(node.id));
        assert_eq!(ed.hit_test(Point::new(10.0, 10.0)), PointerTarget::Canvas);
    }

    #[test]
    fn palette_cascade_staggers_positions() {
        let mut ed = editor();
        let a = ed.add_from_palette(NodeKind::Upload);
        let b = ed.add_from_palette(NodeKind::Ocr);
        assert_eq!(a.position, Point::new(530.0, 324.0));
        assert_eq!(b.position - a.position, CASCADE_STEP);
    }

    #[test]
    fn close_panel_discards_draft() {
        let mut ed = editor();
        let node = ed.store().add_node(NodeKind::Ocr, Point::ORIGIN);
        ed.open_panel(node.id).unwrap().set_label("draft");
        assert!(ed.close_panel());
        let stored = ed.store().node(node.id).unwrap();
        assert_eq!(stored.label, node.label);
        assert!(!stored.configured);
    }
}
