//! Randomized editor session with invariant checks after every operation
//!
//! Drives a [`CanvasEditor`] on a virtual clock with a seeded mix of valid,
//! edge-case, and invalid operations, then checks the store and editor
//! invariants.

use crate::connection::ConnectorSide;
use crate::editor::CanvasEditor;
use crate::graph::GraphStore;
use crate::panel::FieldValue;
use crate::scheduler::VirtualScheduler;
use crate::types::{EdgeId, NodeId, NodeKind, NodeStatus, Point};
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FuzzConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    pub total_operations: u64,
    pub distribution: OperationDistribution,
    /// Node additions are skipped once the canvas holds this many nodes
    pub max_nodes: usize,
    pub stop_on_first_violation: bool,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_operations: 2_000,
            distribution: OperationDistribution::default(),
            max_nodes: 40,
            stop_on_first_violation: true,
        }
    }
}

/// Probability distribution for operation generation
#[derive(Debug, Clone)]
pub struct OperationDistribution {
    pub valid_ops: f64,
    /// Self connections, duplicate pairs, extreme wheel deltas
    pub edge_cases: f64,
    /// Operations on ids that never existed
    pub invalid_ops: f64,
}

impl Default for OperationDistribution {
    fn default() -> Self {
        Self {
            valid_ops: 0.70,
            edge_cases: 0.20,
            invalid_ops: 0.10,
        }
    }
}

#[derive(Debug, Clone)]
pub enum FuzzOperation {
    AddFromPalette(NodeKind),
    InsertAfter(NodeId, NodeKind),
    MoveNode(NodeId, Point),
    RemoveNode(NodeId),
    AddEdge(NodeId, NodeId),
    RemoveEdge(EdgeId),
    /// Full pointer gesture from one node's output to another's input
    Connect(NodeId, NodeId),
    Pan(Point),
    Wheel(f32),
    ResetView,
    ConfigureNode(NodeId),
    Run,
    CancelRun,
    AdvanceClock(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedResult {
    ShouldSucceed,
    ShouldFail,
    /// Outcome depends on layout details the generator does not model
    Either,
}

#[derive(Debug, Clone)]
pub enum Violation {
    UnexpectedOutcome {
        operation_index: u64,
        operation: FuzzOperation,
        expected: ExpectedResult,
        actual: Result<String, String>,
    },
    Invariant(InvariantViolation),
}

#[derive(Debug, Clone)]
pub struct InvariantViolation {
    pub check: InvariantCheck,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantCheck {
    EdgesReferenceExistingNodes,
    NodeIdsAreUnique,
    NoSelfConnections,
    NoDuplicatePairs,
    ScaleWithinBounds,
    SelectionReferencesExistingNode,
    PanelReferencesExistingNode,
    NoRunningNodeWhileIdle,
    RunLogInOrder,
}

#[derive(Debug, Clone, Default)]
pub struct OperationStats {
    pub total_operations: u64,
    pub successful_operations: u64,
    pub failed_operations: u64,
    pub operations_by_type: BTreeMap<String, u64>,
}

impl OperationStats {
    pub fn record(&mut self, operation: &FuzzOperation, result: &Result<String, String>) {
        self.total_operations += 1;
        let name = format!("{operation:?}");
        let name = name.split('(').next().unwrap_or("Unknown").to_string();
        *self.operations_by_type.entry(name).or_insert(0) += 1;
        match result {
            Ok(_) => self.successful_operations += 1,
            Err(_) => self.failed_operations += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FuzzReport {
    pub config: FuzzConfig,
    pub stats: OperationStats,
    pub violations: Vec<Violation>,
    pub final_node_count: usize,
    pub final_edge_count: usize,
}

impl FuzzReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn generate_text(&self) -> String {
        let mut report = String::new();
        report.push_str("=== Canvas Fuzz Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.config.seed));
        report.push_str(&format!("Total Operations: {}\n", self.stats.total_operations));
        report.push_str(&format!("Successful: {}\n", self.stats.successful_operations));
        report.push_str(&format!("Failed: {}\n", self.stats.failed_operations));
        report.push_str(&format!("Violations: {}\n", self.violations.len()));
        report.push_str(&format!("Final Nodes: {}\n", self.final_node_count));
        report.push_str(&format!("Final Edges: {}\n", self.final_edge_count));

        if !self.stats.operations_by_type.is_empty() {
            report.push_str("\n=== Operations ===\n");
            for (name, count) in &self.stats.operations_by_type {
                report.push_str(&format!("{name:<16} {count}\n"));
            }
        }
        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!("{}. {:?}\n", i + 1, v));
            }
        }
        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));
        report
    }
}

struct Session {
    editor: CanvasEditor,
    clock: Arc<VirtualScheduler>,
}

impl Session {
    fn new() -> Self {
        let clock = Arc::new(VirtualScheduler::new());
        let editor = CanvasEditor::with_defaults(Arc::new(GraphStore::new()), clock.clone());
        Self { editor, clock }
    }

    fn store(&self) -> &GraphStore {
        self.editor.store()
    }
}

pub fn run_fuzz(config: FuzzConfig) -> FuzzReport {
    let mut session = Session::new();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut stats = OperationStats::default();
    let mut violations = Vec::new();

    for i in 0..config.total_operations {
        let operation = generate_operation(&mut rng, &config, session.store());
        let expected = classify_expected_result(&session, &operation);
        let actual = execute_operation(&mut session, &operation);

        let matches = match (expected, &actual) {
            (ExpectedResult::Either, _)
            | (ExpectedResult::ShouldSucceed, Ok(_))
            | (ExpectedResult::ShouldFail, Err(_)) => true,
            _ => false,
        };
        if !matches {
            violations.push(Violation::UnexpectedOutcome {
                operation_index: i,
                operation: operation.clone(),
                expected,
                actual: actual.clone(),
            });
            if config.stop_on_first_violation {
                break;
            }
        }

        if let Err(found) = EditorInvariants::check_all(&session.editor) {
            violations.extend(found.into_iter().map(Violation::Invariant));
            if config.stop_on_first_violation {
                break;
            }
        }
        stats.record(&operation, &actual);
    }

    tracing::debug!(
        "Fuzz seed {} finished with {} violation(s)",
        config.seed,
        violations.len()
    );
    FuzzReport {
        final_node_count: session.store().len(),
        final_edge_count: session.store().edge_count(),
        config,
        stats,
        violations,
    }
}

fn generate_operation(rng: &mut StdRng, config: &FuzzConfig, store: &GraphStore) -> FuzzOperation {
    let r: f64 = rng.gen();
    let distribution = &config.distribution;
    if r < distribution.valid_ops {
        generate_valid_operation(rng, config, store)
    } else if r < distribution.valid_ops + distribution.edge_cases {
        generate_edge_case_operation(rng, store)
    } else {
        generate_invalid_operation(rng, store)
    }
}

fn random_kind(rng: &mut StdRng) -> NodeKind {
    NodeKind::ALL[rng.gen_range(0..NodeKind::ALL.len())]
}

fn random_point(rng: &mut StdRng, extent: f32) -> Point {
    Point::new(rng.gen_range(-extent..extent), rng.gen_range(-extent..extent))
}

fn generate_valid_operation(
    rng: &mut StdRng,
    config: &FuzzConfig,
    store: &GraphStore,
) -> FuzzOperation {
    let ids: Vec<NodeId> = store.nodes().iter().map(|n| n.id).collect();
    let (Some(&a), Some(&b)) = (ids.choose(rng), ids.choose(rng)) else {
        return FuzzOperation::AddFromPalette(random_kind(rng));
    };
    match rng.gen_range(0..14) {
        0 | 1 if ids.len() < config.max_nodes => FuzzOperation::AddFromPalette(random_kind(rng)),
        2 if ids.len() < config.max_nodes => FuzzOperation::InsertAfter(a, random_kind(rng)),
        3 => FuzzOperation::MoveNode(a, random_point(rng, 2000.0)),
        4 => FuzzOperation::RemoveNode(a),
        5 | 6 => FuzzOperation::AddEdge(a, b),
        7 => match store.edges().choose(rng) {
            Some(edge) => FuzzOperation::RemoveEdge(edge.id),
            None => FuzzOperation::AddEdge(a, b),
        },
        8 => FuzzOperation::Connect(a, b),
        9 => FuzzOperation::Pan(random_point(rng, 300.0)),
        10 => FuzzOperation::ConfigureNode(a),
        11 => FuzzOperation::Run,
        12 => FuzzOperation::AdvanceClock(Duration::from_millis(rng.gen_range(0..3_000))),
        _ => FuzzOperation::Wheel(rng.gen_range(-400.0..400.0)),
    }
}

fn generate_edge_case_operation(rng: &mut StdRng, store: &GraphStore) -> FuzzOperation {
    let nodes = store.nodes();
    let edges = store.edges();
    match rng.gen_range(0..6) {
        0 => match nodes.choose(rng) {
            Some(node) => FuzzOperation::AddEdge(node.id, node.id),
            None => FuzzOperation::Run,
        },
        1 => match edges.choose(rng) {
            // Same pair, reversed direction
            Some(edge) => FuzzOperation::AddEdge(edge.target, edge.source),
            None => FuzzOperation::ResetView,
        },
        2 => FuzzOperation::Wheel(if rng.gen_bool(0.5) { 1.0e6 } else { -1.0e6 }),
        3 => FuzzOperation::CancelRun,
        4 => FuzzOperation::ResetView,
        _ => FuzzOperation::Run,
    }
}

fn generate_invalid_operation(rng: &mut StdRng, store: &GraphStore) -> FuzzOperation {
    let ghost = NodeId::new();
    match rng.gen_range(0..4) {
        0 => FuzzOperation::RemoveNode(ghost),
        1 => FuzzOperation::MoveNode(ghost, Point::ORIGIN),
        2 => match store.nodes().first() {
            Some(node) => FuzzOperation::AddEdge(node.id, ghost),
            None => FuzzOperation::AddEdge(ghost, NodeId::new()),
        },
        _ => FuzzOperation::ConfigureNode(ghost),
    }
}

fn classify_expected_result(session: &Session, operation: &FuzzOperation) -> ExpectedResult {
    use ExpectedResult::{Either, ShouldFail, ShouldSucceed};
    let store = session.store();
    let expect = |ok: bool| if ok { ShouldSucceed } else { ShouldFail };
    match operation {
        FuzzOperation::AddFromPalette(_)
        | FuzzOperation::Pan(_)
        | FuzzOperation::Wheel(_)
        | FuzzOperation::ResetView
        | FuzzOperation::AdvanceClock(_) => ShouldSucceed,
        FuzzOperation::InsertAfter(id, _)
        | FuzzOperation::MoveNode(id, _)
        | FuzzOperation::RemoveNode(id)
        | FuzzOperation::ConfigureNode(id) => expect(store.contains(*id)),
        FuzzOperation::AddEdge(a, b) => expect(
            a != b
                && store.contains(*a)
                && store.contains(*b)
                && !store.edges().iter().any(|e| e.joins(*a, *b)),
        ),
        FuzzOperation::RemoveEdge(id) => expect(store.edges().iter().any(|e| e.id == *id)),
        FuzzOperation::Connect(..) => Either,
        FuzzOperation::Run => expect(!session.editor.is_running() && session.editor.validation().ready),
        FuzzOperation::CancelRun => expect(session.editor.is_running()),
    }
}

fn execute_operation(session: &mut Session, operation: &FuzzOperation) -> Result<String, String> {
    let editor = &mut session.editor;
    match operation {
        FuzzOperation::AddFromPalette(kind) => {
            let node = editor.add_from_palette(*kind);
            Ok(format!("Added {}", node.id))
        }
        FuzzOperation::InsertAfter(after, kind) => editor
            .add_after(*after, *kind)
            .map(|node| format!("Inserted {}", node.id))
            .map_err(|e| e.to_string()),
        FuzzOperation::MoveNode(id, to) => editor
            .store()
            .move_node(*id, *to)
            .map(|()| "Moved".to_string())
            .map_err(|e| e.to_string()),
        FuzzOperation::RemoveNode(id) => editor
            .remove_node(*id)
            .map(|node| format!("Removed {}", node.id))
            .map_err(|e| e.to_string()),
        FuzzOperation::AddEdge(a, b) => editor
            .store()
            .add_edge(*a, *b)
            .map(|edge| format!("Added {}", edge.id))
            .ok_or_else(|| "edge rejected".to_string()),
        FuzzOperation::RemoveEdge(id) => editor
            .store()
            .remove_edge(*id)
            .map(|edge| format!("Removed {}", edge.id))
            .map_err(|e| e.to_string()),
        FuzzOperation::Connect(a, b) => connect(editor, *a, *b),
        FuzzOperation::Pan(delta) => {
            let start = Point::new(-10_000.0, -10_000.0);
            editor.viewport_mut().begin_pan(start);
            editor.viewport_mut().pan_to(start + *delta);
            editor.viewport_mut().end_pan();
            Ok(format!("Panned to {:?}", editor.viewport().offset()))
        }
        FuzzOperation::Wheel(dy) => {
            editor.wheel(*dy);
            Ok(format!("Scale {}", editor.viewport().scale()))
        }
        FuzzOperation::ResetView => {
            editor.reset_view();
            Ok("Reset".to_string())
        }
        FuzzOperation::ConfigureNode(id) => {
            let panel = editor.open_panel(*id).map_err(|e| e.to_string())?;
            panel
                .set_field("name", FieldValue::from("configured step"))
                .map_err(|e| e.to_string())?;
            editor
                .confirm_panel()
                .map(|_| "Configured".to_string())
                .map_err(|e| e.to_string())
        }
        FuzzOperation::Run => editor
            .run()
            .map(|plan| format!("Running {} step(s)", plan.node_count))
            .map_err(|e| e.to_string()),
        FuzzOperation::CancelRun => {
            if editor.cancel_run() {
                Ok("Cancelled".to_string())
            } else {
                Err("nothing running".to_string())
            }
        }
        FuzzOperation::AdvanceClock(by) => {
            let fired = session.clock.advance(*by);
            Ok(format!("Fired {fired} timer(s)"))
        }
    }
}

fn connect(editor: &mut CanvasEditor, source: NodeId, target: NodeId) -> Result<String, String> {
    let geometry = editor.config().geometry;
    let store = editor.store();
    let (Some(from), Some(to)) = (store.node(source), store.node(target)) else {
        return Err("endpoint missing".to_string());
    };
    let from = editor
        .viewport()
        .model_to_screen(ConnectorSide::Output.anchor(&from, &geometry));
    let to = editor
        .viewport()
        .model_to_screen(ConnectorSide::Input.anchor(&to, &geometry));
    editor.pointer_down(from);
    editor.pointer_move(to);
    match editor.pointer_up(to) {
        Some(outcome) => Ok(format!("{outcome:?}")),
        None => Err("no connection gesture".to_string()),
    }
}

/// Store and editor invariants checked after every operation
pub struct EditorInvariants;

impl EditorInvariants {
    pub fn check_all(editor: &CanvasEditor) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();
        Self::check_graph(editor.store(), &mut violations);
        Self::check_editor(editor, &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    pub fn check_graph(store: &GraphStore, out: &mut Vec<InvariantViolation>) {
        let snapshot = store.snapshot();
        let dangling = snapshot.dangling_edges();
        if !dangling.is_empty() {
            out.push(InvariantViolation {
                check: InvariantCheck::EdgesReferenceExistingNodes,
                details: format!("{} dangling edge(s)", dangling.len()),
            });
        }

        let mut ids = HashSet::new();
        if !snapshot.nodes.iter().all(|n| ids.insert(n.id)) {
            out.push(InvariantViolation {
                check: InvariantCheck::NodeIdsAreUnique,
                details: "duplicate node id".to_string(),
            });
        }

        if let Some(edge) = snapshot.edges.iter().find(|e| e.source == e.target) {
            out.push(InvariantViolation {
                check: InvariantCheck::NoSelfConnections,
                details: format!("edge {}", edge.id),
            });
        }

        let mut pairs = HashSet::new();
        for edge in &snapshot.edges {
            let pair = if edge.source <= edge.target {
                (edge.source, edge.target)
            } else {
                (edge.target, edge.source)
            };
            if !pairs.insert(pair) {
                out.push(InvariantViolation {
                    check: InvariantCheck::NoDuplicatePairs,
                    details: format!("edge {}", edge.id),
                });
            }
        }
    }

    pub fn check_editor(editor: &CanvasEditor, out: &mut Vec<InvariantViolation>) {
        let store = editor.store();
        let bounds = editor.config().viewport;
        let scale = editor.viewport().scale();
        if !(bounds.min_scale..=bounds.max_scale).contains(&scale) {
            out.push(InvariantViolation {
                check: InvariantCheck::ScaleWithinBounds,
                details: format!("scale {scale}"),
            });
        }

        if let Some(id) = editor.selection().filter(|id| !store.contains(*id)) {
            out.push(InvariantViolation {
                check: InvariantCheck::SelectionReferencesExistingNode,
                details: format!("selected {id}"),
            });
        }
        if let Some(id) = editor
            .panel()
            .map(|p| p.node_id())
            .filter(|id| !store.contains(*id))
        {
            out.push(InvariantViolation {
                check: InvariantCheck::PanelReferencesExistingNode,
                details: format!("panel bound to {id}"),
            });
        }

        if !editor.is_running() {
            if let Some(node) = store.nodes().iter().find(|n| n.status == NodeStatus::Running) {
                out.push(InvariantViolation {
                    check: InvariantCheck::NoRunningNodeWhileIdle,
                    details: format!("{} still running", node.label),
                });
            }
        }

        if let Err(err) = editor.run_log().verify_order() {
            out.push(InvariantViolation {
                check: InvariantCheck::RunLogInOrder,
                details: err.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_session_passes() {
        let report = run_fuzz(FuzzConfig {
            seed: 7,
            total_operations: 500,
            ..FuzzConfig::default()
        });
        assert!(report.passed(), "{}", report.generate_text());
        assert_eq!(report.stats.total_operations, 500);
    }

    #[test]
    fn same_seed_same_outcome() {
        let config = FuzzConfig {
            seed: 99,
            total_operations: 300,
            ..FuzzConfig::default()
        };
        let a = run_fuzz(config.clone());
        let b = run_fuzz(config);
        assert_eq!(a.stats.operations_by_type, b.stats.operations_by_type);
        assert_eq!(a.stats.successful_operations, b.stats.successful_operations);
    }
}
