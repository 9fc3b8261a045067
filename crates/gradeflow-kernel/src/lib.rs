//! Headless state model of a node-graph workflow editor for grading
//! pipelines: a step catalog, the graph store, viewport transform,
//! connection gesture, property panel, and a scripted run simulator.

pub mod catalog;
pub mod config;
pub mod connection;
pub mod editor;
pub mod error;
pub mod graph;
pub mod logging;
pub mod panel;
pub mod scheduler;
pub mod simulator;
pub mod templates;
pub mod test_harness;
pub mod types;
pub mod viewport;

pub use config::EditorConfig;
pub use editor::{CanvasEditor, PointerTarget};
pub use error::*;
pub use graph::{GraphStore, StoreEvent, Topology};
pub use simulator::{RunPlan, RunSimulator, WorkflowValidation};
pub use types::*;

/// Re-export test harness for external use
pub use test_harness::{run_fuzz, FuzzConfig, TestHarness};
