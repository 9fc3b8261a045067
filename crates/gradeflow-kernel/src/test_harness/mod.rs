//! Randomized stress harness for the canvas editor

pub mod fuzz;

pub use fuzz::*;

pub struct TestHarness;

impl TestHarness {
    /// One long session at a fixed seed.
    pub fn run_stress_test(max_nodes: usize, operations: u64) -> StressTestReport {
        tracing::info!(
            "Running stress test with up to {} nodes over {} operations",
            max_nodes,
            operations
        );
        let report = run_fuzz(FuzzConfig {
            seed: 12345,
            total_operations: operations,
            max_nodes,
            ..FuzzConfig::default()
        });
        StressTestReport {
            max_nodes,
            operations,
            violations: report.violations.len(),
            success: report.passed(),
        }
    }

    /// Run every seed in `seeds` and stop at the first failing one.
    pub fn run_seeds(seeds: std::ops::Range<u64>, operations: u64) -> Result<u64, FuzzReport> {
        let count = seeds.end.saturating_sub(seeds.start);
        for seed in seeds {
            let report = run_fuzz(FuzzConfig {
                seed,
                total_operations: operations,
                ..FuzzConfig::default()
            });
            if !report.passed() {
                return Err(report);
            }
        }
        Ok(count)
    }
}

#[derive(Debug, Clone)]
pub struct StressTestReport {
    pub max_nodes: usize,
    pub operations: u64,
    pub violations: usize,
    pub success: bool,
}
