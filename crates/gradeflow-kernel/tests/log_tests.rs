use gradeflow_kernel::logging::{RunLog, RunLogKind};
use gradeflow_kernel::types::NodeId;
use gradeflow_kernel::LogError;

#[test]
fn test_sequences_are_contiguous() {
    let log = RunLog::new();
    assert_eq!(log.append(0, RunLogKind::Started, None, "starting workflow (1 steps)"), 0);
    assert_eq!(log.append(0, RunLogKind::NodeRunning, Some(NodeId::new()), "[a] running"), 1);
    assert_eq!(log.append(800, RunLogKind::NodeSucceeded, None, "[a] succeeded"), 2);
    assert_eq!(log.len(), 3);
    assert_eq!(log.count(RunLogKind::NodeRunning), 1);
    log.verify_order().unwrap();
}

#[test]
fn test_time_going_backwards_is_detected() {
    let log = RunLog::new();
    log.append(500, RunLogKind::Started, None, "start");
    log.append(100, RunLogKind::Completed, None, "done");
    assert_eq!(log.verify_order(), Err(LogError::OutOfOrder { sequence: 1 }));
}

#[test]
fn test_clear_restarts_sequence() {
    let log = RunLog::new();
    log.append(0, RunLogKind::Started, None, "first");
    log.clear();
    assert!(log.is_empty());
    assert_eq!(log.append(10, RunLogKind::Started, None, "second"), 0);
}

#[test]
fn test_entry_display_and_json() {
    let log = RunLog::new();
    log.append(1_800, RunLogKind::NodeSucceeded, None, "[Recognize content] succeeded");
    let entry = &log.entries()[0];
    assert_eq!(entry.to_string(), "[  1800 ms] > [Recognize content] succeeded");

    let json = serde_json::to_value(entry).unwrap();
    assert_eq!(json["kind"], "node_succeeded");
    assert_eq!(json["at_ms"], 1_800);
    assert!(json["node_id"].is_null());
}

#[test]
fn test_concurrent_appends_keep_order() {
    let log = std::sync::Arc::new(RunLog::new());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let log = std::sync::Arc::clone(&log);
            std::thread::spawn(move || {
                for _ in 0..250 {
                    log.append(0, RunLogKind::NodeRunning, None, "tick");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(log.len(), 1_000);
    log.verify_order().unwrap();
}
