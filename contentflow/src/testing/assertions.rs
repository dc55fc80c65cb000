//! Assertions for run results.

use crate::pipeline::{RunResult, RunStatus};

/// Asserts that the run succeeded without an error marker.
pub fn assert_run_succeeded(result: &RunResult) {
    assert_eq!(
        result.status,
        RunStatus::Succeeded,
        "Expected success, got {:?} with error {:?}",
        result.status,
        result.error
    );
    assert!(
        result.final_state.error.is_none(),
        "Succeeded run left error marker: {:?}",
        result.final_state.error
    );
}

/// Asserts that the run failed and its error mentions `needle`.
pub fn assert_run_failed(result: &RunResult, needle: &str) {
    assert_eq!(result.status, RunStatus::Failed, "Expected failure, got {:?}", result.status);
    let message = result
        .error
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();
    assert!(
        message.contains(needle),
        "Expected error containing '{needle}', got '{message}'"
    );
}

/// Asserts the exact execution order.
pub fn assert_steps_executed(result: &RunResult, expected: &[&str]) {
    let actual: Vec<&str> = result.executed_steps.iter().map(String::as_str).collect();
    assert_eq!(actual, expected, "Unexpected execution order");
}
