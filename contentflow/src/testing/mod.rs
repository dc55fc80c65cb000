//! Testing utilities for contentflow graphs.
//!
//! This module provides:
//! - Stub steps and capabilities
//! - Fixtures for the content graph
//! - Assertions over run results

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_run_failed, assert_run_succeeded, assert_steps_executed};
pub use fixtures::{sample_state, stub_capabilities, stub_content_steps};
pub use mocks::{
    ExecutionLog, FailingStep, MockStep, RecordingPublisher, RecordingStep,
    ScriptedModerationStep, StubImageGenerator, StubTextGenerator,
};
