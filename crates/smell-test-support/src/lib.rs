//! Test support utilities and fixtures for smellscope tests

pub mod fixtures;
pub mod helpers;
pub mod mocks;

pub use fixtures::{process_alive, wait_for_exit, FakeAnalyzer, TestPipeline};
pub use helpers::RequestBuilder;
pub use mocks::{mock_analyzer, MockAnalyzer};
