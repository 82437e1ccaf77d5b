//! Integration tests for lifeline records
//!
//! These tests drive whole registries through the public API against
//! `MockExecutor`, asserting on the statements a real driver would receive.

mod record_lifecycle;
mod relations;
mod support;

#[ctor::ctor]
fn init_logging() {
    #[cfg(feature = "tracing")]
    lifeline::test_helpers::init_tracing();
}
