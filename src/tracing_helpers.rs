//! Span helpers for record operations.
//!
//! Only compiled with the `tracing` feature. Spans are entered for the duration of
//! one terminal operation so executor calls made inside show up nested under it.

use tracing::Span;

/// Span around one record operation (`find`, `create`, `add`, ...)
pub(crate) fn record_span(model: &str, operation: &'static str) -> Span {
    tracing::info_span!("lifeline.record", model = %model, operation)
}

/// Span around the lazy resolution of a one-to-one relation
pub(crate) fn relation_span(model: &str, relation: &str) -> Span {
    tracing::debug_span!("lifeline.relation", model = %model, relation = %relation)
}
