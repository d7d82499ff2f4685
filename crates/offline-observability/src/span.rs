//! Request spans.

use offline_core::RequestDescriptor;
use tracing::Span;

/// Span covering the handling of one intercepted request.
///
/// `class`, `status` and `cache` are recorded once the runtime knows them.
pub fn request_span(request: &RequestDescriptor) -> Span {
    tracing::info_span!(
        "fetch",
        request_id = %request.id,
        method = %request.method,
        path = %request.path(),
        class = tracing::field::Empty,
        status = tracing::field::Empty,
        cache = tracing::field::Empty,
    )
}

/// Span covering a lifecycle event (`install`, `activate`, `message`).
pub fn lifecycle_span(event: &'static str, generation: &str) -> Span {
    tracing::info_span!("lifecycle", event, generation)
}
