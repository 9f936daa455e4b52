//! Boundary through which clip and velocity events leave the detector.

use camwatch_models::DetectionEvent;

/// Receives detection events.
///
/// Implementations must not block and must not fail the caller: delivery
/// problems are handled (and logged) on the sink's side.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DetectionEvent);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: DetectionEvent) {}
}
