//! Event emitter abstraction for decoupling the capture session from its front-end.
//!
//! The session depends on the [`EventEmitter`] trait rather than a concrete
//! UI or channel, enabling testing and alternative front-ends.

use super::CaptureEvent;

/// Trait for emitting capture events without knowledge of transport.
///
/// # Example
///
/// ```ignore
/// struct Recorder {
///     emitter: Arc<dyn EventEmitter>,
/// }
///
/// impl Recorder {
///     fn report(&self, event: CaptureEvent) {
///         self.emitter.emit_capture(event);
///     }
/// }
/// ```
pub trait EventEmitter: Send + Sync {
    /// Emits a capture lifecycle event.
    fn emit_capture(&self, event: CaptureEvent);
}

/// No-op emitter for headless use or testing.
///
/// Events are silently discarded.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_capture(&self, _event: CaptureEvent) {
        // No-op
    }
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level. Without a `tracing` subscriber installed
/// the events are forwarded to the `log` facade.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_capture(&self, event: CaptureEvent) {
        tracing::debug!(?event, "capture_event");
    }
}
