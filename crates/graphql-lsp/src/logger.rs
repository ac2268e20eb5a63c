/// Logging seam for the message processor.
///
/// The server logs through `tracing`; tests swap in a recording
/// implementation to assert on the logged-once guarantees around
/// initialization failures.
pub trait Logger: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Production logger backed by the `tracing` macros. The binary routes all
/// tracing output to stderr so stdout stays clean for the protocol.
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}
