//! Notifications raised by background bill run work.

use serde_json::Value;
use tracing::{error, info};

/// Receives progress and failure reports from background jobs.
///
/// Passed explicitly to every background entry point.
pub trait Notifier: Send + Sync {
    /// Reports progress.
    fn info(&self, message: &str, context: Value);

    /// Reports a failure.
    fn error(&self, message: &str, context: Value);
}

/// Notifier that writes through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn info(&self, message: &str, context: Value) {
        info!(%context, "{message}");
    }

    fn error(&self, message: &str, context: Value) {
        error!(%context, "{message}");
    }
}
