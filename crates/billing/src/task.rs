//! Fire-and-forget task helper.

use std::future::Future;
use std::sync::Arc;

use serde_json::{Value, json};
use tokio::task::JoinHandle;

use crate::error::ServiceError;
use crate::notifier::Notifier;

/// Runs `future` on its own task without the caller awaiting it.
///
/// A failure is reported to `notifier` together with `context` and then
/// dropped; the task never propagates an error. The handle is returned so
/// tests and shutdown code can wait for completion.
pub fn spawn_detached<F>(
    operation: &'static str,
    context: Value,
    notifier: Arc<dyn Notifier>,
    future: F,
) -> JoinHandle<()>
where
    F: Future<Output = Result<(), ServiceError>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(err) = future.await {
            notifier.error(
                &format!("{operation} failed"),
                json!({
                    "operation": operation,
                    "context": context,
                    "code": err.error_code(),
                    "error": err.to_string(),
                }),
            );
        }
    })
}
