//! Polling a Charging Module bill run until its status settles.

use std::time::Duration;

use tracing::debug;
use uuid::Uuid;

use crate::api::ChargingModule;
use crate::error::ChargingError;
use crate::models::BillRunStatusResponse;

/// Status the Charging Module reports while a bill run is still being worked on.
pub const PENDING_STATUS: &str = "pending";

/// How often and how long to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Pause between attempts. The first attempt is made immediately.
    pub interval: Duration,
    /// Give up after this many attempts; `None` polls until the status settles.
    pub max_attempts: Option<u32>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_attempts: Some(120),
        }
    }
}

/// Result of polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOutcome {
    /// True when a wanted status was seen before attempts ran out.
    pub succeeded: bool,
    /// Last status reported.
    pub status: String,
    /// Number of status requests made.
    pub attempts: u32,
}

/// Polls until the bill run reaches one of `statuses`.
///
/// A failed status request ends polling with an error; only an unwanted
/// status is retried.
pub async fn wait_for_status(
    charging_module: &dyn ChargingModule,
    bill_run_id: Uuid,
    statuses: &[&str],
    options: PollOptions,
) -> Result<WaitOutcome, ChargingError> {
    wait_until(charging_module, bill_run_id, |status| statuses.contains(&status), options).await
}

/// Polls until the bill run is no longer pending.
pub async fn wait_while_pending(
    charging_module: &dyn ChargingModule,
    bill_run_id: Uuid,
    options: PollOptions,
) -> Result<WaitOutcome, ChargingError> {
    wait_until(charging_module, bill_run_id, |status| status != PENDING_STATUS, options).await
}

async fn wait_until(
    charging_module: &dyn ChargingModule,
    bill_run_id: Uuid,
    settled: impl Fn(&str) -> bool + Send,
    options: PollOptions,
) -> Result<WaitOutcome, ChargingError> {
    let mut attempts = 0;
    let mut status = String::new();

    while options.max_attempts.is_none_or(|max| attempts < max) {
        if attempts > 0 && !options.interval.is_zero() {
            tokio::time::sleep(options.interval).await;
        }
        attempts += 1;

        let response: BillRunStatusResponse = charging_module
            .view_bill_run_status(bill_run_id)
            .await
            .parse("view bill run status")?;
        status = response.status;

        debug!(%bill_run_id, %status, attempts, "polled Charging Module bill run status");

        if settled(&status) {
            return Ok(WaitOutcome {
                succeeded: true,
                status,
                attempts,
            });
        }
    }

    Ok(WaitOutcome {
        succeeded: false,
        status,
        attempts,
    })
}
