//! Riverbill operator CLI.
//!
//! Runs bill run operations against the configured database and Charging
//! Module:
//!   riverbill send <BILL_RUN_ID>             - Send a ready bill run
//!   riverbill reissue <BILL_RUN_ID>          - Reissue flagged bills into a bill run
//!   riverbill change-address <INPUT.json>    - Change a billing account's address
//!   riverbill cm-health                      - Check the Charging Module is reachable

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use riverbill_billing::{
    BillRunLifecycleCoordinator, BillingStore, ChangeAddressService, DbBillingStore, Notifier,
    ReissueBillRunService, ReissueOrchestrator, TracingNotifier,
};
use riverbill_charging::{ChargingModule, ChargingModuleClient, PollOptions, StaticToken};
use riverbill_db::repositories::ChangeAddressInput;
use riverbill_shared::AppConfig;
use riverbill_shared::types::BillRunId;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    name = "riverbill",
    about = "Riverbill operator CLI",
    after_help = "Examples:\n  riverbill send 0192f0c4-7c1e-7a4e-9d62-3f1c5b8e2a10\n  riverbill cm-health"
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Approve and send a ready bill run, then record invoice numbers.
    Send {
        /// Bill run to send.
        bill_run_id: BillRunId,
    },
    /// Reissue every bill flagged for rebilling in the bill run's region.
    Reissue {
        /// Bill run to populate.
        bill_run_id: BillRunId,
    },
    /// Change a billing account's address from a JSON file.
    ChangeAddress {
        /// Path to the change, shaped like `ChangeAddressInput`.
        input: PathBuf,
    },
    /// Call the Charging Module status endpoint.
    CmHealth,
}

fn init_tracing(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "riverbill=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn billing_store(config: &AppConfig) -> anyhow::Result<Arc<dyn BillingStore>> {
    let db = riverbill_db::connect_with(&config.database).await?;
    info!("Connected to database");
    Ok(Arc::new(DbBillingStore::new(db)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = AppConfig::load().context("failed to load configuration")?;

    let charging_module: Arc<dyn ChargingModule> = Arc::new(ChargingModuleClient::new(
        &config.charging_module,
        Arc::new(StaticToken::new(config.charging_module.token.clone())),
    )?);
    let poll_interval = Duration::from_millis(config.billing.poll_interval_ms);

    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);

    match cli.command {
        Command::Send { bill_run_id } => {
            let coordinator = BillRunLifecycleCoordinator::new(
                billing_store(&config).await?,
                charging_module,
                notifier,
                PollOptions {
                    interval: poll_interval,
                    max_attempts: Some(config.billing.max_poll_attempts),
                },
            );
            match coordinator.send(bill_run_id).await? {
                Some(handle) => handle.await?,
                None => info!(%bill_run_id, "bill run is not ready to send"),
            }
        }
        Command::Reissue { bill_run_id } => {
            let service = ReissueBillRunService::new(
                billing_store(&config).await?,
                ReissueOrchestrator::new(charging_module, poll_interval),
                notifier,
            );
            service.trigger(bill_run_id).await?;
        }
        Command::ChangeAddress { input } => {
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let change: ChangeAddressInput =
                serde_json::from_str(&raw).context("invalid address change")?;

            let changed = ChangeAddressService::new(billing_store(&config).await?, charging_module)
                .change_address(&change)
                .await?;
            println!(
                "{}",
                json!({
                    "billing_account_address_id": changed.billing_account_address_id,
                    "address_id": changed.address_id,
                    "company_id": changed.company_id,
                    "contact_id": changed.contact_id,
                })
            );
        }
        Command::CmHealth => {
            let result = charging_module
                .view_health()
                .await
                .ensure_succeeded("view health")?;
            println!("{}", result.body_text());
        }
    }

    Ok(())
}
