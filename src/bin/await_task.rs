//! Waits for a generation task to finish by polling the orchestrator.
//!
//! Usage: `gen-orchestrator-await <task_id>`. Prints the artifact locator on
//! success. Cadence and target come from the `GEN_ORCHESTRATOR__POLLER__*`
//! variables.

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gen_orchestrator::config::AppConfig;
use gen_orchestrator::domain::foundation::TaskId;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.server.log_level.as_str().into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.poller.validate()?;

    let task_id = std::env::args()
        .nth(1)
        .ok_or("usage: gen-orchestrator-await <task_id>")?;
    let task_id = TaskId::new(task_id)?;

    let poller = config.poller.task_poller()?;
    tracing::info!(
        %task_id,
        server = %config.poller.server_url,
        max_wait_secs = config.poller.max_wait_secs,
        "Waiting for task"
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let done = poller
        .wait_for_completion(&task_id, &cancel, |progress| {
            tracing::info!(progress = %progress, "Generating");
        })
        .await?;

    println!("{}", done.result);
    Ok(())
}
