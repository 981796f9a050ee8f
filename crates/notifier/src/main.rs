//! Outbox relay: turns committed stock alerts into admin notifications.

use anyhow::Context;
use groupbuy_infra::notifications::NotificationWorker;
use groupbuy_infra::{StorefrontConfig, build_postgres_services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    groupbuy_observability::init();

    let cfg = StorefrontConfig::from_env().context("loading configuration")?;
    let (services, trigger) = build_postgres_services(&cfg)
        .await
        .context("connecting to the database")?;

    // Commits happen in other processes; polling is the only wake-up source
    // here, so the trigger just keeps the channel open.
    let worker = NotificationWorker::default()
        .with_interval(cfg.outbox_poll_interval)
        .spawn(
            "notification-worker",
            tokio::runtime::Handle::current(),
            services.dispatcher.clone(),
            trigger,
        )
        .context("spawning notification worker")?;

    tracing::info!(
        poll_ms = cfg.outbox_poll_interval.as_millis() as u64,
        batch = cfg.outbox_batch_size,
        "notifier running"
    );

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    tracing::info!("shutting down");

    tokio::task::spawn_blocking(move || worker.shutdown())
        .await
        .context("joining notification worker")?;
    services.store.pool().close().await;
    Ok(())
}
