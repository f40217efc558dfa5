use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, sleep, Duration};

use crate::core::shutdown::{shutdown_flag, shutdown_signal};
use crate::core::state::AppState;
use crate::tasks::dispatcher;

const DISPATCH_IDLE_DELAY: Duration = Duration::from_secs(2);
const PRUNE_INTERVAL: Duration = Duration::from_secs(3600);

pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = shutdown_flag();

    let handles = vec![
        tokio::spawn(dispatch_loop(state.clone(), shutdown_rx.clone())),
        tokio::spawn(prune_loop(state.clone(), shutdown_rx)),
    ];

    shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }

    Ok(())
}

async fn dispatch_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let batch = usize::try_from(state.settings().notifier().dispatch_batch).unwrap_or(usize::MAX);

    loop {
        if *shutdown.borrow() {
            break;
        }

        match dispatcher::dispatch_pending_facts(&state).await {
            // A full batch means more may be waiting; drain before sleeping.
            Ok(report) if report.claimed >= batch && report.failed == 0 => continue,
            Ok(_) => {}
            Err(err) => tracing::error!(error = %err, "dispatch_pending_facts failed"),
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(DISPATCH_IDLE_DELAY) => {}
        }
    }
}

async fn prune_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut tick = interval(PRUNE_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = dispatcher::prune_dispatched_facts(&state).await {
                    tracing::error!(error = %err, "prune_dispatched_facts failed");
                }
            }
        }
    }
}
