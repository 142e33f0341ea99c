use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::AppResult;
use crate::models::{Decision, DecisionRecord};
use crate::services::session::SessionStore;

/// Handle for gracefully shutting down the decision router
pub struct DecisionRouterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl DecisionRouterHandle {
    /// Signals the router to stop and waits until queued decisions are applied
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Decision router shutdown signal sent");
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Decision router task failed");
        }
    }
}

/// Spawns the task that applies card decisions to the session
///
/// The returned sender plugs into [`crate::interaction::CardStack::with_decision_sink`],
/// so swipes never wait on the document store.
pub fn spawn_decision_router(
    session: SessionStore,
) -> (mpsc::UnboundedSender<DecisionRecord>, DecisionRouterHandle) {
    let (decision_tx, decision_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

    let task = tokio::spawn(async move {
        decision_router_task(session, decision_rx, shutdown_rx).await;
    });

    (decision_tx, DecisionRouterHandle { shutdown_tx, task })
}

async fn decision_router_task(
    session: SessionStore,
    mut decision_rx: mpsc::UnboundedReceiver<DecisionRecord>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    tracing::info!("Decision router started");

    loop {
        tokio::select! {
            received = decision_rx.recv() => match received {
                Some(record) => apply_logged(&session, record).await,
                None => {
                    tracing::info!("All decision senders dropped");
                    break;
                }
            },
            _ = shutdown_rx.recv() => {
                let mut drained = 0;
                while let Ok(record) = decision_rx.try_recv() {
                    apply_logged(&session, record).await;
                    drained += 1;
                }
                tracing::info!(drained = drained, "Decision router drained pending decisions");
                break;
            }
        }
    }

    tracing::info!("Decision router stopped");
}

async fn apply_logged(session: &SessionStore, record: DecisionRecord) {
    let movie_id = record.movie.id;
    if let Err(e) = apply_decision(session, record).await {
        tracing::warn!(movie_id = %movie_id, error = %e, "Decision not applied");
    }
}

/// Routes one decision to the session collection it belongs in
pub async fn apply_decision(session: &SessionStore, record: DecisionRecord) -> AppResult<()> {
    match record.decision {
        Decision::Watched => {
            session.add_to_watch_list(record.movie).await?;
        }
        Decision::Reviewed(review) => {
            session.record_review(&record.movie, &review).await?;
            session.add_to_watch_list(record.movie).await?;
        }
        Decision::WatchLater => {
            session.add_to_watch_later(record.movie).await?;
        }
        Decision::Skipped => {
            tracing::debug!(movie_id = %record.movie.id, "Skipped");
        }
    }
    Ok(())
}
