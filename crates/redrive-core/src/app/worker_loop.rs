//! Worker group: N processing workers plus one dead-letter monitor.
//!
//! Each worker loops receive → `LifecycleController::handle` → settle.
//! The monitor loops receive → `DeadLetterTriage::triage` → acknowledge.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::builder::App;
use crate::app::controller::LifecycleController;
use crate::app::triage::DeadLetterTriage;
use crate::domain::{Delivery, Settlement};
use crate::ports::MessageSource;

/// Worker group handle.
/// - dropping it (or `request_shutdown`) stops every loop
/// - `shutdown_and_join()` waits for all of them
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `concurrency` workers on `source` and one monitor on
    /// `dead_letter`.
    pub fn spawn(
        concurrency: usize,
        source: Arc<dyn MessageSource>,
        dead_letter: Arc<dyn MessageSource>,
        app: &App,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(concurrency + 1);
        for worker_id in 0..concurrency {
            let source = Arc::clone(&source);
            let controller = Arc::clone(&app.controller);
            let mut rx = shutdown_rx.clone();

            joins.push(tokio::spawn(async move {
                worker_loop(worker_id, source, controller, &mut rx).await;
            }));
        }

        let triage = Arc::clone(&app.triage);
        let mut rx = shutdown_rx;
        joins.push(tokio::spawn(async move {
            dead_letter_loop(dead_letter, triage, &mut rx).await;
        }));

        info!(concurrency, "worker group started");
        Self { shutdown_tx, joins }
    }

    /// Stop taking new deliveries. In-flight deliveries run to completion.
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            if let Err(e) = join.await {
                warn!(error = %e, "worker task ended abnormally");
            }
        }
        info!("worker group stopped");
    }
}

/// Receive the next delivery, or `None` once shutdown is requested.
async fn next_delivery(
    source: &dyn MessageSource,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Option<Delivery> {
    loop {
        if *shutdown_rx.borrow() {
            return None;
        }
        tokio::select! {
            changed = shutdown_rx.changed() => {
                // sender dropped: nobody can ask us to stop any more
                if changed.is_err() {
                    return None;
                }
            }
            delivery = source.receive() => return Some(delivery),
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    source: Arc<dyn MessageSource>,
    controller: Arc<LifecycleController>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    while let Some(delivery) = next_delivery(source.as_ref(), shutdown_rx).await {
        let outcome = controller.handle(&delivery).await;

        match outcome.settlement() {
            Settlement::Acknowledge => {
                if let Err(e) = source.acknowledge(&delivery.handle).await {
                    warn!(
                        worker_id,
                        task_id = %delivery.task_id(),
                        error = %e,
                        "acknowledge failed, message will be redelivered"
                    );
                }
            }
            Settlement::Release => {
                debug!(
                    worker_id,
                    task_id = %delivery.task_id(),
                    attempt = delivery.attempt,
                    "delivery released"
                );
            }
        }
    }
    debug!(worker_id, "worker stopped");
}

async fn dead_letter_loop(
    source: Arc<dyn MessageSource>,
    triage: Arc<DeadLetterTriage>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    while let Some(delivery) = next_delivery(source.as_ref(), shutdown_rx).await {
        triage.triage(&delivery).await;
        if let Err(e) = source.acknowledge(&delivery.handle).await {
            warn!(
                task_id = %delivery.task_id(),
                error = %e,
                "dead-letter acknowledge failed, message will be triaged again"
            );
        }
    }
    debug!("dead-letter monitor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::builder::AppBuilder;
    use crate::config::RedriveConfig;
    use crate::domain::{Task, TaskId, TaskMessage, TaskStatus};
    use crate::impls::fault::AlwaysFail;
    use crate::impls::{InMemoryQueue, InMemoryTaskStore, MemoryDiagnosticSink};
    use crate::ports::{MessagePublisher, TaskStore};
    use chrono::Utc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn failing_task_ends_in_dead_letter_and_is_triaged_once() {
        let config = RedriveConfig::default();
        let store = Arc::new(InMemoryTaskStore::new());
        let queue = InMemoryQueue::from_config(&config.queue);
        let sink = Arc::new(MemoryDiagnosticSink::new());
        let app = AppBuilder::new(config)
            .store(store.clone())
            .scheduler(queue.tasks())
            .unit_of_work(Arc::new(AlwaysFail::new("boom")))
            .sink(sink.clone())
            .build()
            .unwrap();

        let id = TaskId::new("t-1");
        store
            .create(Task::submitted(id.clone(), serde_json::json!({}), Utc::now()))
            .await
            .unwrap();
        queue
            .tasks()
            .publish(TaskMessage::new(id.clone(), serde_json::json!({})))
            .await
            .unwrap();

        let workers = WorkerGroup::spawn(2, queue.tasks(), queue.dead_letter(), &app);

        // 5s + 10s backoff, then the exhausted visibility window (30s) before redrive
        for _ in 0..120 {
            if !sink.records().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        workers.shutdown_and_join().await;

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_complete());

        let task = store.get(&id).await.unwrap().unwrap().task;
        assert_eq!(task.status, TaskStatus::DeadLetter);
        assert_eq!(task.attempts, 3);
        assert_eq!(task.last_error.as_deref(), Some("boom"));

        let snapshot = queue.snapshot().await;
        assert!(snapshot.tasks.is_empty());
        assert!(snapshot.dead_letter.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_idle_workers() {
        let config = RedriveConfig::default();
        let queue = InMemoryQueue::from_config(&config.queue);
        let app = AppBuilder::new(config)
            .store(Arc::new(InMemoryTaskStore::new()))
            .scheduler(queue.tasks())
            .unit_of_work(Arc::new(AlwaysFail::new("unused")))
            .build()
            .unwrap();

        let workers = WorkerGroup::spawn(3, queue.tasks(), queue.dead_letter(), &app);
        tokio::time::timeout(Duration::from_secs(1), workers.shutdown_and_join())
            .await
            .unwrap();
    }
}
