//! Worker runner concurrency, drain, and queue back-pressure.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, watch};
use uuid::Uuid;

use slidehub_core::config::worker::WorkerConfig;
use slidehub_core::error::ErrorKind;
use slidehub_entity::publish::PublishOptions;
use slidehub_entity::upload::MergedArtifact;
use slidehub_service::{PipelineDispatcher, PipelineTask};
use slidehub_worker::executor::{JobExecutionError, PipelineHandler};
use slidehub_worker::{PipelineQueue, WorkerRunner};

fn task() -> PipelineTask {
    PipelineTask {
        job_id: Uuid::new_v4(),
        artifact: MergedArtifact {
            path: PathBuf::from("/tmp/none.svs"),
            size_bytes: 1,
            original_filename: "none.svs".into(),
        },
        options: PublishOptions::default(),
    }
}

/// Handler that blocks until released and tracks peak concurrency.
#[derive(Debug, Default)]
struct GateHandler {
    release: Notify,
    running: AtomicUsize,
    peak: AtomicUsize,
    handled: AtomicUsize,
    abandoned: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl PipelineHandler for GateHandler {
    fn name(&self) -> &str {
        "gate"
    }

    async fn handle(&self, _task: PipelineTask) -> Result<(), JobExecutionError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.release.notified().await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        self.handled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn abandon(&self, task: PipelineTask, _reason: &str) {
        self.abandoned.lock().unwrap().push(task.job_id);
    }
}

async fn wait_for(cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn runs_at_most_concurrency_pipelines_and_drains_on_shutdown() {
    let (queue, receiver) = PipelineQueue::new(16);
    let handler = Arc::new(GateHandler::default());
    let config = WorkerConfig {
        concurrency: 2,
        queue_capacity: 16,
        drain_timeout_seconds: 5,
    };
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let runner = tokio::spawn(WorkerRunner::new(receiver, handler.clone(), config).run(cancel_rx));

    for _ in 0..5 {
        queue.dispatch(task()).await.unwrap();
    }
    wait_for(|| handler.running.load(Ordering::SeqCst) == 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(handler.peak.load(Ordering::SeqCst), 2);

    // Shut down with two pipelines in flight and three still queued.
    cancel_tx.send(true).unwrap();
    wait_for(|| handler.abandoned.lock().unwrap().len() == 3).await;
    assert!(!runner.is_finished());

    handler.release.notify_waiters();
    tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(handler.handled.load(Ordering::SeqCst), 2);
    assert_eq!(handler.peak.load(Ordering::SeqCst), 2);

    let err = queue.dispatch(task()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
}

#[tokio::test]
async fn full_queue_sheds_load() {
    let (queue, _receiver) = PipelineQueue::new(2);
    queue.dispatch(task()).await.unwrap();
    queue.dispatch(task()).await.unwrap();
    assert_eq!(queue.depth(), 2);

    let err = queue.dispatch(task()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
}
