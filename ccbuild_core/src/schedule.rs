#![deny(clippy::unwrap_used)]

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::{
    error::{BuildError, ExecError, FatalError, TaskFailure},
    task::{ExecContext, Readiness, Task},
};

/// Counts for a completed build.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildSummary {
    /// Tasks that ran (including compiles that found their object fresh).
    pub executed: usize,
    /// Tasks cancelled because an ancestor failed.
    pub skipped: usize,
}

/// One message per task, whether it ran, was cancelled, or failed.
enum TaskOutcome {
    Ran,
    Skipped,
    Failed(TaskFailure),
    Fatal(FatalError),
}

/// Executes the task graph.
///
/// One supervisor per task blocks on the task's parent edges and either
/// submits it to the work queue or cancels it. A fixed pool of workers
/// drains the queue, so at most `workers` subprocesses run at once. Every
/// task reports exactly one outcome; the driver waits for all of them,
/// collecting failures. A failed task only prunes its downstream cone —
/// unrelated subgraphs keep building.
pub(crate) async fn execute(
    tasks: Vec<Task>,
    ctx: Arc<ExecContext>,
    workers: usize,
) -> Result<BuildSummary, BuildError> {
    let total = tasks.len();
    for task in &tasks {
        log::debug!("task {:?}", task.name);
    }

    let (work_tx, work_rx) = mpsc::channel::<Task>(workers);
    let work_rx = Arc::new(Mutex::new(work_rx));
    let (outcome_tx, mut outcome_rx) = mpsc::channel::<TaskOutcome>(total.max(1));

    let mut worker_handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let work_rx = Arc::clone(&work_rx);
        let outcome_tx = outcome_tx.clone();
        let ctx = Arc::clone(&ctx);
        worker_handles.push(tokio::spawn(async move {
            loop {
                let task = work_rx.lock().await.recv().await;
                let Some(mut task) = task else {
                    return;
                };
                log::info!("{}", task.name);
                let outcome = match task.run(&ctx).await {
                    Ok(()) => {
                        task.notify_children(true);
                        TaskOutcome::Ran
                    }
                    Err(ExecError::Failure(detail)) => {
                        task.notify_children(false);
                        TaskOutcome::Failed(TaskFailure {
                            task: task.name.clone(),
                            detail,
                        })
                    }
                    Err(ExecError::Fatal(err)) => {
                        task.notify_children(false);
                        TaskOutcome::Fatal(err)
                    }
                };
                if outcome_tx.send(outcome).await.is_err() {
                    // Driver is gone; the build was aborted.
                    return;
                }
            }
        }));
    }

    for mut task in tasks {
        let work_tx = work_tx.clone();
        let outcome_tx = outcome_tx.clone();
        tokio::spawn(async move {
            match task.await_parents().await {
                Readiness::Proceed => {
                    let _ = work_tx.send(task).await;
                }
                Readiness::Cancelled => {
                    log::debug!("skipped {:?}", task.name);
                    task.notify_children(false);
                    let _ = outcome_tx.send(TaskOutcome::Skipped).await;
                }
            }
        });
    }
    drop(work_tx);
    drop(outcome_tx);

    let mut summary = BuildSummary::default();
    let mut failures = Vec::new();
    for _ in 0..total {
        let Some(outcome) = outcome_rx.recv().await else {
            break;
        };
        match outcome {
            TaskOutcome::Ran => summary.executed += 1,
            TaskOutcome::Skipped => summary.skipped += 1,
            TaskOutcome::Failed(failure) => {
                log::error!("task failed: {failure}");
                failures.push(failure);
            }
            TaskOutcome::Fatal(err) => return Err(BuildError::Fatal(err)),
        }
    }

    for handle in worker_handles {
        let _ = handle.await;
    }

    if failures.is_empty() {
        Ok(summary)
    } else {
        Err(BuildError::Failed { failures })
    }
}
