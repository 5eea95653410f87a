//! Bounded-parallelism launching of lesson workers

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::worker::{WorkerContext, run_lesson};
use crate::error::{DownloadError, Error, Result};
use crate::progress::ProgressHub;
use crate::types::{LessonTask, OverallState};

/// Counters shared between the scheduler, its workers and the reporter
///
/// Counters are only written by workers and read by everyone else.
#[derive(Debug)]
pub struct SchedulerState {
    total_tasks: usize,
    finished: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    failed: CancellationToken,
}

impl SchedulerState {
    /// Create the state for a run of `total_tasks` tasks
    pub fn new(total_tasks: usize) -> Self {
        Self {
            total_tasks,
            finished: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            failed: CancellationToken::new(),
        }
    }

    /// Snapshot of finished vs. total tasks
    pub fn overall(&self) -> OverallState {
        OverallState {
            total_tasks: self.total_tasks,
            finished_tasks: self.finished.load(Ordering::SeqCst),
        }
    }

    /// Workers currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of workers that ran at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Whether any worker has failed
    pub fn has_failed(&self) -> bool {
        self.failed.is_cancelled()
    }

    /// Token that is cancelled when the first worker fails
    pub fn failure_signal(&self) -> CancellationToken {
        self.failed.clone()
    }

    pub(crate) fn mark_failed(&self) {
        self.failed.cancel();
    }

    /// Count a worker as finished, returning its position in completion order
    pub(crate) fn mark_finished(&self) -> usize {
        self.finished.fetch_add(1, Ordering::SeqCst)
    }

    fn enter(&self) {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Result of one worker, tagged with when it finished
struct Completion {
    order: usize,
    lesson: String,
    outcome: std::result::Result<(), DownloadError>,
}

/// Launches one worker per task, at most `parallelism` at a time
pub(crate) struct Scheduler {
    state: Arc<SchedulerState>,
    ctx: Arc<WorkerContext>,
    hub: ProgressHub,
}

impl Scheduler {
    pub(crate) fn new(state: Arc<SchedulerState>, ctx: Arc<WorkerContext>, hub: ProgressHub) -> Self {
        Self { state, ctx, hub }
    }

    /// Run every task and wait for all of them
    ///
    /// Tasks are admitted in input order as permits free up. A failing worker
    /// does not stop the others, and queued tasks are still launched after a
    /// failure. Returns the number of tasks on success, or the error of the
    /// worker that failed first.
    pub(crate) async fn run_all(self, tasks: Vec<LessonTask>, parallelism: usize) -> Result<usize> {
        if parallelism == 0 {
            return Err(Error::Scheduling(
                "parallelism must be at least 1".to_string(),
            ));
        }

        let total = tasks.len();
        tracing::info!(lessons = total, parallelism, "Starting lesson downloads");

        let limiter = Arc::new(Semaphore::new(parallelism));
        let mut workers = JoinSet::new();
        let mut lessons = HashMap::with_capacity(total);

        for task in tasks {
            let permit = limiter
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| Error::Scheduling("worker limiter closed".to_string()))?;

            let state = Arc::clone(&self.state);
            let ctx = Arc::clone(&self.ctx);
            let progress = self.hub.sender(task.id);
            let lesson = task.name.clone();

            let handle = workers.spawn(async move {
                state.enter();
                let outcome = AssertUnwindSafe(run_lesson(&ctx, &task, progress))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(DownloadError::Aborted(panic_message(&*panic))));
                state.leave();

                if let Err(e) = &outcome {
                    tracing::error!(
                        task_id = %task.id,
                        lesson = %task.name,
                        kind = e.kind(),
                        error = %e,
                        "Lesson failed"
                    );
                    state.mark_failed();
                }
                let order = state.mark_finished();
                drop(permit);

                Completion {
                    order,
                    lesson: task.name,
                    outcome,
                }
            });
            lessons.insert(handle.id(), lesson);
        }

        let mut first_failure: Option<Completion> = None;
        while let Some(joined) = workers.join_next().await {
            let completion = match joined {
                Ok(completion) => completion,
                // Only reachable if the runtime shuts down under us
                Err(e) => {
                    self.state.mark_failed();
                    Completion {
                        order: usize::MAX,
                        lesson: lessons.get(&e.id()).cloned().unwrap_or_default(),
                        outcome: Err(DownloadError::Aborted(e.to_string())),
                    }
                }
            };

            if completion.outcome.is_err()
                && first_failure
                    .as_ref()
                    .is_none_or(|first| completion.order < first.order)
            {
                first_failure = Some(completion);
            }
        }

        match first_failure {
            Some(Completion {
                lesson,
                outcome: Err(source),
                ..
            }) => Err(Error::download(lesson, source)),
            _ => {
                tracing::info!(lessons = total, "All lessons downloaded");
                Ok(total)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("worker panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("worker panicked: {}", message)
    } else {
        "worker panicked".to_string()
    }
}
