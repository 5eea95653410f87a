//! Live progress reporting
//!
//! The [`Reporter`] is a periodic snapshot-and-render loop. Every cycle it:
//! 1. Drains pending [`ProgressUpdate`](crate::progress::ProgressUpdate)s into its table
//! 2. Hides rows whose transfer is complete
//! 3. Renders the overall state and the active rows through a [`ReportView`]
//! 4. Stops once every task finished and no row is left, or as soon as the
//!    scheduler signals a failure
//!
//! The reporter only reads scheduler state; it never influences the workers.

mod view;

pub use view::{IndicatifView, LogView, ReportView, SuspendingWriter, percent};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::downloader::SchedulerState;
use crate::progress::{ProgressReceiver, ProgressTable};
use crate::types::{LessonTask, OverallState, ProgressSample, TaskId};

/// One displayed transfer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskRow {
    /// Task identifier
    pub id: TaskId,
    /// Lesson name shown in the row
    pub name: String,
    /// Latest progress sample
    pub sample: ProgressSample,
}

/// Everything a view needs to draw one refresh
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportFrame {
    /// Finished vs. total tasks
    pub overall: OverallState,
    /// Active transfers, ordered by task id
    pub rows: Vec<TaskRow>,
}

/// Why the reporter stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Every task finished and every row was cleared
    Completed,
    /// The scheduler reported a failure
    Aborted,
}

/// Periodic progress renderer driven by the scheduler's state and the progress channel
pub struct Reporter<V> {
    rx: ProgressReceiver,
    table: ProgressTable,
    state: Arc<SchedulerState>,
    labels: HashMap<TaskId, String>,
    interval: Duration,
    view: V,
}

impl<V: ReportView> Reporter<V> {
    /// Create a reporter for the given tasks
    pub fn new(
        rx: ProgressReceiver,
        state: Arc<SchedulerState>,
        tasks: &[LessonTask],
        interval: Duration,
        view: V,
    ) -> Self {
        let labels = tasks
            .iter()
            .map(|task| (task.id, task.name.clone()))
            .collect();
        Self {
            rx,
            table: ProgressTable::new(),
            state,
            labels,
            interval,
            view,
        }
    }

    /// Run until all work is finished or a failure is signalled
    ///
    /// Returns the view so callers can inspect or reuse it.
    pub async fn run(mut self) -> V {
        let failure = self.state.failure_signal();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately
        ticker.tick().await;

        let outcome = loop {
            self.table.drain(&mut self.rx);
            self.table.prune_completed();

            let overall = self.state.overall();
            let frame = self.frame(overall);
            self.view.render(&frame);

            if self.state.has_failed() {
                break ReportOutcome::Aborted;
            }
            if overall.is_done() && self.table.is_empty() {
                break ReportOutcome::Completed;
            }

            tokio::select! {
                _ = failure.cancelled() => {}
                _ = ticker.tick() => {}
            }
        };

        tracing::debug!(?outcome, "Reporter stopped");
        self.view.finish(outcome);
        self.view
    }

    fn frame(&self, overall: OverallState) -> ReportFrame {
        let rows = self
            .table
            .iter()
            .map(|(id, sample)| TaskRow {
                id,
                name: self
                    .labels
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| format!("task {}", id)),
                sample,
            })
            .collect();
        ReportFrame { overall, rows }
    }
}
