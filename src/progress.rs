//! Per-task byte progress, passed from workers to the reporter by message
//!
//! Workers never share mutable state with the reporter. Each worker owns a
//! [`ProgressSender`] bound to its own task id and pushes cumulative samples
//! into an unbounded channel. The reporter drains the channel into its private
//! [`ProgressTable`] once per poll cycle.

use std::collections::BTreeMap;
use tokio::sync::mpsc;

use crate::types::{ProgressSample, TaskId};

/// A progress sample tagged with the task it belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Task the sample belongs to
    pub id: TaskId,
    /// Cumulative progress of that task's transfer
    pub sample: ProgressSample,
    /// Set on the last update of a transfer that received its whole body
    pub closed: bool,
}

/// Receiving half of the progress channel, owned by the reporter
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressUpdate>;

/// Create a progress channel: a sender factory for workers and the reporter's receiver
pub fn channel() -> (ProgressHub, ProgressReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressHub { tx }, rx)
}

/// Hands out per-task senders that all feed the same reporter
#[derive(Clone, Debug)]
pub struct ProgressHub {
    tx: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ProgressHub {
    /// Create the sender a worker uses for `id`
    pub fn sender(&self, id: TaskId) -> ProgressSender {
        ProgressSender {
            id,
            tx: self.tx.clone(),
            sample: ProgressSample::default(),
        }
    }
}

/// Worker-side progress publisher for a single task
///
/// The completed count only ever grows: it is accumulated here rather than
/// taken from the caller, so the reporter never sees it go backwards.
#[derive(Debug)]
pub struct ProgressSender {
    id: TaskId,
    tx: mpsc::UnboundedSender<ProgressUpdate>,
    sample: ProgressSample,
}

impl ProgressSender {
    /// Task this sender publishes for
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Current cumulative sample
    pub fn sample(&self) -> ProgressSample {
        self.sample
    }

    /// Publish the opening sample once the declared size is known (0 if not)
    pub fn start(&mut self, total: Option<u64>) {
        self.sample = ProgressSample {
            completed_bytes: 0,
            total_bytes: total.unwrap_or(0),
        };
        self.publish(false);
    }

    /// Account for `bytes` more received bytes and publish the new total
    pub fn advance(&mut self, bytes: u64) {
        self.sample.completed_bytes = self.sample.completed_bytes.saturating_add(bytes);
        self.publish(false);
    }

    /// Publish the final sample of a finished transfer
    ///
    /// A transfer whose size was never declared is closed with
    /// `total = completed`. The update is marked closed, so an empty body
    /// (`0/0`) is still recognised as done.
    pub fn finish(&mut self) {
        if self.sample.total_bytes < self.sample.completed_bytes || self.sample.total_bytes == 0 {
            self.sample.total_bytes = self.sample.completed_bytes;
        }
        self.publish(true);
    }

    fn publish(&self, closed: bool) {
        // The reporter may already have stopped (failure, or an empty run); progress
        // is display-only, so a closed channel is not an error for the worker.
        self.tx
            .send(ProgressUpdate {
                id: self.id,
                sample: self.sample,
                closed,
            })
            .ok();
    }
}

/// Reporter-owned view of every active transfer
///
/// A missing entry means the task has not started yet or its row was already
/// hidden after completing.
#[derive(Debug, Default)]
pub struct ProgressTable {
    entries: BTreeMap<TaskId, Row>,
}

#[derive(Debug, Clone, Copy)]
struct Row {
    sample: ProgressSample,
    closed: bool,
}

impl ProgressTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest sample for a task
    pub fn apply(&mut self, update: ProgressUpdate) {
        self.entries.insert(
            update.id,
            Row {
                sample: update.sample,
                closed: update.closed,
            },
        );
    }

    /// Drain every pending update from `rx` without waiting
    ///
    /// Returns the number of updates applied.
    pub fn drain(&mut self, rx: &mut ProgressReceiver) -> usize {
        let mut applied = 0;
        while let Ok(update) = rx.try_recv() {
            self.apply(update);
            applied += 1;
        }
        applied
    }

    /// Hide rows whose transfer has received every declared byte or was closed
    ///
    /// Returns the ids that were removed. Removal is display-only; the worker
    /// may still be transcoding.
    pub fn prune_completed(&mut self) -> Vec<TaskId> {
        let done: Vec<TaskId> = self
            .entries
            .iter()
            .filter(|(_, row)| row.closed || row.sample.is_complete())
            .map(|(id, _)| *id)
            .collect();
        for id in &done {
            self.entries.remove(id);
        }
        done
    }

    /// Latest sample for a task, if it is still displayed
    pub fn get(&self, id: TaskId) -> Option<ProgressSample> {
        self.entries.get(&id).map(|row| row.sample)
    }

    /// Active rows ordered by task id
    pub fn iter(&self) -> impl Iterator<Item = (TaskId, ProgressSample)> + '_ {
        self.entries.iter().map(|(id, row)| (*id, row.sample))
    }

    /// Number of displayed rows
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no row is displayed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
