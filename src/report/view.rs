//! Rendering targets for the reporter

use std::collections::HashMap;
use std::io::{self, Write};

use indicatif::{HumanBytes, MultiProgress, ProgressBar, ProgressStyle};

use super::{ReportFrame, ReportOutcome};
use crate::types::{ProgressSample, TaskId};

const OVERALL_TEMPLATE: &str = "{pos}/{len} [{bar:40.cyan/blue}] {elapsed_precise}";
const HEADER_TEMPLATE: &str = "{spinner:.blue} {msg}";
const ROW_TEMPLATE: &str =
    "{msg:30} {percent:>3}% [{bar:30.green/white}] {bytes}/{total_bytes} {bytes_per_sec}";
const ROW_SPINNER_TEMPLATE: &str = "{msg:30} {spinner:.yellow} {bytes} {bytes_per_sec}";

/// Something the reporter can draw frames on
pub trait ReportView: Send {
    /// Draw one refresh
    fn render(&mut self, frame: &ReportFrame);

    /// Called exactly once when the reporter stops
    fn finish(&mut self, outcome: ReportOutcome);
}

/// Rounded completion percentage, `None` while the total is unknown
pub fn percent(sample: &ProgressSample) -> Option<u8> {
    sample
        .fraction()
        .map(|fraction| (fraction * 100.0).round() as u8)
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Log sink that hides the bars of a [`MultiProgress`] while a line is written
///
/// Without a bar set it writes straight through.
#[derive(Debug)]
pub struct SuspendingWriter<W> {
    multi: Option<MultiProgress>,
    inner: W,
}

impl<W> SuspendingWriter<W> {
    /// Wrap `inner`, pausing `multi` (if any) around every write
    pub fn new(multi: Option<MultiProgress>, inner: W) -> Self {
        Self { multi, inner }
    }

    /// The wrapped sink
    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}

impl<W: Write> Write for SuspendingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = &mut self.inner;
        match &self.multi {
            Some(multi) => multi.suspend(|| inner.write_all(buf))?,
            None => inner.write_all(buf)?,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let inner = &mut self.inner;
        match &self.multi {
            Some(multi) => multi.suspend(|| inner.flush()),
            None => inner.flush(),
        }
    }
}

struct Row {
    bar: ProgressBar,
    determinate: bool,
}

/// Terminal view: a header, an overall bar and one bar per active transfer
///
/// Bars are drawn on stderr; indicatif skips drawing when stderr is not a terminal.
pub struct IndicatifView {
    multi: MultiProgress,
    header: ProgressBar,
    overall: ProgressBar,
    rows: HashMap<TaskId, Row>,
}

impl IndicatifView {
    /// Create the view for a run of `total_tasks` lessons
    pub fn new(total_tasks: usize) -> Self {
        Self::with_multi_progress(MultiProgress::new(), total_tasks)
    }

    /// Create the view on an existing bar set
    ///
    /// Share `multi` with a [`SuspendingWriter`] so log lines do not tear the bars.
    pub fn with_multi_progress(multi: MultiProgress, total_tasks: usize) -> Self {
        let header = multi.add(ProgressBar::new_spinner());
        header.set_style(style(HEADER_TEMPLATE));
        header.set_message(format!("Downloading {} files", total_tasks));

        let overall = multi.add(ProgressBar::new(total_tasks as u64));
        overall.set_style(style(OVERALL_TEMPLATE).progress_chars("=> "));

        Self {
            multi,
            header,
            overall,
            rows: HashMap::new(),
        }
    }

    fn row(&mut self, id: TaskId, name: &str) -> &mut Row {
        let multi = &self.multi;
        self.rows.entry(id).or_insert_with(|| {
            let bar = multi.add(ProgressBar::new_spinner());
            bar.set_style(style(ROW_SPINNER_TEMPLATE));
            bar.set_message(name.to_string());
            Row {
                bar,
                determinate: false,
            }
        })
    }
}

impl ReportView for IndicatifView {
    fn render(&mut self, frame: &ReportFrame) {
        self.header.tick();
        self.overall.set_length(frame.overall.total_tasks as u64);
        self.overall.set_position(frame.overall.finished_tasks as u64);

        for task in &frame.rows {
            let row = self.row(task.id, &task.name);
            let known = task.sample.total_bytes > 0;
            if known && !row.determinate {
                row.bar.set_style(style(ROW_TEMPLATE).progress_chars("=> "));
                row.determinate = true;
            }
            if known {
                row.bar.set_length(task.sample.total_bytes);
            } else {
                row.bar.tick();
            }
            row.bar.set_position(task.sample.completed_bytes);
        }

        let gone: Vec<TaskId> = self
            .rows
            .keys()
            .filter(|id| !frame.rows.iter().any(|row| row.id == **id))
            .copied()
            .collect();
        for id in gone {
            if let Some(row) = self.rows.remove(&id) {
                row.bar.finish_and_clear();
                self.multi.remove(&row.bar);
            }
        }
    }

    fn finish(&mut self, _outcome: ReportOutcome) {
        for (_, row) in self.rows.drain() {
            row.bar.finish_and_clear();
        }
        self.overall.finish_and_clear();
        self.header.finish_and_clear();
        self.multi.clear().ok();
    }
}

/// Log-line view for non-interactive output
///
/// Emits a line when a transfer starts, when its percentage crosses a
/// quarter mark and whenever the finished count changes.
#[derive(Debug, Default)]
pub struct LogView {
    finished: usize,
    quarters: HashMap<TaskId, u8>,
}

impl LogView {
    /// Create an empty log view
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportView for LogView {
    fn render(&mut self, frame: &ReportFrame) {
        for row in &frame.rows {
            let quarter = percent(&row.sample).map(|p| p / 25).unwrap_or(0);
            match self.quarters.get(&row.id) {
                None => {
                    tracing::info!(
                        task_id = %row.id,
                        lesson = %row.name,
                        size = %HumanBytes(row.sample.total_bytes),
                        "Download started"
                    );
                }
                Some(&last) if quarter > last => {
                    tracing::info!(
                        task_id = %row.id,
                        lesson = %row.name,
                        percent = quarter * 25,
                        received = %HumanBytes(row.sample.completed_bytes),
                        "Download progress"
                    );
                }
                Some(_) => continue,
            }
            self.quarters.insert(row.id, quarter);
        }

        if frame.overall.finished_tasks != self.finished {
            self.finished = frame.overall.finished_tasks;
            tracing::info!(
                finished = frame.overall.finished_tasks,
                total = frame.overall.total_tasks,
                "Lessons finished"
            );
        }
    }

    fn finish(&mut self, outcome: ReportOutcome) {
        match outcome {
            ReportOutcome::Completed => tracing::debug!("All lessons finished"),
            ReportOutcome::Aborted => tracing::warn!("Stopping progress output after a failure"),
        }
    }
}
