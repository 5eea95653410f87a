//! Core types for boyadl

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::utils::sanitize_file_name;

/// Identifier of a lesson task within one run
///
/// Ids are assigned in input order, starting at 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub usize);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One audio lesson: a display name and the URL its audio is served from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// Display name, also used for the output file name
    pub name: String,
    /// Source download URL
    pub url: String,
}

/// Insertion-ordered map from lesson name to source URL
///
/// Inserting a name that is already present replaces its URL in place,
/// so the last definition wins while the first position is kept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Lessons {
    entries: Vec<Lesson>,
}

impl Lessons {
    /// Create an empty lesson map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a lesson, replacing the URL of an existing lesson with the same name
    pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) {
        let name = name.into();
        let url = url.into();
        match self.entries.iter_mut().find(|l| l.name == name) {
            Some(existing) => existing.url = url,
            None => self.entries.push(Lesson { name, url }),
        }
    }

    /// Number of lessons
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no lessons
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a lesson's URL by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.url.as_str())
    }

    /// Iterate over lessons in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Lesson> {
        self.entries.iter()
    }

    /// Build one task per lesson, writing `<output_dir>/<name>.<extension>`
    ///
    /// Titles that sanitize to the same file name (compared case-insensitively)
    /// get a ` (2)`, ` (3)`, ... suffix in input order, so no two tasks share a
    /// destination.
    pub fn to_tasks(&self, output_dir: &Path, extension: &str) -> Vec<LessonTask> {
        let mut taken = HashSet::new();
        self.entries
            .iter()
            .enumerate()
            .map(|(index, lesson)| {
                let stem = sanitize_file_name(&lesson.name);
                let mut file_name = format!("{stem}.{extension}");
                let mut n = 2;
                while !taken.insert(file_name.to_lowercase()) {
                    file_name = format!("{stem} ({n}).{extension}");
                    n += 1;
                }
                LessonTask {
                    id: TaskId(index),
                    name: lesson.name.clone(),
                    source_url: lesson.url.clone(),
                    destination_path: output_dir.join(file_name),
                }
            })
            .collect()
    }
}

impl<N: Into<String>, U: Into<String>> FromIterator<(N, U)> for Lessons {
    fn from_iter<I: IntoIterator<Item = (N, U)>>(iter: I) -> Self {
        let mut lessons = Lessons::new();
        for (name, url) in iter {
            lessons.insert(name, url);
        }
        lessons
    }
}

impl<'a> IntoIterator for &'a Lessons {
    type Item = &'a Lesson;
    type IntoIter = std::slice::Iter<'a, Lesson>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The per-lesson unit of work, immutable once created
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LessonTask {
    /// Task identifier
    pub id: TaskId,
    /// Lesson display name
    pub name: String,
    /// URL the audio is streamed from
    pub source_url: String,
    /// Final location of the encoded file
    pub destination_path: PathBuf,
}

/// Byte progress of one transfer
///
/// `total_bytes == 0` means the size is not known (yet).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgressSample {
    /// Bytes received so far
    pub completed_bytes: u64,
    /// Declared size in bytes, 0 when unknown
    pub total_bytes: u64,
}

impl ProgressSample {
    /// Completed fraction in `0.0..=1.0`, or `None` while the total is unknown
    pub fn fraction(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return None;
        }
        Some((self.completed_bytes as f64 / self.total_bytes as f64).min(1.0))
    }

    /// Whether every declared byte has arrived
    pub fn is_complete(&self) -> bool {
        self.total_bytes > 0 && self.completed_bytes >= self.total_bytes
    }
}

/// Snapshot of the scheduler's overall progress
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OverallState {
    /// Number of tasks in this run
    pub total_tasks: usize,
    /// Number of tasks whose worker reached a terminal state
    pub finished_tasks: usize,
}

impl OverallState {
    /// Whether every task has finished
    pub fn is_done(&self) -> bool {
        self.finished_tasks >= self.total_tasks
    }
}
