//! Queue task data models.
//!
//! An `EnrichmentTask` is created for every saved trip update and lives in the
//! persisted queue until a drain has attempted it.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// GPS position captured when the trip update was saved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// What a queued task asks the processor to do.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    EnrichMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentTask {
    /// Identity of this queue entry. Two tasks for the same record are distinct.
    pub task_id: String,
    pub record_id: String,
    pub coordinates: Coordinates,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    /// Logical enqueue order, strictly increasing within one queue.
    pub enqueued_at: u64,
    pub created_at: DateTime<Utc>,
}

/// Ordered list of pending tasks, oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Queue {
    tasks: Vec<EnrichmentTask>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnrichmentTask> {
        self.tasks.iter()
    }

    pub fn tasks(&self) -> &[EnrichmentTask] {
        &self.tasks
    }

    pub fn next_sequence(&self) -> u64 {
        self.tasks
            .iter()
            .map(|task| task.enqueued_at)
            .max()
            .map_or(1, |last| last + 1)
    }

    /// Builds the task that would be appended next for `record_id`.
    pub fn new_task(&self, record_id: String, coordinates: Coordinates) -> EnrichmentTask {
        EnrichmentTask {
            task_id: Uuid::new_v4().to_string(),
            record_id,
            coordinates,
            kind: TaskKind::EnrichMetadata,
            enqueued_at: self.next_sequence(),
            created_at: Utc::now(),
        }
    }

    /// Returns a copy with `task` appended at the tail.
    pub fn with_task(&self, task: EnrichmentTask) -> Self {
        let mut tasks = self.tasks.clone();
        tasks.push(task);
        Self { tasks }
    }

    /// Returns a copy without the tasks whose ids are in `processed`.
    pub fn without(&self, processed: &HashSet<String>) -> Self {
        Self {
            tasks: self
                .tasks
                .iter()
                .filter(|task| !processed.contains(&task.task_id))
                .cloned()
                .collect(),
        }
    }
}

/// Keeps the given order; position, not `enqueued_at`, decides drain order.
impl From<Vec<EnrichmentTask>> for Queue {
    fn from(tasks: Vec<EnrichmentTask>) -> Self {
        Self { tasks }
    }
}
