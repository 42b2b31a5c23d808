//! Durable queue of pending enrichment tasks.
//!
//! The whole queue is stored as one JSON array under [`QUEUE_STORAGE_KEY`].
//! Every mutation is written to disk first; the in-memory mirror only changes
//! once that write has returned successfully. The stored order is the drain
//! order.

use std::{collections::HashSet, sync::Arc};

use anyhow::{Context, Result};
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    db::Database,
    models::{Coordinates, EnrichmentTask, Queue},
};

pub const QUEUE_STORAGE_KEY: &str = "offline_queue";

#[derive(Default)]
struct Mirror {
    queue: Queue,
    /// Set once the persisted queue has been read into `queue`. Nothing is
    /// derived from the mirror before that.
    loaded: bool,
}

#[derive(Clone)]
pub struct QueueStore {
    db: Database,
    mirror: Arc<Mutex<Mirror>>,
}

impl QueueStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            mirror: Arc::new(Mutex::new(Mirror::default())),
        }
    }

    /// Read the persisted queue and refresh the mirror. Empty when nothing was
    /// ever stored.
    pub async fn load(&self) -> Result<Queue> {
        let mut mirror = self.mirror.lock().await;
        let queue = self.read_persisted().await?;
        mirror.queue = queue.clone();
        mirror.loaded = true;
        Ok(queue)
    }

    /// Durably add `task` at the tail and return the full queue. The task is
    /// stamped with the next sequence number so its recorded order matches
    /// its position.
    pub async fn append(&self, mut task: EnrichmentTask) -> Result<Queue> {
        let mut mirror = self.loaded_mirror().await?;
        task.enqueued_at = mirror.queue.next_sequence();
        let next = mirror.queue.with_task(task);
        self.write_persisted(&next).await?;
        mirror.queue = next.clone();
        Ok(next)
    }

    /// Create a task for `record_id` with the next sequence number and append it.
    pub async fn enqueue(
        &self,
        record_id: impl Into<String>,
        coordinates: Coordinates,
    ) -> Result<EnrichmentTask> {
        let mut mirror = self.loaded_mirror().await?;
        let task = mirror.queue.new_task(record_id.into(), coordinates);
        let next = mirror.queue.with_task(task.clone());
        self.write_persisted(&next).await?;
        mirror.queue = next;
        Ok(task)
    }

    /// Atomically overwrite the persisted queue.
    pub async fn replace(&self, new_queue: Queue) -> Result<()> {
        let mut mirror = self.mirror.lock().await;
        self.write_persisted(&new_queue).await?;
        mirror.queue = new_queue;
        mirror.loaded = true;
        Ok(())
    }

    /// Drop the tasks named in `processed`, keeping anything appended since the
    /// caller took its snapshot. Returns the remaining queue.
    pub async fn remove_processed(&self, processed: &HashSet<String>) -> Result<Queue> {
        let mut mirror = self.loaded_mirror().await?;
        if processed.is_empty() {
            return Ok(mirror.queue.clone());
        }
        let next = mirror.queue.without(processed);
        self.write_persisted(&next).await?;
        mirror.queue = next.clone();
        Ok(next)
    }

    /// Last committed state, without touching disk. Empty until the first
    /// load or mutation.
    pub async fn snapshot(&self) -> Queue {
        self.mirror.lock().await.queue.clone()
    }

    async fn loaded_mirror(&self) -> Result<MutexGuard<'_, Mirror>> {
        let mut mirror = self.mirror.lock().await;
        if !mirror.loaded {
            mirror.queue = self.read_persisted().await?;
            mirror.loaded = true;
        }
        Ok(mirror)
    }

    async fn read_persisted(&self) -> Result<Queue> {
        match self.db.get_value(QUEUE_STORAGE_KEY).await? {
            Some(raw) => {
                let tasks: Vec<EnrichmentTask> =
                    serde_json::from_str(&raw).context("persisted queue is not valid JSON")?;
                Ok(Queue::from(tasks))
            }
            None => Ok(Queue::new()),
        }
    }

    async fn write_persisted(&self, queue: &Queue) -> Result<()> {
        let raw = serde_json::to_string(queue).context("failed to serialize queue")?;
        self.db
            .put_value(QUEUE_STORAGE_KEY, raw)
            .await
            .context("failed to persist queue")
    }
}
