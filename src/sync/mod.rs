pub mod controller;
pub mod processor;

pub use controller::{SyncController, SyncStatus};
pub use processor::{
    DrainOutcome, DrainReport, QueueProcessor, RetirePolicy, TaskOutcome, WeakQueueProcessor,
};
