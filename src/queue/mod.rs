pub mod store;

pub use store::{QueueStore, QUEUE_STORAGE_KEY};
