pub mod firestore;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::FieldPatch;

pub use firestore::FirestoreRecordStore;

/// System of record for trip updates. Only partial field updates are needed.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write the fields present in `patch` to record `record_id`, leaving every
    /// other field untouched.
    async fn patch_fields(&self, record_id: &str, patch: &FieldPatch) -> Result<()>;
}
