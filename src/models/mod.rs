pub mod enrichment;
pub mod task;

pub use enrichment::{AqiCategory, EnrichmentResult, FieldPatch};
pub use task::{Coordinates, EnrichmentTask, Queue, TaskKind};
