pub mod client;
pub mod responses;

use async_trait::async_trait;

use crate::models::{Coordinates, EnrichmentResult};

pub use client::EnrichmentClient;

/// Produces whatever metadata can be found for a coordinate pair. Never fails:
/// a lookup that cannot answer leaves its field empty.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, coordinates: Coordinates) -> EnrichmentResult;
}
