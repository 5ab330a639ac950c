//! Upstream directory abstraction.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DemographicsSnapshot, PodcastSnapshot};

/// The external podcast directory.
///
/// Implementations issue one HTTP request per call and carry no retry
/// logic of their own; a failed lookup is retried only by a future
/// invocation of the whole sync operation.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Fetch one podcast's descriptive snapshot.
    async fn fetch_podcast(&self, upstream_id: &str) -> Result<PodcastSnapshot>;

    /// Fetch audience demographics; `None` when the directory has none.
    async fn fetch_demographics(&self, upstream_id: &str)
        -> Result<Option<DemographicsSnapshot>>;
}
