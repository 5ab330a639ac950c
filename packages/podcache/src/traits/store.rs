//! Storage traits for the central cache and per-consumer annotations.
//!
//! The storage layer is split into two focused traits:
//! - `PodcastCache`: the shared, cross-consumer canonical rows
//! - `AnnotationStore`: consumer-scoped derived analysis
//!
//! Implementations: `MemoryStore` (tests/development) and the Postgres
//! stores behind the `postgres` feature.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{
    Annotation, AnnotationInput, CacheStatistics, CachedPodcast, PodcastRecord,
};

/// The shared central cache, keyed by upstream identifier.
#[async_trait]
pub trait PodcastCache: Send + Sync {
    /// Fetch every row matching any of the given upstream identifiers.
    /// No ordering guarantee.
    async fn get_by_upstream_ids(&self, ids: &[String]) -> Result<Vec<CachedPodcast>>;

    /// Upsert one record. On conflict the whole snapshot is overwritten,
    /// `last_fetched_at` advances, and `fetch_count` increments. The
    /// store maintains its own counters; caller input never sets them.
    async fn upsert_one(&self, record: &PodcastRecord) -> Result<CachedPodcast>;

    /// Upsert many records in a single storage-layer call.
    ///
    /// On failure the whole batch must be treated as unpersisted; the
    /// error lists every attempted identifier so callers can retry.
    async fn upsert_batch(&self, records: &[PodcastRecord]) -> Result<Vec<CachedPodcast>>;

    /// Increment `cache_hit_count` for the given upstream identifiers.
    /// Returns the number of rows updated.
    async fn record_hits(&self, ids: &[String]) -> Result<u64>;

    /// Aggregate usage counters, with the fresh/stale split computed
    /// against the given window.
    async fn statistics(&self, stale_days: i64) -> Result<CacheStatistics>;

    /// Delete rows whose `last_fetched_at` is older than the horizon.
    /// Returns the number of rows removed.
    async fn sweep_older_than(&self, horizon_days: i64) -> Result<u64>;
}

/// Consumer-scoped annotations over canonical rows.
///
/// One logical table per consumer kind; implementations are constructed
/// already scoped to a kind, so every method only takes the consumer id.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Fetch the annotations a consumer has for any of the given rows.
    async fn get_for_consumer(
        &self,
        consumer_id: &str,
        podcast_ids: &[Uuid],
    ) -> Result<Vec<Annotation>>;

    /// True iff no annotation row exists for the pair, or one exists
    /// with `analyzed_at` unset.
    async fn needs_analysis(&self, consumer_id: &str, podcast_id: Uuid) -> Result<bool>;

    /// Upsert an annotation, always setting `analyzed_at = now()`.
    /// An input without analysis records an attempt that yielded nothing.
    async fn upsert(&self, input: &AnnotationInput) -> Result<Annotation>;

    /// Delete every annotation of this consumer whose podcast is NOT in
    /// the given set, keeping per-consumer state in sync with the
    /// consumer's editable source of truth. Returns rows removed.
    async fn retain_only(&self, consumer_id: &str, podcast_ids: &[Uuid]) -> Result<u64>;
}
