//! Outcome types returned by the resolver, pipeline loops, and sync engine.

use serde::Serialize;

use super::annotation::Annotation;
use super::podcast::{CachedPodcast, PodcastRecord};

/// The resolver's partition of a requested identifier set.
///
/// `cached` holds every row found regardless of freshness; `stale` lists
/// the subset of found identifiers past the staleness window; `missing`
/// lists identifiers with no row at all. No ordering is guaranteed -
/// callers re-impose their own request order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSet {
    pub cached: Vec<CachedPodcast>,
    pub missing: Vec<String>,
    pub stale: Vec<String>,
}

impl ResolvedSet {
    /// Count of found rows within the staleness window.
    pub fn fresh_count(&self) -> usize {
        self.cached.len() - self.stale.len()
    }
}

/// Result of one bounded-time fetch loop run.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Successfully fetched records, not yet persisted.
    pub records: Vec<PodcastRecord>,
    /// Identifiers whose fetch failed this invocation (dropped, not retried).
    pub failed: Vec<String>,
    /// True when the wall-clock budget ran out before all identifiers
    /// were attempted.
    pub stopped_early: bool,
    /// Exact count of identifiers never attempted.
    pub remaining: usize,
}

/// Result of one bounded-time analysis loop run.
#[derive(Debug, Default)]
pub struct AnalyzeOutcome {
    /// Pairs analyzed with a usable oracle response.
    pub analyzed: usize,
    /// Pairs marked attempted with an empty payload (oracle failure or
    /// unparseable output).
    pub attempted_empty: usize,
    /// Pairs skipped because analysis was already complete.
    pub skipped: usize,
    pub stopped_early: bool,
    /// Exact count of pairs never attempted.
    pub remaining: usize,
}

/// A cached podcast merged with whatever annotation exists for the
/// requesting consumer.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedPodcast {
    #[serde(flatten)]
    pub podcast: CachedPodcast,
    pub analysis: Option<Annotation>,
}

/// Per-invocation counters returned to the caller.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub stale: usize,
    pub fetched: usize,
    pub fetch_failed: usize,
    pub analyzed: usize,
    pub analysis_failed: usize,
    pub analysis_skipped: usize,
    pub analysis_remaining: usize,
    pub annotations_removed: usize,
}

/// The full result of one sync invocation.
///
/// `stopped_early`/`remaining` model time-boxed partial completion as a
/// first-class outcome: the caller re-invokes the same operation to
/// continue, and already-processed identifiers resolve as cache hits.
#[derive(Debug, Default, Serialize)]
pub struct SyncOutcome {
    /// Rows in requested-identifier order (first occurrence).
    pub podcasts: Vec<AnnotatedPodcast>,
    /// Distinct identifiers requested.
    pub total: usize,
    /// Rows served from the cache.
    pub cached: usize,
    /// Rows fetched from the directory AND persisted this invocation.
    pub fetched: usize,
    pub stopped_early: bool,
    /// Identifiers left unprocessed (time-box or unpersisted batch).
    pub remaining: usize,
    pub stats: SyncStats,
}

/// Aggregate usage counters for the whole cache, served read-only.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatistics {
    pub total_podcasts: i64,
    pub total_fetches: i64,
    pub total_cache_hits: i64,
    pub with_demographics: i64,
    /// Rows within the staleness window used for the query.
    pub fresh: i64,
    /// Rows past the staleness window.
    pub stale: i64,
}
