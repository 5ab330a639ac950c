//! Sync engine - the one orchestration behind every entry point.
//!
//! One invocation: resolve the requested identifiers against the central
//! cache, fetch only what is missing (bounded by the wall-clock budget),
//! flush fetched rows to the writer as a single batch, optionally run
//! per-consumer fit analysis inline, garbage-collect annotations for
//! identifiers the consumer no longer requests, and assemble the
//! response in requested order.
//!
//! The by-client, by-prospect, and outreach entry points all run this
//! engine; only the annotation store they pass in differs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::error::{CacheError, Result};
use crate::pipeline::{analyze, fetch, TimeBudget};
use crate::resolver::Resolver;
use crate::traits::{AnnotationStore, Directory, FitOracle, PodcastCache};
use crate::types::{
    AnnotatedPodcast, CachedPodcast, ConsumerProfile, SyncOutcome, SyncStats,
};

const DEFAULT_STALE_DAYS: i64 = 7;
const DEFAULT_FETCH_BATCH_SIZE: usize = 5;
const DEFAULT_CONCURRENT_BATCHES: usize = 3;
const DEFAULT_ANALYSIS_BATCH_SIZE: usize = 3;
const DEFAULT_TIME_BUDGET_SECS: u64 = 50;

/// Tunables for one engine instance.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Days before a cached row becomes a re-fetch candidate.
    pub stale_days: i64,
    /// Directory lookups per batch.
    pub fetch_batch_size: usize,
    /// Batches in flight at once (so up to batch x this lookups).
    pub concurrent_batches: usize,
    /// Oracle calls in flight at once.
    pub analysis_batch_size: usize,
    /// Wall-clock budget per invocation.
    pub time_budget: Duration,
    /// Also fetch demographics for every new podcast.
    pub fetch_demographics: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            stale_days: DEFAULT_STALE_DAYS,
            fetch_batch_size: DEFAULT_FETCH_BATCH_SIZE,
            concurrent_batches: DEFAULT_CONCURRENT_BATCHES,
            analysis_batch_size: DEFAULT_ANALYSIS_BATCH_SIZE,
            time_budget: Duration::from_secs(DEFAULT_TIME_BUDGET_SECS),
            fetch_demographics: true,
        }
    }
}

/// How one invocation should behave, derived from request flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Resolve and return counts only. No fetch, no writes.
    StatusOnly,
    /// Return cached rows with existing annotations. No fetch, no oracle.
    CacheOnly,
    /// Run fit analysis over cached rows that still need it.
    AnalysisOnly,
    /// Resolve, fetch missing, persist, optionally analyze, GC, assemble.
    Full {
        skip_analysis: bool,
        refresh_stale: bool,
    },
}

/// One sync invocation's input.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    /// Identifiers in presentation order; duplicates are dropped keeping
    /// the first occurrence.
    pub identifiers: Vec<String>,
    pub consumer: ConsumerProfile,
    pub mode: SyncMode,
}

/// The generic sync orchestration.
pub struct SyncEngine {
    store: Arc<dyn PodcastCache>,
    directory: Arc<dyn Directory>,
    oracle: Arc<dyn FitOracle>,
    resolver: Resolver,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn PodcastCache>,
        directory: Arc<dyn Directory>,
        oracle: Arc<dyn FitOracle>,
        config: SyncConfig,
    ) -> Self {
        let resolver = Resolver::new(store.clone());
        Self {
            store,
            directory,
            oracle,
            resolver,
            config,
        }
    }

    /// Run one invocation against the given (kind-scoped) annotation store.
    pub async fn run(
        &self,
        annotations: &dyn AnnotationStore,
        request: SyncRequest,
    ) -> Result<SyncOutcome> {
        let budget = TimeBudget::new(self.config.time_budget);
        let ids = dedup_preserving_order(request.identifiers);
        let total = ids.len();

        tracing::info!(
            consumer_id = %request.consumer.id,
            mode = ?request.mode,
            identifiers = total,
            "Starting sync invocation"
        );

        let resolved = self.resolver.resolve(&ids, self.config.stale_days).await?;

        let mut stats = SyncStats {
            cache_hits: resolved.fresh_count(),
            cache_misses: resolved.missing.len(),
            stale: resolved.stale.len(),
            ..SyncStats::default()
        };

        match request.mode {
            SyncMode::StatusOnly => Ok(SyncOutcome {
                podcasts: Vec::new(),
                total,
                cached: resolved.cached.len(),
                fetched: 0,
                stopped_early: false,
                remaining: resolved.missing.len(),
                stats,
            }),

            SyncMode::CacheOnly => {
                let podcasts = self
                    .annotate_rows(annotations, &request.consumer.id, resolved.cached)
                    .await?;
                let ordered = order_by_request(&ids, podcasts);
                Ok(SyncOutcome {
                    total,
                    cached: ordered.len(),
                    fetched: 0,
                    stopped_early: false,
                    remaining: resolved.missing.len(),
                    stats,
                    podcasts: ordered,
                })
            }

            SyncMode::AnalysisOnly => {
                let analysis = analyze::run(
                    &self.oracle,
                    annotations,
                    &request.consumer,
                    &resolved.cached,
                    &self.config,
                    &budget,
                )
                .await;
                stats.analyzed = analysis.analyzed;
                stats.analysis_failed = analysis.attempted_empty;
                stats.analysis_skipped = analysis.skipped;
                stats.analysis_remaining = analysis.remaining;

                let cached_count = resolved.cached.len();
                let podcasts = self
                    .annotate_rows(annotations, &request.consumer.id, resolved.cached)
                    .await?;
                Ok(SyncOutcome {
                    podcasts: order_by_request(&ids, podcasts),
                    total,
                    cached: cached_count,
                    fetched: 0,
                    stopped_early: analysis.stopped_early,
                    remaining: analysis.remaining,
                    stats,
                })
            }

            SyncMode::Full {
                skip_analysis,
                refresh_stale,
            } => {
                self.run_full(
                    annotations,
                    &request.consumer,
                    ids,
                    resolved,
                    stats,
                    skip_analysis,
                    refresh_stale,
                    budget,
                )
                .await
            }
        }
    }

    /// Drain pending hit events and stop the resolver's counter task.
    pub async fn shutdown(self) {
        self.resolver.shutdown().await;
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_full(
        &self,
        annotations: &dyn AnnotationStore,
        consumer: &ConsumerProfile,
        ids: Vec<String>,
        resolved: crate::types::ResolvedSet,
        mut stats: SyncStats,
        skip_analysis: bool,
        refresh_stale: bool,
        budget: TimeBudget,
    ) -> Result<SyncOutcome> {
        let total = ids.len();
        let cached_count = resolved.cached.len();

        let mut to_fetch = resolved.missing.clone();
        if refresh_stale {
            to_fetch.extend(resolved.stale.iter().cloned());
        }

        let fetched = fetch::run(&self.directory, &to_fetch, &self.config, &budget).await;
        let mut stopped_early = fetched.stopped_early;
        let mut remaining = fetched.remaining;
        stats.fetch_failed = fetched.failed.len();

        // Flush everything the loop fetched as ONE batch write. A failed
        // batch is wholly unpersisted: those identifiers are reported as
        // remaining (reduced counts) and retried by the next invocation.
        let mut new_rows: Vec<CachedPodcast> = Vec::new();
        if !fetched.records.is_empty() {
            match self.store.upsert_batch(&fetched.records).await {
                Ok(rows) => new_rows = rows,
                Err(CacheError::BatchWrite { identifiers, source }) => {
                    tracing::error!(
                        error = %source,
                        count = identifiers.len(),
                        "Batch upsert failed; fetched rows not persisted this invocation"
                    );
                    remaining += identifiers.len();
                }
                Err(e) => return Err(e),
            }
        }
        stats.fetched = new_rows.len();

        if !skip_analysis && !new_rows.is_empty() {
            let analysis = analyze::run(
                &self.oracle,
                annotations,
                consumer,
                &new_rows,
                &self.config,
                &budget,
            )
            .await;
            stats.analyzed = analysis.analyzed;
            stats.analysis_failed = analysis.attempted_empty;
            stats.analysis_skipped = analysis.skipped;
            stats.analysis_remaining = analysis.remaining;
            stopped_early = stopped_early || analysis.stopped_early;
        }

        // Newer rows win: a refreshed stale row replaces its cached copy.
        let mut by_upstream: HashMap<String, CachedPodcast> = HashMap::new();
        for row in resolved.cached {
            by_upstream.insert(row.upstream_id().to_string(), row);
        }
        for row in new_rows {
            by_upstream.insert(row.upstream_id().to_string(), row);
        }

        // The range store is the consumer's source of truth: annotations
        // for rows no longer requested are removed. Best-effort - a GC
        // failure never fails the invocation.
        let keep: Vec<Uuid> = by_upstream.values().map(|row| row.id).collect();
        match annotations.retain_only(&consumer.id, &keep).await {
            Ok(removed) => stats.annotations_removed = removed as usize,
            Err(e) => {
                tracing::warn!(consumer_id = %consumer.id, error = %e, "Annotation GC failed");
            }
        }

        let rows: Vec<CachedPodcast> = by_upstream.into_values().collect();
        let fetched_count = stats.fetched;
        let podcasts = self.annotate_rows(annotations, &consumer.id, rows).await?;
        let ordered = order_by_request(&ids, podcasts);

        tracing::info!(
            consumer_id = %consumer.id,
            total,
            cached = cached_count,
            fetched = fetched_count,
            remaining,
            stopped_early,
            elapsed_ms = budget.elapsed().as_millis() as u64,
            "Sync invocation finished"
        );

        Ok(SyncOutcome {
            podcasts: ordered,
            total,
            cached: cached_count,
            fetched: fetched_count,
            stopped_early,
            remaining,
            stats,
        })
    }

    /// Merge whatever annotations exist onto the rows.
    async fn annotate_rows(
        &self,
        annotations: &dyn AnnotationStore,
        consumer_id: &str,
        rows: Vec<CachedPodcast>,
    ) -> Result<Vec<AnnotatedPodcast>> {
        let row_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let existing = annotations.get_for_consumer(consumer_id, &row_ids).await?;
        let mut by_podcast: HashMap<Uuid, crate::types::Annotation> = existing
            .into_iter()
            .map(|annotation| (annotation.podcast_id, annotation))
            .collect();

        Ok(rows
            .into_iter()
            .map(|podcast| {
                let analysis = by_podcast.remove(&podcast.id);
                AnnotatedPodcast { podcast, analysis }
            })
            .collect())
    }
}

/// Drop duplicate identifiers, keeping first occurrence order.
fn dedup_preserving_order(ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter()
        .filter(|id| !id.trim().is_empty())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Re-impose the requested identifier order on the assembled rows.
fn order_by_request(ids: &[String], podcasts: Vec<AnnotatedPodcast>) -> Vec<AnnotatedPodcast> {
    let mut by_upstream: HashMap<String, AnnotatedPodcast> = podcasts
        .into_iter()
        .map(|p| (p.podcast.upstream_id().to_string(), p))
        .collect();

    ids.iter()
        .filter_map(|id| by_upstream.remove(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use crate::testing::{podcast_record, podcast_snapshot, MockDirectory, MockOracle};

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn consumer() -> ConsumerProfile {
        ConsumerProfile::new("client-1", "Dana Smith", "Fractional CFO for SaaS startups")
    }

    fn engine_with(
        store: Arc<MemoryStore>,
        directory: MockDirectory,
        oracle: MockOracle,
    ) -> SyncEngine {
        SyncEngine::new(
            store,
            Arc::new(directory),
            Arc::new(oracle),
            SyncConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_full_mode_fetches_only_missing_and_preserves_order() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_one(&podcast_record("pA")).await.unwrap();
        store.upsert_one(&podcast_record("pB")).await.unwrap();

        let directory = MockDirectory::new()
            .with_podcast(podcast_snapshot("pC", "Podcast C"));
        let engine = engine_with(store.clone(), directory, MockOracle::new());
        let annotations = MemoryStore::new();

        let outcome = engine
            .run(
                &annotations,
                SyncRequest {
                    identifiers: ids(&["pC", "pA", "pB"]),
                    consumer: consumer(),
                    mode: SyncMode::Full {
                        skip_analysis: true,
                        refresh_stale: false,
                    },
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.cached, 2);
        assert_eq!(outcome.fetched, 1);
        assert!(!outcome.stopped_early);
        assert_eq!(outcome.remaining, 0);
        let order: Vec<&str> = outcome
            .podcasts
            .iter()
            .map(|p| p.podcast.upstream_id())
            .collect();
        assert_eq!(order, vec!["pC", "pA", "pB"]);

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_example_scenario_stale_row_served_not_refetched() {
        // Cache: p1 fetched 1 day ago, p2 fetched 10 days ago; request
        // [p1, p2, p3] with a 7-day window.
        let store = Arc::new(MemoryStore::new());
        store.upsert_one(&podcast_record("p1")).await.unwrap();
        store.upsert_one(&podcast_record("p2")).await.unwrap();
        store.age_podcast("p1", 1);
        store.age_podcast("p2", 10);

        let directory = MockDirectory::new()
            .with_podcast(podcast_snapshot("p3", "Podcast Three"));
        let engine = engine_with(store.clone(), directory, MockOracle::new());
        let annotations = MemoryStore::new();

        let outcome = engine
            .run(
                &annotations,
                SyncRequest {
                    identifiers: ids(&["p1", "p2", "p3"]),
                    consumer: consumer(),
                    mode: SyncMode::Full {
                        skip_analysis: true,
                        refresh_stale: false,
                    },
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.cached, 2);
        assert_eq!(outcome.fetched, 1);
        assert_eq!(outcome.stats.stale, 1);
        assert_eq!(outcome.stats.cache_hits, 1);
        let order: Vec<&str> = outcome
            .podcasts
            .iter()
            .map(|p| p.podcast.upstream_id())
            .collect();
        assert_eq!(order, vec!["p1", "p2", "p3"]);
        // p2 stayed stale-but-served: exactly one fetch ever recorded.
        assert_eq!(store.fetch_count("p2"), 1);

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_refresh_stale_refetches_stale_rows() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_one(&podcast_record("p1")).await.unwrap();
        store.age_podcast("p1", 30);

        let directory = MockDirectory::new()
            .with_podcast(podcast_snapshot("p1", "Podcast One, refreshed"));
        let engine = engine_with(store.clone(), directory, MockOracle::new());
        let annotations = MemoryStore::new();

        let outcome = engine
            .run(
                &annotations,
                SyncRequest {
                    identifiers: ids(&["p1"]),
                    consumer: consumer(),
                    mode: SyncMode::Full {
                        skip_analysis: true,
                        refresh_stale: true,
                    },
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.fetched, 1);
        assert_eq!(store.fetch_count("p1"), 2);
        assert_eq!(
            outcome.podcasts[0].podcast.snapshot.name.as_deref(),
            Some("Podcast One, refreshed")
        );

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_status_only_neither_fetches_nor_writes() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_one(&podcast_record("p1")).await.unwrap();

        let directory = MockDirectory::new();
        let engine = engine_with(store.clone(), directory, MockOracle::new());
        let annotations = MemoryStore::new();

        let outcome = engine
            .run(
                &annotations,
                SyncRequest {
                    identifiers: ids(&["p1", "p2"]),
                    consumer: consumer(),
                    mode: SyncMode::StatusOnly,
                },
            )
            .await
            .unwrap();

        assert!(outcome.podcasts.is_empty());
        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.cached, 1);
        assert_eq!(outcome.remaining, 1);
        // Nothing was fetched or upserted beyond the seed row.
        assert_eq!(store.fetch_count("p1"), 1);

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_cache_only_returns_rows_without_directory_calls() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_one(&podcast_record("p1")).await.unwrap();

        let directory = MockDirectory::new();
        let engine = engine_with(store.clone(), directory, MockOracle::new());
        let annotations = MemoryStore::new();

        let outcome = engine
            .run(
                &annotations,
                SyncRequest {
                    identifiers: ids(&["p1", "p2"]),
                    consumer: consumer(),
                    mode: SyncMode::CacheOnly,
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.podcasts.len(), 1);
        assert_eq!(outcome.podcasts[0].podcast.upstream_id(), "p1");
        assert_eq!(outcome.remaining, 1);

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_analysis_only_annotates_cached_rows() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_one(&podcast_record("p1")).await.unwrap();
        store.upsert_one(&podcast_record("p2")).await.unwrap();

        let oracle = MockOracle::new();
        let engine = SyncEngine::new(
            store.clone(),
            Arc::new(MockDirectory::new()),
            Arc::new(oracle),
            SyncConfig::default(),
        );
        let annotations = MemoryStore::new();

        let outcome = engine
            .run(
                &annotations,
                SyncRequest {
                    identifiers: ids(&["p1", "p2"]),
                    consumer: consumer(),
                    mode: SyncMode::AnalysisOnly,
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.stats.analyzed, 2);
        assert!(outcome.podcasts.iter().all(|p| p.analysis.is_some()));

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_full_mode_gc_removes_unrequested_annotations() {
        let store = Arc::new(MemoryStore::new());
        let old = store.upsert_one(&podcast_record("p_old")).await.unwrap();
        store.upsert_one(&podcast_record("p1")).await.unwrap();

        let annotations = MemoryStore::new();
        annotations
            .upsert(&crate::types::AnnotationInput::new("client-1", old.id))
            .await
            .unwrap();

        let engine = engine_with(store.clone(), MockDirectory::new(), MockOracle::new());

        let outcome = engine
            .run(
                &annotations,
                SyncRequest {
                    identifiers: ids(&["p1"]),
                    consumer: consumer(),
                    mode: SyncMode::Full {
                        skip_analysis: true,
                        refresh_stale: false,
                    },
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.stats.annotations_removed, 1);
        let left = annotations
            .get_for_consumer("client-1", &[old.id])
            .await
            .unwrap();
        assert!(left.is_empty());

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_duplicate_identifiers_collapse() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_one(&podcast_record("p1")).await.unwrap();

        let engine = engine_with(store.clone(), MockDirectory::new(), MockOracle::new());
        let annotations = MemoryStore::new();

        let outcome = engine
            .run(
                &annotations,
                SyncRequest {
                    identifiers: ids(&["p1", "p1", "", "p1"]),
                    consumer: consumer(),
                    mode: SyncMode::CacheOnly,
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.total, 1);
        assert_eq!(outcome.podcasts.len(), 1);

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_batch_write_failure_reports_reduced_counts() {
        let store = Arc::new(MemoryStore::new().fail_batch_writes());
        let directory = MockDirectory::new()
            .with_podcast(podcast_snapshot("p1", "Podcast One"))
            .with_podcast(podcast_snapshot("p2", "Podcast Two"));
        let engine = engine_with(store.clone(), directory, MockOracle::new());
        let annotations = MemoryStore::new();

        let outcome = engine
            .run(
                &annotations,
                SyncRequest {
                    identifiers: ids(&["p1", "p2"]),
                    consumer: consumer(),
                    mode: SyncMode::Full {
                        skip_analysis: true,
                        refresh_stale: false,
                    },
                },
            )
            .await
            .unwrap();

        // The whole batch counts as unpersisted: nothing reported fetched,
        // both identifiers remain for the next invocation.
        assert_eq!(outcome.fetched, 0);
        assert_eq!(outcome.remaining, 2);
        assert!(outcome.podcasts.is_empty());

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_inline_analysis_runs_for_newly_fetched_rows() {
        let store = Arc::new(MemoryStore::new());
        let directory = MockDirectory::new()
            .with_podcast(podcast_snapshot("p1", "Podcast One"));
        let oracle = Arc::new(MockOracle::new());
        let engine = SyncEngine::new(
            store.clone(),
            Arc::new(directory),
            oracle.clone(),
            SyncConfig::default(),
        );
        let annotations = MemoryStore::new();

        let outcome = engine
            .run(
                &annotations,
                SyncRequest {
                    identifiers: ids(&["p1"]),
                    consumer: consumer(),
                    mode: SyncMode::Full {
                        skip_analysis: false,
                        refresh_stale: false,
                    },
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.stats.analyzed, 1);
        assert_eq!(oracle.call_count(), 1);
        assert!(outcome.podcasts[0].analysis.is_some());

        engine.shutdown().await;
    }
}
