//! Cache resolver - partitions requested identifiers and records hits.
//!
//! The resolver answers one question: of the identifiers a caller wants,
//! which are already cached (and how fresh), and which must be fetched?
//! Rows found within the staleness window additionally count as cache
//! hits. Hit counting is best-effort and asynchronous: the read path
//! emits a "hits observed" event to a background counter task and never
//! waits on it, so a failed increment can only ever cost a counter tick,
//! not a response.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::traits::PodcastCache;
use crate::types::ResolvedSet;

/// Background counter-update task fed by resolver reads.
///
/// Cloning shares the same channel. `shutdown` drains pending events -
/// the server calls it on graceful stop, and tests use it to observe
/// eventual counter state deterministically.
pub struct HitRecorder {
    tx: mpsc::UnboundedSender<Vec<String>>,
    handle: Option<JoinHandle<()>>,
}

impl HitRecorder {
    /// Spawn the counter task over the given store.
    pub fn spawn(store: Arc<dyn PodcastCache>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<String>>();

        let handle = tokio::spawn(async move {
            while let Some(ids) = rx.recv().await {
                match store.record_hits(&ids).await {
                    Ok(updated) => {
                        tracing::debug!(hits = updated, "Recorded cache hits");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, count = ids.len(), "Failed to record cache hits");
                    }
                }
            }
        });

        Self {
            tx,
            handle: Some(handle),
        }
    }

    /// Report observed hits. Never blocks; a closed channel is logged
    /// and ignored.
    pub fn observe(&self, ids: Vec<String>) {
        if ids.is_empty() {
            return;
        }
        if self.tx.send(ids).is_err() {
            tracing::warn!("Hit recorder channel closed; dropping hit events");
        }
    }

    /// Close the channel and wait for pending increments to drain.
    pub async fn shutdown(mut self) {
        drop(self.tx);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Hit recorder task panicked");
            }
        }
    }
}

/// Resolver over a shared cache store.
pub struct Resolver {
    store: Arc<dyn PodcastCache>,
    recorder: HitRecorder,
}

impl Resolver {
    pub fn new(store: Arc<dyn PodcastCache>) -> Self {
        let recorder = HitRecorder::spawn(store.clone());
        Self { store, recorder }
    }

    /// Partition the requested identifiers into cached / missing / stale.
    ///
    /// `cached` contains every found row regardless of freshness; `stale`
    /// names the found rows past the window (re-fetch candidates, still
    /// served); `missing` the identifiers with no row. For every found
    /// row inside the window a hit event is emitted, fire-and-forget.
    pub async fn resolve(&self, ids: &[String], stale_days: i64) -> Result<ResolvedSet> {
        if ids.is_empty() {
            return Ok(ResolvedSet::default());
        }

        let cached = self.store.get_by_upstream_ids(ids).await?;

        let mut found: std::collections::HashSet<&str> = std::collections::HashSet::new();
        let mut stale = Vec::new();
        let mut hits = Vec::new();

        for row in &cached {
            found.insert(row.upstream_id());
            if row.is_stale(stale_days) {
                stale.push(row.upstream_id().to_string());
            } else {
                hits.push(row.upstream_id().to_string());
            }
        }

        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !found.contains(id.as_str()))
            .cloned()
            .collect();

        tracing::debug!(
            requested = ids.len(),
            cached = cached.len(),
            missing = missing.len(),
            stale = stale.len(),
            "Resolved identifier set"
        );

        self.recorder.observe(hits);

        Ok(ResolvedSet {
            cached,
            missing,
            stale,
        })
    }

    /// Drain pending hit events and stop the counter task.
    pub async fn shutdown(self) {
        self.recorder.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use crate::testing::podcast_record;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_partition_covers_input_without_overlap() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_one(&podcast_record("p1")).await.unwrap();
        store.upsert_one(&podcast_record("p2")).await.unwrap();

        let resolver = Resolver::new(store);
        let requested = ids(&["p1", "p2", "p3", "p4"]);
        let resolved = resolver.resolve(&requested, 7).await.unwrap();

        let mut covered: Vec<String> = resolved
            .cached
            .iter()
            .map(|p| p.upstream_id().to_string())
            .chain(resolved.missing.iter().cloned())
            .collect();
        covered.sort();

        assert_eq!(covered, ids(&["p1", "p2", "p3", "p4"]));
        assert!(resolved.stale.is_empty());
        resolver.shutdown().await;
    }

    #[tokio::test]
    async fn test_stale_rows_are_served_and_flagged() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_one(&podcast_record("p1")).await.unwrap();
        store.upsert_one(&podcast_record("p2")).await.unwrap();
        store.age_podcast("p2", 10);

        let resolver = Resolver::new(store);
        let resolved = resolver.resolve(&ids(&["p1", "p2", "p3"]), 7).await.unwrap();

        assert_eq!(resolved.cached.len(), 2);
        assert_eq!(resolved.missing, ids(&["p3"]));
        assert_eq!(resolved.stale, ids(&["p2"]));
        assert_eq!(resolved.fresh_count(), 1);
        resolver.shutdown().await;
    }

    #[tokio::test]
    async fn test_hit_counter_increments_only_for_fresh_rows() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_one(&podcast_record("p1")).await.unwrap();
        store.upsert_one(&podcast_record("p2")).await.unwrap();
        store.age_podcast("p2", 10);

        let resolver = Resolver::new(store.clone());
        for _ in 0..3 {
            resolver.resolve(&ids(&["p1", "p2"]), 7).await.unwrap();
        }
        // Drain the fire-and-forget increments before asserting.
        resolver.shutdown().await;

        assert_eq!(store.hit_count("p1"), 3);
        assert_eq!(store.hit_count("p2"), 0);
    }

    #[tokio::test]
    async fn test_empty_input_resolves_empty() {
        let store = Arc::new(MemoryStore::new());
        let resolver = Resolver::new(store);

        let resolved = resolver.resolve(&[], 7).await.unwrap();
        assert!(resolved.cached.is_empty());
        assert!(resolved.missing.is_empty());
        resolver.shutdown().await;
    }
}
