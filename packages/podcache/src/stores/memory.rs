//! In-memory storage implementation for testing and development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{CacheError, Result};
use crate::traits::{AnnotationStore, PodcastCache};
use crate::types::{
    Annotation, AnnotationInput, CacheStatistics, CachedPodcast, PodcastRecord,
};

/// In-memory podcast cache and annotation store.
///
/// Useful for testing and development. Not suitable for production as
/// data is lost on restart. Upsert semantics match the Postgres store:
/// whole-snapshot overwrite, store-maintained monotonic counters.
#[derive(Default)]
pub struct MemoryStore {
    podcasts: RwLock<HashMap<String, CachedPodcast>>,
    annotations: RwLock<HashMap<(String, Uuid), Annotation>>,
    upsert_batch_calls: AtomicUsize,
    fail_batch_writes: AtomicBool,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `upsert_batch` call fail (for failure-path tests).
    pub fn fail_batch_writes(self) -> Self {
        self.fail_batch_writes.store(true, Ordering::SeqCst);
        self
    }

    /// Number of `upsert_batch` calls made against this store.
    pub fn upsert_batch_calls(&self) -> usize {
        self.upsert_batch_calls.load(Ordering::SeqCst)
    }

    /// Number of cached podcasts.
    pub fn podcast_count(&self) -> usize {
        self.podcasts.read().unwrap().len()
    }

    /// Current `cache_hit_count` for an upstream identifier (0 if absent).
    pub fn hit_count(&self, upstream_id: &str) -> i64 {
        self.podcasts
            .read()
            .unwrap()
            .get(upstream_id)
            .map(|row| row.cache_hit_count)
            .unwrap_or(0)
    }

    /// Current `fetch_count` for an upstream identifier (0 if absent).
    pub fn fetch_count(&self, upstream_id: &str) -> i64 {
        self.podcasts
            .read()
            .unwrap()
            .get(upstream_id)
            .map(|row| row.fetch_count)
            .unwrap_or(0)
    }

    /// Backdate a row's `last_fetched_at` by the given number of days.
    pub fn age_podcast(&self, upstream_id: &str, days: i64) {
        if let Some(row) = self.podcasts.write().unwrap().get_mut(upstream_id) {
            row.last_fetched_at = Utc::now() - chrono::Duration::days(days);
        }
    }

    fn apply_upsert(&self, record: &PodcastRecord) -> CachedPodcast {
        let now = Utc::now();
        let mut podcasts = self.podcasts.write().unwrap();

        let row = podcasts
            .entry(record.upstream_id().to_string())
            .and_modify(|existing| {
                // Whole-row overwrite; counters are ours, not the caller's.
                existing.snapshot = record.snapshot.clone();
                existing.demographics = record.demographics.clone();
                existing.last_fetched_at = now;
                existing.fetch_count += 1;
                existing.updated_at = now;
            })
            .or_insert_with(|| CachedPodcast {
                id: Uuid::new_v4(),
                snapshot: record.snapshot.clone(),
                demographics: record.demographics.clone(),
                last_fetched_at: now,
                fetch_count: 1,
                cache_hit_count: 0,
                created_at: now,
                updated_at: now,
            });

        row.clone()
    }
}

#[async_trait]
impl PodcastCache for MemoryStore {
    async fn get_by_upstream_ids(&self, ids: &[String]) -> Result<Vec<CachedPodcast>> {
        let podcasts = self.podcasts.read().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| podcasts.get(id).cloned())
            .collect())
    }

    async fn upsert_one(&self, record: &PodcastRecord) -> Result<CachedPodcast> {
        Ok(self.apply_upsert(record))
    }

    async fn upsert_batch(&self, records: &[PodcastRecord]) -> Result<Vec<CachedPodcast>> {
        self.upsert_batch_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_batch_writes.load(Ordering::SeqCst) {
            return Err(CacheError::BatchWrite {
                identifiers: records
                    .iter()
                    .map(|r| r.upstream_id().to_string())
                    .collect(),
                source: "batch writes disabled".into(),
            });
        }

        Ok(records.iter().map(|r| self.apply_upsert(r)).collect())
    }

    async fn record_hits(&self, ids: &[String]) -> Result<u64> {
        let mut podcasts = self.podcasts.write().unwrap();
        let mut updated = 0;
        for id in ids {
            if let Some(row) = podcasts.get_mut(id) {
                row.cache_hit_count += 1;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn statistics(&self, stale_days: i64) -> Result<CacheStatistics> {
        let podcasts = self.podcasts.read().unwrap();
        let mut stats = CacheStatistics {
            total_podcasts: podcasts.len() as i64,
            ..CacheStatistics::default()
        };

        for row in podcasts.values() {
            stats.total_fetches += row.fetch_count;
            stats.total_cache_hits += row.cache_hit_count;
            if row.demographics.is_some() {
                stats.with_demographics += 1;
            }
            if row.is_stale(stale_days) {
                stats.stale += 1;
            } else {
                stats.fresh += 1;
            }
        }

        Ok(stats)
    }

    async fn sweep_older_than(&self, horizon_days: i64) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(horizon_days);

        let removed_ids: Vec<Uuid> = {
            let mut podcasts = self.podcasts.write().unwrap();
            let doomed: Vec<String> = podcasts
                .iter()
                .filter(|(_, row)| row.last_fetched_at < cutoff)
                .map(|(id, _)| id.clone())
                .collect();
            doomed
                .iter()
                .filter_map(|id| podcasts.remove(id))
                .map(|row| row.id)
                .collect()
        };

        // Mirror the database's ON DELETE CASCADE.
        if !removed_ids.is_empty() {
            self.annotations
                .write()
                .unwrap()
                .retain(|(_, podcast_id), _| !removed_ids.contains(podcast_id));
        }

        Ok(removed_ids.len() as u64)
    }
}

#[async_trait]
impl AnnotationStore for MemoryStore {
    async fn get_for_consumer(
        &self,
        consumer_id: &str,
        podcast_ids: &[Uuid],
    ) -> Result<Vec<Annotation>> {
        let annotations = self.annotations.read().unwrap();
        Ok(podcast_ids
            .iter()
            .filter_map(|podcast_id| {
                annotations
                    .get(&(consumer_id.to_string(), *podcast_id))
                    .cloned()
            })
            .collect())
    }

    async fn needs_analysis(&self, consumer_id: &str, podcast_id: Uuid) -> Result<bool> {
        let annotations = self.annotations.read().unwrap();
        Ok(annotations
            .get(&(consumer_id.to_string(), podcast_id))
            .map(|annotation| annotation.analyzed_at.is_none())
            .unwrap_or(true))
    }

    async fn upsert(&self, input: &AnnotationInput) -> Result<Annotation> {
        let now = Utc::now();
        let mut annotations = self.annotations.write().unwrap();
        let key = (input.consumer_id.clone(), input.podcast_id);

        let annotation = annotations
            .entry(key)
            .and_modify(|existing| {
                existing.clean_description =
                    input.analysis.as_ref().map(|a| a.clean_description.clone());
                existing.fit_reasons = input.analysis.as_ref().map(|a| a.fit_reasons.clone());
                existing.pitch_angles = input.analysis.as_ref().map(|a| a.pitch_angles.clone());
                existing.analyzed_at = Some(now);
                existing.updated_at = now;
            })
            .or_insert_with(|| Annotation {
                id: Uuid::new_v4(),
                consumer_id: input.consumer_id.clone(),
                podcast_id: input.podcast_id,
                clean_description: input.analysis.as_ref().map(|a| a.clean_description.clone()),
                fit_reasons: input.analysis.as_ref().map(|a| a.fit_reasons.clone()),
                pitch_angles: input.analysis.as_ref().map(|a| a.pitch_angles.clone()),
                analyzed_at: Some(now),
                created_at: now,
                updated_at: now,
            });

        Ok(annotation.clone())
    }

    async fn retain_only(&self, consumer_id: &str, podcast_ids: &[Uuid]) -> Result<u64> {
        let mut annotations = self.annotations.write().unwrap();
        let before = annotations.len();
        annotations.retain(|(owner, podcast_id), _| {
            owner != consumer_id || podcast_ids.contains(podcast_id)
        });
        Ok((before - annotations.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::podcast_record;
    use crate::types::PodcastSnapshot;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_upsert_twice_keeps_one_row_and_increments_fetch_count() {
        let store = MemoryStore::new();

        let first = store
            .upsert_one(&PodcastRecord::new(
                PodcastSnapshot::new("p1").with_name("Old Name"),
            ))
            .await
            .unwrap();
        let second = store
            .upsert_one(&PodcastRecord::new(
                PodcastSnapshot::new("p1").with_name("New Name"),
            ))
            .await
            .unwrap();

        assert_eq!(store.podcast_count(), 1);
        assert_eq!(first.id, second.id, "conflict keeps the row identity");
        assert_eq!(second.snapshot.name.as_deref(), Some("New Name"));
        assert_eq!(second.fetch_count, 2);
        assert_eq!(second.cache_hit_count, 0);
    }

    #[tokio::test]
    async fn test_batch_upsert_then_resolve_finds_all() {
        let store = MemoryStore::new();
        let records: Vec<PodcastRecord> = ["pA", "pB", "pC"]
            .iter()
            .map(|id| podcast_record(id))
            .collect();

        let rows = store.upsert_batch(&records).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(store.upsert_batch_calls(), 1);

        let found = store
            .get_by_upstream_ids(&ids(&["pA", "pB", "pC"]))
            .await
            .unwrap();
        assert_eq!(found.len(), 3);
    }

    #[tokio::test]
    async fn test_batch_failure_lists_attempted_identifiers() {
        let store = MemoryStore::new().fail_batch_writes();
        let records = vec![podcast_record("pA"), podcast_record("pB")];

        let err = store.upsert_batch(&records).await.unwrap_err();
        match err {
            CacheError::BatchWrite { identifiers, .. } => {
                assert_eq!(identifiers, ids(&["pA", "pB"]));
            }
            other => panic!("expected BatchWrite, got {other:?}"),
        }
        assert!(store.get_by_upstream_ids(&ids(&["pA"])).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_hits_skips_unknown_ids() {
        let store = MemoryStore::new();
        store.upsert_one(&podcast_record("p1")).await.unwrap();

        let updated = store.record_hits(&ids(&["p1", "nope"])).await.unwrap();
        assert_eq!(updated, 1);
        assert_eq!(store.hit_count("p1"), 1);
    }

    #[tokio::test]
    async fn test_sweep_removes_old_rows_and_their_annotations() {
        let store = MemoryStore::new();
        let old = store.upsert_one(&podcast_record("p_old")).await.unwrap();
        store.upsert_one(&podcast_record("p_new")).await.unwrap();
        store.age_podcast("p_old", 200);

        store
            .upsert(&AnnotationInput::new("client-1", old.id))
            .await
            .unwrap();

        let removed = store.sweep_older_than(180).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.podcast_count(), 1);
        assert!(store
            .get_for_consumer("client-1", &[old.id])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_statistics_aggregates_counters() {
        let store = MemoryStore::new();
        store.upsert_one(&podcast_record("p1")).await.unwrap();
        store.upsert_one(&podcast_record("p1")).await.unwrap();
        store.upsert_one(&podcast_record("p2")).await.unwrap();
        store.age_podcast("p2", 10);
        store.record_hits(&ids(&["p1"])).await.unwrap();

        let stats = store.statistics(7).await.unwrap();
        assert_eq!(stats.total_podcasts, 2);
        assert_eq!(stats.total_fetches, 3);
        assert_eq!(stats.total_cache_hits, 1);
        assert_eq!(stats.fresh, 1);
        assert_eq!(stats.stale, 1);
    }

    #[tokio::test]
    async fn test_annotation_upsert_overwrites_payload() {
        let store = MemoryStore::new();
        let row = store.upsert_one(&podcast_record("p1")).await.unwrap();

        // Attempt with no payload first (oracle failed)...
        let attempted = store
            .upsert(&AnnotationInput::new("client-1", row.id))
            .await
            .unwrap();
        assert!(attempted.is_analyzed());
        assert!(attempted.clean_description.is_none());

        // ...then a manual re-run with a real payload replaces it.
        let analysis = crate::types::FitAnalysis {
            clean_description: "A show about startups.".to_string(),
            fit_reasons: vec!["audience overlap".to_string()],
            pitch_angles: vec![],
        };
        let analyzed = store
            .upsert(&AnnotationInput::new("client-1", row.id).with_analysis(analysis))
            .await
            .unwrap();
        assert_eq!(analyzed.id, attempted.id);
        assert_eq!(
            analyzed.clean_description.as_deref(),
            Some("A show about startups.")
        );
    }
}
