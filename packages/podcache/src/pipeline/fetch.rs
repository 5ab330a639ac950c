//! Bounded-time fetch loop over the upstream directory.
//!
//! Identifiers are processed in waves of `batch_size x concurrent_batches`
//! in-flight lookups - a soft throttle sized against the directory's
//! documented ~120 requests/minute ceiling. The wall-clock budget is
//! checked before each wave; when it runs out the loop stops and reports
//! exactly how many identifiers were never attempted. Partial completion
//! is the contract, not a failure: the caller re-invokes and completed
//! identifiers resolve as cache hits.

use std::sync::Arc;

use futures::future::join_all;
use tracing::warn;

use crate::pipeline::sync::SyncConfig;
use crate::pipeline::TimeBudget;
use crate::traits::Directory;
use crate::types::{FetchOutcome, PodcastRecord};

/// Fetch the given identifiers from the directory within the budget.
///
/// Per-identifier failures are logged and dropped from this invocation -
/// the identifier stays missing and is picked up by the next full run.
/// Successfully fetched records are returned unpersisted; the caller
/// flushes them to the writer as one batch.
pub async fn run(
    directory: &Arc<dyn Directory>,
    ids: &[String],
    config: &SyncConfig,
    budget: &TimeBudget,
) -> FetchOutcome {
    let mut outcome = FetchOutcome::default();
    let wave_size = config.fetch_batch_size * config.concurrent_batches;
    let mut attempted = 0;

    for wave in ids.chunks(wave_size) {
        if budget.expired() {
            outcome.stopped_early = true;
            break;
        }

        let batches = wave
            .chunks(config.fetch_batch_size)
            .map(|batch| fetch_batch(directory, batch, config.fetch_demographics));
        let results = join_all(batches).await;

        for result in results.into_iter().flatten() {
            match result {
                Ok(record) => outcome.records.push(record),
                Err(id) => outcome.failed.push(id),
            }
        }
        attempted += wave.len();
    }

    outcome.remaining = ids.len() - attempted;

    tracing::info!(
        requested = ids.len(),
        fetched = outcome.records.len(),
        failed = outcome.failed.len(),
        remaining = outcome.remaining,
        stopped_early = outcome.stopped_early,
        elapsed_ms = budget.elapsed().as_millis() as u64,
        "Directory fetch loop finished"
    );

    outcome
}

/// One batch of concurrent lookups.
async fn fetch_batch(
    directory: &Arc<dyn Directory>,
    ids: &[String],
    with_demographics: bool,
) -> Vec<Result<PodcastRecord, String>> {
    let fetches = ids.iter().map(|id| fetch_one(directory, id, with_demographics));
    join_all(fetches).await
}

/// Fetch one podcast and, optionally, its demographics.
///
/// Demographics are best-effort: a directory without them (or an error
/// fetching them) never costs us the snapshot.
async fn fetch_one(
    directory: &Arc<dyn Directory>,
    id: &str,
    with_demographics: bool,
) -> Result<PodcastRecord, String> {
    let snapshot = match directory.fetch_podcast(id).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(upstream_id = %id, error = %e, "Directory fetch failed; dropping identifier for this invocation");
            return Err(id.to_string());
        }
    };

    let mut record = PodcastRecord::new(snapshot);

    if with_demographics {
        match directory.fetch_demographics(id).await {
            Ok(Some(demographics)) => record = record.with_demographics(demographics),
            Ok(None) => {}
            Err(e) => {
                warn!(upstream_id = %id, error = %e, "Demographics fetch failed; keeping snapshot without them");
            }
        }
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::testing::{podcast_snapshot, MockDirectory};

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn directory_with(ids: &[&str]) -> MockDirectory {
        let mut directory = MockDirectory::new();
        for id in ids {
            directory = directory.with_podcast(podcast_snapshot(id, &format!("Podcast {id}")));
        }
        directory
    }

    #[tokio::test]
    async fn test_fetches_all_within_budget() {
        let directory: Arc<dyn Directory> = Arc::new(directory_with(&["p1", "p2", "p3"]));
        let config = SyncConfig::default();
        let budget = TimeBudget::new(Duration::from_secs(50));

        let outcome = run(&directory, &ids(&["p1", "p2", "p3"]), &config, &budget).await;

        assert_eq!(outcome.records.len(), 3);
        assert!(!outcome.stopped_early);
        assert_eq!(outcome.remaining, 0);
        assert!(outcome.failed.is_empty());
    }

    #[tokio::test]
    async fn test_failed_identifier_is_dropped_not_fatal() {
        let directory: Arc<dyn Directory> =
            Arc::new(directory_with(&["p1", "p3"]).with_failure("p2"));
        let config = SyncConfig::default();
        let budget = TimeBudget::new(Duration::from_secs(50));

        let outcome = run(&directory, &ids(&["p1", "p2", "p3"]), &config, &budget).await;

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.failed, ids(&["p2"]));
        assert_eq!(outcome.remaining, 0);
    }

    #[tokio::test]
    async fn test_time_box_stops_between_waves_and_reports_remaining() {
        // Each lookup sleeps 30ms; with batch_size=1 and one batch per
        // wave, a 45ms budget admits the first wave and expires before
        // the second.
        let directory: Arc<dyn Directory> = Arc::new(
            directory_with(&["p1", "p2", "p3", "p4"]).with_latency(Duration::from_millis(30)),
        );
        let config = SyncConfig {
            fetch_batch_size: 1,
            concurrent_batches: 1,
            ..SyncConfig::default()
        };
        let budget = TimeBudget::new(Duration::from_millis(45));

        let outcome = run(
            &directory,
            &ids(&["p1", "p2", "p3", "p4"]),
            &config,
            &budget,
        )
        .await;

        assert!(outcome.stopped_early);
        assert!(outcome.remaining > 0);
        assert_eq!(outcome.records.len() + outcome.remaining, 4);

        // A follow-up invocation over the remaining identifiers finishes
        // the set: nothing is permanently stuck.
        let processed = outcome.records.len();
        let rest = ids(&["p1", "p2", "p3", "p4"])[processed..].to_vec();
        let second = run(
            &directory,
            &rest,
            &config,
            &TimeBudget::new(Duration::from_secs(10)),
        )
        .await;
        assert_eq!(second.records.len(), rest.len());
        assert_eq!(second.remaining, 0);
    }

    #[tokio::test]
    async fn test_demographics_attached_when_available() {
        let directory: Arc<dyn Directory> = Arc::new(
            directory_with(&["p1", "p2"]).with_demographics(
                "p1",
                serde_json::json!({"gender": {"female": 0.6}}),
                12,
            ),
        );
        let config = SyncConfig::default();
        let budget = TimeBudget::new(Duration::from_secs(50));

        let outcome = run(&directory, &ids(&["p1", "p2"]), &config, &budget).await;

        let p1 = outcome
            .records
            .iter()
            .find(|r| r.upstream_id() == "p1")
            .unwrap();
        let p2 = outcome
            .records
            .iter()
            .find(|r| r.upstream_id() == "p2")
            .unwrap();
        assert!(p1.demographics.is_some());
        assert_eq!(p1.demographics.as_ref().unwrap().episodes_analyzed, Some(12));
        assert!(p2.demographics.is_none());
    }
}
