//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! One maintenance task: a nightly sweep that deletes cache rows whose
//! `last_fetched_at` is past the long staleness horizon. Annotations on
//! swept rows go with them (ON DELETE CASCADE).

use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use podcache::traits::PodcastCache;

/// Start all scheduled tasks
pub async fn start_scheduler(
    store: Arc<dyn PodcastCache>,
    horizon_days: i64,
    schedule: &str,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let sweep_job = Job::new_async(schedule, move |_uuid, _lock| {
        let store = store.clone();
        Box::pin(async move {
            if let Err(e) = run_cache_sweep(store, horizon_days).await {
                tracing::error!("Cache sweep task failed: {}", e);
            }
        })
    })?;

    scheduler.add(sweep_job).await?;
    scheduler.start().await?;

    tracing::info!(
        schedule = %schedule,
        horizon_days,
        "Scheduled tasks started (cache sweep)"
    );
    Ok(scheduler)
}

/// Run the maintenance sweep once.
async fn run_cache_sweep(store: Arc<dyn PodcastCache>, horizon_days: i64) -> Result<()> {
    tracing::info!(horizon_days, "Running cache sweep");

    let removed = store.sweep_older_than(horizon_days).await?;

    if removed > 0 {
        tracing::info!(removed, "Cache sweep removed rows past the horizon");
    } else {
        tracing::info!("Cache sweep found nothing to remove");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use podcache::stores::MemoryStore;
    use podcache::testing::podcast_record;

    #[tokio::test]
    async fn test_sweep_removes_only_rows_past_horizon() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_one(&podcast_record("p_recent")).await.unwrap();
        store.upsert_one(&podcast_record("p_ancient")).await.unwrap();
        store.age_podcast("p_ancient", 365);

        run_cache_sweep(store.clone(), 180).await.unwrap();

        assert_eq!(store.podcast_count(), 1);
        assert_eq!(store.fetch_count("p_recent"), 1);
        assert_eq!(store.fetch_count("p_ancient"), 0);
    }
}
