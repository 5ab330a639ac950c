//! Bounded-time annotation loop - per-consumer fit analysis.
//!
//! For each (consumer, podcast) pair that still needs analysis, asks the
//! scoring oracle and upserts the result. The pair is marked attempted
//! (`analyzed_at` set) even when the oracle fails or returns something
//! unusable, so a bad pair cannot burn oracle spend on every subsequent
//! invocation. Same time-box discipline as the fetch loop: stop before
//! starting new work once the budget is gone, report the exact remainder.

use std::sync::Arc;

use futures::future::join_all;
use tracing::warn;

use crate::pipeline::sync::SyncConfig;
use crate::pipeline::TimeBudget;
use crate::traits::{AnnotationStore, FitOracle};
use crate::types::{AnalyzeOutcome, AnnotationInput, CachedPodcast, ConsumerProfile};

/// What happened to one pair.
enum ItemResult {
    Analyzed,
    AttemptedEmpty,
    Skipped,
}

/// Analyze every given podcast for the consumer, within the budget.
pub async fn run(
    oracle: &Arc<dyn FitOracle>,
    annotations: &dyn AnnotationStore,
    consumer: &ConsumerProfile,
    podcasts: &[CachedPodcast],
    config: &SyncConfig,
    budget: &TimeBudget,
) -> AnalyzeOutcome {
    let mut outcome = AnalyzeOutcome::default();
    let mut attempted = 0;

    for batch in podcasts.chunks(config.analysis_batch_size) {
        if budget.expired() {
            outcome.stopped_early = true;
            break;
        }

        let items = batch
            .iter()
            .map(|podcast| analyze_one(oracle, annotations, consumer, podcast));
        let results = join_all(items).await;

        for result in results {
            match result {
                ItemResult::Analyzed => outcome.analyzed += 1,
                ItemResult::AttemptedEmpty => outcome.attempted_empty += 1,
                ItemResult::Skipped => outcome.skipped += 1,
            }
        }
        attempted += batch.len();
    }

    outcome.remaining = podcasts.len() - attempted;

    tracing::info!(
        consumer_id = %consumer.id,
        analyzed = outcome.analyzed,
        attempted_empty = outcome.attempted_empty,
        skipped = outcome.skipped,
        remaining = outcome.remaining,
        stopped_early = outcome.stopped_early,
        "Annotation loop finished"
    );

    outcome
}

/// Analyze one pair, gated on `needs_analysis`.
async fn analyze_one(
    oracle: &Arc<dyn FitOracle>,
    annotations: &dyn AnnotationStore,
    consumer: &ConsumerProfile,
    podcast: &CachedPodcast,
) -> ItemResult {
    match annotations.needs_analysis(&consumer.id, podcast.id).await {
        Ok(true) => {}
        Ok(false) => return ItemResult::Skipped,
        Err(e) => {
            warn!(
                consumer_id = %consumer.id,
                podcast_id = %podcast.id,
                error = %e,
                "needs_analysis check failed; skipping pair this invocation"
            );
            return ItemResult::Skipped;
        }
    }

    let mut input = AnnotationInput::new(consumer.id.clone(), podcast.id);
    let mut result = ItemResult::AttemptedEmpty;

    match oracle.analyze_fit(&podcast.snapshot, consumer).await {
        Ok(Some(analysis)) => {
            input = input.with_analysis(analysis);
            result = ItemResult::Analyzed;
        }
        Ok(None) => {
            warn!(
                consumer_id = %consumer.id,
                upstream_id = %podcast.upstream_id(),
                "Oracle response unusable; marking pair attempted with empty payload"
            );
        }
        Err(e) => {
            warn!(
                consumer_id = %consumer.id,
                upstream_id = %podcast.upstream_id(),
                error = %e,
                "Oracle call failed; marking pair attempted with empty payload"
            );
        }
    }

    if let Err(e) = annotations.upsert(&input).await {
        warn!(
            consumer_id = %consumer.id,
            podcast_id = %podcast.id,
            error = %e,
            "Failed to persist annotation"
        );
        return ItemResult::AttemptedEmpty;
    }

    result
}
