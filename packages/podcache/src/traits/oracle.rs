//! Scoring oracle abstraction.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ConsumerProfile, FitAnalysis, PodcastSnapshot};

/// The compatibility-scoring oracle.
///
/// Treated as fallible and opaque: input is the podcast snapshot plus
/// the consumer's profile, output is a fit analysis or `None` when the
/// oracle answered but its response was unusable. Callers mark the pair
/// "attempted" on `None` and on `Err` alike, so a single failure is
/// never retried automatically.
#[async_trait]
pub trait FitOracle: Send + Sync {
    async fn analyze_fit(
        &self,
        podcast: &PodcastSnapshot,
        consumer: &ConsumerProfile,
    ) -> Result<Option<FitAnalysis>>;
}
