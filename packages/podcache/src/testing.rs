//! Testing utilities including mock implementations.
//!
//! Useful for testing applications that use the cache core without a
//! database, a directory API key, or an LLM.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{CacheError, Result};
use crate::traits::{Directory, FitOracle};
use crate::types::{
    ConsumerProfile, DemographicsSnapshot, FitAnalysis, PitchAngle, PodcastRecord,
    PodcastSnapshot,
};

/// Quick snapshot factory for tests.
pub fn podcast_snapshot(upstream_id: &str, name: &str) -> PodcastSnapshot {
    PodcastSnapshot::new(upstream_id)
        .with_name(name)
        .with_description(format!("Description of {name}"))
}

/// Quick writer-input factory for tests.
pub fn podcast_record(upstream_id: &str) -> PodcastRecord {
    PodcastRecord::new(podcast_snapshot(
        upstream_id,
        &format!("Podcast {upstream_id}"),
    ))
}

/// A mock upstream directory with configurable snapshots, failures, and
/// per-lookup latency.
#[derive(Default)]
pub struct MockDirectory {
    podcasts: RwLock<HashMap<String, PodcastSnapshot>>,
    demographics: RwLock<HashMap<String, DemographicsSnapshot>>,
    failing: RwLock<HashSet<String>>,
    latency: Option<Duration>,
    lookup_calls: AtomicUsize,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve this snapshot for its identifier.
    pub fn with_podcast(self, snapshot: PodcastSnapshot) -> Self {
        self.podcasts
            .write()
            .unwrap()
            .insert(snapshot.upstream_id.clone(), snapshot);
        self
    }

    /// Serve demographics for an identifier.
    pub fn with_demographics(
        self,
        upstream_id: &str,
        breakdown: serde_json::Value,
        episodes_analyzed: i32,
    ) -> Self {
        self.demographics.write().unwrap().insert(
            upstream_id.to_string(),
            DemographicsSnapshot {
                episodes_analyzed: Some(episodes_analyzed),
                breakdown,
                fetched_at: Utc::now(),
            },
        );
        self
    }

    /// Fail every lookup of this identifier.
    pub fn with_failure(self, upstream_id: &str) -> Self {
        self.failing.write().unwrap().insert(upstream_id.to_string());
        self
    }

    /// Sleep this long on every podcast lookup (for time-box tests).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of podcast lookups made against this mock.
    pub fn lookup_count(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Directory for MockDirectory {
    async fn fetch_podcast(&self, upstream_id: &str) -> Result<PodcastSnapshot> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing.read().unwrap().contains(upstream_id) {
            return Err(CacheError::directory(format!(
                "injected failure for {upstream_id}"
            )));
        }

        self.podcasts
            .read()
            .unwrap()
            .get(upstream_id)
            .cloned()
            .ok_or_else(|| CacheError::directory(format!("podcast not found: {upstream_id}")))
    }

    async fn fetch_demographics(
        &self,
        upstream_id: &str,
    ) -> Result<Option<DemographicsSnapshot>> {
        Ok(self.demographics.read().unwrap().get(upstream_id).cloned())
    }
}

/// A mock scoring oracle with canned analyses, failure modes, and a call
/// counter for idempotence assertions.
#[derive(Default)]
pub struct MockOracle {
    canned: RwLock<HashMap<String, FitAnalysis>>,
    unparseable: RwLock<HashSet<String>>,
    fail_all: AtomicBool,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return this analysis for the given upstream identifier.
    pub fn with_analysis(self, upstream_id: &str, analysis: FitAnalysis) -> Self {
        self.canned
            .write()
            .unwrap()
            .insert(upstream_id.to_string(), analysis);
        self
    }

    /// Answer `Ok(None)` (unparseable output) for this identifier.
    pub fn unparseable_for(self, upstream_id: &str) -> Self {
        self.unparseable
            .write()
            .unwrap()
            .insert(upstream_id.to_string());
        self
    }

    /// Fail every call.
    pub fn failing(self) -> Self {
        self.fail_all.store(true, Ordering::SeqCst);
        self
    }

    /// Sleep this long on every call (for time-box tests).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of analyze calls made against this mock.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Deterministic default analysis for identifiers without a canned one.
    fn default_analysis(podcast: &PodcastSnapshot, consumer: &ConsumerProfile) -> FitAnalysis {
        let name = podcast.name.as_deref().unwrap_or(&podcast.upstream_id);
        FitAnalysis {
            clean_description: format!("{name}, cleaned up."),
            fit_reasons: vec![
                format!("{name} reaches {}'s audience", consumer.name),
                "Topic overlap with the consumer's positioning".to_string(),
                "Actively books guests".to_string(),
            ],
            pitch_angles: vec![
                PitchAngle {
                    title: "Origin story".to_string(),
                    description: format!("How {} got started", consumer.name),
                },
                PitchAngle {
                    title: "Contrarian take".to_string(),
                    description: "An unpopular opinion segment".to_string(),
                },
                PitchAngle {
                    title: "Tactical deep dive".to_string(),
                    description: "A how-to walkthrough for listeners".to_string(),
                },
            ],
        }
    }
}

#[async_trait]
impl FitOracle for MockOracle {
    async fn analyze_fit(
        &self,
        podcast: &PodcastSnapshot,
        consumer: &ConsumerProfile,
    ) -> Result<Option<FitAnalysis>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.fail_all.load(Ordering::SeqCst) {
            return Err(CacheError::oracle("injected oracle failure"));
        }

        if self
            .unparseable
            .read()
            .unwrap()
            .contains(&podcast.upstream_id)
        {
            return Ok(None);
        }

        if let Some(canned) = self.canned.read().unwrap().get(&podcast.upstream_id) {
            return Ok(Some(canned.clone()));
        }

        Ok(Some(Self::default_analysis(podcast, consumer)))
    }
}
