//! Consumer annotation types - per-consumer fit analysis over shared rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of consumer an annotation table is scoped to.
///
/// Fit analysis is never shared across consumers, and each kind keeps its
/// own table so that a client's pipeline cannot see prospect state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumerKind {
    Client,
    Prospect,
    Outreach,
}

impl ConsumerKind {
    /// Stable lowercase name, used in logs and route paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumerKind::Client => "client",
            ConsumerKind::Prospect => "prospect",
            ConsumerKind::Outreach => "outreach",
        }
    }
}

impl std::fmt::Display for ConsumerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The consumer a sync invocation runs on behalf of.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerProfile {
    pub id: String,
    pub name: String,
    /// Free-text bio/positioning used to build the scoring prompt.
    pub bio: String,
}

impl ConsumerProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, bio: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bio: bio.into(),
        }
    }
}

/// One suggested pitch angle from the scoring oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchAngle {
    pub title: String,
    pub description: String,
}

/// A successful oracle response: why this podcast fits this consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitAnalysis {
    pub clean_description: String,
    /// 3-4 reasons, ordered by strength.
    pub fit_reasons: Vec<String>,
    /// 3 suggested angles.
    pub pitch_angles: Vec<PitchAngle>,
}

/// One persisted annotation row: (consumer, podcast) plus the analysis
/// payload.
///
/// A set `analyzed_at` with null payload fields means analysis was
/// attempted and yielded nothing - distinct from "never attempted", and
/// deliberately not retried automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub id: Uuid,
    pub consumer_id: String,
    pub podcast_id: Uuid,
    pub clean_description: Option<String>,
    pub fit_reasons: Option<Vec<String>>,
    pub pitch_angles: Option<Vec<PitchAngle>>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Annotation {
    /// Whether analysis has been attempted for this pair.
    pub fn is_analyzed(&self) -> bool {
        self.analyzed_at.is_some()
    }
}

/// Writer input for one annotation upsert.
///
/// `analysis: None` records an attempt that yielded nothing (oracle
/// failure or unparseable output); the store still sets `analyzed_at`.
#[derive(Debug, Clone)]
pub struct AnnotationInput {
    pub consumer_id: String,
    pub podcast_id: Uuid,
    pub analysis: Option<FitAnalysis>,
}

impl AnnotationInput {
    pub fn new(consumer_id: impl Into<String>, podcast_id: Uuid) -> Self {
        Self {
            consumer_id: consumer_id.into(),
            podcast_id,
            analysis: None,
        }
    }

    pub fn with_analysis(mut self, analysis: FitAnalysis) -> Self {
        self.analysis = Some(analysis);
        self
    }
}
