//! Podcast types - directory snapshots and cached rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One category assignment, in the order the directory lists them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// A rating from one rating source (Apple, Spotify, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSource {
    pub source: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub bucket: Option<String>,
}

/// The descriptive snapshot of one podcast as last reported by the
/// upstream directory.
///
/// `upstream_id` is the only required field; everything else mirrors
/// whatever the directory had at fetch time. Snapshots are written
/// whole-row - there is no field-level merging across fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodcastSnapshot {
    pub upstream_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub episode_count: Option<i32>,
    #[serde(default)]
    pub last_episode_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub has_guests: Option<bool>,
    #[serde(default)]
    pub has_sponsors: Option<bool>,
    #[serde(default)]
    pub ratings: Vec<RatingSource>,
    #[serde(default)]
    pub audience_size: Option<i64>,
    #[serde(default)]
    pub reach_score: Option<i32>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    /// Opaque pass-through payload; the core never inspects it.
    #[serde(default)]
    pub social_links: Option<serde_json::Value>,
    #[serde(default)]
    pub rss_url: Option<String>,
}

impl PodcastSnapshot {
    /// Create a snapshot carrying only the identifier.
    pub fn new(upstream_id: impl Into<String>) -> Self {
        Self {
            upstream_id: upstream_id.into(),
            name: None,
            description: None,
            image_url: None,
            url: None,
            publisher: None,
            categories: Vec::new(),
            language: None,
            region: None,
            episode_count: None,
            last_episode_at: None,
            is_active: None,
            has_guests: None,
            has_sponsors: None,
            ratings: Vec::new(),
            audience_size: None,
            reach_score: None,
            contact_email: None,
            website: None,
            social_links: None,
            rss_url: None,
        }
    }

    /// Set the podcast name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Audience demographics attached to a cached podcast.
///
/// The breakdown payload is opaque; only the episode count and fetch
/// timestamp are inspected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemographicsSnapshot {
    #[serde(default)]
    pub episodes_analyzed: Option<i32>,
    pub breakdown: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
}

/// Input to the reconciliation writer: one freshly fetched podcast.
///
/// Carries no cache bookkeeping - `fetch_count` and `cache_hit_count`
/// are maintained by the store itself and can never be supplied here.
#[derive(Debug, Clone)]
pub struct PodcastRecord {
    pub snapshot: PodcastSnapshot,
    pub demographics: Option<DemographicsSnapshot>,
}

impl PodcastRecord {
    /// Create a record from a directory snapshot.
    pub fn new(snapshot: PodcastSnapshot) -> Self {
        Self {
            snapshot,
            demographics: None,
        }
    }

    /// Attach demographics.
    pub fn with_demographics(mut self, demographics: DemographicsSnapshot) -> Self {
        self.demographics = Some(demographics);
        self
    }

    /// The upstream identifier this record belongs to.
    pub fn upstream_id(&self) -> &str {
        &self.snapshot.upstream_id
    }
}

/// One row of the central cache: the canonical snapshot for an upstream
/// identifier plus freshness and usage bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPodcast {
    pub id: Uuid,
    #[serde(flatten)]
    pub snapshot: PodcastSnapshot,
    #[serde(default)]
    pub demographics: Option<DemographicsSnapshot>,
    pub last_fetched_at: DateTime<Utc>,
    pub fetch_count: i64,
    pub cache_hit_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CachedPodcast {
    /// The upstream identifier this row is keyed on.
    pub fn upstream_id(&self) -> &str {
        &self.snapshot.upstream_id
    }

    /// Whether the row is older than the staleness window.
    ///
    /// Stale rows are still served (stale data beats no data); they are
    /// re-fetch candidates, nothing more.
    pub fn is_stale(&self, stale_days: i64) -> bool {
        Utc::now() - self.last_fetched_at > chrono::Duration::days(stale_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staleness_window() {
        let mut row = CachedPodcast {
            id: Uuid::new_v4(),
            snapshot: PodcastSnapshot::new("pd_1"),
            demographics: None,
            last_fetched_at: Utc::now() - chrono::Duration::days(10),
            fetch_count: 1,
            cache_hit_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(row.is_stale(7));
        assert!(!row.is_stale(30));

        row.last_fetched_at = Utc::now() - chrono::Duration::days(1);
        assert!(!row.is_stale(7));
    }

    #[test]
    fn test_cached_podcast_serializes_flat() {
        let row = CachedPodcast {
            id: Uuid::new_v4(),
            snapshot: PodcastSnapshot::new("pd_1").with_name("The Startup Hour"),
            demographics: None,
            last_fetched_at: Utc::now(),
            fetch_count: 1,
            cache_hit_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&row).unwrap();
        // Snapshot fields are flattened into the row object.
        assert_eq!(json["upstream_id"], "pd_1");
        assert_eq!(json["name"], "The Startup Hour");
        assert_eq!(json["fetch_count"], 1);
    }
}
