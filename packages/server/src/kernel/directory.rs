//! Podscan adapter - maps the vendored directory client onto the cache
//! core's `Directory` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use podcache::error::{CacheError, Result};
use podcache::traits::Directory;
use podcache::types::{Category, DemographicsSnapshot, PodcastSnapshot, RatingSource};
use podscan::PodscanClient;

/// `Directory` implementation backed by the Podscan API.
pub struct PodscanDirectory {
    client: PodscanClient,
}

impl PodscanDirectory {
    pub fn new(client: PodscanClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Directory for PodscanDirectory {
    async fn fetch_podcast(&self, upstream_id: &str) -> Result<PodcastSnapshot> {
        let podcast = self
            .client
            .get_podcast(upstream_id)
            .await
            .map_err(CacheError::directory)?;

        Ok(to_snapshot(podcast))
    }

    async fn fetch_demographics(
        &self,
        upstream_id: &str,
    ) -> Result<Option<DemographicsSnapshot>> {
        let demographics = self
            .client
            .get_demographics(upstream_id)
            .await
            .map_err(CacheError::directory)?;

        Ok(demographics.map(|d| DemographicsSnapshot {
            episodes_analyzed: d.episodes_analyzed,
            breakdown: d.breakdown,
            fetched_at: Utc::now(),
        }))
    }
}

/// Flatten the API shape into the cache's snapshot type.
fn to_snapshot(podcast: podscan::Podcast) -> PodcastSnapshot {
    let reach = podcast.reach;

    PodcastSnapshot {
        upstream_id: podcast.podcast_id,
        name: podcast.podcast_name,
        description: podcast.podcast_description,
        image_url: podcast.podcast_image_url,
        url: podcast.podcast_url,
        publisher: podcast.publisher,
        categories: podcast
            .categories
            .into_iter()
            .map(|c| Category {
                id: c.category_id,
                name: c.category_name,
            })
            .collect(),
        language: podcast.language,
        region: podcast.region,
        episode_count: podcast.episode_count,
        last_episode_at: podcast.last_posted_at.as_deref().and_then(parse_timestamp),
        is_active: podcast.is_active,
        has_guests: podcast.has_guests,
        has_sponsors: podcast.has_sponsors,
        ratings: podcast
            .ratings
            .into_iter()
            .map(|r| RatingSource {
                source: r.source,
                value: r.rating,
                count: r.rating_count,
                bucket: r.bucket,
            })
            .collect(),
        audience_size: reach.as_ref().and_then(|r| r.audience_size),
        reach_score: reach.as_ref().and_then(|r| r.score),
        contact_email: reach.as_ref().and_then(|r| r.email.clone()),
        website: reach.as_ref().and_then(|r| r.website.clone()),
        social_links: reach
            .and_then(|r| r.social_links)
            .and_then(|links| serde_json::to_value(links).ok()),
        rss_url: podcast.rss_url,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_conversion_flattens_reach() {
        let podcast: podscan::Podcast = serde_json::from_str(
            r#"{
                "podcast_id": "pd_1",
                "podcast_name": "The Startup Hour",
                "categories": [{"category_id": "cat_1", "category_name": "Business"}],
                "last_posted_at": "2026-07-30T08:00:00Z",
                "ratings": [{"source": "apple", "rating": 4.8, "rating_count": 10}],
                "reach": {
                    "audience_size": 54000,
                    "score": 72,
                    "email": "booking@startuphour.fm",
                    "social_links": {"twitter": "https://x.com/startuphour"}
                }
            }"#,
        )
        .unwrap();

        let snapshot = to_snapshot(podcast);

        assert_eq!(snapshot.upstream_id, "pd_1");
        assert_eq!(snapshot.categories[0].name, "Business");
        assert_eq!(snapshot.audience_size, Some(54000));
        assert_eq!(snapshot.reach_score, Some(72));
        assert_eq!(snapshot.contact_email.as_deref(), Some("booking@startuphour.fm"));
        assert!(snapshot.last_episode_at.is_some());
        assert_eq!(snapshot.ratings[0].count, Some(10));
        assert!(snapshot.social_links.is_some());
    }

    #[test]
    fn test_bad_timestamp_becomes_none() {
        assert!(parse_timestamp("yesterday-ish").is_none());
        assert!(parse_timestamp("2026-07-30T08:00:00Z").is_some());
    }
}
