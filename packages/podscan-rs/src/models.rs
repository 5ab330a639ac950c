//! Response models for the Podscan directory API.
//!
//! Fields are optional wherever the API has been observed to omit them;
//! only `podcast_id` is guaranteed.

use serde::{Deserialize, Serialize};

/// A single podcast as returned by `GET /podcasts/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Podcast {
    pub podcast_id: String,
    #[serde(default)]
    pub podcast_name: Option<String>,
    #[serde(default)]
    pub podcast_description: Option<String>,
    #[serde(default)]
    pub podcast_image_url: Option<String>,
    #[serde(default)]
    pub podcast_url: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub categories: Vec<CategoryEntry>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub episode_count: Option<i32>,
    #[serde(default)]
    pub last_posted_at: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub has_guests: Option<bool>,
    #[serde(default)]
    pub has_sponsors: Option<bool>,
    #[serde(default)]
    pub ratings: Vec<RatingEntry>,
    #[serde(default)]
    pub reach: Option<Reach>,
    #[serde(default)]
    pub rss_url: Option<String>,
}

/// One category assignment, ordered as the directory orders them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub category_id: String,
    pub category_name: String,
}

/// A rating from one rating source (Apple, Spotify, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingEntry {
    pub source: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub rating_count: Option<i64>,
    #[serde(default)]
    pub bucket: Option<String>,
}

/// Audience reach block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reach {
    #[serde(default)]
    pub audience_size: Option<i64>,
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub social_links: Option<SocialLinks>,
}

/// Social profile links attached to a podcast's reach block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialLinks {
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub youtube: Option<String>,
    #[serde(default)]
    pub facebook: Option<String>,
    #[serde(default)]
    pub tiktok: Option<String>,
}

/// Audience demographics as returned by `GET /podcasts/{id}/demographics`.
///
/// The breakdown payload is passed through opaquely; callers only inspect
/// `episodes_analyzed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demographics {
    #[serde(default)]
    pub episodes_analyzed: Option<i32>,
    #[serde(default)]
    pub breakdown: serde_json::Value,
}

/// Paginated search results from `GET /podcasts/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub podcasts: Vec<Podcast>,
    #[serde(default)]
    pub total: Option<i64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_podcast_decodes_minimal_payload() {
        let json = r#"{"podcast_id": "pd_abc123"}"#;
        let podcast: Podcast = serde_json::from_str(json).unwrap();

        assert_eq!(podcast.podcast_id, "pd_abc123");
        assert!(podcast.podcast_name.is_none());
        assert!(podcast.categories.is_empty());
        assert!(podcast.reach.is_none());
    }

    #[test]
    fn test_podcast_decodes_full_payload() {
        let json = r#"{
            "podcast_id": "pd_abc123",
            "podcast_name": "The Startup Hour",
            "podcast_description": "Interviews with founders.",
            "podcast_image_url": "https://cdn.example.com/art.jpg",
            "podcast_url": "https://podscan.fm/podcasts/pd_abc123",
            "publisher": "Acme Media",
            "categories": [
                {"category_id": "cat_1", "category_name": "Business"},
                {"category_id": "cat_9", "category_name": "Entrepreneurship"}
            ],
            "language": "en",
            "region": "us",
            "episode_count": 412,
            "last_posted_at": "2026-07-30T08:00:00Z",
            "is_active": true,
            "has_guests": true,
            "has_sponsors": false,
            "ratings": [
                {"source": "apple", "rating": 4.8, "rating_count": 1023, "bucket": "1000+"}
            ],
            "reach": {
                "audience_size": 54000,
                "score": 72,
                "email": "booking@startuphour.fm",
                "website": "https://startuphour.fm",
                "social_links": {"twitter": "https://x.com/startuphour"}
            },
            "rss_url": "https://feeds.example.com/startuphour"
        }"#;
        let podcast: Podcast = serde_json::from_str(json).unwrap();

        assert_eq!(podcast.podcast_name.as_deref(), Some("The Startup Hour"));
        assert_eq!(podcast.categories.len(), 2);
        assert_eq!(podcast.categories[0].category_name, "Business");
        assert_eq!(podcast.ratings[0].rating_count, Some(1023));
        let reach = podcast.reach.unwrap();
        assert_eq!(reach.audience_size, Some(54000));
        assert_eq!(
            reach.social_links.unwrap().twitter.as_deref(),
            Some("https://x.com/startuphour")
        );
    }

    #[test]
    fn test_demographics_breakdown_is_opaque() {
        let json = r#"{
            "episodes_analyzed": 25,
            "breakdown": {"gender": {"female": 0.44, "male": 0.56}, "age": {"25-34": 0.4}}
        }"#;
        let demo: Demographics = serde_json::from_str(json).unwrap();

        assert_eq!(demo.episodes_analyzed, Some(25));
        assert!(demo.breakdown.get("gender").is_some());
    }

    #[test]
    fn test_search_results_decode() {
        let json = r#"{
            "podcasts": [{"podcast_id": "pd_1"}, {"podcast_id": "pd_2"}],
            "total": 2,
            "page": 1,
            "per_page": 20
        }"#;
        let results: SearchResults = serde_json::from_str(json).unwrap();

        assert_eq!(results.podcasts.len(), 2);
        assert_eq!(results.total, Some(2));
    }
}
