//! Thin client for the Podscan podcast directory API.
//!
//! Covers the three endpoints the booking workflow needs: fetch one
//! podcast, fetch its audience demographics, and search the directory.
//! The client performs no retries; callers decide whether a failed lookup
//! is retried on a later invocation.
//!
//! Rate limits documented by the vendor: ~120 requests/minute and
//! ~2000 requests/day per API key. This client does not enforce them;
//! callers bound their own concurrency.

pub mod models;

use reqwest::{Client, StatusCode};
use thiserror::Error;

pub use crate::models::{
    CategoryEntry, Demographics, Podcast, RatingEntry, Reach, SearchResults, SocialLinks,
};

const DEFAULT_BASE_URL: &str = "https://podscan.fm/api/v1";

/// Errors returned by the Podscan client.
#[derive(Debug, Error)]
pub enum PodscanError {
    /// Request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("Podscan API error {status}: {body}")]
    Api { status: StatusCode, body: String },

    /// The response body did not match the expected shape.
    #[error("failed to parse Podscan response: {0}")]
    Parse(#[source] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, PodscanError>;

/// Podscan directory API client.
#[derive(Debug, Clone)]
pub struct PodscanClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl PodscanClient {
    /// Create a new client against the production API.
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Create a client against a custom base URL (staging, test server).
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Fetch one podcast's descriptive snapshot by its directory identifier.
    pub async fn get_podcast(&self, podcast_id: &str) -> Result<Podcast> {
        let url = format!("{}/podcasts/{}", self.base_url, podcast_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PodscanError::Api { status, body });
        }

        response.json::<Podcast>().await.map_err(PodscanError::Parse)
    }

    /// Fetch audience demographics for a podcast.
    ///
    /// Returns `Ok(None)` when the directory has no demographics for the
    /// podcast (404); every other non-2xx status is an error.
    pub async fn get_demographics(&self, podcast_id: &str) -> Result<Option<Demographics>> {
        let url = format!("{}/podcasts/{}/demographics", self.base_url, podcast_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PodscanError::Api { status, body });
        }

        response
            .json::<Demographics>()
            .await
            .map(Some)
            .map_err(PodscanError::Parse)
    }

    /// Search the directory. Results are paginated by the API.
    pub async fn search(
        &self,
        query: &str,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<SearchResults> {
        let url = format!("{}/podcasts/search", self.base_url);

        let mut params: Vec<(&str, String)> = vec![("query", query.to_string())];
        if let Some(page) = page {
            params.push(("page", page.to_string()));
        }
        if let Some(per_page) = per_page {
            params.push(("per_page", per_page.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PodscanError::Api { status, body });
        }

        response
            .json::<SearchResults>()
            .await
            .map_err(PodscanError::Parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client =
            PodscanClient::with_base_url("key".into(), "https://staging.podscan.fm/api/v1/".into())
                .unwrap();
        assert_eq!(client.base_url, "https://staging.podscan.fm/api/v1");
    }
}
