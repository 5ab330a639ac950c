//! Google Sheets range store client.
//!
//! Each consumer's sheet is the editable source of truth for "which
//! podcasts are relevant to me"; this client does a read-only range scan
//! and extracts the identifier column (the first column of the
//! configured range). Auth is a service-account JWT minted locally and
//! exchanged for a short-lived access token, cached until near expiry.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::BaseRangeStore;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
/// Refresh the access token a minute before Google expires it.
const TOKEN_EXPIRY_SLACK: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// A `values.get` response; rows of loosely-typed cells.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Google Sheets client scoped to one identifier range per spreadsheet.
pub struct GoogleSheetsClient {
    service_account_email: String,
    encoding_key: EncodingKey,
    identifier_range: String,
    client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleSheetsClient {
    /// Create a client from service-account credentials.
    ///
    /// `private_key` is the PEM-encoded RSA key from the service account
    /// JSON; `identifier_range` is the A1 range holding identifiers in
    /// its first column (e.g. `Podcasts!A2:A`).
    pub fn new(
        service_account_email: String,
        private_key: &str,
        identifier_range: String,
    ) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key.as_bytes())
            .context("GOOGLE_PRIVATE_KEY is not a valid RSA PEM key")?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            service_account_email,
            encoding_key,
            identifier_range,
            client,
            token: Mutex::new(None),
        })
    }

    /// Mint a service-account JWT and exchange it for an access token.
    async fn fetch_access_token(&self) -> Result<TokenResponse> {
        let now = chrono::Utc::now().timestamp();
        let claims = JwtClaims {
            iss: &self.service_account_email,
            scope: SHEETS_SCOPE,
            aud: TOKEN_URL,
            iat: now,
            exp: now + 3600,
        };

        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .context("Failed to sign service-account JWT")?;

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .context("Failed to send token exchange request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Google token exchange error {}: {}", status, body);
        }

        response
            .json::<TokenResponse>()
            .await
            .context("Failed to parse token exchange response")
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.fetch_access_token().await?;
        let expires_at = Instant::now()
            + Duration::from_secs(fresh.expires_in).saturating_sub(TOKEN_EXPIRY_SLACK);
        let access_token = fresh.access_token.clone();

        *cached = Some(CachedToken {
            access_token: fresh.access_token,
            expires_at,
        });

        Ok(access_token)
    }
}

#[async_trait]
impl BaseRangeStore for GoogleSheetsClient {
    async fn read_identifiers(&self, range_source_id: &str) -> Result<Vec<String>> {
        let token = self.access_token().await?;

        let url = format!(
            "https://sheets.googleapis.com/v4/spreadsheets/{}/values/{}",
            range_source_id,
            urlencode(&self.identifier_range)
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to send Sheets range request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Google Sheets API error {}: {}", status, body);
        }

        let range: ValueRange = response
            .json()
            .await
            .context("Failed to parse Sheets range response")?;

        let identifiers = identifier_column(&range.values);

        tracing::info!(
            range_source_id = %range_source_id,
            identifiers = identifiers.len(),
            "Read identifier range"
        );

        Ok(identifiers)
    }
}

/// First column of each row, trimmed, empties dropped.
fn identifier_column(rows: &[Vec<serde_json::Value>]) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.first())
        .filter_map(|cell| cell.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Minimal percent-encoding for the A1 range path segment (`!` and `:`
/// are safe; spaces and quotes in sheet names are not).
fn urlencode(range: &str) -> String {
    range
        .chars()
        .map(|c| match c {
            ' ' => "%20".to_string(),
            '\'' => "%27".to_string(),
            _ => c.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_column_takes_first_cell_of_each_row() {
        let rows = vec![
            vec![serde_json::json!("pd_1"), serde_json::json!("85")],
            vec![serde_json::json!(" pd_2 ")],
            vec![serde_json::json!("")],
            vec![],
            vec![serde_json::json!("pd_3")],
        ];

        assert_eq!(identifier_column(&rows), vec!["pd_1", "pd_2", "pd_3"]);
    }

    #[test]
    fn test_range_encoding_handles_sheet_names_with_spaces() {
        assert_eq!(urlencode("Podcasts!A2:A"), "Podcasts!A2:A");
        assert_eq!(urlencode("'My Podcasts'!A2:A"), "%27My%20Podcasts%27!A2:A");
    }
}
