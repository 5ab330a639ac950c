//! Orchestration entry points - one handler per consumer kind, all
//! delegating to the shared sync engine.
//!
//! Request flags map onto engine modes (first match wins):
//! `checkStatusOnly` > `cacheOnly` > `aiAnalysisOnly` > full sync.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use podcache::types::{AnnotatedPodcast, ConsumerKind, ConsumerProfile, SyncStats};
use podcache::{SyncMode, SyncRequest};

use crate::server::app::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequestBody {
    /// Spreadsheet holding this consumer's identifier range.
    pub range_source_id: String,
    pub consumer_id: String,
    #[serde(default)]
    pub consumer_name: Option<String>,
    #[serde(default)]
    pub consumer_bio: Option<String>,
    #[serde(default)]
    pub cache_only: bool,
    #[serde(default)]
    pub skip_ai_analysis: bool,
    #[serde(default)]
    pub ai_analysis_only: bool,
    #[serde(default)]
    pub check_status_only: bool,
    #[serde(default)]
    pub refresh_stale: bool,
}

impl SyncRequestBody {
    fn mode(&self) -> SyncMode {
        if self.check_status_only {
            SyncMode::StatusOnly
        } else if self.cache_only {
            SyncMode::CacheOnly
        } else if self.ai_analysis_only {
            SyncMode::AnalysisOnly
        } else {
            SyncMode::Full {
                skip_analysis: self.skip_ai_analysis,
                refresh_stale: self.refresh_stale,
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub podcasts: Vec<AnnotatedPodcast>,
    pub total: usize,
    pub cached: usize,
    pub fetched: usize,
    pub stopped_early: bool,
    pub remaining: usize,
    pub stats: SyncStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

pub type SyncResult = Result<Json<SyncResponse>, (StatusCode, Json<ErrorResponse>)>;

pub async fn sync_client(
    State(state): State<AppState>,
    Json(body): Json<SyncRequestBody>,
) -> SyncResult {
    run_sync(&state, ConsumerKind::Client, body).await
}

pub async fn sync_prospect(
    State(state): State<AppState>,
    Json(body): Json<SyncRequestBody>,
) -> SyncResult {
    run_sync(&state, ConsumerKind::Prospect, body).await
}

pub async fn sync_outreach(
    State(state): State<AppState>,
    Json(body): Json<SyncRequestBody>,
) -> SyncResult {
    run_sync(&state, ConsumerKind::Outreach, body).await
}

async fn run_sync(state: &AppState, kind: ConsumerKind, body: SyncRequestBody) -> SyncResult {
    tracing::info!(
        kind = %kind,
        consumer_id = %body.consumer_id,
        range_source_id = %body.range_source_id,
        "Sync requested"
    );

    let identifiers = state
        .range_store
        .read_identifiers(&body.range_source_id)
        .await
        .map_err(|e| internal_error("Failed to read identifier range", e))?;

    let mode = body.mode();
    let consumer = ConsumerProfile::new(
        body.consumer_id,
        body.consumer_name.unwrap_or_default(),
        body.consumer_bio.unwrap_or_default(),
    );

    let outcome = state
        .engine
        .run(
            state.annotations_for(kind).as_ref(),
            SyncRequest {
                identifiers,
                consumer,
                mode,
            },
        )
        .await
        .map_err(|e| internal_error("Sync failed", e))?;

    Ok(Json(SyncResponse {
        success: true,
        podcasts: outcome.podcasts,
        total: outcome.total,
        cached: outcome.cached,
        fetched: outcome.fetched,
        stopped_early: outcome.stopped_early,
        remaining: outcome.remaining,
        stats: outcome.stats,
    }))
}

fn internal_error(
    message: &str,
    error: impl std::fmt::Display,
) -> (StatusCode, Json<ErrorResponse>) {
    tracing::error!(error = %error, "{message}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            success: false,
            error: format!("{message}: {error}"),
        }),
    )
}
