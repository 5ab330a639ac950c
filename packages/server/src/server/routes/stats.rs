//! Cache statistics endpoint - the derived aggregate view plus the
//! fresh/stale split for the configured window.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use podcache::traits::PodcastCache;
use podcache::types::CacheStatistics;

use crate::server::app::AppState;
use crate::server::routes::sync::ErrorResponse;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub success: bool,
    pub stale_days: i64,
    pub stats: CacheStatistics,
}

pub async fn cache_stats(
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let stats = state
        .store
        .statistics(state.stale_days)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to read cache statistics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    success: false,
                    error: format!("Failed to read cache statistics: {e}"),
                }),
            )
        })?;

    Ok(Json(StatsResponse {
        success: true,
        stale_days: state.stale_days,
        stats,
    }))
}
