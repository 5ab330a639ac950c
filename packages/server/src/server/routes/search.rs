//! Directory search passthrough - lets admin tooling find podcasts to
//! add to a consumer's sheet without holding its own directory key.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use podscan::SearchResults;

use crate::server::app::AppState;
use crate::server::routes::sync::ErrorResponse;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub success: bool,
    #[serde(flatten)]
    pub results: SearchResults,
}

pub async fn directory_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, Json<ErrorResponse>)> {
    let results = state
        .directory_client
        .search(&params.query, params.page, params.per_page)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, query = %params.query, "Directory search failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    success: false,
                    error: format!("Directory search failed: {e}"),
                }),
            )
        })?;

    Ok(Json(SearchResponse {
        success: true,
        results,
    }))
}
