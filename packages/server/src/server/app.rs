//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use podcache::traits::{AnnotationStore, PodcastCache};
use podcache::types::ConsumerKind;
use podcache::{PostgresAnnotationStore, PostgresPodcastStore, SyncConfig, SyncEngine};
use podscan::PodscanClient;

use crate::config::Config;
use crate::kernel::{BaseRangeStore, GoogleSheetsClient, OpenAIClient, PodscanDirectory};
use crate::server::routes::{
    cache_stats, directory_search, health_handler, sync_client, sync_outreach, sync_prospect,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub store: Arc<dyn PodcastCache>,
    pub engine: Arc<SyncEngine>,
    pub client_annotations: Arc<dyn AnnotationStore>,
    pub prospect_annotations: Arc<dyn AnnotationStore>,
    pub outreach_annotations: Arc<dyn AnnotationStore>,
    pub range_store: Arc<dyn BaseRangeStore>,
    pub directory_client: Arc<PodscanClient>,
    pub stale_days: i64,
}

impl AppState {
    /// The annotation store for one consumer kind.
    pub fn annotations_for(&self, kind: ConsumerKind) -> &Arc<dyn AnnotationStore> {
        match kind {
            ConsumerKind::Client => &self.client_annotations,
            ConsumerKind::Prospect => &self.prospect_annotations,
            ConsumerKind::Outreach => &self.outreach_annotations,
        }
    }
}

/// Build the Axum application router and the shared state.
///
/// State is returned separately because the scheduled sweep needs the
/// store after the router is handed to axum.
pub fn build_app(pool: PgPool, config: &Config) -> anyhow::Result<(Router, AppState)> {
    // Upstream directory client (shared by the sync engine and the
    // search passthrough)
    let podscan_client = match &config.podscan_base_url {
        Some(base_url) => {
            PodscanClient::with_base_url(config.podscan_api_key.clone(), base_url.clone())?
        }
        None => PodscanClient::new(config.podscan_api_key.clone())?,
    };
    let directory_client = Arc::new(podscan_client);
    let directory = Arc::new(PodscanDirectory::new((*directory_client).clone()));

    // Scoring oracle
    let oracle = Arc::new(OpenAIClient::new(config.openai_api_key.clone()));

    // Google Sheets range store
    let range_store: Arc<dyn BaseRangeStore> = Arc::new(GoogleSheetsClient::new(
        config.google_service_account_email.clone(),
        &config.google_private_key,
        config.sheets_identifier_range.clone(),
    )?);

    // Stores over the shared pool
    let store: Arc<dyn PodcastCache> = Arc::new(PostgresPodcastStore::new(pool.clone()));
    let client_annotations: Arc<dyn AnnotationStore> = Arc::new(PostgresAnnotationStore::new(
        pool.clone(),
        ConsumerKind::Client,
    ));
    let prospect_annotations: Arc<dyn AnnotationStore> = Arc::new(PostgresAnnotationStore::new(
        pool.clone(),
        ConsumerKind::Prospect,
    ));
    let outreach_annotations: Arc<dyn AnnotationStore> = Arc::new(PostgresAnnotationStore::new(
        pool.clone(),
        ConsumerKind::Outreach,
    ));

    let sync_config = SyncConfig {
        stale_days: config.stale_days,
        time_budget: Duration::from_secs(config.time_budget_secs),
        ..SyncConfig::default()
    };
    let engine = Arc::new(SyncEngine::new(
        store.clone(),
        directory,
        oracle,
        sync_config,
    ));

    let state = AppState {
        db_pool: pool,
        store,
        engine,
        client_annotations,
        prospect_annotations,
        outreach_annotations,
        range_store,
        directory_client,
        stale_days: config.stale_days,
    };

    // CORS: the admin UI runs on its own origin
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let app = Router::new()
        // Orchestration entry points
        .route("/api/sync/client", post(sync_client))
        .route("/api/sync/prospect", post(sync_prospect))
        .route("/api/sync/outreach", post(sync_outreach))
        // Cache statistics and directory search for admin tooling
        .route("/api/cache/stats", get(cache_stats))
        .route("/api/directory/search", get(directory_search))
        // Health check
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    Ok((app, state))
}
