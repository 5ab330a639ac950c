//! Central Podcast Cache & Outreach Sync Core
//!
//! The shared cache that turns per-campaign directory fetches into a
//! one-time, shared cost: given the identifiers a consumer cares about,
//! serve what is already known, fetch only what is not, and write results
//! back so every future caller benefits.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use podcache::{MemoryStore, SyncConfig, SyncEngine, SyncMode, SyncRequest};
//! use podcache::types::ConsumerProfile;
//!
//! let store = Arc::new(MemoryStore::new());
//! let engine = SyncEngine::new(store, directory, oracle, SyncConfig::default());
//!
//! let outcome = engine
//!     .run(&annotations, SyncRequest {
//!         identifiers: vec!["pd_abc".into(), "pd_def".into()],
//!         consumer: ConsumerProfile::new("client-1", "Dana", "Fractional CFO"),
//!         mode: SyncMode::Full { skip_analysis: false, refresh_stale: false },
//!     })
//!     .await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (PodcastCache, AnnotationStore,
//!   Directory, FitOracle)
//! - [`types`] - Podcast snapshots, annotations, outcomes
//! - [`resolver`] - Cache resolver with fire-and-forget hit counting
//! - [`pipeline`] - Bounded-time fetch/analyze loops and the sync engine
//! - [`stores`] - Storage implementations (MemoryStore, Postgres behind
//!   the `postgres` feature)
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod pipeline;
pub mod resolver;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{CacheError, Result};
pub use pipeline::{SyncConfig, SyncEngine, SyncMode, SyncRequest, TimeBudget};
pub use resolver::{HitRecorder, Resolver};
pub use stores::MemoryStore;
pub use traits::{AnnotationStore, Directory, FitOracle, PodcastCache};
pub use types::{
    AnnotatedPodcast, Annotation, AnnotationInput, CacheStatistics, CachedPodcast, ConsumerKind,
    ConsumerProfile, FitAnalysis, PitchAngle, PodcastRecord, PodcastSnapshot, SyncOutcome,
    SyncStats,
};

#[cfg(feature = "postgres")]
pub use stores::{PostgresAnnotationStore, PostgresPodcastStore};
