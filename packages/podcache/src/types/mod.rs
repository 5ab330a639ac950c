//! Core data types for the podcast cache.

pub mod annotation;
pub mod outcome;
pub mod podcast;

pub use annotation::{
    Annotation, AnnotationInput, ConsumerKind, ConsumerProfile, FitAnalysis, PitchAngle,
};
pub use outcome::{
    AnalyzeOutcome, AnnotatedPodcast, CacheStatistics, FetchOutcome, ResolvedSet, SyncOutcome,
    SyncStats,
};
pub use podcast::{
    CachedPodcast, Category, DemographicsSnapshot, PodcastRecord, PodcastSnapshot, RatingSource,
};
