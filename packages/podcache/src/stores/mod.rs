//! Storage implementations (MemoryStore, Postgres stores).

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStore;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresAnnotationStore, PostgresPodcastStore};
