//! Core trait abstractions (storage, directory, oracle).

pub mod directory;
pub mod oracle;
pub mod store;

pub use directory::Directory;
pub use oracle::FitOracle;
pub use store::{AnnotationStore, PodcastCache};
