//! Kernel module - server infrastructure and dependencies.

pub mod ai;
pub mod directory;
pub mod scheduled_tasks;
pub mod sheets_client;
pub mod test_dependencies;

use anyhow::Result;
use async_trait::async_trait;

/// Read-only identifier source for one consumer (a spreadsheet range).
///
/// The range store is the consumer's editable source of truth for which
/// podcasts matter to them; this trait only ever reads it.
#[async_trait]
pub trait BaseRangeStore: Send + Sync {
    /// Read the identifier column for the given range source.
    async fn read_identifiers(&self, range_source_id: &str) -> Result<Vec<String>>;
}

pub use ai::OpenAIClient;
pub use directory::PodscanDirectory;
pub use scheduled_tasks::start_scheduler;
pub use sheets_client::GoogleSheetsClient;
pub use test_dependencies::MockRangeStore;
