//! Mock infrastructure dependencies for server tests.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use super::BaseRangeStore;

/// In-memory range store: canned identifier lists per range source id.
#[derive(Default)]
pub struct MockRangeStore {
    ranges: HashMap<String, Vec<String>>,
}

impl MockRangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve these identifiers for a range source id.
    pub fn with_range(mut self, range_source_id: &str, identifiers: &[&str]) -> Self {
        self.ranges.insert(
            range_source_id.to_string(),
            identifiers.iter().map(|s| s.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl BaseRangeStore for MockRangeStore {
    async fn read_identifiers(&self, range_source_id: &str) -> Result<Vec<String>> {
        self.ranges
            .get(range_source_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown range source: {range_source_id}"))
    }
}
