use std::path::PathBuf;
use tracing::{info, instrument};

use super::base::SourceAdapter;
use crate::common::error::{Result, ScraperError};
use crate::common::types::RawEvent;

/// Replays raw tuples captured earlier, for offline runs and fixtures.
///
/// The file holds a JSON array of raw events; `source_id` may be omitted and
/// is stamped from the adapter.
pub struct JsonFileAdapter {
    source_id: String,
    path: PathBuf,
}

impl JsonFileAdapter {
    pub fn new(source_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            source_id: source_id.into(),
            path: path.into(),
        }
    }
}

#[async_trait::async_trait]
impl SourceAdapter for JsonFileAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    #[instrument(skip(self), fields(source = %self.source_id))]
    async fn fetch(&self) -> Result<Vec<RawEvent>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| ScraperError::Source {
            source_id: self.source_id.clone(),
            message: format!("cannot read {}: {}", self.path.display(), e),
        })?;

        let mut events: Vec<RawEvent> = serde_json::from_str(&content)?;
        for event in &mut events {
            event.source_id = self.source_id.clone();
        }

        info!("Loaded {} raw events from {}", events.len(), self.path.display());
        Ok(events)
    }
}
