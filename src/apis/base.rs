use crate::common::error::Result;
use crate::common::types::RawEvent;

/// One place events are scraped from.
///
/// Adapters only produce raw tuples; dates stay as the source printed them.
/// A failed fetch fails this source only.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source_id(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<RawEvent>>;
}
