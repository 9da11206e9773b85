use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::common::error::Result;
use crate::common::types::{EventRecord, ListedEvent};

#[derive(Debug, Serialize)]
struct RunOutput<'a> {
    run_id: &'a str,
    generated_at: DateTime<Utc>,
    run_date: NaiveDate,
    events: &'a [ListedEvent],
    unresolved: &'a [EventRecord],
}

/// Write the listing table and the unresolved audit list to
/// `<output_dir>/events_<timestamp>.json`. Returns the written path.
pub fn persist_to_json(
    run_id: &str,
    run_date: NaiveDate,
    events: &[ListedEvent],
    unresolved: &[EventRecord],
    output_dir: &Path,
) -> Result<String> {
    fs::create_dir_all(output_dir)?;

    let generated_at = Utc::now();
    let filename = format!("events_{}.json", generated_at.format("%Y%m%d_%H%M%S"));
    let filepath = output_dir.join(&filename);

    let output = RunOutput {
        run_id,
        generated_at,
        run_date,
        events,
        unresolved,
    };
    fs::write(&filepath, serde_json::to_string_pretty(&output)?)?;

    Ok(filepath.to_string_lossy().to_string())
}
