use chrono::{Months, NaiveDate};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::common::types::{EventDate, EventRecord, ListedEvent};
use crate::metrics::RunMetrics;

/// Final table plus the records that never got a date
#[derive(Debug, Default, Serialize)]
pub struct Consolidated {
    pub events: Vec<ListedEvent>,
    pub unresolved: Vec<EventRecord>,
    pub duplicates_dropped: usize,
    pub outside_window: usize,
}

/// Date window applied to the final table
#[derive(Debug, Clone, Copy)]
pub struct ListingWindow {
    pub from: NaiveDate,
    pub to: Option<NaiveDate>,
}

impl ListingWindow {
    /// `months == 0` leaves the window open-ended
    pub fn starting(today: NaiveDate, months: u32) -> Self {
        let to = if months == 0 {
            None
        } else {
            today.checked_add_months(Months::new(months))
        };
        Self { from: today, to }
    }

    fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && self.to.map_or(true, |to| date <= to)
    }
}

/// Merge records from every source, in source priority order.
///
/// The first record seen for a `(title, date, venue)` key wins. Output is
/// sorted by date; the sort is stable so ties keep source priority.
/// Undated records go to `unresolved` and never take part in dedup.
pub fn consolidate(records: Vec<EventRecord>, window: Option<ListingWindow>) -> Consolidated {
    let mut seen: HashSet<(String, NaiveDate, String)> = HashSet::new();
    let mut result = Consolidated::default();

    for record in records {
        let date = match record.date {
            EventDate::Resolved(date) => date,
            EventDate::Unresolved(_) => {
                result.unresolved.push(record);
                continue;
            }
        };

        if let Some(window) = window {
            if !window.contains(date) {
                result.outside_window += 1;
                continue;
            }
        }

        let key = (record.title.clone(), date, record.venue.clone());
        if !seen.insert(key) {
            debug!("Dropping duplicate '{}' at {} on {}", record.title, record.venue, date);
            result.duplicates_dropped += 1;
            continue;
        }

        result.events.push(ListedEvent {
            title: record.title,
            venue: record.venue,
            date,
            link: record.link,
            image: record.image.map(|image| absolute_image_url(&image)),
            source_id: record.source_id,
        });
    }

    result.events.sort_by_key(|event| event.date);

    info!(
        "Consolidated {} events ({} duplicates, {} outside window, {} unresolved)",
        result.events.len(),
        result.duplicates_dropped,
        result.outside_window,
        result.unresolved.len()
    );
    RunMetrics::record_consolidation(result.events.len(), result.duplicates_dropped);

    result
}

/// Image URLs scraped as `//cdn...` are protocol-relative
fn absolute_image_url(image: &str) -> String {
    match image.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => image.to_string(),
    }
}
