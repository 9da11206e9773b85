use crate::common::types::{EventDate, EventRecord, RawEvent};
use crate::metrics::DateMetrics;
use crate::pipeline::dates::DateParseOutcome;

/// Turn one raw event and its date outcome into event records.
///
/// Multi-date listings become exactly two records, at the first and last
/// listed date; dates in between are dropped and the combined listing is not
/// kept. Unparseable dates still produce one record carrying the reason.
pub fn expand(raw: &RawEvent, outcome: DateParseOutcome) -> Vec<EventRecord> {
    match outcome {
        DateParseOutcome::Single(date) => vec![EventRecord::from_raw(raw, EventDate::Resolved(date))],
        DateParseOutcome::Multiple(dates) => {
            DateMetrics::record_expansion();
            boundary_dates(&dates)
                .into_iter()
                .map(|date| EventRecord::from_raw(raw, EventDate::Resolved(date)))
                .collect()
        }
        DateParseOutcome::Unparseable(reason) => {
            DateMetrics::record_unresolved(&raw.source_id, reason.label());
            vec![EventRecord::from_raw(raw, EventDate::Unresolved(reason))]
        }
    }
}

fn boundary_dates<T: Copy>(dates: &[T]) -> Vec<T> {
    match (dates.first(), dates.last()) {
        (Some(first), Some(last)) if dates.len() > 1 => vec![*first, *last],
        (Some(only), _) => vec![*only],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::DateFailure;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn raw() -> RawEvent {
        RawEvent {
            source_id: "ticketek".into(),
            title: "Royel Otis".into(),
            raw_date: "Tues 30 Jan & Wed 31 Jan".into(),
            venue: "Forum Melbourne".into(),
            link: "https://premier.ticketek.com.au/shows/show.aspx?sh=ROYELOTI25".into(),
            image: Some("https://cdn.example.com/royel.jpg".into()),
        }
    }

    #[test]
    fn test_two_dates_become_two_identical_records() {
        let records = expand(
            &raw(),
            DateParseOutcome::Multiple(vec![date(2025, 1, 30), date(2025, 1, 31)]),
        );
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, EventDate::Resolved(date(2025, 1, 30)));
        assert_eq!(records[1].date, EventDate::Resolved(date(2025, 1, 31)));
        for record in &records {
            assert_eq!(record.title, "Royel Otis");
            assert_eq!(record.venue, "Forum Melbourne");
            assert_eq!(record.link, raw().link);
            assert_eq!(record.image, raw().image);
        }
    }

    #[test]
    fn test_long_run_keeps_first_and_last_only() {
        let records = expand(
            &raw(),
            DateParseOutcome::Multiple(vec![
                date(2025, 3, 1),
                date(2025, 3, 2),
                date(2025, 3, 3),
                date(2025, 3, 4),
            ]),
        );
        let dates: Vec<_> = records.iter().filter_map(|r| r.date.resolved()).collect();
        assert_eq!(dates, vec![date(2025, 3, 1), date(2025, 3, 4)]);
    }

    #[test]
    fn test_unparseable_kept_with_reason() {
        let records = expand(&raw(), DateParseOutcome::Unparseable(DateFailure::ResolverFailure));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, EventDate::Unresolved(DateFailure::ResolverFailure));
        assert_eq!(records[0].raw_date, "Tues 30 Jan & Wed 31 Jan");
    }

    #[test]
    fn test_single_date_passes_through() {
        let records = expand(&raw(), DateParseOutcome::Single(date(2025, 2, 1)));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date.resolved(), Some(date(2025, 2, 1)));
    }
}
