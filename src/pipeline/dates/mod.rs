//! Date normalization: deterministic grammar first, resolver as the costly
//! fallback, then year rollover.

pub mod parser;
pub mod profile;
pub mod rollover;
pub mod splitter;

use chrono::{Datelike, NaiveDate};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::common::types::DateFailure;
use crate::metrics::DateMetrics;
use crate::pipeline::resolver::{has_explicit_year, DateResolver};

pub use parser::parse_date;
pub use profile::{DateProfile, DelimiterPolicy};

/// A parsed calendar date plus whether its year was filled in by default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedDate {
    pub date: NaiveDate,
    pub year_assumed: bool,
}

impl NormalizedDate {
    /// Year came from the text
    pub fn explicit(date: NaiveDate) -> Self {
        Self { date, year_assumed: false }
    }

    /// No year in the text; the current year was assumed
    pub fn assumed(date: NaiveDate) -> Self {
        Self { date, year_assumed: true }
    }

    /// Computed relative to today ("tomorrow", "friday"); never needs rolling
    pub fn derived(date: NaiveDate) -> Self {
        Self { date, year_assumed: false }
    }
}

/// Result of normalizing one raw date string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateParseOutcome {
    Single(NaiveDate),
    /// Two or more dates in the order the source listed them
    Multiple(Vec<NaiveDate>),
    Unparseable(DateFailure),
}

impl DateParseOutcome {
    fn from_dates(dates: Vec<NaiveDate>, empty_reason: DateFailure) -> Self {
        match dates.len() {
            0 => DateParseOutcome::Unparseable(empty_reason),
            1 => DateParseOutcome::Single(dates[0]),
            _ => DateParseOutcome::Multiple(dates),
        }
    }
}

/// Runs the full date ladder for one raw string under a source profile
#[derive(Clone)]
pub struct DateNormalizer {
    resolver: Arc<dyn DateResolver>,
}

impl DateNormalizer {
    pub fn new(resolver: Arc<dyn DateResolver>) -> Self {
        Self { resolver }
    }

    /// Normalize `raw` as seen on `today`. Never fails; problems surface as
    /// `Unparseable` with the reason attached.
    pub async fn normalize(
        &self,
        source_id: &str,
        raw: &str,
        profile: &DateProfile,
        today: NaiveDate,
    ) -> DateParseOutcome {
        if raw.trim().is_empty() {
            debug!(source = source_id, raw_date = raw, "Empty date text, leaving unresolved");
            return DateParseOutcome::Unparseable(DateFailure::Empty);
        }

        if profile.escalates_ranges() && splitter::is_multi_date(raw) {
            warn!(source = source_id, raw_date = raw, "Multiple dates detected, escalating to resolver");
            return self
                .resolve(source_id, raw, today, DateFailure::AmbiguousMultiDate)
                .await;
        }

        match parse_date(raw, profile, today) {
            Ok(parsed) => {
                DateMetrics::record_deterministic(source_id);
                match rollover::roll_forward(parsed, today) {
                    Ok(date) => {
                        if date != parsed.date {
                            debug!(source = source_id, raw_date = raw, "Rolled {} forward to {}", parsed.date, date);
                            DateMetrics::record_rollover();
                        }
                        DateParseOutcome::Single(date)
                    }
                    Err(reason) => {
                        warn!(source = source_id, raw_date = raw, "Leaving date unresolved: {}", reason);
                        DateParseOutcome::Unparseable(reason)
                    }
                }
            }
            Err(DateFailure::Empty) => {
                debug!(source = source_id, raw_date = raw, "Empty date text, leaving unresolved");
                DateParseOutcome::Unparseable(DateFailure::Empty)
            }
            Err(reason) => {
                warn!(source = source_id, raw_date = raw, "Cannot parse date deterministically, escalating to resolver");
                self.resolve(source_id, raw, today, reason).await
            }
        }
    }

    async fn resolve(
        &self,
        source_id: &str,
        raw: &str,
        today: NaiveDate,
        escalated_for: DateFailure,
    ) -> DateParseOutcome {
        if !self.resolver.is_enabled() {
            return DateParseOutcome::Unparseable(escalated_for);
        }

        let resolved = self.resolver.resolve(raw, today.year()).await;
        if resolved.is_empty() {
            warn!(source = source_id, raw_date = raw, resolver = self.resolver.name(), "Resolver could not interpret date");
            return DateParseOutcome::Unparseable(DateFailure::ResolverFailure);
        }
        DateMetrics::record_resolver_success(source_id);

        let year_assumed = !has_explicit_year(raw);
        let mut dates = Vec::with_capacity(resolved.len());
        let mut expired = None;
        for date in resolved {
            let parsed = NormalizedDate { date, year_assumed };
            match rollover::roll_forward(parsed, today) {
                Ok(rolled) => {
                    if rolled != date {
                        DateMetrics::record_rollover();
                    }
                    dates.push(rolled);
                }
                Err(reason) => {
                    warn!(source = source_id, raw_date = raw, "Dropping resolved date: {}", reason);
                    expired.get_or_insert(reason);
                }
            }
        }

        DateParseOutcome::from_dates(dates, expired.unwrap_or(DateFailure::ResolverFailure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::resolver::DisabledResolver;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tracing_subscriber::fmt::MakeWriter;

    /// Collects formatted log lines for assertions
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Replies with a fixed list and counts calls
    struct FixedResolver {
        dates: Vec<NaiveDate>,
        calls: AtomicUsize,
    }

    impl FixedResolver {
        fn new(dates: Vec<NaiveDate>) -> Arc<Self> {
            Arc::new(Self { dates, calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl DateResolver for FixedResolver {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn resolve(&self, _raw_date: &str, _current_year: i32) -> Vec<NaiveDate> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.dates.clone()
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_year_rollover_on_december_run() {
        let normalizer = DateNormalizer::new(Arc::new(DisabledResolver));
        let outcome = normalizer
            .normalize("oztix", "15 Jan", &DateProfile::default(), date(2025, 12, 20))
            .await;
        assert_eq!(outcome, DateParseOutcome::Single(date(2026, 1, 15)));
    }

    #[tokio::test]
    async fn test_deterministic_success_skips_resolver() {
        let resolver = FixedResolver::new(vec![date(2030, 1, 1)]);
        let normalizer = DateNormalizer::new(resolver.clone());
        let outcome = normalizer
            .normalize("oztix", "Sat 1 Nov", &DateProfile::default(), date(2025, 10, 17))
            .await;
        assert_eq!(outcome, DateParseOutcome::Single(date(2025, 11, 1)));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_range_goes_straight_to_resolver() {
        let resolver = FixedResolver::new(vec![date(2025, 1, 30), date(2025, 1, 31)]);
        let normalizer = DateNormalizer::new(resolver.clone());
        let outcome = normalizer
            .normalize("ticketek", "Tues 30 Jan & Wed 31 Jan", &DateProfile::ranged(), date(2025, 1, 10))
            .await;
        assert_eq!(
            outcome,
            DateParseOutcome::Multiple(vec![date(2025, 1, 30), date(2025, 1, 31)])
        );
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_range_without_resolver_keeps_reason() {
        let normalizer = DateNormalizer::new(Arc::new(DisabledResolver));
        let outcome = normalizer
            .normalize("ticketek", "30 Jan - 2 Feb", &DateProfile::ranged(), date(2025, 1, 10))
            .await;
        assert_eq!(outcome, DateParseOutcome::Unparseable(DateFailure::AmbiguousMultiDate));
    }

    #[tokio::test]
    async fn test_parse_failure_escalates_once() {
        let resolver = FixedResolver::new(vec![date(2025, 11, 8)]);
        let normalizer = DateNormalizer::new(resolver.clone());
        let outcome = normalizer
            .normalize("humanitix", "this coming sat night", &DateProfile::default(), date(2025, 10, 17))
            .await;
        assert_eq!(outcome, DateParseOutcome::Single(date(2025, 11, 8)));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_resolver_reply_is_resolver_failure() {
        let resolver = FixedResolver::new(Vec::new());
        let normalizer = DateNormalizer::new(resolver.clone());
        let outcome = normalizer
            .normalize("humanitix", "date TBC", &DateProfile::default(), date(2025, 10, 17))
            .await;
        assert_eq!(outcome, DateParseOutcome::Unparseable(DateFailure::ResolverFailure));
    }

    #[tokio::test]
    async fn test_empty_input_never_calls_resolver() {
        let resolver = FixedResolver::new(vec![date(2025, 11, 8)]);
        let normalizer = DateNormalizer::new(resolver.clone());
        let outcome = normalizer
            .normalize("eventbrite", "   ", &DateProfile::ranged(), date(2025, 10, 17))
            .await;
        assert_eq!(outcome, DateParseOutcome::Unparseable(DateFailure::Empty));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolver_dates_roll_over_when_year_assumed() {
        // Range crossing new year, read in December; resolver assumed the current year
        let resolver = FixedResolver::new(vec![date(2025, 12, 30), date(2025, 1, 2)]);
        let normalizer = DateNormalizer::new(resolver);
        let outcome = normalizer
            .normalize("ticketek", "30 Dec - 2 Jan", &DateProfile::ranged(), date(2025, 12, 20))
            .await;
        assert_eq!(
            outcome,
            DateParseOutcome::Multiple(vec![date(2025, 12, 30), date(2026, 1, 2)])
        );
    }

    #[tokio::test]
    async fn test_explicit_past_year_is_expired() {
        let normalizer = DateNormalizer::new(Arc::new(DisabledResolver));
        let outcome = normalizer
            .normalize("oztix", "Fri 3 Jan 2025", &DateProfile::default(), date(2025, 10, 17))
            .await;
        assert_eq!(
            outcome,
            DateParseOutcome::Unparseable(DateFailure::ExpiredDate(date(2025, 1, 3)))
        );
    }

    #[tokio::test]
    async fn test_local_failures_are_logged_with_source_and_text() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let normalizer = DateNormalizer::new(Arc::new(DisabledResolver));
        let today = date(2025, 10, 17);
        normalizer.normalize("oztix", "Fri 3 Jan 2025", &DateProfile::default(), today).await;
        normalizer.normalize("howler", "  ", &DateProfile::default(), today).await;

        let output = logs.contents();
        assert!(output.contains("oztix"), "{output}");
        assert!(output.contains("Fri 3 Jan 2025"));
        assert!(output.contains("already in the past"));
        assert!(output.contains("howler"));
        assert!(output.contains("Empty date text"));
    }
}
