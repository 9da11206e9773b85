//! Natural-language fallback for date strings the deterministic grammar
//! cannot handle.
//!
//! Implementations never return an error: every transport or decoding failure
//! is logged and collapses to an empty result.

pub mod openai;

use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::common::constants::ISO_DATE_FORMAT;

pub use openai::OpenAiDateResolver;

static ISO_IN_REPLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("valid regex"));

static EXPLICIT_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid regex"));

#[async_trait]
pub trait DateResolver: Send + Sync {
    fn name(&self) -> &str;

    /// Disabled resolvers are skipped entirely so the record keeps the
    /// reason it was escalated for.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Interpret `raw_date`, assuming `current_year` when the text has no
    /// year. Ranges come back as every boundary date, in order.
    async fn resolve(&self, raw_date: &str, current_year: i32) -> Vec<NaiveDate>;
}

/// Used when no API key is configured
pub struct DisabledResolver;

#[async_trait]
impl DateResolver for DisabledResolver {
    fn name(&self) -> &str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn resolve(&self, _raw_date: &str, _current_year: i32) -> Vec<NaiveDate> {
        Vec::new()
    }
}

/// Pull every `YYYY-MM-DD` out of a free-text reply, in order.
/// Invalid calendar dates ("2025-02-30") are dropped.
pub fn parse_reply(reply: &str) -> Vec<NaiveDate> {
    ISO_IN_REPLY
        .find_iter(reply)
        .filter_map(|m| match NaiveDate::parse_from_str(m.as_str(), ISO_DATE_FORMAT) {
            Ok(date) => Some(date),
            Err(e) => {
                warn!("Discarding resolver date '{}': {}", m.as_str(), e);
                None
            }
        })
        .collect()
}

/// Whether the scraped text itself names a year
pub fn has_explicit_year(raw_date: &str) -> bool {
    EXPLICIT_YEAR.is_match(raw_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_reply_comma_list() {
        assert_eq!(
            parse_reply("2025-01-30, 2025-01-31"),
            vec![date(2025, 1, 30), date(2025, 1, 31)]
        );
    }

    #[test]
    fn test_parse_reply_tolerates_quotes_and_fences() {
        let reply = "```\n'2025-03-07', '2025-03-08'\n```";
        assert_eq!(parse_reply(reply), vec![date(2025, 3, 7), date(2025, 3, 8)]);
    }

    #[test]
    fn test_parse_reply_drops_invalid_and_chatter() {
        assert_eq!(parse_reply("2025-02-30"), Vec::<NaiveDate>::new());
        assert_eq!(parse_reply("I could not find a date."), Vec::<NaiveDate>::new());
    }

    #[test]
    fn test_explicit_year_detection() {
        assert!(has_explicit_year("Fri 30 Jan 2026"));
        assert!(!has_explicit_year("Tues 30 Jan & Wed 31 Jan"));
        assert!(!has_explicit_year("Doors 20:00"));
    }

    #[tokio::test]
    async fn test_disabled_resolver_returns_nothing() {
        let resolver = DisabledResolver;
        assert!(!resolver.is_enabled());
        assert!(resolver.resolve("Tues 30 Jan", 2025).await.is_empty());
    }
}
