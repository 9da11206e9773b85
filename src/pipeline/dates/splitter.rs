use once_cell::sync::Lazy;
use regex::Regex;

use crate::common::constants::MULTI_DATE_DELIMITERS;

static ISO_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\d{4}-\d{1,2}-\d{1,2}(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?$",
    )
    .expect("valid regex")
});

/// True when the raw text looks like a list or range of dates.
///
/// A hyphen inside one date cannot be told apart from a range hyphen, so any
/// delimiter counts; only a bare ISO date or timestamp is exempt.
pub fn is_multi_date(raw: &str) -> bool {
    let trimmed = raw.trim();
    if ISO_TIMESTAMP.is_match(trimmed) {
        return false;
    }

    let lowered = format!(" {} ", trimmed.to_lowercase());
    MULTI_DATE_DELIMITERS
        .iter()
        .any(|delimiter| lowered.contains(delimiter))
}
