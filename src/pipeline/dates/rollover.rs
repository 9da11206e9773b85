use chrono::{Months, NaiveDate};

use super::NormalizedDate;
use crate::common::types::DateFailure;

/// Move an assumed-year date that already passed into next year.
///
/// Listings omit the year for near-term shows, so "15 Jan" read in December is
/// next January. Dates whose year came from the text are never moved; if one
/// of those is in the past the listing is stale.
pub fn roll_forward(parsed: NormalizedDate, today: NaiveDate) -> Result<NaiveDate, DateFailure> {
    if parsed.date >= today {
        return Ok(parsed.date);
    }
    if !parsed.year_assumed {
        return Err(DateFailure::ExpiredDate(parsed.date));
    }
    // 29 Feb clamps to 28 Feb in a non-leap year
    parsed
        .date
        .checked_add_months(Months::new(12))
        .ok_or(DateFailure::ParseFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_assumed_past_date_moves_to_next_year() {
        let parsed = NormalizedDate::assumed(date(2025, 1, 15));
        assert_eq!(roll_forward(parsed, date(2025, 12, 20)), Ok(date(2026, 1, 15)));
    }

    #[test]
    fn test_today_and_future_unchanged() {
        let today = date(2025, 12, 20);
        assert_eq!(roll_forward(NormalizedDate::assumed(today), today), Ok(today));
        assert_eq!(
            roll_forward(NormalizedDate::assumed(date(2025, 12, 31)), today),
            Ok(date(2025, 12, 31))
        );
    }

    #[test]
    fn test_explicit_past_year_is_expired_not_rolled() {
        let parsed = NormalizedDate::explicit(date(2025, 1, 15));
        assert_eq!(
            roll_forward(parsed, date(2025, 12, 20)),
            Err(DateFailure::ExpiredDate(date(2025, 1, 15)))
        );
    }

    #[test]
    fn test_leap_day_clamps() {
        let parsed = NormalizedDate::assumed(date(2024, 2, 29));
        assert_eq!(roll_forward(parsed, date(2024, 6, 1)), Ok(date(2025, 2, 28)));
    }
}
