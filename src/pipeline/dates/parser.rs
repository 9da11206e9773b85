//! Deterministic date grammar.
//!
//! Handles the shapes venue pages actually publish: ISO dates, numeric
//! `dd/mm[/yy]` or `mm/dd[/yy]`, textual "Fri 24 Oct 2025, 8pm", relative
//! "Tomorrow at 7pm" and bare weekdays. Anything else is a `ParseFailure`
//! and the caller decides whether to escalate.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

use super::profile::DateProfile;
use super::NormalizedDate;
use crate::common::types::DateFailure;

static CLOCK_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d{1,2}(?:[:.]\d{2})?\s*(?:am|pm)\b|\b\d{1,2}:\d{2}(?::\d{2})?\b")
        .expect("valid regex")
});

static ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})[-/](\d{1,2})[-/](\d{1,2})(?:$|[T\s])").expect("valid regex")
});

static NUMERIC_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})[/.](\d{1,2})(?:[/.](\d{2}|\d{4}))?\b").expect("valid regex")
});

// "7.30", "12.30": only stripped once a month name shows the text is not numeric
static DOT_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}\.\d{2}\b").expect("valid regex"));

static DAY_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})(?:ST|ND|RD|TH)?$").expect("valid regex"));

/// Parse a single raw date string under a source profile.
///
/// The result never carries a time of day. `year_assumed` is set only when
/// the text had no year and the current year was filled in.
pub fn parse_date(
    raw: &str,
    profile: &DateProfile,
    today: NaiveDate,
) -> Result<NormalizedDate, DateFailure> {
    if raw.trim().is_empty() {
        return Err(DateFailure::Empty);
    }

    // Sources append timezone offsets or "+ support acts" after a plus sign
    let head = raw.split('+').next().unwrap_or_default();
    let text = collapse_whitespace(head);
    if text.is_empty() {
        return Err(DateFailure::ParseFailure);
    }
    let upper = text.to_uppercase();

    if profile.relative_terms {
        if upper.contains("TOMORROW") {
            return Ok(NormalizedDate::derived(today + Duration::days(1)));
        }
        if upper.contains("TODAY") {
            return Ok(NormalizedDate::derived(today));
        }
    }

    let without_times = CLOCK_TIME.replace_all(&upper, " ");

    if profile.weekday_lookahead && !without_times.chars().any(|c| c.is_ascii_digit()) {
        if let Some(weekday) = tokens(&without_times).find_map(weekday_from_token) {
            return Ok(NormalizedDate::derived(next_weekday(today, weekday)));
        }
    }

    parse_calendar_text(&upper, &without_times, profile.day_first, today.year())
        .ok_or(DateFailure::ParseFailure)
}

/// Next occurrence of `weekday` counting today as a match.
pub fn next_weekday(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let target = weekday.num_days_from_monday() as i64;
    let current = today.weekday().num_days_from_monday() as i64;
    today + Duration::days((target - current).rem_euclid(7))
}

fn parse_calendar_text(
    upper: &str,
    without_times: &str,
    day_first: bool,
    current_year: i32,
) -> Option<NormalizedDate> {
    if let Some(caps) = ISO_DATE.captures(upper) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day).map(NormalizedDate::explicit);
    }

    // A month name means any `A.B` left over is a door time, never a day/month pair
    if tokens(without_times).any(|t| month_from_token(t).is_some()) {
        let text = DOT_TIME.replace_all(without_times, " ");
        return parse_textual(&text, current_year);
    }

    if let Some(caps) = NUMERIC_DATE.captures(without_times) {
        let first: u32 = caps[1].parse().ok()?;
        let second: u32 = caps[2].parse().ok()?;
        let (day, month) = if day_first { (first, second) } else { (second, first) };
        return match caps.get(3) {
            Some(year) => {
                let year = expand_year(year.as_str().parse().ok()?);
                NaiveDate::from_ymd_opt(year, month, day).map(NormalizedDate::explicit)
            }
            None => NaiveDate::from_ymd_opt(current_year, month, day).map(NormalizedDate::assumed),
        };
    }

    parse_textual(without_times, current_year)
}

/// "Fri 24 Oct", "October 24th, 2025", "24 Oct 2025": exactly one month name
/// and one day number, optionally one year. Anything ambiguous fails.
fn parse_textual(text: &str, current_year: i32) -> Option<NormalizedDate> {
    let mut months = Vec::new();
    let mut days = Vec::new();
    let mut years = Vec::new();

    for token in tokens(text) {
        if let Some(month) = month_from_token(token) {
            months.push(month);
        } else if token.len() == 4 && token.chars().all(|c| c.is_ascii_digit()) {
            years.push(token.parse::<i32>().ok()?);
        } else if let Some(caps) = DAY_TOKEN.captures(token) {
            days.push(caps[1].parse::<u32>().ok()?);
        }
        // weekday names and filler words ("doors", "at") carry no date information
    }

    if months.len() != 1 || days.len() != 1 || years.len() > 1 {
        return None;
    }

    match years.first() {
        Some(&year) => NaiveDate::from_ymd_opt(year, months[0], days[0]).map(NormalizedDate::explicit),
        None => NaiveDate::from_ymd_opt(current_year, months[0], days[0]).map(NormalizedDate::assumed),
    }
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn expand_year(year: i32) -> i32 {
    if year < 100 {
        2000 + year
    } else {
        year
    }
}

fn month_from_token(token: &str) -> Option<u32> {
    let month = match token {
        "JAN" | "JANUARY" => 1,
        "FEB" | "FEBRUARY" => 2,
        "MAR" | "MARCH" => 3,
        "APR" | "APRIL" => 4,
        "MAY" => 5,
        "JUN" | "JUNE" => 6,
        "JUL" | "JULY" => 7,
        "AUG" | "AUGUST" => 8,
        "SEP" | "SEPT" | "SEPTEMBER" => 9,
        "OCT" | "OCTOBER" => 10,
        "NOV" | "NOVEMBER" => 11,
        "DEC" | "DECEMBER" => 12,
        _ => return None,
    };
    Some(month)
}

fn weekday_from_token(token: &str) -> Option<Weekday> {
    let weekday = match token {
        "MON" | "MONDAY" => Weekday::Mon,
        "TUE" | "TUES" | "TUESDAY" => Weekday::Tue,
        "WED" | "WEDNESDAY" => Weekday::Wed,
        "THU" | "THUR" | "THURS" | "THURSDAY" => Weekday::Thu,
        "FRI" | "FRIDAY" => Weekday::Fri,
        "SAT" | "SATURDAY" => Weekday::Sat,
        "SUN" | "SUNDAY" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}
