use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw event tuple as produced by a source adapter, before any date handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub source_id: String,
    pub title: String,
    pub raw_date: String,
    pub venue: String,
    pub link: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Why a raw date string could not be turned into a calendar date
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFailure {
    #[error("date text is empty")]
    Empty,

    #[error("no deterministic date grammar matched")]
    ParseFailure,

    #[error("multiple dates detected and no resolver is available")]
    AmbiguousMultiDate,

    #[error("resolver returned no usable dates")]
    ResolverFailure,

    #[error("explicitly dated {0} which is already in the past")]
    ExpiredDate(NaiveDate),
}

/// Date carried by an event record once normalization has run.
///
/// `Unresolved` is the terminal state for records whose date could not be
/// determined; such records are kept for auditing but never listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventDate {
    Resolved(NaiveDate),
    Unresolved(DateFailure),
}

impl DateFailure {
    /// Stable short label for logs and metric tags
    pub fn label(&self) -> &'static str {
        match self {
            DateFailure::Empty => "empty",
            DateFailure::ParseFailure => "parse_failure",
            DateFailure::AmbiguousMultiDate => "ambiguous_multi_date",
            DateFailure::ResolverFailure => "resolver_failure",
            DateFailure::ExpiredDate(_) => "expired_date",
        }
    }
}

impl EventDate {
    pub fn resolved(&self) -> Option<NaiveDate> {
        match self {
            EventDate::Resolved(date) => Some(*date),
            EventDate::Unresolved(_) => None,
        }
    }
}

/// An event after date normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub source_id: String,
    pub title: String,
    pub venue: String,
    pub link: String,
    pub image: Option<String>,
    pub date: EventDate,
    /// Scraped text the date was derived from, kept for auditing only
    pub raw_date: String,
}

impl EventRecord {
    /// Copy the descriptive fields of a raw event onto a normalized date
    pub fn from_raw(raw: &RawEvent, date: EventDate) -> Self {
        Self {
            source_id: raw.source_id.clone(),
            title: raw.title.clone(),
            venue: raw.venue.clone(),
            link: raw.link.clone(),
            image: raw.image.clone(),
            date,
            raw_date: raw.raw_date.clone(),
        }
    }
}

/// Finalized listing handed to enrichment and export.
/// Only records with a concrete calendar date are ever turned into one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedEvent {
    pub title: String,
    pub venue: String,
    /// Serialized as `YYYY-MM-DD`
    pub date: NaiveDate,
    pub link: String,
    pub image: Option<String>,
    pub source_id: String,
}
