use serde::{Deserialize, Serialize};

/// What to do with raw dates that contain list/range delimiters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelimiterPolicy {
    /// The source posts one date per listing; parse the whole string as a single date
    #[default]
    SingleDate,
    /// The source posts ranges ("Tues 30 Jan & Wed 31 Jan"); send any delimited
    /// string straight to the resolver
    EscalateToResolver,
}

/// Per-source date conventions, declared in the source registry.
///
/// One parser consumes these flags instead of every source carrying its own
/// hand-tuned cleanup routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DateProfile {
    /// `03/04` means 3 April rather than March 4
    pub day_first: bool,
    /// "Today" / "Tomorrow" resolve against the run date
    pub relative_terms: bool,
    /// A bare weekday ("Friday at 8pm") means its next occurrence
    pub weekday_lookahead: bool,
    pub delimiter_policy: DelimiterPolicy,
}

impl DateProfile {
    /// Ticketing platforms that list multi-night runs in one card
    pub fn ranged() -> Self {
        Self {
            delimiter_policy: DelimiterPolicy::EscalateToResolver,
            ..Self::default()
        }
    }

    /// Platforms that show "Tomorrow at 7pm" / "Friday at 8pm" for the coming week
    pub fn relative() -> Self {
        Self {
            relative_terms: true,
            weekday_lookahead: true,
            ..Self::default()
        }
    }

    pub fn with_day_first(mut self) -> Self {
        self.day_first = true;
        self
    }

    pub fn escalates_ranges(&self) -> bool {
        self.delimiter_policy == DelimiterPolicy::EscalateToResolver
    }
}
