use chrono::{DateTime, Duration, Utc};
use rocket::form::{self, FromFormField, ValueField};
use serde::{Deserialize, Serialize};

use super::engine::PositionEntry;

/// How far back to look when counting votes.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeWindow {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "15m")]
    Last15Minutes,
    #[serde(rename = "1h")]
    LastHour,
    #[serde(rename = "6h")]
    Last6Hours,
    #[serde(rename = "24h")]
    Last24Hours,
    #[serde(rename = "7d")]
    Last7Days,
}

impl TimeWindow {
    /// Interpret a query-string token. Anything unrecognised means [`TimeWindow::All`].
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "15m" => Self::Last15Minutes,
            "1h" => Self::LastHour,
            "6h" => Self::Last6Hours,
            "24h" => Self::Last24Hours,
            "7d" => Self::Last7Days,
            _ => Self::All,
        }
    }

    /// The canonical query-string token for this window.
    pub fn token(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Last15Minutes => "15m",
            Self::LastHour => "1h",
            Self::Last6Hours => "6h",
            Self::Last24Hours => "24h",
            Self::Last7Days => "7d",
        }
    }

    pub fn duration(self) -> Option<Duration> {
        match self {
            Self::All => None,
            Self::Last15Minutes => Some(Duration::minutes(15)),
            Self::LastHour => Some(Duration::hours(1)),
            Self::Last6Hours => Some(Duration::hours(6)),
            Self::Last24Hours => Some(Duration::hours(24)),
            Self::Last7Days => Some(Duration::days(7)),
        }
    }

    /// Earliest instant still inside the window, if bounded.
    pub fn lower_bound(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.duration().map(|d| now - d)
    }

    /// Does a vote cast at `created_at` count when looking back from `now`?
    pub fn includes(self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.lower_bound(now) {
            Some(bound) => created_at >= bound,
            None => true,
        }
    }
}

/// Query parameters never fail to parse; stale values fall back to the default.
#[rocket::async_trait]
impl<'r> FromFormField<'r> for TimeWindow {
    fn from_value(field: ValueField<'r>) -> form::Result<'r, Self> {
        Ok(Self::parse(field.value))
    }

    fn default() -> Option<Self> {
        Some(Self::All)
    }
}

/// Which positions to report on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PositionFilter {
    #[default]
    All,
    /// A single position, matched case-insensitively by name.
    Named(String),
}

const ALL_SENTINELS: [&str; 2] = ["all", "all positions"];

impl PositionFilter {
    /// Interpret an optional query-string value.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::All,
            Some(name)
                if ALL_SENTINELS
                    .iter()
                    .any(|sentinel| name.eq_ignore_ascii_case(sentinel)) =>
            {
                Self::All
            }
            Some(name) => Self::Named(name.to_string()),
        }
    }

    /// Pick the positions to compute, preserving their stored order.
    ///
    /// A name that matches no position selects every position.
    pub fn select<'a>(&self, positions: &'a [PositionEntry]) -> Vec<&'a PositionEntry> {
        if let Self::Named(name) = self {
            let wanted = name.to_lowercase();
            let matching: Vec<_> = positions
                .iter()
                .filter(|p| p.name.to_lowercase() == wanted)
                .collect();
            if !matching.is_empty() {
                return matching;
            }
        }
        positions.iter().collect()
    }
}
