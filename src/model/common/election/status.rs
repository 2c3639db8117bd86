use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// States in the Election lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionStatus {
    /// Under construction, no start time committed yet.
    Pending,
    /// Waiting for its start time.
    Scheduled,
    /// Accepting ballots.
    Ongoing,
    /// Temporarily not accepting ballots.
    Paused,
    /// Halted early by an admin. Terminal.
    Stopped,
    /// Finished normally. Terminal.
    Completed,
}

impl ElectionStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [ElectionStatus; 6] = [
        Self::Pending,
        Self::Scheduled,
        Self::Ongoing,
        Self::Paused,
        Self::Stopped,
        Self::Completed,
    ];

    /// Terminal states are never reopened.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Completed)
    }

    /// Positions, candidates and partylists may only be edited before voting opens.
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Pending | Self::Scheduled)
    }

    /// Can an admin explicitly move an election from this status to `target`?
    pub fn can_transition_to(self, target: ElectionStatus) -> bool {
        use ElectionStatus::*;
        matches!(
            (self, target),
            (Pending, Scheduled)
                | (Pending, Ongoing)
                | (Scheduled, Pending)
                | (Scheduled, Ongoing)
                | (Ongoing, Paused)
                | (Ongoing, Stopped)
                | (Ongoing, Completed)
                | (Paused, Ongoing)
                | (Paused, Stopped)
                | (Paused, Completed)
        )
    }
}

impl Display for ElectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::Scheduled => "SCHEDULED",
            Self::Ongoing => "ONGOING",
            Self::Paused => "PAUSED",
            Self::Stopped => "STOPPED",
            Self::Completed => "COMPLETED",
        };
        write!(f, "{name}")
    }
}

impl From<ElectionStatus> for Bson {
    fn from(status: ElectionStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

/// Derive the status that should be displayed and enforced right now.
///
/// Paused and terminal states are authoritative. A scheduled election whose
/// start time has arrived is reported as ongoing even if the stored record
/// has not been flipped yet. The stored value is never modified.
pub fn effective_status(
    stored: ElectionStatus,
    start: Option<DateTime<Utc>>,
    _end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ElectionStatus {
    match stored {
        ElectionStatus::Completed | ElectionStatus::Stopped | ElectionStatus::Paused => stored,
        ElectionStatus::Scheduled => match start {
            Some(start) if now >= start => ElectionStatus::Ongoing,
            _ => stored,
        },
        ElectionStatus::Pending | ElectionStatus::Ongoing => stored,
    }
}

/// May final results be shown to the public?
pub fn results_visible(effective: ElectionStatus, end: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    effective == ElectionStatus::Completed || end <= now
}

/// May the live ranking be shown to the public?
pub fn ranking_visible(effective: ElectionStatus) -> bool {
    !matches!(effective, ElectionStatus::Pending | ElectionStatus::Scheduled)
}

/// Is the election currently accepting ballots?
pub fn accepting_ballots(effective: ElectionStatus, end: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    effective == ElectionStatus::Ongoing && now < end
}
