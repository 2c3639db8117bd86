use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::election::{
        accepting_ballots, effective_status, ranking_visible, results_visible, ElectionStatus,
    },
    mongodb::serde_optional_datetime,
};

/// Core election data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ElectionCore {
    /// Election name.
    pub name: String,
    /// Unique URL-friendly name.
    pub slug: String,
    /// Stored lifecycle status. Only explicit transitions change this.
    pub status: ElectionStatus,
    /// Election start time, if one has been set.
    #[serde(default, with = "serde_optional_datetime")]
    pub start_time: Option<DateTime<Utc>>,
    /// Election end time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ElectionCore {
    /// The status to display and enforce at `now`.
    pub fn effective_status(&self, now: DateTime<Utc>) -> ElectionStatus {
        effective_status(self.status, self.start_time, self.end_time, now)
    }

    /// May the final results be shown publicly at `now`?
    pub fn results_visible(&self, now: DateTime<Utc>) -> bool {
        results_visible(self.effective_status(now), self.end_time, now)
    }

    /// May the live ranking be shown publicly at `now`?
    pub fn ranking_visible(&self, now: DateTime<Utc>) -> bool {
        ranking_visible(self.effective_status(now))
    }

    /// Is the election accepting ballots at `now`?
    pub fn accepting_ballots(&self, now: DateTime<Utc>) -> bool {
        accepting_ballots(self.effective_status(now), self.end_time, now)
    }
}
