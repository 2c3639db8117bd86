use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::ApiId,
    common::election::{slugify, ElectionStatus},
    db::{
        candidate::NewCandidate,
        election::{ElectionCore, NewElection},
        partylist::NewPartylist,
        position::NewPosition,
    },
    mongodb::Id,
};

/// An election specification, as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    /// Election name. The slug is derived from it.
    pub name: String,
    /// Election start time. Required before the election can be scheduled.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Election end time.
    pub end_time: DateTime<Utc>,
}

impl ElectionSpec {
    /// Validate the submitted schedule and name, returning the derived slug.
    fn validate(&self) -> Result<String> {
        let slug = slugify(&self.name);
        if slug.is_empty() {
            return Err(Error::bad_request(format!(
                "Election name '{}' has no usable characters",
                self.name
            )));
        }
        if let Some(start) = self.start_time {
            if start >= self.end_time {
                return Err(Error::bad_request(
                    "Election must start before it ends".to_string(),
                ));
            }
        }
        Ok(slug)
    }

    /// Convert this spec into a new, pending election.
    pub fn into_election(self, now: DateTime<Utc>) -> Result<NewElection> {
        let slug = self.validate()?;
        Ok(NewElection {
            name: self.name.trim().to_string(),
            slug,
            status: ElectionStatus::Pending,
            start_time: self.start_time,
            end_time: self.end_time,
            created_at: now,
        })
    }

    /// Apply this spec to an existing election, keeping its status and history.
    pub fn apply_to(self, election: &mut ElectionCore) -> Result<()> {
        let slug = self.validate()?;
        if election.status == ElectionStatus::Scheduled && self.start_time.is_none() {
            return Err(Error::bad_request(
                "A scheduled election must keep a start time".to_string(),
            ));
        }
        election.name = self.name.trim().to_string();
        election.slug = slug;
        election.start_time = self.start_time;
        election.end_time = self.end_time;
        Ok(())
    }
}

/// A request to move an election to a new stored status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: ElectionStatus,
}

/// A new position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSpec {
    pub name: String,
}

impl PositionSpec {
    pub fn into_position(self, election_id: Id, now: DateTime<Utc>) -> Result<NewPosition> {
        let name = non_empty(&self.name, "Position name")?;
        Ok(NewPosition {
            election_id,
            name,
            created_at: now,
        })
    }
}

/// A new partylist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartylistSpec {
    pub name: String,
}

impl PartylistSpec {
    pub fn into_partylist(self, election_id: Id) -> Result<NewPartylist> {
        let name = non_empty(&self.name, "Partylist name")?;
        Ok(NewPartylist { election_id, name })
    }
}

/// A new candidate for a position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    /// Omit to run as an independent.
    #[serde(default)]
    pub partylist_id: Option<ApiId>,
    pub name: String,
    pub school_id: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CandidateSpec {
    pub fn into_candidate(self, election_id: Id, position_id: Id) -> Result<NewCandidate> {
        let name = non_empty(&self.name, "Candidate name")?;
        let school_id = non_empty(&self.school_id, "Candidate school ID")?;
        Ok(NewCandidate {
            election_id,
            position_id,
            partylist_id: self.partylist_id.map(Id::from),
            name,
            school_id,
            bio: self.bio,
            gender: self.gender,
            date_of_birth: self.date_of_birth,
            image_url: self.image_url,
        })
    }
}

fn non_empty(value: &str, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::bad_request(format!("{what} must not be empty")))
    } else {
        Ok(trimmed.to_string())
    }
}
