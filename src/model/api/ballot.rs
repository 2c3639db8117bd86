use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    db::vote::{NewVote, Vote},
    mongodb::Id,
    tally::PositionEntry,
};

use super::ApiId;

/// One choice on a submitted ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotEntry {
    pub position_id: ApiId,
    pub candidate_id: ApiId,
}

/// Check a ballot against the election's layout and turn it into votes.
///
/// A ballot must be non-empty, name each position at most once, and only
/// choose candidates standing for the position they are listed under.
/// Positions may be left out.
pub fn ballot_votes(
    entries: &[BallotEntry],
    positions: &[PositionEntry],
    voter_id: Id,
    election_id: Id,
    now: DateTime<Utc>,
) -> Result<Vec<NewVote>> {
    if entries.is_empty() {
        return Err(Error::bad_request("Ballot is empty".to_string()));
    }

    let mut seen = HashSet::new();
    entries
        .iter()
        .map(|entry| {
            let position_id = Id::from(entry.position_id);
            let candidate_id = Id::from(entry.candidate_id);
            if !seen.insert(position_id) {
                return Err(Error::bad_request(format!(
                    "Position {position_id} appears more than once"
                )));
            }
            let position = positions
                .iter()
                .find(|p| p.id == position_id)
                .ok_or_else(|| Error::not_found(format!("Position {position_id}")))?;
            if !position.candidates.iter().any(|c| c.id == candidate_id) {
                return Err(Error::bad_request(format!(
                    "Candidate {candidate_id} is not standing for {}",
                    position.name
                )));
            }
            Ok(NewVote {
                voter_id,
                election_id,
                position_id,
                candidate_id,
                created_at: now,
            })
        })
        .collect()
}

/// A recorded vote, as shown to the voter who cast it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteDescription {
    pub id: ApiId,
    pub election_id: ApiId,
    pub position_id: ApiId,
    pub candidate_id: ApiId,
    pub created_at: DateTime<Utc>,
}

impl From<Vote> for VoteDescription {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.id.into(),
            election_id: vote.election_id.into(),
            position_id: vote.position_id.into(),
            candidate_id: vote.candidate_id.into(),
            created_at: vote.created_at,
        }
    }
}
