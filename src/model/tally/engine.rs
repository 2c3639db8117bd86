use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::model::{common::election::INDEPENDENT, mongodb::Id};

use super::filter::{PositionFilter, TimeWindow};

/// A single recorded vote, as far as counting is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteFact {
    pub voter_id: Id,
    pub position_id: Id,
    pub candidate_id: Id,
    pub created_at: DateTime<Utc>,
}

/// A candidate standing for a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEntry {
    pub id: Id,
    pub display_name: String,
    /// Partylist name, if the candidate belongs to one.
    pub partylist: Option<String>,
}

/// A position together with its candidates, in stored position order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionEntry {
    pub id: Id,
    pub name: String,
    pub candidates: Vec<CandidateEntry>,
}

/// Votes counted for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateTally {
    pub candidate_id: Id,
    pub display_name: String,
    /// Partylist name, or "INDEPENDENT".
    pub partylist: String,
    pub votes: u64,
}

/// The counted and ranked state of one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionTally {
    pub position_id: Id,
    pub position_name: String,
    /// Most votes first; equal counts ordered by display name.
    pub ranked_candidates: Vec<CandidateTally>,
    pub total_position_votes: u64,
    pub top_votes: u64,
    /// Candidates holding `top_votes`. Empty when nobody has any votes.
    pub winners: Vec<CandidateTally>,
    pub is_tie: bool,
}

/// Counted results for an election.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionTally {
    pub positions: Vec<PositionTally>,
    /// Distinct voters with at least one vote in the window.
    pub turnout: u64,
}

/// Count, rank and summarise every selected position of an election.
pub fn tally_election(
    positions: &[PositionEntry],
    votes: &[VoteFact],
    position_filter: &PositionFilter,
    window: TimeWindow,
    now: DateTime<Utc>,
) -> ElectionTally {
    let counted: Vec<&VoteFact> = votes
        .iter()
        .filter(|vote| window.includes(vote.created_at, now))
        .collect();

    let mut counts: HashMap<(Id, Id), u64> = HashMap::new();
    for vote in counted.iter() {
        *counts
            .entry((vote.position_id, vote.candidate_id))
            .or_insert(0) += 1;
    }

    let positions = position_filter
        .select(positions)
        .into_iter()
        .map(|position| rank_position(position, &counts))
        .collect();

    ElectionTally {
        positions,
        turnout: count_distinct_voters(counted.into_iter()),
    }
}

/// Rank one position's candidates given per-`(position, candidate)` counts.
pub fn rank_position(position: &PositionEntry, counts: &HashMap<(Id, Id), u64>) -> PositionTally {
    let mut ranked: Vec<CandidateTally> = position
        .candidates
        .iter()
        .map(|candidate| CandidateTally {
            candidate_id: candidate.id,
            display_name: candidate.display_name.clone(),
            partylist: candidate
                .partylist
                .clone()
                .unwrap_or_else(|| INDEPENDENT.to_string()),
            votes: counts
                .get(&(position.id, candidate.id))
                .copied()
                .unwrap_or(0),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });

    let total_position_votes = ranked.iter().map(|c| c.votes).sum();
    let top_votes = ranked.first().map(|c| c.votes).unwrap_or(0);
    let winners: Vec<CandidateTally> = if top_votes > 0 {
        ranked
            .iter()
            .take_while(|c| c.votes == top_votes)
            .cloned()
            .collect()
    } else {
        Vec::new()
    };
    let is_tie = winners.len() > 1;

    PositionTally {
        position_id: position.id,
        position_name: position.name.clone(),
        ranked_candidates: ranked,
        total_position_votes,
        top_votes,
        winners,
        is_tie,
    }
}

fn count_distinct_voters<'a>(votes: impl Iterator<Item = &'a VoteFact>) -> u64 {
    votes.map(|vote| vote.voter_id).collect::<HashSet<_>>().len() as u64
}
