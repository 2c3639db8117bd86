use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::ApiId,
    common::election::ElectionStatus,
    db::{
        candidate::Candidate,
        election::{Election, ElectionContents},
        partylist::Partylist,
    },
};

/// A summary of an election, shorter than the full `ElectionDescription`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSummary {
    /// Election unique ID.
    pub id: ApiId,
    /// Election name.
    pub name: String,
    /// URL-friendly name.
    pub slug: String,
    /// Status as it applies right now.
    pub status: ElectionStatus,
    /// Election start time, if set.
    pub start_time: Option<DateTime<Utc>>,
    /// Election end time.
    pub end_time: DateTime<Utc>,
    /// Whether final results may be shown.
    pub results_visible: bool,
    /// Whether ballots are currently accepted.
    pub accepting_ballots: bool,
}

impl ElectionSummary {
    pub fn new(election: &Election, now: DateTime<Utc>) -> Self {
        Self {
            id: election.id.into(),
            name: election.name.clone(),
            slug: election.slug.clone(),
            status: election.effective_status(now),
            start_time: election.start_time,
            end_time: election.end_time,
            results_visible: election.results_visible(now),
            accepting_ballots: election.accepting_ballots(now),
        }
    }
}

/// An election with its full ballot layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    #[serde(flatten)]
    pub summary: ElectionSummary,
    /// In stored order.
    pub positions: Vec<PositionDescription>,
    pub partylists: Vec<PartylistDescription>,
}

impl ElectionDescription {
    pub fn new(contents: &ElectionContents, now: DateTime<Utc>) -> Self {
        let positions = contents
            .positions
            .iter()
            .map(|position| PositionDescription {
                id: position.id.into(),
                name: position.name.clone(),
                candidates: contents
                    .candidates_for(position.id)
                    .map(|candidate| CandidateDescription::new(candidate, contents))
                    .collect(),
            })
            .collect();
        Self {
            summary: ElectionSummary::new(&contents.election, now),
            positions,
            partylists: contents.partylists.iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDescription {
    pub id: ApiId,
    pub name: String,
    pub candidates: Vec<CandidateDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartylistDescription {
    pub id: ApiId,
    pub name: String,
}

impl From<&Partylist> for PartylistDescription {
    fn from(partylist: &Partylist) -> Self {
        Self {
            id: partylist.id.into(),
            name: partylist.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: ApiId,
    pub position_id: ApiId,
    pub partylist_id: Option<ApiId>,
    /// Partylist name, or "INDEPENDENT".
    pub partylist: String,
    pub name: String,
    pub school_id: String,
    pub bio: String,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub image_url: Option<String>,
}

impl CandidateDescription {
    pub fn new(candidate: &Candidate, contents: &ElectionContents) -> Self {
        Self {
            id: candidate.id.into(),
            position_id: candidate.position_id.into(),
            partylist_id: candidate.partylist_id.map(Into::into),
            partylist: contents.partylist_name(candidate.partylist_id),
            name: candidate.name.clone(),
            school_id: candidate.school_id.clone(),
            bio: candidate.bio.clone(),
            gender: candidate.gender.clone(),
            date_of_birth: candidate.date_of_birth,
            image_url: candidate.image_url.clone(),
        }
    }
}
