use std::collections::HashMap;

use mongodb::Database;
use rocket::futures::TryStreamExt;

use crate::error::Result;
use crate::model::{
    common::election::INDEPENDENT,
    db::{candidate::Candidate, partylist::Partylist, position::Position},
    mongodb::{Coll, Id},
    tally::{CandidateEntry, PositionEntry},
};

use super::db::Election;

/// An election together with everything standing in it.
#[derive(Debug, Clone)]
pub struct ElectionContents {
    pub election: Election,
    /// In stored order: creation time, then name.
    pub positions: Vec<Position>,
    pub candidates: Vec<Candidate>,
    pub partylists: Vec<Partylist>,
}

impl ElectionContents {
    /// Load the positions, candidates and partylists of an election.
    pub async fn load(db: &Database, election: Election) -> Result<Self> {
        let filter = Position::of_election(election.id);
        let positions: Vec<Position> = Coll::<Position>::from_db(db)
            .find(filter.clone(), Position::ordering())
            .await?
            .try_collect()
            .await?;
        let candidates: Vec<Candidate> = Coll::<Candidate>::from_db(db)
            .find(filter.clone(), None)
            .await?
            .try_collect()
            .await?;
        let partylists: Vec<Partylist> = Coll::<Partylist>::from_db(db)
            .find(filter, None)
            .await?
            .try_collect()
            .await?;
        Ok(Self {
            election,
            positions,
            candidates,
            partylists,
        })
    }

    /// Name of the given partylist, or [`INDEPENDENT`].
    pub fn partylist_name(&self, partylist_id: Option<Id>) -> String {
        partylist_id
            .and_then(|id| self.partylists.iter().find(|p| p.id == id))
            .map(|p| p.name.clone())
            .unwrap_or_else(|| INDEPENDENT.to_string())
    }

    /// Candidates standing for the given position.
    pub fn candidates_for(&self, position_id: Id) -> impl Iterator<Item = &Candidate> {
        self.candidates
            .iter()
            .filter(move |c| c.position_id == position_id)
    }

    /// Every position has at least one candidate, and there is at least one position.
    pub fn ready_to_start(&self) -> bool {
        !self.positions.is_empty()
            && self
                .positions
                .iter()
                .all(|p| self.candidates_for(p.id).next().is_some())
    }

    /// Would [`ElectionContents::ready_to_start`] still hold with the given
    /// position or candidate removed?
    pub fn ready_without(&self, removed: Id) -> bool {
        let mut remaining = self.clone();
        remaining.positions.retain(|p| p.id != removed);
        remaining.candidates.retain(|c| c.id != removed);
        remaining.ready_to_start()
    }

    /// The ballot layout, as far as counting is concerned.
    pub fn position_entries(&self) -> Vec<PositionEntry> {
        let partylists: HashMap<Id, &str> = self
            .partylists
            .iter()
            .map(|p| (p.id, p.name.as_str()))
            .collect();
        self.positions
            .iter()
            .map(|position| PositionEntry {
                id: position.id,
                name: position.name.clone(),
                candidates: self
                    .candidates_for(position.id)
                    .map(|c| CandidateEntry {
                        id: c.id,
                        display_name: c.name.clone(),
                        partylist: c
                            .partylist_id
                            .and_then(|id| partylists.get(&id))
                            .map(|name| name.to_string()),
                    })
                    .collect(),
            })
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_follow_stored_order() {
        let contents = ElectionContents::example();
        let entries = contents.position_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "President");
        assert_eq!(entries[0].candidates.len(), 2);
        assert_eq!(entries[0].candidates[0].partylist.as_deref(), Some("Alpha"));
        assert_eq!(entries[0].candidates[1].partylist, None);
        assert_eq!(entries[1].name, "Secretary");
        assert_eq!(contents.partylist_name(None), INDEPENDENT);
    }

    #[test]
    fn start_requires_candidates_everywhere() {
        let mut contents = ElectionContents::example();
        assert!(contents.ready_to_start());

        let secretary = contents.positions[1].id;
        contents.candidates.retain(|c| c.position_id != secretary);
        assert!(!contents.ready_to_start());

        contents.positions.clear();
        contents.candidates.clear();
        assert!(!contents.ready_to_start());
    }

    #[test]
    fn removals_that_empty_a_position() {
        let contents = ElectionContents::example();
        let president = contents.positions[0].id;
        let secretary = contents.positions[1].id;
        let bea = contents.candidates[0].id;
        let cy = contents.candidates[2].id;

        // President keeps Abe.
        assert!(contents.ready_without(bea));
        // Secretary's only candidate.
        assert!(!contents.ready_without(cy));
        // A whole position may go while another remains.
        assert!(contents.ready_without(president));
        assert!(contents.ready_without(secretary));
        assert!(contents.ready_without(Id::new()));
    }
}
