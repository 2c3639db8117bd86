use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::ApiId,
    tally::{
        percentage, progress, CandidateTally, ElectionTally, PositionTally, ProgressContext,
        TimeWindow,
    },
};

use super::ElectionSummary;

/// One candidate's line in a ranking or result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateStanding {
    pub candidate_id: ApiId,
    pub name: String,
    pub partylist: String,
    pub votes: u64,
    /// Share of the position's votes, to one decimal place.
    pub percentage: f64,
    /// Bar width relative to the leader.
    pub progress: u32,
    pub is_winner: bool,
}

/// A ranked position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionStanding {
    pub position_id: ApiId,
    pub position_name: String,
    pub total_votes: u64,
    pub top_votes: u64,
    pub is_tie: bool,
    /// Best first.
    pub candidates: Vec<CandidateStanding>,
}

impl PositionStanding {
    fn new(tally: &PositionTally, context: ProgressContext) -> Self {
        let standing = |candidate: &CandidateTally| CandidateStanding {
            candidate_id: candidate.candidate_id.into(),
            name: candidate.display_name.clone(),
            partylist: candidate.partylist.clone(),
            votes: candidate.votes,
            percentage: percentage(candidate.votes, tally.total_position_votes),
            progress: progress(candidate.votes, tally.top_votes, context),
            is_winner: tally
                .winners
                .iter()
                .any(|w| w.candidate_id == candidate.candidate_id),
        };
        Self {
            position_id: tally.position_id.into(),
            position_name: tally.position_name.clone(),
            total_votes: tally.total_position_votes,
            top_votes: tally.top_votes,
            is_tie: tally.is_tie,
            candidates: tally.ranked_candidates.iter().map(standing).collect(),
        }
    }
}

/// Live standings while an election runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingView {
    pub election: ElectionSummary,
    pub window: TimeWindow,
    pub turnout: u64,
    pub positions: Vec<PositionStanding>,
    pub generated_at: DateTime<Utc>,
}

impl RankingView {
    pub fn new(
        election: ElectionSummary,
        tally: &ElectionTally,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            election,
            window,
            turnout: tally.turnout,
            positions: tally
                .positions
                .iter()
                .map(|p| PositionStanding::new(p, ProgressContext::LiveRanking))
                .collect(),
            generated_at: now,
        }
    }
}

/// Final results, shown once an election is over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultView {
    pub election: ElectionSummary,
    pub turnout: u64,
    pub positions: Vec<PositionStanding>,
}

impl ResultView {
    pub fn new(election: ElectionSummary, tally: &ElectionTally) -> Self {
        Self {
            election,
            turnout: tally.turnout,
            positions: tally
                .positions
                .iter()
                .map(|p| PositionStanding::new(p, ProgressContext::FinalResult))
                .collect(),
        }
    }
}

/// Participation figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsView {
    pub election: ElectionSummary,
    pub window: TimeWindow,
    /// Distinct voters who cast at least one vote in the window.
    pub turnout: u64,
    pub registered_voters: u64,
    /// Turnout as a percentage of registered voters.
    pub participation: f64,
    /// Votes per position, in stored order.
    pub position_votes: Vec<PositionVotes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionVotes {
    pub position_name: String,
    pub total_votes: u64,
}

impl StatisticsView {
    pub fn new(
        election: ElectionSummary,
        tally: &ElectionTally,
        window: TimeWindow,
        registered_voters: u64,
    ) -> Self {
        Self {
            election,
            window,
            turnout: tally.turnout,
            registered_voters,
            participation: percentage(tally.turnout, registered_voters),
            position_votes: tally
                .positions
                .iter()
                .map(|p| PositionVotes {
                    position_name: p.position_name.clone(),
                    total_votes: p.total_position_votes,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{
        db::election::ElectionContents,
        mongodb::Id,
        tally::{tally_election, PositionFilter, VoteFact, MIN_PROGRESS},
    };

    fn votes(contents: &ElectionContents, candidate: usize, n: usize) -> Vec<VoteFact> {
        let c = &contents.candidates[candidate];
        (0..n)
            .map(|_| VoteFact {
                voter_id: Id::new(),
                position_id: c.position_id,
                candidate_id: c.id,
                created_at: Utc::now(),
            })
            .collect()
    }

    fn tally(contents: &ElectionContents, votes: &[VoteFact]) -> ElectionTally {
        tally_election(
            &contents.position_entries(),
            votes,
            &PositionFilter::All,
            TimeWindow::All,
            Utc::now(),
        )
    }

    #[test]
    fn standings_carry_percentages() {
        let contents = ElectionContents::example();
        let mut cast = votes(&contents, 0, 3);
        cast.extend(votes(&contents, 1, 7));
        let tally = tally(&contents, &cast);
        let summary = ElectionSummary::new(&contents.election, Utc::now());

        let ranking = RankingView::new(summary.clone(), &tally, TimeWindow::All, Utc::now());
        let president = &ranking.positions[0];
        assert_eq!(president.candidates[0].name, "Abe");
        assert_eq!(president.candidates[0].percentage, 70.0);
        assert_eq!(president.candidates[0].progress, 100);
        assert!(president.candidates[0].is_winner);
        assert_eq!(president.candidates[1].percentage, 30.0);
        assert_eq!(president.candidates[1].progress, 43);
        assert!(!president.candidates[1].is_winner);
        assert_eq!(ranking.turnout, 10);

        let stats = StatisticsView::new(summary, &tally, TimeWindow::All, 40);
        assert_eq!(stats.participation, 25.0);
        assert_eq!(stats.position_votes[0].total_votes, 10);
        assert_eq!(stats.position_votes[1].total_votes, 0);
    }

    #[test]
    fn empty_positions_differ_by_view() {
        let contents = ElectionContents::example();
        let tally = tally(&contents, &[]);
        let summary = ElectionSummary::new(&contents.election, Utc::now());

        let ranking = RankingView::new(summary.clone(), &tally, TimeWindow::All, Utc::now());
        let result = ResultView::new(summary, &tally);
        for candidate in ranking.positions[0].candidates.iter() {
            assert_eq!(candidate.progress, MIN_PROGRESS);
            assert_eq!(candidate.percentage, 0.0);
            assert!(!candidate.is_winner);
        }
        for candidate in result.positions[0].candidates.iter() {
            assert_eq!(candidate.progress, 0);
        }
    }
}
