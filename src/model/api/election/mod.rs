mod desc;
mod results;
mod spec;

pub use desc::{
    CandidateDescription, ElectionDescription, ElectionSummary, PartylistDescription,
    PositionDescription,
};
pub use results::{
    CandidateStanding, PositionStanding, PositionVotes, RankingView, ResultView, StatisticsView,
};
pub use spec::{CandidateSpec, ElectionSpec, PartylistSpec, PositionSpec, StatusChange};
