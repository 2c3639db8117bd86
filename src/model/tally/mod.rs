//! Vote tallying, ranking and turnout.
//!
//! Everything in here is pure: the caller fetches vote facts and candidate
//! listings from the database and supplies the current time explicitly.

mod engine;
mod filter;
mod presentation;

pub use engine::{
    rank_position, tally_election, CandidateEntry, CandidateTally, ElectionTally,
    PositionEntry, PositionTally, VoteFact,
};
pub use filter::{PositionFilter, TimeWindow};
pub use presentation::{percentage, progress, ProgressContext, MIN_PROGRESS};
