mod slug;
mod status;

pub use slug::slugify;
pub use status::{
    accepting_ballots, effective_status, ranking_visible, results_visible, ElectionStatus,
};

/// Partylist label shown for candidates that do not belong to any partylist.
pub const INDEPENDENT: &str = "INDEPENDENT";
