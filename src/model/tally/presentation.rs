/// Smallest progress-bar width, so that zero-vote bars remain visible.
pub const MIN_PROGRESS: u32 = 6;

/// Share of `total` as a percentage rounded to one decimal place.
pub fn percentage(votes: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let share = votes as f64 / total as f64 * 100.0;
    (share * 10.0).round() / 10.0
}

/// Where a progress bar is drawn.
///
/// The two views treat a position with no votes differently: the live
/// ranking keeps every bar at the minimum width, the final result view
/// draws empty bars.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProgressContext {
    LiveRanking,
    FinalResult,
}

/// Bar width in percent of the leading candidate's votes.
pub fn progress(votes: u64, top_votes: u64, context: ProgressContext) -> u32 {
    if top_votes == 0 {
        return match context {
            ProgressContext::LiveRanking => MIN_PROGRESS,
            ProgressContext::FinalResult => 0,
        };
    }
    let width = (votes as f64 / top_votes as f64 * 100.0).round() as u32;
    width.max(MIN_PROGRESS)
}
