use crate::summary::ReplaySummary;

/// Pluggable accept/reject predicate over a replay summary.
///
/// A rejected replay skips processing but still counts as completed; it is
/// recorded in the worker's `invalid_replays` set.
pub trait ReplayValidator: Send + Sync {
    fn is_valid(&self, summary: &ReplaySummary) -> bool;
}

/// Stub validator that accepts every replay. No acceptance criteria beyond
/// "it parsed" have been settled yet (corrupt vs. merely low-quality matches).
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl ReplayValidator for AcceptAll {
    fn is_valid(&self, _summary: &ReplaySummary) -> bool {
        true
    }
}
