//! Error taxonomy. Validation errors arise while building ballots and
//! profiles, configuration errors before the first round runs, and the
//! unresolved-tie error mid-run.

use crate::fraction::Fraction;
use thiserror::Error;

/// A malformed ballot or profile. Raised eagerly at construction; no
/// partially valid value is ever returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("duplicate candidate {0} in the candidate list")]
    DuplicateCandidate(String),
    #[error("ballot mentions candidate {0} who is not in the candidate list")]
    UnknownCandidate(String),
    #[error("ballot weight {0} is negative")]
    NegativeWeight(Fraction),
    #[error("candidate {0} appears in more than one ranking position")]
    RepeatedCandidate(String),
    #[error("ballot has an empty ranking position")]
    EmptyRankingPosition,
    #[error("score for candidate {0} is negative")]
    NegativeScore(String),
}

/// A configuration the engine refuses to run. Raised by `ElectionEngine::new`,
/// before any round state exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("cannot elect {seats} candidates from a field of {candidates}")]
    InvalidSeats { seats: usize, candidates: usize },
    #[error("score vector must be {0}")]
    InvalidScoreVector(&'static str),
    #[error("the configured method draws randomness but no seed was supplied")]
    SeedRequired,
    #[error("{0}")]
    InvalidMethodParameter(&'static str),
    #[error("a ballot scores {candidate} above the rating limit {limit}")]
    ScoreLimitExceeded { candidate: String, limit: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElectionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// An outcome-affecting tie with no usable resolution policy. The
    /// transcript up to the last fully resolved round remains readable.
    #[error("tie between {} in round {round} cannot be resolved", candidates.join(", "))]
    UnresolvedTie { round: usize, candidates: Vec<String> },
}
