// Copyright 2025 the votecount developers.
// This file is part of votecount.
// votecount is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// votecount is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with votecount.  If not, see <https://www.gnu.org/licenses/>.

//! Pure scoring utilities over a profile: first-place tallies, positional
//! (Borda) scores, direct score sums, mention counts and the veto mirror of
//! the first-place tally.
//!
//! A ranking position tied between k still-undecided candidates contributes
//! weight/k to each of them, in every utility here. Ballots lacking the data a
//! utility needs (no ranking, no scores) are skipped, never an error.

use crate::errors::ConfigurationError;
use crate::fraction::Fraction;
use crate::profile::PreferenceProfile;
use std::collections::{BTreeMap, BTreeSet};

/// Attribute each ballot's weight to the candidates of its highest-ranked
/// position that still holds at least one `remaining` candidate, split evenly
/// on a tie. Positions holding only decided candidates are skipped. Every
/// remaining candidate appears in the result, possibly at zero.
pub fn first_place_tally(
    profile: &PreferenceProfile,
    remaining: &BTreeSet<String>,
) -> BTreeMap<String, Fraction> {
    let mut tally: BTreeMap<String, Fraction> =
        remaining.iter().map(|c| (c.clone(), Fraction::zero())).collect();
    for ballot in profile.ballots() {
        if ballot.weight().is_zero() {
            continue;
        }
        for position in ballot.ranking() {
            let hits: Vec<&String> = position.iter().filter(|c| remaining.contains(*c)).collect();
            if !hits.is_empty() {
                let share = ballot.weight().clone() / Fraction::from(hits.len());
                for hit in hits {
                    *tally.get_mut(hit).unwrap() += share.clone();
                }
                break;
            }
        }
    }
    tally
}

/// The veto mirror of `first_place_tally`: weight goes to a ballot's *least*
/// preferred remaining candidates. Remaining candidates the ballot leaves
/// unranked sit in an implicit shared last position below everything ranked.
pub fn last_place_tally(
    profile: &PreferenceProfile,
    remaining: &BTreeSet<String>,
) -> BTreeMap<String, Fraction> {
    let mut tally: BTreeMap<String, Fraction> =
        remaining.iter().map(|c| (c.clone(), Fraction::zero())).collect();
    for ballot in profile.ballots() {
        if ballot.weight().is_zero() {
            continue;
        }
        let ranked: BTreeSet<&String> = ballot.ranking().iter().flatten().collect();
        let unranked: Vec<&String> = remaining.iter().filter(|c| !ranked.contains(*c)).collect();
        let hits: Vec<&String> = if !unranked.is_empty() {
            unranked
        } else {
            match ballot
                .ranking()
                .iter()
                .rev()
                .map(|position| position.iter().filter(|c| remaining.contains(*c)).collect::<Vec<_>>())
                .find(|hits| !hits.is_empty())
            {
                Some(hits) => hits,
                None => continue,
            }
        };
        let share = ballot.weight().clone() / Fraction::from(hits.len());
        for hit in hits {
            *tally.get_mut(hit).unwrap() += share.clone();
        }
    }
    tally
}

/// The default positional vector for n candidates: (n-1, n-2, …, 0).
pub fn default_borda_vector(n: usize) -> Vec<Fraction> {
    (0..n).rev().map(Fraction::from).collect()
}

/// A usable score vector is nonempty, no longer than the candidate field,
/// non-negative and weakly decreasing.
pub fn validate_score_vector(vector: &[Fraction], num_candidates: usize) -> Result<(), ConfigurationError> {
    if vector.is_empty() {
        return Err(ConfigurationError::InvalidScoreVector("nonempty"));
    }
    if vector.len() > num_candidates {
        return Err(ConfigurationError::InvalidScoreVector("no longer than the number of candidates"));
    }
    if vector.iter().any(|v| v.is_negative()) {
        return Err(ConfigurationError::InvalidScoreVector("non-negative"));
    }
    if vector.windows(2).any(|w| w[0] < w[1]) {
        return Err(ConfigurationError::InvalidScoreVector("non-increasing"));
    }
    Ok(())
}

/// Positional scores over the full roster. The vector must already be valid
/// (see `validate_score_vector`); it is zero-padded to the roster size. A tied
/// position of size k receives the mean of the k vector entries it spans, and
/// candidates a ballot leaves unranked share the leftover entries as one
/// implicit final position. Ballots without rankings contribute nothing.
pub fn positional_scores(profile: &PreferenceProfile, vector: &[Fraction]) -> BTreeMap<String, Fraction> {
    let n = profile.num_candidates();
    let mut padded = vector.to_vec();
    padded.resize(n, Fraction::zero());
    let mut scores: BTreeMap<String, Fraction> =
        profile.candidates().iter().map(|c| (c.clone(), Fraction::zero())).collect();
    for ballot in profile.ballots() {
        if !ballot.has_ranking() || ballot.weight().is_zero() {
            continue;
        }
        let mut slot = 0;
        for position in ballot.ranking() {
            let share = mean(&padded[slot..slot + position.len()]);
            for candidate in position {
                *scores.get_mut(candidate).unwrap() += ballot.weight().clone() * share.clone();
            }
            slot += position.len();
        }
        if slot < n {
            let ranked: BTreeSet<&String> = ballot.ranking().iter().flatten().collect();
            let share = mean(&padded[slot..]);
            for candidate in profile.candidates() {
                if !ranked.contains(candidate) {
                    *scores.get_mut(candidate).unwrap() += ballot.weight().clone() * share.clone();
                }
            }
        }
    }
    scores
}

/// Borda scores with the supplied vector, or the default (n-1, …, 0).
pub fn borda_scores(
    profile: &PreferenceProfile,
    vector: Option<&[Fraction]>,
) -> Result<BTreeMap<String, Fraction>, ConfigurationError> {
    let n = profile.num_candidates();
    let vector = match vector {
        Some(v) => {
            validate_score_vector(v, n)?;
            v.to_vec()
        }
        None => default_borda_vector(n),
    };
    Ok(positional_scores(profile, &vector))
}

/// Weighted sum of the ballots' own score fields, rankings ignored. Only
/// candidates somebody scored appear in the result.
pub fn score_profile(profile: &PreferenceProfile) -> BTreeMap<String, Fraction> {
    let mut scores: BTreeMap<String, Fraction> = BTreeMap::new();
    for ballot in profile.ballots() {
        if ballot.weight().is_zero() {
            continue;
        }
        for (candidate, score) in ballot.scores() {
            *scores.entry(candidate.clone()).or_insert_with(Fraction::zero) +=
                ballot.weight().clone() * score.clone();
        }
    }
    scores
}

/// Weighted count of ranking appearances per candidate.
pub fn mentions(profile: &PreferenceProfile) -> BTreeMap<String, Fraction> {
    let mut counts: BTreeMap<String, Fraction> = BTreeMap::new();
    for ballot in profile.ballots() {
        if ballot.weight().is_zero() {
            continue;
        }
        for position in ballot.ranking() {
            for candidate in position {
                *counts.entry(candidate.clone()).or_insert_with(Fraction::zero) += ballot.weight().clone();
            }
        }
    }
    counts
}

/// Limited voting: each ballot casts one point for each of its top `votes`
/// ranked candidates; a tied position splits whatever budget is left across
/// its members.
pub fn limited_tally(profile: &PreferenceProfile, votes: usize) -> BTreeMap<String, Fraction> {
    let mut scores: BTreeMap<String, Fraction> = BTreeMap::new();
    for ballot in profile.ballots() {
        if ballot.weight().is_zero() {
            continue;
        }
        let mut budget = Fraction::from(votes);
        for position in ballot.ranking() {
            if budget.is_zero() {
                break;
            }
            let size = Fraction::from(position.len());
            let each = if budget >= size { Fraction::one() } else { budget.clone() / size.clone() };
            for candidate in position {
                *scores.entry(candidate.clone()).or_insert_with(Fraction::zero) +=
                    ballot.weight().clone() * each.clone();
            }
            budget = if budget >= size { budget - size } else { Fraction::zero() };
        }
    }
    scores
}

/// Group a score map into descending score-tied groups, names ascending
/// within a group.
pub fn ranking_from_scores(scores: &BTreeMap<String, Fraction>) -> Vec<Vec<String>> {
    let mut by_score: BTreeMap<&Fraction, Vec<String>> = BTreeMap::new();
    for (candidate, score) in scores {
        by_score.entry(score).or_default().push(candidate.clone());
    }
    by_score.into_values().rev().collect()
}

fn mean(slice: &[Fraction]) -> Fraction {
    slice.iter().cloned().sum::<Fraction>() / Fraction::from(slice.len())
}
