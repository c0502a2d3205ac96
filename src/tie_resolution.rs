// Copyright 2025 the votecount developers.
// This file is part of votecount.
// votecount is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// votecount is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with votecount.  If not, see <https://www.gnu.org/licenses/>.

//! Tie resolution. The engine only consults a policy for ties that straddle a
//! decision boundary; ties that change nothing are ordered by candidate name
//! without one.

use crate::profile::PreferenceProfile;
use crate::tally::{default_borda_vector, first_place_tally, positional_scores, ranking_from_scores};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How to order candidates with equal score or tally at a decision boundary.
/// The configuration carries `Option<TieBreakPolicy>`; `None` means an
/// outcome-affecting tie aborts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieBreakPolicy {
    /// A uniform permutation from the seeded generator.
    Random,
    /// Borda scores on the profile restricted to the tied set, recursively.
    Borda,
    /// First-place tallies on the profile restricted to the tied set,
    /// recursively.
    FirstPlace,
}

/// Order `tied` best-first into a strict total order, or `None` when the
/// policy is absent or cannot discriminate. The `Borda` and `FirstPlace`
/// policies recurse on still-tied subgroups, re-restricting the profile each
/// time; once recursion stops discriminating they fall back to the seeded
/// generator if one is available.
pub fn resolve_tie(
    tied: &[String],
    policy: Option<TieBreakPolicy>,
    profile: &PreferenceProfile,
    mut rng: Option<&mut ChaCha20Rng>,
) -> Option<Vec<String>> {
    if tied.len() <= 1 {
        return Some(tied.to_vec());
    }
    match policy? {
        TieBreakPolicy::Random => {
            let rng = rng.as_deref_mut()?;
            let mut order = tied.to_vec();
            order.shuffle(rng);
            Some(order)
        }
        TieBreakPolicy::Borda => resolve_by_scores(tied, profile, TieBreakPolicy::Borda, rng),
        TieBreakPolicy::FirstPlace => resolve_by_scores(tied, profile, TieBreakPolicy::FirstPlace, rng),
    }
}

fn resolve_by_scores(
    tied: &[String],
    profile: &PreferenceProfile,
    policy: TieBreakPolicy,
    mut rng: Option<&mut ChaCha20Rng>,
) -> Option<Vec<String>> {
    let keep: BTreeSet<String> = tied.iter().cloned().collect();
    let restricted = profile.restricted_to(&keep);
    let scores = match policy {
        TieBreakPolicy::Borda => {
            positional_scores(&restricted, &default_borda_vector(restricted.num_candidates()))
        }
        _ => first_place_tally(&restricted, &keep),
    };
    let mut order = vec![];
    for group in ranking_from_scores(&scores) {
        if group.len() == 1 {
            order.extend(group);
        } else if group.len() == tied.len() {
            // the scores discriminate nothing; only randomness is left
            let rng = rng.as_deref_mut()?;
            let mut group = group;
            group.shuffle(rng);
            order.extend(group);
        } else {
            order.extend(resolve_by_scores(&group, profile, policy, rng.as_deref_mut())?);
        }
    }
    Some(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballot::Ballot;
    use crate::fraction::Fraction;
    use crate::random_util::seeded_rng;

    fn tied() -> Vec<String> {
        vec!["A".to_string(), "B".to_string(), "C".to_string()]
    }

    fn profile_with_ties() -> PreferenceProfile {
        PreferenceProfile::from_ballots(vec![
            Ballot::from_positions(&[&["A", "B"]], Fraction::one()).unwrap(),
            Ballot::from_positions(&[&["A", "B", "C"]], Fraction::new(1, 2)).unwrap(),
            Ballot::from_names(&["A", "C", "B"], Fraction::from(3usize)).unwrap(),
        ])
    }

    #[test]
    fn first_place_policy_orders_by_tallies() {
        let order = resolve_tie(&tied(), Some(TieBreakPolicy::FirstPlace), &profile_with_ties(), None);
        assert_eq!(order.unwrap(), tied());
    }

    #[test]
    fn borda_policy_orders_by_restricted_borda() {
        let order = resolve_tie(&tied(), Some(TieBreakPolicy::Borda), &profile_with_ties(), None);
        assert_eq!(order.unwrap(), vec!["A".to_string(), "C".to_string(), "B".to_string()]);
    }

    #[test]
    fn no_policy_means_no_resolution() {
        assert_eq!(resolve_tie(&tied(), None, &profile_with_ties(), None), None);
        // a single candidate needs no policy at all
        let lone = ["A".to_string()];
        assert_eq!(resolve_tie(&lone, None, &profile_with_ties(), None), Some(lone.to_vec()));
    }

    #[test]
    fn recursion_splits_subgroups() {
        // first-place over {A,B,C}: A=2, B=2, C=1; restricted to {A,B} the
        // head-to-head ballots still tie, so without a seed resolution fails
        let profile = PreferenceProfile::from_ballots(vec![
            Ballot::from_names(&["A", "B"], Fraction::from(2usize)).unwrap(),
            Ballot::from_names(&["B", "A"], Fraction::from(2usize)).unwrap(),
            Ballot::from_names(&["C"], Fraction::one()).unwrap(),
        ]);
        assert_eq!(resolve_tie(&tied(), Some(TieBreakPolicy::FirstPlace), &profile, None), None);
        let mut rng = seeded_rng(11);
        let order =
            resolve_tie(&tied(), Some(TieBreakPolicy::FirstPlace), &profile, Some(&mut rng)).unwrap();
        assert_eq!(order[2], "C".to_string());
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn random_policy_replays_with_the_seed() {
        let profile = profile_with_ties();
        let mut a = seeded_rng(5);
        let mut b = seeded_rng(5);
        assert_eq!(
            resolve_tie(&tied(), Some(TieBreakPolicy::Random), &profile, Some(&mut a)),
            resolve_tie(&tied(), Some(TieBreakPolicy::Random), &profile, Some(&mut b)),
        );
    }
}
