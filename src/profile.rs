// Copyright 2025 the votecount developers.
// This file is part of votecount.
// votecount is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// votecount is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with votecount.  If not, see <https://www.gnu.org/licenses/>.

//! The immutable aggregate of ballots and the candidate roster for one
//! election instance.

use crate::ballot::Ballot;
use crate::errors::ValidationError;
use crate::fraction::Fraction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::convert::TryFrom;
use std::io::{Read, Write};

/// Ballots plus the candidate roster. Every operation that "edits" a profile
/// returns a new one, leaving the original intact for reuse across
/// experiments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawProfile")]
pub struct PreferenceProfile {
    candidates: Vec<String>,
    ballots: Vec<Ballot>,
}

impl PreferenceProfile {
    /// A profile with an explicit roster. Fails on duplicate roster entries
    /// and on any positive-weight ballot mentioning a candidate outside the
    /// roster.
    pub fn new(ballots: Vec<Ballot>, candidates: Vec<String>) -> Result<PreferenceProfile, ValidationError> {
        let mut roster: BTreeSet<&String> = BTreeSet::new();
        for candidate in &candidates {
            if !roster.insert(candidate) {
                return Err(ValidationError::DuplicateCandidate(candidate.clone()));
            }
        }
        for ballot in &ballots {
            if ballot.weight().is_zero() {
                continue;
            }
            for mentioned in ballot.mentions() {
                if !roster.contains(mentioned) {
                    return Err(ValidationError::UnknownCandidate(mentioned.clone()));
                }
            }
        }
        Ok(PreferenceProfile { candidates, ballots })
    }

    /// A profile whose roster is derived as the union of all mentioned
    /// candidates, in first-mention order.
    pub fn from_ballots(ballots: Vec<Ballot>) -> PreferenceProfile {
        let mut candidates: Vec<String> = vec![];
        let mut seen: BTreeSet<&String> = BTreeSet::new();
        for ballot in &ballots {
            for mentioned in ballot.mentions() {
                if seen.insert(mentioned) {
                    candidates.push(mentioned.clone());
                }
            }
        }
        PreferenceProfile { candidates, ballots }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }
    pub fn ballots(&self) -> &[Ballot] {
        &self.ballots
    }
    pub fn num_candidates(&self) -> usize {
        self.candidates.len()
    }

    pub fn total_weight(&self) -> Fraction {
        self.ballots.iter().map(|b| b.weight().clone()).sum()
    }

    /// The roster members that actually appear on some positive-weight ballot.
    pub fn candidates_cast(&self) -> BTreeSet<String> {
        let mut cast = BTreeSet::new();
        for ballot in &self.ballots {
            if !ballot.weight().is_zero() {
                cast.extend(ballot.mentions().cloned());
            }
        }
        cast
    }

    /// Merge ballots with identical (ranking, scores) by summing weights.
    /// First-occurrence order is kept, total weight is preserved exactly, and
    /// condensing twice changes nothing.
    pub fn condense(&self) -> PreferenceProfile {
        type Key<'a> = (&'a [BTreeSet<String>], &'a BTreeMap<String, Fraction>);
        let mut first_seen: Vec<usize> = vec![];
        let mut merged: HashMap<Key, Fraction> = HashMap::new();
        for (index, ballot) in self.ballots.iter().enumerate() {
            let key = (ballot.ranking(), ballot.scores());
            merged
                .entry(key)
                .and_modify(|w| *w += ballot.weight().clone())
                .or_insert_with(|| {
                    first_seen.push(index);
                    ballot.weight().clone()
                });
        }
        let ballots = first_seen
            .into_iter()
            .map(|index| {
                let ballot = &self.ballots[index];
                let weight = merged.remove(&(ballot.ranking(), ballot.scores())).unwrap();
                ballot.reweighted(weight)
            })
            .collect();
        PreferenceProfile { candidates: self.candidates.clone(), ballots }
    }

    /// A new profile with the given candidates struck from the roster and from
    /// every ballot. Ballots left mentioning nobody disappear.
    pub fn without_candidates(&self, drop: &BTreeSet<String>) -> PreferenceProfile {
        let candidates = self.candidates.iter().filter(|c| !drop.contains(*c)).cloned().collect();
        let ballots = self.ballots.iter().filter_map(|b| b.without_candidates(drop)).collect();
        PreferenceProfile { candidates, ballots }
    }

    /// The complement of `without_candidates`: keep only the given candidates.
    pub fn restricted_to(&self, keep: &BTreeSet<String>) -> PreferenceProfile {
        let drop: BTreeSet<String> = self.candidates.iter().filter(|c| !keep.contains(*c)).cloned().collect();
        self.without_candidates(&drop)
    }

    /// Expand every tied ranking position into all orderings (weight split
    /// equally) and condense the result.
    pub fn resolve_ties(&self) -> PreferenceProfile {
        let ballots = self.ballots.iter().flat_map(|b| b.expand_ties()).collect();
        PreferenceProfile { candidates: self.candidates.clone(), ballots }.condense()
    }

    pub fn print_summary(&self) {
        let condensed = self.condense();
        println!(
            "{} candidates, {} ballots ({} distinct), total weight {}",
            self.candidates.len(),
            self.ballots.len(),
            condensed.ballots.len(),
            self.total_weight()
        );
        let cast = self.candidates_cast();
        for candidate in &self.candidates {
            if !cast.contains(candidate) {
                println!("  {} received no ballots", candidate);
            }
        }
    }

    pub fn write_json<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer(writer, self)
    }
    pub fn read_json<R: Read>(reader: R) -> serde_json::Result<PreferenceProfile> {
        serde_json::from_reader(reader)
    }
}

#[derive(Deserialize)]
struct RawProfile {
    #[serde(default)]
    candidates: Option<Vec<String>>,
    ballots: Vec<Ballot>,
}

impl TryFrom<RawProfile> for PreferenceProfile {
    type Error = ValidationError;
    fn try_from(raw: RawProfile) -> Result<Self, Self::Error> {
        match raw.candidates {
            Some(candidates) => PreferenceProfile::new(raw.ballots, candidates),
            None => Ok(PreferenceProfile::from_ballots(raw.ballots)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn roster_is_derived_from_mentions() {
        let profile = PreferenceProfile::from_ballots(vec![
            Ballot::from_names(&["A", "B", "C"], Fraction::one()).unwrap(),
            Ballot::from_names(&["B", "C", "E"], Fraction::one()).unwrap(),
        ]);
        assert_eq!(profile.candidates(), names(&["A", "B", "C", "E"]).as_slice());
    }

    #[test]
    fn explicit_roster_is_validated() {
        let ballots = vec![Ballot::from_names(&["A", "D"], Fraction::one()).unwrap()];
        assert_eq!(
            PreferenceProfile::new(ballots.clone(), names(&["A", "B", "B"])),
            Err(ValidationError::DuplicateCandidate("B".to_string()))
        );
        assert_eq!(
            PreferenceProfile::new(ballots, names(&["A", "B"])),
            Err(ValidationError::UnknownCandidate("D".to_string()))
        );
        // zero-weight ballots may mention anyone
        let weightless = vec![Ballot::from_names(&["Z"], Fraction::zero()).unwrap()];
        assert!(PreferenceProfile::new(weightless, names(&["A"])).is_ok());
    }

    #[test]
    fn condense_merges_and_preserves_weight() {
        let profile = PreferenceProfile::from_ballots(vec![
            Ballot::from_names(&["A", "B"], Fraction::from(2usize)).unwrap(),
            Ballot::from_names(&["B", "A"], Fraction::new(1, 2)).unwrap(),
            Ballot::from_names(&["A", "B"], Fraction::new(1, 2)).unwrap(),
        ]);
        let condensed = profile.condense();
        assert_eq!(condensed.ballots().len(), 2);
        assert_eq!(condensed.total_weight(), profile.total_weight());
        assert_eq!(condensed.ballots()[0].weight(), &Fraction::new(5, 2));
        // idempotent
        assert_eq!(condensed.condense(), condensed);
    }

    #[test]
    fn candidates_cast_ignores_weightless_ballots() {
        let profile = PreferenceProfile::new(
            vec![
                Ballot::from_names(&["A"], Fraction::one()).unwrap(),
                Ballot::from_names(&["B"], Fraction::zero()).unwrap(),
            ],
            names(&["A", "B", "C"]),
        )
        .unwrap();
        assert_eq!(profile.candidates_cast(), BTreeSet::from(["A".to_string()]));
    }

    #[test]
    fn resolve_ties_matches_manual_expansion() {
        let profile = PreferenceProfile::from_ballots(vec![
            Ballot::from_positions(&[&["A", "B"]], Fraction::one()).unwrap(),
            Ballot::from_positions(&[&["A", "B", "C"]], Fraction::new(1, 2)).unwrap(),
            Ballot::from_names(&["A", "C", "B"], Fraction::from(3usize)).unwrap(),
        ]);
        let resolved = profile.resolve_ties();
        assert_eq!(resolved.total_weight(), profile.total_weight());
        // A>C>B appears once from the six-way expansion (1/12) and once whole (3)
        let acb = Ballot::from_names(&["A", "C", "B"], Fraction::new(37, 12)).unwrap();
        assert!(resolved.ballots().contains(&acb));
        for ballot in resolved.ballots() {
            assert!(ballot.ranking().iter().all(|p| p.len() == 1));
        }
    }

    #[test]
    fn without_candidates_merges_nothing_but_shrinks() {
        let profile = PreferenceProfile::from_ballots(vec![
            Ballot::from_names(&["A", "B"], Fraction::one()).unwrap(),
            Ballot::from_names(&["A"], Fraction::from(3usize)).unwrap(),
        ]);
        let drop = BTreeSet::from(["A".to_string()]);
        let reduced = profile.without_candidates(&drop);
        assert_eq!(reduced.candidates(), &["B".to_string()]);
        assert_eq!(reduced.ballots().len(), 1);
        // the original is untouched
        assert_eq!(profile.ballots().len(), 2);
    }

    #[test]
    fn json_round_trip() {
        let profile = PreferenceProfile::from_ballots(vec![
            Ballot::from_names(&["A", "B"], Fraction::new(7, 2)).unwrap(),
        ]);
        let text = serde_json::to_string(&profile).unwrap();
        let back: PreferenceProfile = serde_json::from_str(&text).unwrap();
        assert_eq!(back, profile);
    }
}
