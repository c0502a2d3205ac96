// Copyright 2025 the votecount developers.
// This file is part of votecount.
// votecount is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// votecount is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with votecount.  If not, see <https://www.gnu.org/licenses/>.

//! A single voter-weight record: a ranking and/or scores over candidates.

use crate::errors::ValidationError;
use crate::fraction::Fraction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::convert::TryFrom;

/// One voter's (or voter group's) weighted ranking and/or scoring of
/// candidates. A ranking position holding more than one candidate is a tie at
/// that position. Immutable once constructed; every transformation returns a
/// new ballot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBallot")]
pub struct Ballot {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ranking: Vec<BTreeSet<String>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    scores: BTreeMap<String, Fraction>,
    weight: Fraction,
}

impl Ballot {
    /// Validates eagerly: the weight must be nonnegative, no ranking position
    /// may be empty, no candidate may occupy two positions, and scores must be
    /// nonnegative. Zero scores are dropped; a candidate scored zero is
    /// indistinguishable from one not scored at all.
    pub fn new(
        ranking: Vec<BTreeSet<String>>,
        scores: BTreeMap<String, Fraction>,
        weight: Fraction,
    ) -> Result<Ballot, ValidationError> {
        if weight.is_negative() {
            return Err(ValidationError::NegativeWeight(weight));
        }
        let mut seen: BTreeSet<&String> = BTreeSet::new();
        for position in &ranking {
            if position.is_empty() {
                return Err(ValidationError::EmptyRankingPosition);
            }
            for candidate in position {
                if !seen.insert(candidate) {
                    return Err(ValidationError::RepeatedCandidate(candidate.clone()));
                }
            }
        }
        for (candidate, score) in &scores {
            if score.is_negative() {
                return Err(ValidationError::NegativeScore(candidate.clone()));
            }
        }
        let scores = scores.into_iter().filter(|(_, s)| !s.is_zero()).collect();
        Ok(Ballot { ranking, scores, weight })
    }

    /// A strict ranking, one candidate per position.
    pub fn from_names(names: &[&str], weight: Fraction) -> Result<Ballot, ValidationError> {
        Ballot::from_positions(&names.iter().map(|n| std::slice::from_ref(n)).collect::<Vec<_>>(), weight)
    }

    /// A ranking possibly containing tied positions.
    pub fn from_positions(positions: &[&[&str]], weight: Fraction) -> Result<Ballot, ValidationError> {
        let ranking = positions
            .iter()
            .map(|p| p.iter().map(|n| n.to_string()).collect())
            .collect();
        Ballot::new(ranking, BTreeMap::new(), weight)
    }

    /// A pure score ballot with no ranking.
    pub fn from_scores(scores: BTreeMap<String, Fraction>, weight: Fraction) -> Result<Ballot, ValidationError> {
        Ballot::new(vec![], scores, weight)
    }

    pub fn ranking(&self) -> &[BTreeSet<String>] {
        &self.ranking
    }
    pub fn scores(&self) -> &BTreeMap<String, Fraction> {
        &self.scores
    }
    pub fn weight(&self) -> &Fraction {
        &self.weight
    }
    pub fn has_ranking(&self) -> bool {
        !self.ranking.is_empty()
    }
    pub fn has_scores(&self) -> bool {
        !self.scores.is_empty()
    }

    /// Every candidate this ballot mentions, ranking positions first.
    pub fn mentions(&self) -> impl Iterator<Item = &String> {
        self.ranking.iter().flatten().chain(self.scores.keys())
    }

    /// A new ballot with the given candidates struck from both the ranking and
    /// the scores. Emptied positions disappear; a ballot left with neither
    /// ranking nor scores disappears too.
    pub fn without_candidates(&self, drop: &BTreeSet<String>) -> Option<Ballot> {
        let ranking: Vec<BTreeSet<String>> = self
            .ranking
            .iter()
            .map(|p| p.iter().filter(|c| !drop.contains(*c)).cloned().collect::<BTreeSet<String>>())
            .filter(|p: &BTreeSet<String>| !p.is_empty())
            .collect();
        let scores: BTreeMap<String, Fraction> =
            self.scores.iter().filter(|(c, _)| !drop.contains(*c)).map(|(c, s)| (c.clone(), s.clone())).collect();
        if ranking.is_empty() && scores.is_empty() {
            None
        } else {
            Some(Ballot { ranking, scores, weight: self.weight.clone() })
        }
    }

    /// The same ballot at a different weight.
    pub(crate) fn reweighted(&self, weight: Fraction) -> Ballot {
        Ballot { ranking: self.ranking.clone(), scores: self.scores.clone(), weight }
    }

    /// Expand every tied position into all of its orderings, the weight split
    /// equally over the expansion. A ballot with no ties comes back alone.
    pub fn expand_ties(&self) -> Vec<Ballot> {
        let mut expansions: Vec<Vec<BTreeSet<String>>> = vec![vec![]];
        for position in &self.ranking {
            if position.len() == 1 {
                for e in &mut expansions {
                    e.push(position.clone());
                }
            } else {
                let members: Vec<&String> = position.iter().collect();
                let orderings = permutations(&members);
                let mut next = Vec::with_capacity(expansions.len() * orderings.len());
                for e in &expansions {
                    for ordering in &orderings {
                        let mut grown = e.clone();
                        grown.extend(ordering.iter().map(|c| BTreeSet::from([(*c).clone()])));
                        next.push(grown);
                    }
                }
                expansions = next;
            }
        }
        let share = self.weight.clone() / Fraction::from(expansions.len());
        expansions
            .into_iter()
            .map(|ranking| Ballot { ranking, scores: self.scores.clone(), weight: share.clone() })
            .collect()
    }
}

fn permutations<'a>(items: &[&'a String]) -> Vec<Vec<&'a String>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut res = vec![];
    for (i, &head) in items.iter().enumerate() {
        let mut rest: Vec<&String> = items.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head);
            res.push(tail);
        }
    }
    res
}

#[derive(Deserialize)]
struct RawBallot {
    #[serde(default)]
    ranking: Vec<BTreeSet<String>>,
    #[serde(default)]
    scores: BTreeMap<String, Fraction>,
    #[serde(default = "Fraction::one")]
    weight: Fraction,
}

impl TryFrom<RawBallot> for Ballot {
    type Error = ValidationError;
    fn try_from(raw: RawBallot) -> Result<Self, Self::Error> {
        Ballot::new(raw.ranking, raw.scores, raw.weight)
    }
}
