//! Pairwise-majority comparisons: who beats whom, and the dominance tiers
//! used by the Condorcet-flavoured methods.

use crate::fraction::Fraction;
use crate::profile::PreferenceProfile;
use std::collections::BTreeMap;

/// For every ordered candidate pair (i, j), the total ballot weight strictly
/// preferring i to j. A ballot prefers a ranked candidate to an unranked one;
/// candidates sharing a position, or both unranked, prefer neither.
pub struct PairwiseComparison {
    candidates: Vec<String>,
    prefer: Vec<Fraction>,
}

impl PairwiseComparison {
    pub fn new(profile: &PreferenceProfile) -> PairwiseComparison {
        let candidates: Vec<String> = profile.candidates().to_vec();
        let n = candidates.len();
        let index: BTreeMap<&String, usize> = candidates.iter().enumerate().map(|(i, c)| (c, i)).collect();
        let mut prefer = vec![Fraction::zero(); n * n];
        for ballot in profile.ballots() {
            if ballot.weight().is_zero() {
                continue;
            }
            let mut rank_of: BTreeMap<usize, usize> = BTreeMap::new();
            for (position, members) in ballot.ranking().iter().enumerate() {
                for candidate in members {
                    rank_of.insert(index[candidate], position);
                }
            }
            for i in 0..n {
                for j in 0..n {
                    let preferred = match (rank_of.get(&i), rank_of.get(&j)) {
                        (Some(ri), Some(rj)) => ri < rj,
                        (Some(_), None) => true,
                        _ => false,
                    };
                    if preferred {
                        prefer[i * n + j] += ballot.weight().clone();
                    }
                }
            }
        }
        PairwiseComparison { candidates, prefer }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn weight_preferring(&self, i: usize, j: usize) -> &Fraction {
        &self.prefer[i * self.candidates.len() + j]
    }

    /// i beats j when strictly more weight prefers i to j than j to i.
    pub fn beats(&self, i: usize, j: usize) -> bool {
        self.weight_preferring(i, j) > self.weight_preferring(j, i)
    }

    /// For each candidate, how many others they beat pairwise.
    pub fn win_counts(&self) -> Vec<usize> {
        let n = self.candidates.len();
        (0..n).map(|i| (0..n).filter(|&j| j != i && self.beats(i, j)).count()).collect()
    }

    /// Partition the candidates into dominance tiers, best first. A tier is
    /// the smallest nonempty set of still-unplaced candidates all of whom beat
    /// everyone unplaced outside it; candidates nobody separates land in the
    /// same tier.
    pub fn dominance_tiers(&self) -> Vec<Vec<String>> {
        let n = self.candidates.len();
        let mut unplaced: Vec<usize> = (0..n).collect();
        let mut tiers = vec![];
        while !unplaced.is_empty() {
            let tier = self.minimal_dominant_set(&unplaced);
            unplaced.retain(|i| !tier.contains(i));
            tiers.push(tier.into_iter().map(|i| self.candidates[i].clone()).collect());
        }
        tiers
    }

    /// Smallest dominant subset of `pool`: seed with the candidates of maximal
    /// win count within the pool, then close over everyone not strictly beaten
    /// by the whole current set.
    fn minimal_dominant_set(&self, pool: &[usize]) -> Vec<usize> {
        let wins: BTreeMap<usize, usize> = pool
            .iter()
            .map(|&i| (i, pool.iter().filter(|&&j| j != i && self.beats(i, j)).count()))
            .collect();
        let best = wins.values().max().copied().unwrap_or(0);
        let mut set: Vec<usize> = pool.iter().filter(|i| wins[i] == best).copied().collect();
        loop {
            let addition: Vec<usize> = pool
                .iter()
                .filter(|i| !set.contains(i))
                .filter(|&&candidate| set.iter().any(|&member| !self.beats(member, candidate)))
                .copied()
                .collect();
            if addition.is_empty() {
                break;
            }
            set.extend(addition);
        }
        set.sort_unstable();
        set
    }
}
