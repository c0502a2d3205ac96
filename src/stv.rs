// Copyright 2025 the votecount developers.
// This file is part of votecount.
// votecount is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// votecount is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with votecount.  If not, see <https://www.gnu.org/licenses/>.

//! STV working state: the pile of weighted ballots each continuing candidate
//! currently holds, and the surplus transfer rules. All weight movement is
//! exact; every transfer conserves the pre-transfer total to the fraction.

use crate::fraction::Fraction;
use crate::profile::PreferenceProfile;
use crate::random_util::random_order;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How an elected candidate's surplus moves to next preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferRule {
    /// Every ballot in the pile is rescaled by surplus/tally and moves on.
    Fractional,
    /// Seeded sampling without replacement moves whole ballots, at full
    /// current weight, until exactly the surplus has moved.
    Random,
}

/// A ballot part-way through distribution: the preferences it was cast with,
/// how far down them it has advanced, and its current exact weight. Splitting
/// at a tied position produces several of these from one ballot.
#[derive(Clone, Debug)]
struct WorkingBallot<'a> {
    prefs: &'a [BTreeSet<String>],
    upto: usize,
    weight: Fraction,
}

pub(crate) struct StvState<'a> {
    piles: BTreeMap<String, Vec<WorkingBallot<'a>>>,
    quota: Fraction,
    exhausted: Fraction,
}

impl<'a> StvState<'a> {
    /// Distribute first preferences and fix the Droop quota,
    /// floor(total/(seats+1)) + 1 over the whole profile weight.
    pub(crate) fn new(profile: &'a PreferenceProfile, remaining: &BTreeSet<String>, seats: usize) -> StvState<'a> {
        let quota = (profile.total_weight() / Fraction::from(seats + 1)).floor() + Fraction::one();
        let mut state = StvState { piles: BTreeMap::new(), quota, exhausted: Fraction::zero() };
        let entries = profile
            .ballots()
            .iter()
            .filter(|b| !b.weight().is_zero())
            .map(|b| WorkingBallot { prefs: b.ranking(), upto: 0, weight: b.weight().clone() })
            .collect();
        state.distribute(entries, remaining);
        state
    }

    pub(crate) fn quota(&self) -> &Fraction {
        &self.quota
    }
    pub(crate) fn exhausted(&self) -> &Fraction {
        &self.exhausted
    }

    /// Current pile weight per candidate; zero for a candidate holding none.
    pub(crate) fn tallies(&self, remaining: &[String]) -> BTreeMap<String, Fraction> {
        remaining
            .iter()
            .map(|c| {
                let tally = self
                    .piles
                    .get(c)
                    .map(|pile| pile.iter().map(|b| b.weight.clone()).sum())
                    .unwrap_or_else(Fraction::zero);
                (c.clone(), tally)
            })
            .collect()
    }

    /// Move the surplus by rescaling every ballot in the pile by
    /// surplus/tally; the candidate retains exactly the quota.
    pub(crate) fn transfer_surplus_fractional(&mut self, candidate: &str, remaining: &BTreeSet<String>) {
        let pile = self.piles.remove(candidate).unwrap_or_default();
        let total: Fraction = pile.iter().map(|b| b.weight.clone()).sum();
        let surplus = total.clone() - self.quota.clone();
        if surplus.is_zero() {
            return;
        }
        let ratio = surplus / total;
        let rescaled = pile
            .into_iter()
            .map(|b| WorkingBallot { weight: b.weight.clone() * ratio.clone(), ..b })
            .collect();
        self.distribute(rescaled, remaining);
    }

    /// Move exactly the surplus by sampling ballots without replacement at
    /// full current weight; the ballot crossing the boundary is split so the
    /// moved total is exact, and the unsampled rest retains the quota.
    pub(crate) fn transfer_surplus_random<R: Rng + ?Sized>(
        &mut self,
        candidate: &str,
        remaining: &BTreeSet<String>,
        rng: &mut R,
    ) {
        let pile = self.piles.remove(candidate).unwrap_or_default();
        let total: Fraction = pile.iter().map(|b| b.weight.clone()).sum();
        let surplus = total - self.quota.clone();
        if surplus.is_zero() {
            return;
        }
        let mut moving = vec![];
        let mut moved = Fraction::zero();
        for index in random_order(pile.len(), rng) {
            if moved == surplus {
                break;
            }
            let entry = &pile[index];
            let headroom = surplus.clone() - moved.clone();
            if entry.weight <= headroom {
                moved += entry.weight.clone();
                moving.push(entry.clone());
            } else {
                moving.push(WorkingBallot { weight: headroom, ..entry.clone() });
                moved = surplus.clone();
            }
        }
        self.distribute(moving, remaining);
    }

    /// An eliminated candidate's whole pile moves on at current weights.
    pub(crate) fn transfer_all(&mut self, candidate: &str, remaining: &BTreeSet<String>) {
        let pile = self.piles.remove(candidate).unwrap_or_default();
        self.distribute(pile, remaining);
    }

    /// Attribute each working ballot to the first of its positions, at or
    /// past its advance point, holding a remaining candidate. A position tied
    /// between k remaining candidates splits the ballot k ways at weight/k.
    /// Ballots with nowhere left to go feed the exhausted bucket.
    fn distribute(&mut self, entries: Vec<WorkingBallot<'a>>, remaining: &BTreeSet<String>) {
        for entry in entries {
            let placement = (entry.upto..entry.prefs.len()).find_map(|position| {
                let hits: Vec<&String> =
                    entry.prefs[position].iter().filter(|c| remaining.contains(*c)).collect();
                if hits.is_empty() { None } else { Some((position, hits)) }
            });
            match placement {
                Some((position, hits)) => {
                    let share = entry.weight.clone() / Fraction::from(hits.len());
                    for hit in hits {
                        self.piles.entry(hit.clone()).or_default().push(WorkingBallot {
                            prefs: entry.prefs,
                            upto: position,
                            weight: share.clone(),
                        });
                    }
                }
                None => self.exhausted += entry.weight,
            }
        }
    }
}
