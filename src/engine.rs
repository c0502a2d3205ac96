// Copyright 2025 the votecount developers.
// This file is part of votecount.
// votecount is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// votecount is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with votecount.  If not, see <https://www.gnu.org/licenses/>.

//! The round state machine. One engine instance runs one (profile,
//! configuration) pair to completion, appending one immutable round snapshot
//! per transition until the seats are filled or nobody is left undecided.

use crate::errors::{ConfigurationError, ElectionError};
use crate::fraction::Fraction;
use crate::pairwise::PairwiseComparison;
use crate::profile::PreferenceProfile;
use crate::random_util::{seeded_rng, weighted_choice};
use crate::stv::{StvState, TransferRule};
use crate::tally::{
    default_borda_vector, first_place_tally, last_place_tally, limited_tally, mentions,
    positional_scores, ranking_from_scores, score_profile, validate_score_vector,
};
use crate::tie_resolution::{TieBreakPolicy, resolve_tie};
use crate::transcript::{RoundState, Transcript};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The closed set of supported election methods. Every variant shares the
/// same round-snapshot and termination machinery; each owns its scoring,
/// elimination and transfer logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionMethod {
    /// Single round, first-place tallies, top m elected.
    Plurality,
    /// Single round, positional scores, top m elected.
    Borda,
    /// Multi-round quota/transfer counting. One seat makes this IRV.
    Stv { transfer: TransferRule },
    /// Borda adjusted so pairwise wins dominate raw totals.
    CondorcetBorda,
    /// Pairwise dominance tiers elected top-down.
    DominatingSets,
    /// Direct sums of the ballots' own scores.
    HighestScore,
    /// Direct sums, each ballot capped at `limit` points per candidate.
    Rating { limit: usize },
    /// One point per ranking appearance, regardless of position.
    Cumulative,
    /// One point for each of a ballot's top `votes` ranked candidates.
    Limited { votes: usize },
    /// Eliminate by veto tally until the remaining just fill the seats.
    PluralityVeto,
    /// Elect with probability proportional to first-place tally.
    RandomDictator,
    /// Elect with probability proportional to the squared tally.
    BoostedRandomDictator,
}

impl ElectionMethod {
    fn draws_randomness(&self) -> bool {
        matches!(
            self,
            ElectionMethod::Stv { transfer: TransferRule::Random }
                | ElectionMethod::PluralityVeto
                | ElectionMethod::RandomDictator
                | ElectionMethod::BoostedRandomDictator
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionConfig {
    /// The number of seats, m.
    pub seats: usize,
    pub method: ElectionMethod,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tiebreak: Option<TieBreakPolicy>,
    /// For the positional methods; defaults to (n-1, …, 0).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub score_vector: Option<Vec<Fraction>>,
    /// Required whenever the method, tie-break policy or transfer rule draws
    /// randomness.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub seed: Option<u64>,
    #[serde(skip)]
    pub print_progress: bool,
}

impl ElectionConfig {
    pub fn new(seats: usize, method: ElectionMethod) -> ElectionConfig {
        ElectionConfig { seats, method, tiebreak: None, score_vector: None, seed: None, print_progress: false }
    }
}

/// Runs one election to completion. The transcript stays valid and
/// inspectable even when a run aborts on an unresolvable tie.
pub struct ElectionEngine<'a> {
    profile: &'a PreferenceProfile,
    config: ElectionConfig,
    rng: Option<ChaCha20Rng>,
    stv: Option<StvState<'a>>,
    remaining: Vec<String>,
    elected: Vec<String>,
    eliminated: Vec<String>,
    transcript: Transcript,
    complete: bool,
}

impl<'a> ElectionEngine<'a> {
    /// Checks the whole configuration before any round can run; a rejected
    /// configuration never produces round history.
    pub fn new(profile: &'a PreferenceProfile, config: ElectionConfig) -> Result<ElectionEngine<'a>, ElectionError> {
        let n = profile.num_candidates();
        if config.seats == 0 || config.seats > n {
            return Err(ConfigurationError::InvalidSeats { seats: config.seats, candidates: n }.into());
        }
        if let Some(vector) = &config.score_vector {
            validate_score_vector(vector, n)?;
        }
        if (config.method.draws_randomness() || config.tiebreak == Some(TieBreakPolicy::Random))
            && config.seed.is_none()
        {
            return Err(ConfigurationError::SeedRequired.into());
        }
        match &config.method {
            ElectionMethod::Limited { votes: 0 } => {
                return Err(ConfigurationError::InvalidMethodParameter(
                    "limited voting needs at least one vote per ballot",
                )
                .into());
            }
            ElectionMethod::Rating { limit } => {
                if *limit == 0 {
                    return Err(ConfigurationError::InvalidMethodParameter(
                        "the rating limit must be at least one",
                    )
                    .into());
                }
                let cap = Fraction::from(*limit);
                for ballot in profile.ballots() {
                    for (candidate, score) in ballot.scores() {
                        if *score > cap {
                            return Err(ConfigurationError::ScoreLimitExceeded {
                                candidate: candidate.clone(),
                                limit: *limit,
                            }
                            .into());
                        }
                    }
                }
            }
            _ => {}
        }
        let rng = config.seed.map(seeded_rng);
        let remaining = profile.candidates().to_vec();
        let stv = match &config.method {
            ElectionMethod::Stv { .. } => {
                let everyone: BTreeSet<String> = remaining.iter().cloned().collect();
                Some(StvState::new(profile, &everyone, config.seats))
            }
            _ => None,
        };
        let mut transcript = Transcript::default();
        transcript.quota = stv.as_ref().map(|s| s.quota().clone());
        if config.print_progress {
            if let Some(quota) = &transcript.quota {
                println!("Quota = {}", quota);
            }
        }
        Ok(ElectionEngine {
            profile,
            config,
            rng,
            stv,
            remaining,
            elected: vec![],
            eliminated: vec![],
            transcript,
            complete: false,
        })
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }
    pub fn into_transcript(self) -> Transcript {
        self.transcript
    }
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Run every remaining round. On an unresolvable tie the error propagates
    /// and the transcript keeps every fully resolved round.
    pub fn run(&mut self) -> Result<(), ElectionError> {
        while !self.complete {
            self.next_round()?;
        }
        Ok(())
    }

    /// One transition of the state machine. A no-op once complete.
    pub fn next_round(&mut self) -> Result<(), ElectionError> {
        if self.complete {
            return Ok(());
        }
        match self.config.method.clone() {
            ElectionMethod::Plurality => {
                let everyone: BTreeSet<String> = self.remaining.iter().cloned().collect();
                let tallies = first_place_tally(self.profile, &everyone);
                self.single_round(tallies)?;
            }
            ElectionMethod::Borda => {
                let scores = positional_scores(self.profile, &self.borda_vector());
                self.single_round(scores)?;
            }
            ElectionMethod::Stv { transfer } => self.stv_round(transfer)?,
            ElectionMethod::CondorcetBorda => {
                let scores = self.condorcet_borda_scores();
                self.single_round(scores)?;
            }
            ElectionMethod::DominatingSets => {
                let scores = self.dominance_scores();
                self.single_round(scores)?;
            }
            ElectionMethod::HighestScore | ElectionMethod::Rating { .. } => {
                let scores = self.filled(score_profile(self.profile));
                self.single_round(scores)?;
            }
            ElectionMethod::Cumulative => {
                let scores = self.filled(mentions(self.profile));
                self.single_round(scores)?;
            }
            ElectionMethod::Limited { votes } => {
                let scores = self.filled(limited_tally(self.profile, votes));
                self.single_round(scores)?;
            }
            ElectionMethod::PluralityVeto => self.veto_round()?,
            ElectionMethod::RandomDictator => self.dictator_round(false)?,
            ElectionMethod::BoostedRandomDictator => self.dictator_round(true)?,
        }
        self.complete = self.elected.len() == self.config.seats || self.remaining.is_empty();
        Ok(())
    }

    /// Re-run the same (profile, configuration, seed) from scratch and return
    /// the rounds from `round` on. Every draw is seeded, so the result
    /// reproduces a completed run's suffix bit-for-bit.
    pub fn replay_from(&self, round: usize) -> Result<Vec<RoundState>, ElectionError> {
        let mut engine = ElectionEngine::new(self.profile, self.config.clone())?;
        engine.run()?;
        Ok(engine.transcript.rounds.into_iter().skip(round).collect())
    }

    fn borda_vector(&self) -> Vec<Fraction> {
        self.config
            .score_vector
            .clone()
            .unwrap_or_else(|| default_borda_vector(self.profile.num_candidates()))
    }

    /// Zero-fill a score map so every roster candidate appears.
    fn filled(&self, mut scores: BTreeMap<String, Fraction>) -> BTreeMap<String, Fraction> {
        for candidate in self.profile.candidates() {
            scores.entry(candidate.clone()).or_insert_with(Fraction::zero);
        }
        scores
    }

    /// wins·B + borda, with B above any possible Borda total, so a candidate
    /// beating all others pairwise outranks every raw point count.
    fn condorcet_borda_scores(&self) -> BTreeMap<String, Fraction> {
        let vector = self.borda_vector();
        let mut scores = positional_scores(self.profile, &vector);
        let pairwise = PairwiseComparison::new(self.profile);
        let top_entry = vector.first().cloned().unwrap_or_else(Fraction::zero);
        let bound = self.profile.total_weight() * top_entry + Fraction::one();
        for (candidate, wins) in pairwise.candidates().iter().zip(pairwise.win_counts()) {
            *scores.get_mut(candidate).unwrap() += Fraction::from(wins) * bound.clone();
        }
        scores
    }

    /// Each candidate scores the number of candidates in strictly lower
    /// dominance tiers, so whole tiers elect top-down and candidates inside a
    /// tier stay tied for the policy to separate.
    fn dominance_scores(&self) -> BTreeMap<String, Fraction> {
        let tiers = PairwiseComparison::new(self.profile).dominance_tiers();
        let mut below = self.profile.num_candidates();
        let mut scores = BTreeMap::new();
        for tier in tiers {
            below -= tier.len();
            for candidate in tier {
                scores.insert(candidate, Fraction::from(below));
            }
        }
        scores
    }

    /// The single-round methods: score everybody, elect the top m, leave the
    /// rest remaining.
    fn single_round(&mut self, scores: BTreeMap<String, Fraction>) -> Result<(), ElectionError> {
        let pool = self.remaining.clone();
        let (winners, rest, tiebreak_winners) = self.cut_top(&scores, &pool, self.config.seats)?;
        for winner in winners {
            self.declare_elected(winner);
        }
        self.remaining = rest;
        self.push_round(scores, tiebreak_winners, Fraction::zero());
        Ok(())
    }

    /// Take the top `seats_open` of `pool` by score. Score-tied groups lying
    /// wholly inside or outside the cut keep candidate-name order; a group
    /// straddling the cut goes to the tie-break policy, and an absent or
    /// exhausted policy aborts the round.
    fn cut_top(
        &mut self,
        scores: &BTreeMap<String, Fraction>,
        pool: &[String],
        seats_open: usize,
    ) -> Result<(Vec<String>, Vec<String>, BTreeSet<String>), ElectionError> {
        let pool_scores: BTreeMap<String, Fraction> =
            pool.iter().map(|c| (c.clone(), scores[c].clone())).collect();
        let mut winners: Vec<String> = vec![];
        let mut rest: Vec<String> = vec![];
        let mut tiebreak_winners = BTreeSet::new();
        for group in ranking_from_scores(&pool_scores) {
            if winners.len() == seats_open {
                rest.extend(group);
            } else if winners.len() + group.len() <= seats_open {
                winners.extend(group);
            } else {
                let resolved = resolve_tie(&group, self.config.tiebreak, self.profile, self.rng.as_mut())
                    .ok_or_else(|| ElectionError::UnresolvedTie {
                        round: self.transcript.rounds.len() + 1,
                        candidates: group.clone(),
                    })?;
                tiebreak_winners.extend(group);
                let need = seats_open - winners.len();
                winners.extend(resolved[..need].iter().cloned());
                rest.extend(resolved[need..].iter().cloned());
            }
        }
        Ok((winners, rest, tiebreak_winners))
    }

    fn stv_round(&mut self, transfer: TransferRule) -> Result<(), ElectionError> {
        let tallies = self.stv.as_ref().unwrap().tallies(&self.remaining);
        let quota = self.transcript.quota.clone().unwrap();
        let open = self.config.seats - self.elected.len();
        let mut tiebreak_winners = BTreeSet::new();

        if self.remaining.len() == open {
            // everybody left fills a seat, highest tally first
            for candidate in order_descending(&tallies, &self.remaining) {
                self.declare_elected(candidate);
            }
        } else {
            let over: Vec<String> =
                self.remaining.iter().filter(|c| tallies[*c] >= quota).cloned().collect();
            if !over.is_empty() {
                let (winners, _, tb) = self.cut_top(&tallies, &over, open.min(over.len()))?;
                tiebreak_winners = tb;
                for candidate in &winners {
                    self.declare_elected(candidate.clone());
                }
                if self.elected.len() < self.config.seats {
                    let still: BTreeSet<String> = self.remaining.iter().cloned().collect();
                    for candidate in &winners {
                        match transfer {
                            TransferRule::Fractional => {
                                self.stv.as_mut().unwrap().transfer_surplus_fractional(candidate, &still)
                            }
                            TransferRule::Random => {
                                let rng = self.rng.as_mut().unwrap();
                                self.stv.as_mut().unwrap().transfer_surplus_random(candidate, &still, rng)
                            }
                        }
                    }
                }
            } else {
                let lowest = tallies.values().min().unwrap().clone();
                let group: Vec<String> =
                    self.remaining.iter().filter(|c| tallies[*c] == lowest).cloned().collect();
                let loser = if group.len() == 1 {
                    group[0].clone()
                } else {
                    let resolved =
                        resolve_tie(&group, self.config.tiebreak, self.profile, self.rng.as_mut())
                            .ok_or_else(|| ElectionError::UnresolvedTie {
                                round: self.transcript.rounds.len() + 1,
                                candidates: group.clone(),
                            })?;
                    tiebreak_winners.extend(group);
                    resolved.last().unwrap().clone()
                };
                self.declare_eliminated(loser.clone());
                let still: BTreeSet<String> = self.remaining.iter().cloned().collect();
                self.stv.as_mut().unwrap().transfer_all(&loser, &still);
            }
        }
        self.remaining = order_descending(&tallies, &self.remaining);
        let exhausted = self.stv.as_ref().unwrap().exhausted().clone();
        self.push_round(tallies, tiebreak_winners, exhausted);
        Ok(())
    }

    /// One seeded draw per round, probability proportional to the first-place
    /// tally (squared when boosted), electing the drawn candidate.
    fn dictator_round(&mut self, boosted: bool) -> Result<(), ElectionError> {
        let remaining_set: BTreeSet<String> = self.remaining.iter().cloned().collect();
        let tallies = first_place_tally(self.profile, &remaining_set);
        let pool = self.remaining.clone();
        let weights: Vec<Fraction> = pool
            .iter()
            .map(|c| {
                let tally = tallies[c].clone();
                if boosted { tally.clone() * tally } else { tally }
            })
            .collect();
        let drawn = weighted_choice(&weights, self.rng.as_mut().unwrap()).unwrap();
        self.declare_elected(pool[drawn].clone());
        self.remaining = order_descending(&tallies, &self.remaining);
        self.push_round(tallies, BTreeSet::new(), Fraction::zero());
        Ok(())
    }

    /// One seeded veto per round: eliminate with probability proportional to
    /// the last-place tally, until the remaining exactly fill the open seats.
    fn veto_round(&mut self) -> Result<(), ElectionError> {
        let remaining_set: BTreeSet<String> = self.remaining.iter().cloned().collect();
        let tallies = first_place_tally(self.profile, &remaining_set);
        let open = self.config.seats - self.elected.len();
        if self.remaining.len() == open {
            for candidate in order_descending(&tallies, &self.remaining) {
                self.declare_elected(candidate);
            }
        } else {
            let vetoes = last_place_tally(self.profile, &remaining_set);
            let pool = self.remaining.clone();
            let weights: Vec<Fraction> = pool.iter().map(|c| vetoes[c].clone()).collect();
            let drawn = weighted_choice(&weights, self.rng.as_mut().unwrap()).unwrap();
            self.declare_eliminated(pool[drawn].clone());
        }
        self.remaining = order_descending(&tallies, &self.remaining);
        self.push_round(tallies, BTreeSet::new(), Fraction::zero());
        Ok(())
    }

    fn declare_elected(&mut self, candidate: String) {
        self.remaining.retain(|c| c != &candidate);
        if self.config.print_progress {
            println!("Elected {}", candidate);
        }
        self.elected.push(candidate);
    }

    fn declare_eliminated(&mut self, candidate: String) {
        self.remaining.retain(|c| c != &candidate);
        if self.config.print_progress {
            println!("Eliminated {}", candidate);
        }
        self.eliminated.push(candidate);
    }

    fn push_round(
        &mut self,
        scores: BTreeMap<String, Fraction>,
        tiebreak_winners: BTreeSet<String>,
        exhausted: Fraction,
    ) {
        let state = RoundState {
            round_number: self.transcript.rounds.len() + 1,
            remaining: self.remaining.clone(),
            elected: self.elected.clone(),
            eliminated: self.eliminated.clone(),
            tiebreak_winners,
            scores,
            exhausted,
        };
        debug_assert!(state.partition_holds(self.profile.candidates()));
        if self.config.print_progress {
            println!(
                "Round {}: {} elected, {} eliminated, {} remaining",
                state.round_number,
                state.elected.len(),
                state.eliminated.len(),
                state.remaining.len()
            );
        }
        self.transcript.rounds.push(state);
        self.transcript.elected = self.elected.clone();
    }
}

fn order_descending(scores: &BTreeMap<String, Fraction>, pool: &[String]) -> Vec<String> {
    let mut order = pool.to_vec();
    order.sort_by(|a, b| scores[b].cmp(&scores[a]).then_with(|| a.cmp(b)));
    order
}

/// Run a configured election over a profile and hand back the transcript.
pub fn run_election(profile: &PreferenceProfile, config: ElectionConfig) -> Result<Transcript, ElectionError> {
    let mut engine = ElectionEngine::new(profile, config)?;
    engine.run()?;
    Ok(engine.into_transcript())
}
