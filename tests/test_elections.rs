// Copyright 2025 the votecount developers.
// This file is part of votecount.
// votecount is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// votecount is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with votecount.  If not, see <https://www.gnu.org/licenses/>.


//! End-to-end runs of the engine across methods, checking the documented
//! counting properties: condensation, the Droop quota, exact weight
//! conservation through transfers, tie failure, and seeded replay.

use votecount::ballot::Ballot;
use votecount::engine::{run_election, ElectionConfig, ElectionEngine, ElectionMethod};
use votecount::errors::ElectionError;
use votecount::fraction::Fraction;
use votecount::profile::PreferenceProfile;
use votecount::stv::TransferRule;
use votecount::tie_resolution::TieBreakPolicy;
use votecount::transcript::Transcript;

fn profile(entries: &[(&[&str], usize)]) -> PreferenceProfile {
    PreferenceProfile::from_ballots(
        entries
            .iter()
            .map(|(names, weight)| Ballot::from_names(names, Fraction::from(*weight)).unwrap())
            .collect(),
    )
}

/// At the start of every STV round, the undecided tallies plus the quotas
/// held by earlier winners plus the weight already exhausted must reproduce
/// the profile's total weight exactly.
fn assert_weight_conserved(transcript: &Transcript, total: &Fraction) {
    let quota = transcript.quota.clone().unwrap();
    for (index, round) in transcript.rounds.iter().enumerate() {
        let (held, exhausted) = match index {
            0 => (0, Fraction::zero()),
            _ => {
                let prev = &transcript.rounds[index - 1];
                (prev.elected.len(), prev.exhausted.clone())
            }
        };
        let sum = round.scores.values().cloned().sum::<Fraction>()
            + quota.clone() * Fraction::from(held)
            + exhausted;
        assert_eq!(&sum, total, "weight drifted by round {}", round.round_number);
    }
}

#[test]
fn plurality_condensed_example() -> anyhow::Result<()> {
    let mut ballots = vec![];
    for _ in 0..6 {
        for _ in 0..3 {
            ballots.push(Ballot::from_names(&["A", "B", "C"], Fraction::one())?);
        }
        for _ in 0..2 {
            ballots.push(Ballot::from_names(&["B", "A", "C"], Fraction::one())?);
        }
        ballots.push(Ballot::from_names(&["C", "B", "A"], Fraction::one())?);
    }
    let condensed = PreferenceProfile::from_ballots(ballots).condense();
    assert_eq!(condensed.ballots().len(), 3);
    assert_eq!(condensed.total_weight(), Fraction::from(36usize));

    let transcript = run_election(&condensed, ElectionConfig::new(1, ElectionMethod::Plurality))?;
    assert_eq!(transcript.rounds.len(), 1, "plurality is a single round");
    let round = &transcript.rounds[0];
    assert_eq!(round.scores["A"], Fraction::from(18usize));
    assert_eq!(round.scores["B"], Fraction::from(12usize));
    assert_eq!(round.scores["C"], Fraction::from(6usize));
    assert_eq!(transcript.elected, vec!["A".to_string()]);

    let partition = transcript.final_partition();
    assert_eq!(partition.remaining, vec!["B".to_string(), "C".to_string()]);
    assert!(partition.eliminated.is_empty());
    let table = transcript.status_table();
    assert!(table.contains("A") && table.contains("Elected"));
    assert!(table.contains("Remaining"));
    Ok(())
}

#[test]
fn stv_elects_at_quota_and_transfers_exactly() -> anyhow::Result<()> {
    // total 20, two seats: Droop quota floor(20/3)+1 = 7
    let p = profile(&[(&["A", "B", "C"], 10), (&["B", "A"], 5), (&["C", "B"], 4), (&["D"], 1)]);
    let config = ElectionConfig::new(2, ElectionMethod::Stv { transfer: TransferRule::Fractional });
    let transcript = run_election(&p, config)?;
    assert_eq!(transcript.quota, Some(Fraction::from(7usize)));

    // A clears quota immediately; the 3/10 surplus flows to B, who clears next
    assert_eq!(transcript.rounds[0].elected, vec!["A".to_string()]);
    assert_eq!(transcript.rounds[1].scores["B"], Fraction::from(8usize));
    assert_eq!(transcript.elected, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(transcript.rounds.len(), 2);
    assert_weight_conserved(&transcript, &p.total_weight());
    Ok(())
}

#[test]
fn stv_elects_several_in_one_round() -> anyhow::Result<()> {
    // A and B both open at quota; filling every seat ends the count at once
    let p = profile(&[(&["A"], 8), (&["B"], 8), (&["C"], 2)]);
    let config = ElectionConfig::new(2, ElectionMethod::Stv { transfer: TransferRule::Fractional });
    let transcript = run_election(&p, config)?;
    assert_eq!(transcript.rounds.len(), 1);
    assert_eq!(transcript.elected, vec!["A".to_string(), "B".to_string()]);
    Ok(())
}

#[test]
fn irv_exhausts_and_elects_below_quota() -> anyhow::Result<()> {
    // nobody reaches the majority quota of 5; C then B exhaust on elimination
    let p = profile(&[(&["A"], 4), (&["B"], 3), (&["C"], 2)]);
    let config = ElectionConfig::new(1, ElectionMethod::Stv { transfer: TransferRule::Fractional });
    let transcript = run_election(&p, config)?;
    assert_eq!(transcript.quota, Some(Fraction::from(5usize)));
    assert_eq!(transcript.rounds.len(), 3);
    assert_eq!(transcript.rounds[0].eliminated, vec!["C".to_string()]);
    assert_eq!(transcript.rounds[1].eliminated, vec!["C".to_string(), "B".to_string()]);
    assert_eq!(transcript.rounds[1].exhausted, Fraction::from(5usize));
    assert_eq!(transcript.elected, vec!["A".to_string()]);
    assert_weight_conserved(&transcript, &p.total_weight());
    Ok(())
}

#[test]
fn random_transfer_conserves_and_replays() -> anyhow::Result<()> {
    let p = profile(&[
        (&["A", "B", "C"], 6),
        (&["A", "C"], 4),
        (&["B", "C"], 5),
        (&["C", "B"], 4),
        (&["D", "C"], 2),
    ]);
    let mut config = ElectionConfig::new(2, ElectionMethod::Stv { transfer: TransferRule::Random });
    config.seed = Some(17);
    config.tiebreak = Some(TieBreakPolicy::Random);
    let first = run_election(&p, config.clone())?;
    let second = run_election(&p, config)?;
    assert_eq!(first, second, "one seed, one transcript");
    assert_weight_conserved(&first, &p.total_weight());
    assert_eq!(first.elected.len(), 2);
    Ok(())
}

#[test]
fn replay_reproduces_the_suffix() -> anyhow::Result<()> {
    let p = profile(&[
        (&["A", "B", "C"], 6),
        (&["B", "C"], 5),
        (&["C", "B"], 5),
        (&["D", "A"], 3),
    ]);
    let mut config = ElectionConfig::new(2, ElectionMethod::Stv { transfer: TransferRule::Random });
    config.seed = Some(23);
    config.tiebreak = Some(TieBreakPolicy::Random);
    let mut engine = ElectionEngine::new(&p, config)?;
    engine.run()?;
    let full = engine.transcript().clone();
    for k in 0..=full.rounds.len() {
        let truncated = full.truncated(k);
        assert_eq!(truncated.rounds.len(), k.min(full.rounds.len()));
        let replayed = engine.replay_from(k)?;
        assert_eq!(replayed, full.rounds[k..].to_vec());
    }
    Ok(())
}

#[test]
fn dictator_methods_follow_their_seeds() -> anyhow::Result<()> {
    let p = profile(&[(&["A", "B"], 7), (&["B", "A"], 2), (&["C", "B"], 1)]);
    let mut config = ElectionConfig::new(1, ElectionMethod::RandomDictator);
    config.seed = Some(12);
    let first = run_election(&p, config.clone())?;
    assert_eq!(first, run_election(&p, config)?);
    assert_eq!(first.rounds.len(), 1);
    assert_eq!(first.elected.len(), 1);

    let mut config = ElectionConfig::new(1, ElectionMethod::BoostedRandomDictator);
    config.seed = Some(12);
    let boosted = run_election(&p, config)?;
    assert_eq!(boosted.rounds[0].scores["A"], Fraction::from(7usize));
    Ok(())
}

#[test]
fn unresolved_tie_preserves_resolved_rounds() {
    // round 1 eliminates D cleanly; round 2 finds B and C tied at the bottom
    let p = profile(&[(&["A"], 5), (&["B"], 2), (&["C"], 2), (&["D"], 1)]);
    let config = ElectionConfig::new(1, ElectionMethod::Stv { transfer: TransferRule::Fractional });
    let mut engine = ElectionEngine::new(&p, config).unwrap();
    let err = engine.run().err().unwrap();
    assert_eq!(
        err,
        ElectionError::UnresolvedTie { round: 2, candidates: vec!["B".to_string(), "C".to_string()] }
    );
    assert_eq!(engine.transcript().rounds.len(), 1);
    assert_eq!(engine.transcript().rounds[0].eliminated, vec!["D".to_string()]);

    // the same profile with a policy runs to completion
    let mut config = ElectionConfig::new(1, ElectionMethod::Stv { transfer: TransferRule::Fractional });
    config.tiebreak = Some(TieBreakPolicy::Random);
    config.seed = Some(8);
    let transcript = run_election(&p, config).unwrap();
    assert_eq!(transcript.elected, vec!["A".to_string()]);
    assert!(transcript.rounds.iter().any(|r| !r.tiebreak_winners.is_empty()));
}

#[test]
fn borda_respects_a_configured_vector() -> anyhow::Result<()> {
    let p = profile(&[(&["A", "B", "C"], 3), (&["B", "C", "A"], 2), (&["C", "B", "A"], 2)]);
    // under the default (2,1,0) vector the compromise candidate B wins
    let transcript = run_election(&p, ElectionConfig::new(1, ElectionMethod::Borda))?;
    assert_eq!(transcript.elected, vec!["B".to_string()]);
    // a head-only vector turns the same count into plurality: A wins
    let mut config = ElectionConfig::new(1, ElectionMethod::Borda);
    config.score_vector = Some(vec![Fraction::one(), Fraction::zero(), Fraction::zero()]);
    let transcript = run_election(&p, config)?;
    assert_eq!(transcript.elected, vec!["A".to_string()]);
    Ok(())
}

#[test]
fn transcripts_round_trip_through_json() -> anyhow::Result<()> {
    let p = profile(&[(&["A", "B", "C"], 10), (&["B", "A"], 5), (&["C", "B"], 4), (&["D"], 1)]);
    let config = ElectionConfig::new(2, ElectionMethod::Stv { transfer: TransferRule::Fractional });
    let transcript = run_election(&p, config)?;
    let mut buffer = vec![];
    transcript.write_json(&mut buffer)?;
    let back = Transcript::read_json(buffer.as_slice())?;
    assert_eq!(back, transcript);
    assert_eq!(back.quota, Some(Fraction::from(7usize)));
    Ok(())
}

#[test]
fn every_round_keeps_the_partition_invariant() -> anyhow::Result<()> {
    let p = profile(&[
        (&["A", "B", "C", "D"], 6),
        (&["B", "C"], 5),
        (&["C", "D", "A"], 4),
        (&["D"], 3),
    ]);
    let mut config = ElectionConfig::new(2, ElectionMethod::Stv { transfer: TransferRule::Fractional });
    config.tiebreak = Some(TieBreakPolicy::FirstPlace);
    config.seed = Some(1);
    let transcript = run_election(&p, config)?;
    for round in &transcript.rounds {
        assert!(round.partition_holds(p.candidates()), "round {}", round.round_number);
    }
    assert_weight_conserved(&transcript, &p.total_weight());
    Ok(())
}
