// Copyright 2025 the votecount developers.
// This file is part of votecount.
// votecount is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// votecount is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with votecount.  If not, see <https://www.gnu.org/licenses/>.

//! The history of a run: one immutable snapshot per round, the final
//! partition read off the last snapshot, and a tabular rendering.

use crate::fraction::Fraction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::{Read, Write};

/// Snapshot of one round. `scores` holds the values that drove this round's
/// decision, keyed by every candidate still undecided when the round began;
/// `elected` and `eliminated` are cumulative and ordered by when each
/// candidate was settled. Never mutated once appended to a transcript.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundState {
    pub round_number: usize,
    pub remaining: Vec<String>,
    pub elected: Vec<String>,
    pub eliminated: Vec<String>,
    /// Candidates whose fate this round was settled by the tie-break policy.
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub tiebreak_winners: BTreeSet<String>,
    pub scores: BTreeMap<String, Fraction>,
    /// Weight no longer attributable to any continuing candidate. Nonzero
    /// only under STV.
    #[serde(skip_serializing_if = "Fraction::is_zero", default = "Fraction::zero")]
    pub exhausted: Fraction,
}

impl RoundState {
    /// The partition invariant: elected, eliminated and remaining are
    /// pairwise disjoint and together cover the whole roster.
    pub fn partition_holds(&self, candidates: &[String]) -> bool {
        let mut seen: BTreeSet<&String> = BTreeSet::new();
        for candidate in self.elected.iter().chain(&self.eliminated).chain(&self.remaining) {
            if !seen.insert(candidate) {
                return false;
            }
        }
        seen.len() == candidates.len() && candidates.iter().all(|c| seen.contains(c))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateStatus {
    Elected,
    Eliminated,
    Remaining,
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateStatus::Elected => write!(f, "Elected"),
            CandidateStatus::Eliminated => write!(f, "Eliminated"),
            CandidateStatus::Remaining => write!(f, "Remaining"),
        }
    }
}

/// The final partition of the candidates, read off the last round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// In order of election.
    pub elected: Vec<String>,
    /// In order of elimination.
    pub eliminated: Vec<String>,
    pub remaining: Vec<String>,
}

/// The append-only history of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub quota: Option<Fraction>,
    pub rounds: Vec<RoundState>,
    pub elected: Vec<String>,
}

impl Transcript {
    pub fn final_partition(&self) -> Partition {
        match self.rounds.last() {
            Some(last) => Partition {
                elected: last.elected.clone(),
                eliminated: last.eliminated.clone(),
                remaining: last.remaining.clone(),
            },
            None => Partition { elected: vec![], eliminated: vec![], remaining: vec![] },
        }
    }

    /// The round in which a candidate's fate was settled, if it was.
    pub fn round_settled(&self, candidate: &str) -> Option<usize> {
        self.rounds
            .iter()
            .find(|r| {
                r.elected.iter().any(|c| c == candidate) || r.eliminated.iter().any(|c| c == candidate)
            })
            .map(|r| r.round_number)
    }

    /// A text table with one row per candidate: name, status, and the round
    /// the candidate's fate was settled in ("-" for remaining).
    pub fn status_table(&self) -> String {
        let partition = self.final_partition();
        let rows: Vec<(&String, CandidateStatus)> = partition
            .elected
            .iter()
            .map(|c| (c, CandidateStatus::Elected))
            .chain(partition.remaining.iter().map(|c| (c, CandidateStatus::Remaining)))
            .chain(partition.eliminated.iter().map(|c| (c, CandidateStatus::Eliminated)))
            .collect();
        let name_width = rows.iter().map(|(c, _)| c.len()).max().unwrap_or(9).max("Candidate".len());
        let mut out = format!("{:name_width$}  {:10}  {}\n", "Candidate", "Status", "Round");
        for (candidate, status) in rows {
            let settled = match self.round_settled(candidate) {
                Some(round) => round.to_string(),
                None => "-".to_string(),
            };
            out.push_str(&format!("{:name_width$}  {:10}  {}\n", candidate, status.to_string(), settled));
        }
        out
    }

    /// The same history cut back to the first `rounds` rounds, for replay.
    pub fn truncated(&self, rounds: usize) -> Transcript {
        let rounds: Vec<RoundState> = self.rounds.iter().take(rounds).cloned().collect();
        let elected = rounds.last().map(|r| r.elected.clone()).unwrap_or_default();
        Transcript { quota: self.quota.clone(), rounds, elected }
    }

    pub fn write_json<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, self)
    }
    pub fn read_json<R: Read>(reader: R) -> serde_json::Result<Transcript> {
        serde_json::from_reader(reader)
    }
}
