// Copyright 2025 the votecount developers.
// This file is part of votecount.
// votecount is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// votecount is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with votecount.  If not, see <https://www.gnu.org/licenses/>.

//! Seeded pseudo-random helpers. Every stochastic operation in the crate
//! draws from a caller-seeded generator threaded through explicitly; nothing
//! reads global random state, so identical seeds replay bit-for-bit.

use crate::fraction::Fraction;
use num::{BigInt, BigRational};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

pub fn seeded_rng(seed: u64) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(seed)
}

/// Draw an index with probability proportional to the given exact weights.
/// Falls back to a uniform draw when every weight is zero. The draw maps one
/// 64-bit sample onto the exact cumulative weights, so proportionality holds
/// to 2^-64 without ever rounding a weight.
pub fn weighted_choice<R: Rng + ?Sized>(weights: &[Fraction], rng: &mut R) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    let total: Fraction = weights.iter().cloned().sum();
    if total.is_zero() {
        return Some(rng.random_range(0..weights.len()));
    }
    let numerator = BigInt::from(rng.random::<u64>());
    let denominator = BigInt::from(1u128 << 64);
    let target = total * Fraction(BigRational::new(numerator, denominator));
    let mut cumulative = Fraction::zero();
    for (index, weight) in weights.iter().enumerate() {
        cumulative += weight.clone();
        if cumulative > target {
            return Some(index);
        }
    }
    Some(weights.len() - 1)
}

/// The indices 0..n in a seeded random order.
pub fn random_order<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    order
}
