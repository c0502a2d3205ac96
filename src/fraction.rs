// Copyright 2025 the votecount developers.
// This file is part of votecount.
// votecount is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// votecount is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with votecount.  If not, see <https://www.gnu.org/licenses/>.

//! Exact rational arithmetic used for every weight, score, tally, quota and
//! transfer ratio. Comparisons against the quota are exact, never within a
//! floating-point tolerance.

use num::rational::{ParseRatioError, Ratio};
use num::{BigInt, BigRational, One, Signed, Zero};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};
use std::str::FromStr;

/// An arbitrary-precision rational number that serializes as a string like
/// `"7/2"` or `"3"`, keeping persisted transcripts exact and readable.
#[derive(Clone, Serialize, Deserialize, Ord, PartialOrd, Eq, PartialEq, Hash)]
#[serde(into = "String")]
#[serde(try_from = "String")]
pub struct Fraction(pub(crate) BigRational);

impl Fraction {
    pub fn zero() -> Self {
        Fraction(BigRational::zero())
    }
    pub fn one() -> Self {
        Fraction(BigRational::one())
    }
    /// `numerator/denominator`. The denominator must be nonzero.
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Fraction(BigRational::new(BigInt::from(numerator), BigInt::from(denominator)))
    }
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }
    /// Largest integer-valued rational not above this one.
    pub fn floor(&self) -> Fraction {
        Fraction(self.0.floor())
    }
}

impl From<usize> for Fraction {
    fn from(value: usize) -> Self {
        Fraction(BigRational::from_integer(BigInt::from(value)))
    }
}

impl Add for Fraction {
    type Output = Fraction;
    fn add(self, rhs: Self) -> Fraction {
        Fraction(self.0 + rhs.0)
    }
}
impl Sub for Fraction {
    type Output = Fraction;
    fn sub(self, rhs: Self) -> Fraction {
        Fraction(self.0 - rhs.0)
    }
}
impl Mul for Fraction {
    type Output = Fraction;
    fn mul(self, rhs: Self) -> Fraction {
        Fraction(self.0 * rhs.0)
    }
}
/// The divisor must be nonzero.
impl Div for Fraction {
    type Output = Fraction;
    fn div(self, rhs: Self) -> Fraction {
        Fraction(self.0 / rhs.0)
    }
}
impl AddAssign for Fraction {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}
impl SubAssign for Fraction {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}
impl Sum for Fraction {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Fraction::zero(), |acc, f| acc + f)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
// type alias really, don't want long display
impl fmt::Debug for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Fraction> for String {
    fn from(f: Fraction) -> Self {
        f.0.to_string()
    }
}

impl FromStr for Fraction {
    type Err = ParseRatioError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Fraction(Ratio::from_str(s)?))
    }
}

impl TryFrom<String> for Fraction {
    type Error = ParseRatioError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Fraction::from_str(&s)
    }
}
