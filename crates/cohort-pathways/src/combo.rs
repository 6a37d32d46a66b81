//! Combo codes: the integer encoding of the event cohorts active in one step.
//!
//! A combo code is the bitwise union of the bit values of every event cohort
//! contributing to a step. Codes are backed by [`BigUint`], so the number of
//! distinct event cohorts in a run is not capped by a machine word.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Integer encoding of a set of event cohorts.
///
/// Ordering is numeric, so sorting a list of codes sorts them the same way
/// an export sorted on the integer column would.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComboCode(BigUint);

impl ComboCode {
    /// Returns the empty combo (no event cohorts).
    pub fn empty() -> Self {
        Self(BigUint::default())
    }

    /// Returns the code with only the given zero-based bit set (`2^position`).
    pub fn single_bit(position: u64) -> Self {
        Self(BigUint::from(1u32) << position)
    }

    /// Returns true if no bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.bits() == 0
    }

    /// Number of event cohorts folded into this code.
    #[inline]
    pub fn member_count(&self) -> u64 {
        self.0.count_ones()
    }

    /// Number of significant bits (position of the highest set bit + 1).
    #[inline]
    pub fn bit_width(&self) -> u64 {
        self.0.bits()
    }

    /// Returns a reference to the underlying integer.
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Clears the bits of `other` if all of them are set in `self`.
    pub(crate) fn checked_remove(&mut self, other: &ComboCode) -> bool {
        if (&self.0 & &other.0) != other.0 {
            return false;
        }
        self.0 ^= &other.0;
        true
    }
}

impl From<u64> for ComboCode {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for ComboCode {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl BitOr for &ComboCode {
    type Output = ComboCode;

    fn bitor(self, rhs: Self) -> ComboCode {
        ComboCode(&self.0 | &rhs.0)
    }
}

impl BitOrAssign<&ComboCode> for ComboCode {
    fn bitor_assign(&mut self, rhs: &ComboCode) {
        self.0 |= &rhs.0;
    }
}

impl fmt::Display for ComboCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ComboCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigUint::from_str(s.trim())
            .map(Self)
            .map_err(|e| format!("invalid combo code '{}': {}", s, e))
    }
}

// Decimal strings keep codes wider than 53 bits intact in JSON consumers.
impl Serialize for ComboCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ComboCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let code = ComboCode::empty();
        assert!(code.is_empty());
        assert_eq!(code.member_count(), 0);
        assert_eq!(code.to_string(), "0");
    }

    #[test]
    fn test_single_bit() {
        assert_eq!(ComboCode::single_bit(0), ComboCode::from(1));
        assert_eq!(ComboCode::single_bit(3), ComboCode::from(8));
        assert_eq!(ComboCode::single_bit(3).bit_width(), 4);
    }

    #[test]
    fn test_union() {
        let mut code = ComboCode::single_bit(0);
        code |= &ComboCode::single_bit(1);
        assert_eq!(code, ComboCode::from(3));
        assert_eq!(code.member_count(), 2);

        // OR is idempotent
        code |= &ComboCode::single_bit(1);
        assert_eq!(code, ComboCode::from(3));
    }

    #[test]
    fn test_wide_codes_beyond_u64() {
        let wide = &ComboCode::single_bit(100) | &ComboCode::single_bit(0);
        assert_eq!(wide.bit_width(), 101);
        assert_eq!(wide.member_count(), 2);
        assert_eq!(wide.to_string(), "1267650600228229401496703205377");
    }

    #[test]
    fn test_checked_remove() {
        let mut code = ComboCode::from(5);
        assert!(!code.checked_remove(&ComboCode::from(8)));
        assert!(code.checked_remove(&ComboCode::from(4)));
        assert_eq!(code, ComboCode::from(1));
    }

    #[test]
    fn test_ordering_is_numeric() {
        let mut codes = vec![ComboCode::from(10), ComboCode::from(2), ComboCode::from(33)];
        codes.sort();
        assert_eq!(
            codes,
            vec![ComboCode::from(2), ComboCode::from(10), ComboCode::from(33)]
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!("12".parse::<ComboCode>().unwrap(), ComboCode::from(12));
        assert!("abc".parse::<ComboCode>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let code = ComboCode::from(6);
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"6\"");
        let back: ComboCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }
}
