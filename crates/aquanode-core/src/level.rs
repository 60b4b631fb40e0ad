//! Fixed-point quantities.
//!
//! Tank levels, low-water thresholds and depletion rates are all expressed as
//! a [`Level`]: a signed count of hundredths. Arithmetic is exact, and the
//! two-decimal rendering used on the wire never drifts the way repeated
//! float subtraction does.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;

const SCALE: i64 = 100;

/// A quantity with exactly two decimals, stored as hundredths.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(i64);

impl Level {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create a level from whole units (`Level::from_units(50)` is `50.00`).
    #[must_use]
    pub const fn from_units(units: i64) -> Self {
        Self(units.saturating_mul(SCALE))
    }

    /// Create a level from hundredths (`Level::from_hundredths(5)` is `0.05`).
    #[must_use]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Self(hundredths)
    }

    /// Return the raw number of hundredths.
    #[must_use]
    pub const fn hundredths(self) -> i64 {
        self.0
    }

    /// Returns true if the level is strictly greater than zero.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Subtract, saturating at the numeric bounds.
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Convert from a float, rounding to the nearest hundredth.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not finite or out of range.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn try_from_f64(value: f64) -> Result<Self, LevelError> {
        if !value.is_finite() {
            return Err(LevelError::NotFinite);
        }
        let scaled = (value * SCALE as f64).round();
        if scaled > i64::MAX as f64 || scaled < i64::MIN as f64 {
            return Err(LevelError::OutOfRange(value.to_string()));
        }
        Ok(Self(scaled as i64))
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level({self})")
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = SCALE.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / scale, abs % scale)
    }
}

impl FromStr for Level {
    type Err = LevelError;

    /// Parse a decimal literal. Digits past the second decimal are truncated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let (int_part, frac_part) = match body.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (body, ""),
        };

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(LevelError::Malformed(s.to_string()));
        }
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(LevelError::Malformed(s.to_string()));
        }

        let out_of_range = || LevelError::OutOfRange(s.to_string());

        let units: i64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| out_of_range())?
        };

        let mut hundredths: i64 = 0;
        for (idx, digit) in frac_part.bytes().take(2).enumerate() {
            let weight = if idx == 0 { 10 } else { 1 };
            hundredths += i64::from(digit - b'0') * weight;
        }

        let magnitude = units
            .checked_mul(SCALE)
            .and_then(|v| v.checked_add(hundredths))
            .ok_or_else(out_of_range)?;

        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}

impl Serialize for Level {
    /// Serialised as a bare JSON number with exactly two decimals.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = RawValue::from_string(self.to_string()).map_err(S::Error::custom)?;
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Self::try_from_f64(value).map_err(D::Error::custom)
    }
}

/// Errors that can occur when parsing a [`Level`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelError {
    /// The input is not a decimal literal.
    #[error("not a decimal number: {0:?}")]
    Malformed(String),

    /// The input does not fit in the fixed-point range.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// The input is NaN or infinite.
    #[error("not a finite number")]
    NotFinite,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_always_has_two_decimals() {
        assert_eq!(Level::from_units(2400).to_string(), "2400.00");
        assert_eq!(Level::from_hundredths(5).to_string(), "0.05");
        assert_eq!(Level::from_hundredths(-5).to_string(), "-0.05");
        assert_eq!(Level::from_hundredths(-1250).to_string(), "-12.50");
        assert_eq!(Level::ZERO.to_string(), "0.00");
    }

    #[test]
    fn parse_decimal_literals() {
        assert_eq!("50".parse::<Level>().unwrap(), Level::from_units(50));
        assert_eq!("0.5".parse::<Level>().unwrap(), Level::from_hundredths(50));
        assert_eq!(".25".parse::<Level>().unwrap(), Level::from_hundredths(25));
        assert_eq!("7.".parse::<Level>().unwrap(), Level::from_units(7));
        assert_eq!(" 3.1 ".parse::<Level>().unwrap(), Level::from_hundredths(310));
        assert_eq!("-5".parse::<Level>().unwrap(), Level::from_units(-5));
        assert_eq!("+5".parse::<Level>().unwrap(), Level::from_units(5));
    }

    #[test]
    fn parse_truncates_extra_digits() {
        assert_eq!("12.345".parse::<Level>().unwrap(), Level::from_hundredths(1234));
        assert_eq!("0.299".parse::<Level>().unwrap(), Level::from_hundredths(29));
    }

    #[test]
    fn parse_rejects_garbage() {
        for input in ["", "-", ".", "abc", "1.2.3", "1e3", "5abc", "--1"] {
            assert!(
                matches!(input.parse::<Level>(), Err(LevelError::Malformed(_))),
                "{input:?} should be rejected"
            );
        }
        assert!(matches!(
            "99999999999999999999".parse::<Level>(),
            Err(LevelError::OutOfRange(_))
        ));
    }

    #[test]
    fn arithmetic_is_exact() {
        let mut level = Level::from_units(2400);
        let rate = "0.1".parse::<Level>().unwrap();
        for _ in 0..10 {
            level = level.saturating_sub(rate);
        }
        assert_eq!(level, Level::from_units(2399));
        assert_eq!(Level::from_units(-5).saturating_sub(Level::from_units(1)), Level::from_units(-6));
        assert!(rate.is_positive());
        assert!(!Level::ZERO.is_positive());
    }

    #[test]
    fn serializes_as_two_decimal_number() {
        #[derive(Serialize)]
        struct Body {
            level: Level,
        }

        let json = serde_json::to_string(&Body {
            level: Level::from_units(2400),
        })
        .unwrap();
        assert_eq!(json, r#"{"level":2400.00}"#);

        let json = serde_json::to_string(&Level::from_hundredths(-205)).unwrap();
        assert_eq!(json, "-2.05");
    }

    #[test]
    fn deserializes_from_any_number() {
        let level: Level = serde_json::from_str("2400.00").unwrap();
        assert_eq!(level, Level::from_units(2400));

        let level: Level = serde_json::from_str("12").unwrap();
        assert_eq!(level, Level::from_units(12));

        let level: Level = serde_json::from_str("0.07").unwrap();
        assert_eq!(level, Level::from_hundredths(7));
    }

    #[test]
    fn float_conversion_rounds() {
        assert_eq!(Level::try_from_f64(0.29).unwrap(), Level::from_hundredths(29));
        assert!(Level::try_from_f64(f64::NAN).is_err());
    }
}
