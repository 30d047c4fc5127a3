use std::fmt;
use std::str::FromStr;

use ordered_float::OrderedFloat;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Largest magnitude that is still rendered (and serialized) as an integer.
const MAX_INTEGRAL_DISPLAY: f64 = 1e15;

/// `10^308` is the largest finite power of ten.
const MAX_ROUNDING_DECIMALS: u32 = 308;

/// A finite numeric value appearing in a trace.
///
/// Integers and decimals share one representation. Integral values display without a
/// fractional part (`12`, not `12.0`) so operation strings read the way a solver would say
/// them. Negative zero is folded into zero so that it hashes and compares like `0`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Number(OrderedFloat<f64>);

impl Number {
    pub const ZERO: Number = Number(OrderedFloat(0.0));

    pub fn new(value: f64) -> Self {
        debug_assert!(!value.is_nan(), "NaN is not a valid trace number");
        // `-0.0 == 0.0`, so this folds negative zero without touching other values.
        if value == 0.0 {
            return Self::ZERO;
        }
        Self(OrderedFloat(value))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0.into_inner()
    }

    #[must_use]
    pub fn is_integral(self) -> bool {
        let v = self.value();
        v.is_finite() && v.fract() == 0.0
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.value().is_finite()
    }

    /// Round half away from zero to `decimals` fractional digits.
    #[must_use]
    pub fn round_to(self, decimals: u32) -> Self {
        let v = self.value();
        if !v.is_finite() {
            return self;
        }
        let scale = 10f64.powi(decimals.min(MAX_ROUNDING_DECIMALS) as i32);
        let scaled = v * scale;
        if !scaled.is_finite() {
            return self;
        }
        Self::new(scaled.round() / scale)
    }

    /// Absolute-plus-relative closeness test (`|a - b| <= atol + 1e-5 * |b|`).
    #[must_use]
    pub fn is_close(self, other: Number, tolerance: f64) -> bool {
        const RELATIVE: f64 = 1e-5;
        let (a, b) = (self.value(), other.value());
        (a - b).abs() <= tolerance + RELATIVE * b.abs()
    }

    /// Whether two numbers denote the same state member: equal outright, or equal once both
    /// are rounded to `decimals` places.
    #[must_use]
    pub fn matches(self, other: Number, decimals: u32) -> bool {
        self == other || self.round_to(decimals) == other.round_to(decimals)
    }

    /// Parse a literal of the form `[+-]?digits(.digits)?`.
    ///
    /// This is the only number syntax the expression language accepts; forms such as `.5`,
    /// `5.`, `1e3` or a bare sign are rejected.
    pub fn parse_literal(text: &str) -> Option<Self> {
        let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((int_part, frac_part)) => (int_part, Some(frac_part)),
            None => (unsigned, None),
        };
        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if let Some(frac_part) = frac_part {
            if frac_part.is_empty() || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
        }
        let value: f64 = text.parse().ok()?;
        value.is_finite().then(|| Self::new(value))
    }

    fn as_display_integer(self) -> Option<i64> {
        let v = self.value();
        (self.is_integral() && v.abs() < MAX_INTEGRAL_DISPLAY).then_some(v as i64)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_display_integer() {
            Some(int) => write!(f, "{int}"),
            None => write!(f, "{}", self.value()),
        }
    }
}

impl fmt::Debug for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid number literal {0:?}")]
pub struct ParseNumberError(pub String);

impl FromStr for Number {
    type Err = ParseNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Number::parse_literal(s.trim()).ok_or_else(|| ParseNumberError(s.to_string()))
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::new(f64::from(value))
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::new(value as f64)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::new(value)
    }
}

impl From<Number> for f64 {
    fn from(value: Number) -> Self {
        value.value()
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_display_integer() {
            Some(int) => serializer.serialize_i64(int),
            None => serializer.serialize_f64(self.value()),
        }
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() {
            return Err(de::Error::custom(format!("non-finite number {value}")));
        }
        Ok(Number::new(value))
    }
}
