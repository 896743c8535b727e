//! Monetary amounts as integer kobo.
//!
//! All wallet arithmetic happens on `i64` minor units. Floats only appear at
//! the JSON boundary, where two-decimal values are converted through their
//! string representation.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Sub};

const KOBO_PER_NAIRA: i64 = 100;

/// A non-negative monetary amount in kobo (1/100 naira).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_kobo(kobo: i64) -> Self {
        Self(kobo)
    }

    pub const fn from_naira(naira: i64) -> Self {
        Self(naira * KOBO_PER_NAIRA)
    }

    pub fn kobo(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// True when the amount carries no kobo fraction. Providers that deal in
    /// whole naira only accept such amounts.
    pub fn is_whole_naira(self) -> bool {
        self.0 % KOBO_PER_NAIRA == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Percentage of this amount, rounded up to the nearest whole naira.
    ///
    /// The platform never under-collects a fraction of a naira:
    /// `₦549 at 2% = ₦10.98 -> ₦11`.
    pub fn percent_ceil(self, percent: u32) -> Amount {
        if percent == 0 || self.0 <= 0 {
            return Amount::ZERO;
        }
        let numerator = self.0 as i128 * percent as i128;
        let denominator = (100 * KOBO_PER_NAIRA) as i128;
        let naira = (numerator + denominator - 1) / denominator;
        Amount(naira as i64 * KOBO_PER_NAIRA)
    }

    /// Parse a decimal string with at most two fractional digits.
    pub fn from_decimal_str(s: &str) -> Option<Amount> {
        let s = s.trim();
        if s.is_empty() || s.starts_with('-') || s.starts_with('+') {
            return None;
        }
        let mut parts = s.split('.');
        let int_part = parts.next()?;
        let frac_part = parts.next();
        if parts.next().is_some() || int_part.is_empty() {
            return None;
        }
        let naira: i64 = int_part.parse().ok()?;
        let frac_kobo = match frac_part {
            None | Some("") => 0,
            Some(frac) => {
                if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let mut v: i64 = frac.parse().ok()?;
                if frac.len() == 1 {
                    v *= 10;
                }
                v
            }
        };
        naira
            .checked_mul(KOBO_PER_NAIRA)
            .and_then(|k| k.checked_add(frac_kobo))
            .map(Amount)
    }

    /// Parse a JSON number or string into an amount of naira.
    pub fn from_json(value: &serde_json::Value) -> Option<Amount> {
        match value {
            serde_json::Value::Number(n) => Amount::from_decimal_str(&n.to_string()),
            serde_json::Value::String(s) => Amount::from_decimal_str(s),
            _ => None,
        }
    }
}

impl Add for Amount {
    type Output = Amount;
    fn add(self, other: Amount) -> Amount {
        Amount(self.0 + other.0)
    }
}

impl Sub for Amount {
    type Output = Amount;
    fn sub(self, other: Amount) -> Amount {
        Amount(self.0 - other.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let naira = self.0 / KOBO_PER_NAIRA;
        let kobo = (self.0 % KOBO_PER_NAIRA).abs();
        if kobo == 0 {
            write!(f, "₦{}", naira)
        } else {
            write!(f, "₦{}.{:02}", naira, kobo)
        }
    }
}

// JSON boundary: amounts are naira numbers (`500` or `1000.5`).
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % KOBO_PER_NAIRA == 0 {
            serializer.serialize_i64(self.0 / KOBO_PER_NAIRA)
        } else {
            serializer.serialize_f64(self.0 as f64 / KOBO_PER_NAIRA as f64)
        }
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an amount of naira as a number or decimal string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        if v < 0 {
            return Err(E::custom("amount cannot be negative"));
        }
        // Checked: naira-to-kobo conversion can overflow i64 for
        // attacker-sized inputs.
        v.checked_mul(KOBO_PER_NAIRA)
            .map(Amount)
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        i64::try_from(v)
            .ok()
            .and_then(|n| n.checked_mul(KOBO_PER_NAIRA))
            .map(Amount)
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        Amount::from_decimal_str(&v.to_string())
            .ok_or_else(|| E::custom("amount must have at most two decimal places"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::from_decimal_str(v).ok_or_else(|| E::custom(format!("invalid amount: {}", v)))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}
