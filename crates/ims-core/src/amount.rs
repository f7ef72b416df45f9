//! # Monetary Amounts
//!
//! Prices travel as decimal strings, never as floats. [`UnitPrice`]
//! accepts a JSON string or a positive JSON integer and rejects JSON
//! floats outright.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A positive decimal price with at most four fractional digits.
///
/// Stored in normalized form: no leading `+`, no surrounding whitespace,
/// redundant leading zeros stripped from the integer part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UnitPrice(String);

impl UnitPrice {
    /// Maximum number of fractional digits.
    pub const MAX_SCALE: usize = 4;

    /// Maximum number of integer digits.
    pub const MAX_INTEGER_DIGITS: usize = 12;

    /// Parse and normalize a decimal price string.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let s = raw.trim();
        let invalid = || ValidationError::InvalidUnitPrice(raw.clone());

        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (s, None),
        };
        if int_part.is_empty()
            || int_part.len() > Self::MAX_INTEGER_DIGITS
            || !int_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        if let Some(f) = frac_part {
            if f.is_empty() || f.len() > Self::MAX_SCALE || !f.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
        }

        let int_norm = int_part.trim_start_matches('0');
        let int_norm = if int_norm.is_empty() { "0" } else { int_norm };
        let is_zero = int_norm == "0" && frac_part.map_or(true, |f| f.bytes().all(|b| b == b'0'));
        if is_zero {
            return Err(invalid());
        }
        let normalized = match frac_part {
            Some(f) => format!("{int_norm}.{f}"),
            None => int_norm.to_string(),
        };
        Ok(Self(normalized))
    }

    /// Access the normalized decimal string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UnitPrice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UnitPrice {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct PriceVisitor;

        impl<'de> serde::de::Visitor<'de> for PriceVisitor {
            type Value = UnitPrice;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a positive decimal string or integer")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<UnitPrice, E> {
                UnitPrice::new(v).map_err(E::custom)
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<UnitPrice, E> {
                UnitPrice::new(v.to_string()).map_err(E::custom)
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<UnitPrice, E> {
                UnitPrice::new(v.to_string()).map_err(E::custom)
            }

            fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<UnitPrice, E> {
                Err(E::custom(format!(
                    "float prices are not accepted ({v}); send the price as a decimal string"
                )))
            }
        }

        deserializer.deserialize_any(PriceVisitor)
    }
}
