//! Currency codes and minor-unit amount arithmetic.
//!
//! Amounts are carried as `i64` minor units (cents, fen, ...) everywhere; the
//! currency travels next to them on the owning document.

use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{DomainError, DomainResult};

/// ISO-4217 style currency code: three ASCII uppercase letters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// Parse a code, normalising to uppercase.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        let bytes = trimmed.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_alphabetic()) {
            return Err(DomainError::validation(format!(
                "currency must be three letters, got '{trimmed}'"
            )));
        }
        let mut code = [0u8; 3];
        for (dst, src) in code.iter_mut().zip(bytes) {
            *dst = src.to_ascii_uppercase();
        }
        Ok(Self(code))
    }

    /// Digits after the decimal point of the minor unit (ISO 4217).
    pub fn minor_exponent(&self) -> u32 {
        match self.as_str() {
            "JPY" | "KRW" | "VND" | "CLP" | "ISK" | "UGX" | "XAF" | "XOF" | "PYG" => 0,
            "BHD" | "KWD" | "OMR" | "JOD" | "TND" | "IQD" | "LYD" => 3,
            _ => 2,
        }
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII letters are ever stored.
        core::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl core::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.as_str().to_string()
    }
}

impl<'de> Deserialize<'de> for CurrencyCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// `quantity × unit_price` with overflow reported as a validation error.
pub fn line_amount(quantity: i64, unit_price: i64) -> DomainResult<i64> {
    quantity
        .checked_mul(unit_price)
        .ok_or_else(|| DomainError::validation("line amount overflows"))
}

/// Sum of amounts with overflow reported as a validation error.
pub fn sum_amounts(amounts: impl IntoIterator<Item = i64>) -> DomainResult<i64> {
    amounts.into_iter().try_fold(0i64, |acc, a| {
        acc.checked_add(a)
            .ok_or_else(|| DomainError::validation("total amount overflows"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_uppercases() {
        let c = CurrencyCode::parse(" cny ").unwrap();
        assert_eq!(c.as_str(), "CNY");
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"CNY\"");
    }

    #[test]
    fn minor_exponents() {
        assert_eq!(CurrencyCode::parse("usd").unwrap().minor_exponent(), 2);
        assert_eq!(CurrencyCode::parse("JPY").unwrap().minor_exponent(), 0);
        assert_eq!(CurrencyCode::parse("KWD").unwrap().minor_exponent(), 3);
    }

    #[test]
    fn rejects_malformed_codes() {
        for raw in ["", "US", "USDT", "U$D", "12A"] {
            assert!(CurrencyCode::parse(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn deserialize_validates() {
        assert!(serde_json::from_str::<CurrencyCode>("\"usd\"").is_ok());
        assert!(serde_json::from_str::<CurrencyCode>("\"dollars\"").is_err());
    }

    #[test]
    fn amount_overflow_is_validation_error() {
        assert!(matches!(line_amount(i64::MAX, 2), Err(DomainError::Validation(_))));
        assert!(matches!(sum_amounts([i64::MAX, 1]), Err(DomainError::Validation(_))));
        assert_eq!(sum_amounts([line_amount(3, 250).unwrap(), 50]).unwrap(), 800);
    }
}
