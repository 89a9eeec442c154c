use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use livebase_core::{
    CurrencyCode, DomainError, DomainResult, EntityId, Timestamps, entity_id, impl_record,
};

entity_id!(
    /// Derived from (pair, effective date) so an upsert replaces the same row.
    CurrencyRateId,
    "CurrencyRateId"
);

impl CurrencyRateId {
    pub fn for_pair(base: CurrencyCode, quote: CurrencyCode, effective_on: NaiveDate) -> Self {
        let name = format!("{base}/{quote}@{effective_on}");
        Self(EntityId::from_uuid(Uuid::new_v5(
            &Uuid::NAMESPACE_OID,
            name.as_bytes(),
        )))
    }
}

/// `1 base_currency = rate quote_currency`, effective from a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyRate {
    pub id: CurrencyRateId,
    pub base_currency: CurrencyCode,
    pub quote_currency: CurrencyCode,
    pub rate: Decimal,
    pub effective_on: NaiveDate,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub version: u64,
}

impl_record!(CurrencyRate, CurrencyRateId, "currency_rates");

#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyRateInput {
    pub base_currency: CurrencyCode,
    pub quote_currency: CurrencyCode,
    pub rate: Decimal,
    pub effective_on: NaiveDate,
}

impl CurrencyRate {
    pub fn create(input: CurrencyRateInput, now: DateTime<Utc>) -> DomainResult<Self> {
        if input.base_currency == input.quote_currency {
            return Err(DomainError::validation(
                "base and quote currency must differ",
            ));
        }
        check_rate(input.rate)?;
        Ok(Self {
            id: CurrencyRateId::for_pair(
                input.base_currency,
                input.quote_currency,
                input.effective_on,
            ),
            base_currency: input.base_currency,
            quote_currency: input.quote_currency,
            rate: input.rate,
            effective_on: input.effective_on,
            timestamps: Timestamps::new(now),
            version: 0,
        })
    }

    /// Overwrite with a freshly validated upsert of the same pair and date.
    pub fn replace_with(&mut self, incoming: CurrencyRate, now: DateTime<Utc>) {
        self.rate = incoming.rate;
        self.timestamps.touch(now);
    }

    fn is_pair(&self, base: CurrencyCode, quote: CurrencyCode) -> bool {
        self.base_currency == base && self.quote_currency == quote
    }
}

fn check_rate(rate: Decimal) -> DomainResult<()> {
    if rate <= Decimal::ZERO {
        return Err(DomainError::validation("rate must be greater than zero"));
    }
    Ok(())
}

/// Latest rate for `from -> to` effective on or before `on`; inverse pairs
/// are used when no direct rate exists.
fn effective_rate(
    from: CurrencyCode,
    to: CurrencyCode,
    on: NaiveDate,
    rates: &[CurrencyRate],
) -> Option<Decimal> {
    let latest = |base, quote| {
        rates
            .iter()
            .filter(|r| r.is_pair(base, quote) && r.effective_on <= on)
            .max_by_key(|r| r.effective_on)
            .map(|r| r.rate)
    };
    latest(from, to).or_else(|| latest(to, from).and_then(|r| Decimal::ONE.checked_div(r)))
}

/// Convert `amount_minor` of `from` into minor units of `to`.
///
/// Minor-unit exponents of both currencies are honoured; the result is
/// rounded half away from zero.
pub fn convert(
    amount_minor: i64,
    from: CurrencyCode,
    to: CurrencyCode,
    on: NaiveDate,
    rates: &[CurrencyRate],
) -> DomainResult<i64> {
    if from == to {
        return Ok(amount_minor);
    }
    let rate = effective_rate(from, to, on, rates).ok_or_else(|| {
        DomainError::not_found(format!("no {from}/{to} rate effective on {on}"))
    })?;
    let overflow = || DomainError::validation("converted amount overflows");
    let mut value = Decimal::from(amount_minor)
        .checked_mul(rate)
        .ok_or_else(overflow)?;
    let (from_exp, to_exp) = (from.minor_exponent(), to.minor_exponent());
    let scale = Decimal::from(10i64.pow(from_exp.abs_diff(to_exp)));
    value = if to_exp >= from_exp {
        value.checked_mul(scale)
    } else {
        value.checked_div(scale)
    }
    .ok_or_else(overflow)?;
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(overflow)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RateFilter {
    pub base_currency: Option<CurrencyCode>,
    pub quote_currency: Option<CurrencyCode>,
}

impl RateFilter {
    pub fn matches(&self, r: &CurrencyRate) -> bool {
        self.base_currency.is_none_or(|c| c == r.base_currency)
            && self.quote_currency.is_none_or(|c| c == r.quote_currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::parse(s).unwrap()
    }

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn rate(base: &str, quote: &str, rate: &str, on: NaiveDate) -> CurrencyRate {
        CurrencyRate::create(
            CurrencyRateInput {
                base_currency: code(base),
                quote_currency: code(quote),
                rate: dec(rate),
                effective_on: on,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_bad_rates() {
        for bad in [Decimal::ZERO, dec("-1"), dec("-0.0001")] {
            let res = CurrencyRate::create(
                CurrencyRateInput {
                    base_currency: code("USD"),
                    quote_currency: code("CNY"),
                    rate: bad,
                    effective_on: day(1, 1),
                },
                Utc::now(),
            );
            assert!(res.is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn id_is_stable_per_pair_and_date() {
        assert_eq!(rate("USD", "CNY", "7.1", day(1, 1)).id, rate("USD", "CNY", "7.3", day(1, 1)).id);
        assert_ne!(rate("USD", "CNY", "7.1", day(1, 1)).id, rate("USD", "CNY", "7.1", day(1, 2)).id);
    }

    #[test]
    fn uses_latest_rate_on_or_before_date() {
        let rates = vec![
            rate("USD", "CNY", "7.0", day(1, 1)),
            rate("USD", "CNY", "7.2", day(3, 1)),
            rate("USD", "CNY", "9.9", day(6, 1)),
        ];
        assert_eq!(convert(100, code("USD"), code("CNY"), day(4, 1), &rates).unwrap(), 720);
        assert_eq!(convert(100, code("USD"), code("CNY"), day(1, 1), &rates).unwrap(), 700);
        let err = convert(100, code("USD"), code("CNY"), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(), &rates)
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn falls_back_to_inverse_pair() {
        let rates = vec![rate("USD", "CNY", "8.0", day(1, 1))];
        assert_eq!(convert(800, code("CNY"), code("USD"), day(2, 1), &rates).unwrap(), 100);
    }

    #[test]
    fn decimal_rates_round_midpoints_away_from_zero() {
        let rates = vec![rate("USD", "EUR", "0.29", day(1, 1))];
        // 50 x 0.29 = 14.5 exactly
        assert_eq!(convert(50, code("USD"), code("EUR"), day(1, 1), &rates).unwrap(), 15);
        assert_eq!(convert(-50, code("USD"), code("EUR"), day(1, 1), &rates).unwrap(), -15);
        assert_eq!(convert(10, code("USD"), code("EUR"), day(1, 1), &rates).unwrap(), 3);
    }

    #[test]
    fn shrinking_exponent_divides() {
        // 1 JPY = 0.0067 USD; 1000 JPY = 6.70 USD = 670 cents
        let rates = vec![rate("JPY", "USD", "0.0067", day(1, 1))];
        assert_eq!(convert(1000, code("JPY"), code("USD"), day(1, 1), &rates).unwrap(), 670);
    }

    #[test]
    fn overflow_is_a_validation_error() {
        let rates = vec![rate("USD", "JPY", "1000", day(1, 1))];
        let err = convert(i64::MAX / 2, code("USD"), code("JPY"), day(1, 1), &rates).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn rate_serialises_without_float_noise() {
        let r = rate("USD", "EUR", "0.29", day(1, 1));
        let json = serde_json::to_value(&r).unwrap();
        let back: CurrencyRate = serde_json::from_value(json).unwrap();
        assert_eq!(back.rate, dec("0.29"));
        let input: CurrencyRateInput = serde_json::from_value(serde_json::json!({
            "base_currency": "USD", "quote_currency": "EUR", "rate": 0.29, "effective_on": "2024-01-01"
        }))
        .unwrap();
        assert_eq!(input.rate, dec("0.29"));
    }

    #[test]
    fn same_currency_is_identity() {
        assert_eq!(convert(-42, code("EUR"), code("eur"), day(1, 1), &[]).unwrap(), -42);
    }

    #[test]
    fn honours_minor_exponents_and_rounds_half_away_from_zero() {
        // 1.00 USD = 150 JPY
        let rates = vec![rate("USD", "JPY", "150.0", day(1, 1))];
        assert_eq!(convert(100, code("USD"), code("JPY"), day(1, 1), &rates).unwrap(), 150);
        // 0.01 USD = 1.5 JPY, rounds to 2; -0.01 USD rounds to -2.
        assert_eq!(convert(1, code("USD"), code("JPY"), day(1, 1), &rates).unwrap(), 2);
        assert_eq!(convert(-1, code("USD"), code("JPY"), day(1, 1), &rates).unwrap(), -2);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Converting there and back lands within the rounding error of
            /// the two conversions.
            #[test]
            fn round_trip_within_rounding(amount in -1_000_000_000i64..1_000_000_000, milli in 100i64..10_000) {
                let r = Decimal::new(milli, 3);
                let rates = vec![rate("USD", "EUR", &r.to_string(), day(1, 1))];
                let there = convert(amount, code("USD"), code("EUR"), day(1, 1), &rates).unwrap();
                let back = convert(there, code("EUR"), code("USD"), day(1, 1), &rates).unwrap();
                let tolerance = (Decimal::new(5, 1) / r).ceil().to_i64().unwrap() + 1;
                prop_assert!((back - amount).abs() <= tolerance);
            }
        }
    }
}
