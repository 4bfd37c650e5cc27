//! Monetary amounts in major currency units.
//!
//! Orders carry amounts in major units (rupees, not paise) using exact decimal
//! arithmetic. The payment gateway wants integer minor units; that conversion
//! lives in exactly one place, [`Money::to_minor_units`].
//!
//! # Rounding
//!
//! Minor-unit conversion is exact for every valid amount. The final rounding
//! step only guards the decimal representation and rounds half away from zero.
//!
//! # Bounds
//!
//! Amounts carry at most two decimal places, matching the `NUMERIC(12, 2)`
//! columns they are stored in. A single stored amount may not exceed
//! [`Money::MAX_STORED`]; aggregates may, so that bound is checked by callers
//! that persist a value rather than by [`Money::new`].

use core::fmt;
use core::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Minor units per major unit for every supported currency.
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Decimal places an amount may carry.
pub const MAX_DECIMAL_PLACES: u32 = 2;

/// Errors produced when constructing or converting [`Money`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("amount cannot be negative: {0}")]
    Negative(Decimal),
    #[error("amount {0} has more than 2 decimal places")]
    TooPrecise(Decimal),
    #[error("amount {0} exceeds the maximum of 9999999999.99")]
    TooLarge(Decimal),
    #[error("amount {0} is out of range")]
    Overflow(Decimal),
    #[error("unsupported currency code: {0}")]
    UnsupportedCurrency(String),
}

/// A non-negative decimal amount in major currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest amount one `NUMERIC(12, 2)` column holds.
    pub const MAX_STORED: Self = Self(Decimal::from_parts(3_567_587_327, 232, 0, false, 2));

    /// Create an amount, rejecting negative values and sub-cent precision.
    ///
    /// Trailing zeros do not count: `19.990` is accepted as `19.99`.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] for amounts below zero and
    /// [`MoneyError::TooPrecise`] for more than two decimal places.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount));
        }
        if amount.normalize().scale() > MAX_DECIMAL_PLACES {
            return Err(MoneyError::TooPrecise(amount));
        }
        Ok(Self(amount))
    }

    /// Amount in major units with an explicit scale, e.g. `from_parts(1999, 2)` is `19.99`.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] for negative mantissas.
    pub fn from_parts(mantissa: i64, scale: u32) -> Result<Self, MoneyError> {
        Self::new(Decimal::new(mantissa, scale))
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Convert to the gateway's integer minor units (paise, cents).
    ///
    /// `19.99 -> 1999`, `100 -> 10000`.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] when the result does not fit in `i64`.
    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        self.0
            .checked_mul(Decimal::from(MINOR_UNITS_PER_MAJOR))
            .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|rounded| rounded.to_i64())
            .ok_or(MoneyError::Overflow(self.0))
    }

    /// Reject amounts that do not fit a stored order column.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::TooLarge`] above [`Money::MAX_STORED`].
    pub fn storable(self) -> Result<Self, MoneyError> {
        if self > Self::MAX_STORED {
            return Err(MoneyError::TooLarge(self.0));
        }
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] when the sum is not representable.
    pub fn checked_add(self, rhs: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(MoneyError::Overflow(self.0))
    }

    /// Total of `amounts`, failing instead of wrapping or panicking.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] when the running total overflows.
    pub fn checked_sum<I>(amounts: I) -> Result<Self, MoneyError>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

// JSON clients expect plain numbers (`"amount": 19.99`).
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0.normalize(), serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

/// ISO 4217 currency codes accepted for orders.
///
/// Deserializes case-insensitively; `null` and `""` mean the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
    AUD,
    CAD,
    SGD,
    AED,
}

impl CurrencyCode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::AUD => "AUD",
            Self::CAD => "CAD",
            Self::SGD => "SGD",
            Self::AED => "AED",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Self::INR),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "AUD" => Ok(Self::AUD),
            "CAD" => Ok(Self::CAD),
            "SGD" => Ok(Self::SGD),
            "AED" => Ok(Self::AED),
            _ => Err(MoneyError::UnsupportedCurrency(s.to_owned())),
        }
    }
}

impl<'de> Deserialize<'de> for CurrencyCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(code) if !code.trim().is_empty() => {
                code.parse().map_err(serde::de::Error::custom)
            }
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        Money::new(s.parse().unwrap()).unwrap()
    }

    #[test]
    fn test_minor_units_exact() {
        assert_eq!(money("19.99").to_minor_units().unwrap(), 1999);
        assert_eq!(money("100").to_minor_units().unwrap(), 10000);
        assert_eq!(money("0").to_minor_units().unwrap(), 0);
        assert_eq!(money("1234.56").to_minor_units().unwrap(), 123_456);
    }

    #[test]
    fn test_minor_units_round_half_up() {
        // Bypasses `new` to reach the rounding step directly.
        let raw = |s: &str| Money(s.parse().unwrap());
        assert_eq!(raw("0.005").to_minor_units().unwrap(), 1);
        assert_eq!(raw("0.004").to_minor_units().unwrap(), 0);
        assert_eq!(raw("10.025").to_minor_units().unwrap(), 1003);
    }

    #[test]
    fn test_sub_cent_precision_rejected() {
        assert!(matches!(
            Money::new("19.999".parse().unwrap()),
            Err(MoneyError::TooPrecise(_))
        ));
        assert!(matches!(Money::from_parts(5, 3), Err(MoneyError::TooPrecise(_))));
        assert_eq!(money("19.990"), money("19.99"));
        assert!(serde_json::from_str::<Money>("19.999").is_err());
        assert!(serde_json::from_str::<Money>("\"0.005\"").is_err());
    }

    #[test]
    fn test_storable_bound() {
        let max = money("9999999999.99");
        assert_eq!(max, Money::MAX_STORED);
        assert_eq!(max.storable().unwrap(), max);
        assert_eq!(max.to_minor_units().unwrap(), 999_999_999_999);

        assert!(matches!(
            money("10000000000").storable(),
            Err(MoneyError::TooLarge(_))
        ));
        assert!(matches!(
            Money::new(Decimal::MAX).unwrap().storable(),
            Err(MoneyError::TooLarge(_))
        ));
    }

    #[test]
    fn test_minor_units_overflow() {
        let huge = Money::new(Decimal::MAX).unwrap();
        assert!(matches!(huge.to_minor_units(), Err(MoneyError::Overflow(_))));
    }

    #[test]
    fn test_negative_rejected() {
        assert!(matches!(
            Money::from_parts(-1, 2),
            Err(MoneyError::Negative(_))
        ));
        assert_eq!(Money::from_parts(0, 2).unwrap(), Money::ZERO);
    }

    #[test]
    fn test_json_numbers_are_exact() {
        let parsed: Money = serde_json::from_str("19.99").unwrap();
        assert_eq!(parsed, Money::from_parts(1999, 2).unwrap());
        assert_eq!(parsed.to_minor_units().unwrap(), 1999);

        let from_string: Money = serde_json::from_str("\"250.50\"").unwrap();
        assert_eq!(from_string, money("250.5"));

        assert!(serde_json::from_str::<Money>("-3").is_err());
        assert_eq!(serde_json::to_string(&money("350.00")).unwrap(), "350.0");
    }

    #[test]
    fn test_checked_sum() {
        let total = Money::checked_sum([money("100"), money("200"), money("50.25")]).unwrap();
        assert_eq!(total, money("350.25"));
        assert_eq!(Money::checked_sum([]).unwrap(), Money::ZERO);

        let huge = Money::new(Decimal::MAX).unwrap();
        assert!(matches!(
            Money::checked_sum([huge, huge]),
            Err(MoneyError::Overflow(_))
        ));
        assert!(huge.checked_add(Money::ZERO).is_ok());
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("inr".parse::<CurrencyCode>().unwrap(), CurrencyCode::INR);
        assert_eq!(CurrencyCode::default(), CurrencyCode::INR);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
        assert_eq!(
            serde_json::to_string(&CurrencyCode::USD).unwrap(),
            "\"USD\""
        );
    }

    #[test]
    fn test_currency_deserialize_is_lenient() {
        let parse = |json: &str| serde_json::from_str::<CurrencyCode>(json);

        assert_eq!(parse("\"inr\"").unwrap(), CurrencyCode::INR);
        assert_eq!(parse("\" usd \"").unwrap(), CurrencyCode::USD);
        assert_eq!(parse("\"\"").unwrap(), CurrencyCode::INR);
        assert_eq!(parse("null").unwrap(), CurrencyCode::INR);
        assert!(parse("\"XYZ\"").is_err());
        assert!(parse("7").is_err());
    }
}
