//! Two-decimal fixed-point amounts and the split ratio between a payer and the rest of the household.

use std::{
    fmt::Display,
    ops::{Add, Sub},
};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef},
};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::Error;

/// A decimal rounded to two places, e.g. an amount of money or a quantity.
///
/// Values are stored in the database as integer hundredths so that sums in
/// SQL are exact, and are rendered as JSON numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct FixedPoint(Decimal);

impl FixedPoint {
    /// Zero.
    pub const ZERO: FixedPoint = FixedPoint(Decimal::ZERO);

    /// One.
    pub const ONE: FixedPoint = FixedPoint(Decimal::ONE);

    /// The largest difference between the sum of a transaction's items and
    /// its total that is still accepted.
    pub const TOLERANCE: FixedPoint = FixedPoint(Decimal::from_parts(1, 0, 0, false, 2));

    /// The largest amount that can be stored, 9,999,999,999.99.
    pub const MAX: FixedPoint = FixedPoint(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2));

    /// Round `value` half away from zero to two decimal places.
    pub fn new(value: Decimal) -> Self {
        Self(value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Create a value from a whole number of hundredths, e.g. `1250` is `12.50`.
    pub fn from_hundredths(hundredths: i64) -> Self {
        Self(Decimal::new(hundredths, 2))
    }

    /// The value as a whole number of hundredths, or `None` if it does not fit in an `i64`.
    pub fn to_hundredths(self) -> Option<i64> {
        self.0
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|hundredths| hundredths.trunc().to_i64())
    }

    /// Add `other`, or `None` if the sum does not fit in a decimal.
    pub fn checked_add(self, other: FixedPoint) -> Option<FixedPoint> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Check that the value is no greater than [FixedPoint::MAX].
    ///
    /// # Errors
    ///
    /// Returns [Error::AmountTooLarge] naming `field` if the value is too large.
    pub fn ensure_storable(self, field: &'static str) -> Result<Self, Error> {
        if self > Self::MAX {
            return Err(Error::AmountTooLarge(field));
        }

        Ok(self)
    }

    /// The underlying decimal.
    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    /// Whether the value is strictly greater than zero.
    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Whether the value is less than zero.
    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// The absolute difference between `self` and `other`.
    pub fn abs_diff(self, other: FixedPoint) -> FixedPoint {
        Self((self.0 - other.0).abs())
    }
}

impl From<Decimal> for FixedPoint {
    fn from(value: Decimal) -> Self {
        Self::new(value)
    }
}

impl From<FixedPoint> for Decimal {
    fn from(value: FixedPoint) -> Self {
        value.0
    }
}

impl From<i64> for FixedPoint {
    fn from(value: i64) -> Self {
        Self(Decimal::from(value))
    }
}

impl Display for FixedPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for FixedPoint {
    type Output = FixedPoint;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for FixedPoint {
    type Output = FixedPoint;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl ToSql for FixedPoint {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self.to_hundredths() {
            Some(hundredths) => Ok(ToSqlOutput::from(hundredths)),
            None => Err(rusqlite::Error::ToSqlConversionFailure(
                format!("{self} is too large to store").into(),
            )),
        }
    }
}

impl FromSql for FixedPoint {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(FixedPoint::from_hundredths)
    }
}

/// The fraction of a transaction's amount attributed to the user who paid, in [0, 1].
///
/// The remainder is attributed to the other household member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SplitRatio(FixedPoint);

impl SplitRatio {
    /// An even split.
    pub const EVEN: SplitRatio = SplitRatio(FixedPoint(Decimal::from_parts(50, 0, 0, false, 2)));

    /// Create a split ratio, rounded to two decimal places.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidSplitRatio] if `ratio` is outside of [0, 1].
    pub fn new(ratio: Decimal) -> Result<Self, Error> {
        let ratio = FixedPoint::new(ratio);

        if ratio.is_negative() || ratio > FixedPoint::ONE {
            return Err(Error::InvalidSplitRatio(ratio.to_string()));
        }

        Ok(Self(ratio))
    }

    /// The ratio as a fixed-point value.
    pub fn as_fixed_point(self) -> FixedPoint {
        self.0
    }
}

impl Default for SplitRatio {
    fn default() -> Self {
        Self::EVEN
    }
}

impl<'de> Deserialize<'de> for SplitRatio {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let ratio = <Decimal as Deserialize>::deserialize(deserializer)?;
        SplitRatio::new(ratio).map_err(serde::de::Error::custom)
    }
}

impl ToSql for SplitRatio {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for SplitRatio {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        FixedPoint::column_result(value).map(SplitRatio)
    }
}

/// How a transaction's amount is divided between the payer and the other party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitShares {
    /// The amount attributed to the payer, `amount * ratio`.
    pub payer_share: FixedPoint,
    /// The rest of the amount, `amount * (1 - ratio)`.
    pub other_share: FixedPoint,
}

/// Split `amount` between the payer and the other party.
///
/// The payer's share is rounded to two decimal places and the other share is
/// the remainder, so the two shares always add up to `amount`.
pub fn split_amount(amount: FixedPoint, ratio: SplitRatio) -> SplitShares {
    let payer_share = FixedPoint::new(amount.as_decimal() * ratio.as_fixed_point().as_decimal());

    SplitShares {
        payer_share,
        other_share: amount - payer_share,
    }
}

#[cfg(test)]
mod fixed_point_tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;

    use crate::Error;

    use super::FixedPoint;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(
            FixedPoint::new(Decimal::new(12345, 3)),
            FixedPoint::from_hundredths(1235)
        );
        assert_eq!(
            FixedPoint::new(Decimal::new(-12345, 3)),
            FixedPoint::from_hundredths(-1235)
        );
    }

    #[test]
    fn displays_two_decimal_places() {
        assert_eq!(FixedPoint::from(15).to_string(), "15.00");
        assert_eq!(FixedPoint::from_hundredths(5).to_string(), "0.05");
    }

    #[test]
    fn stores_as_integer_hundredths() {
        let connection = Connection::open_in_memory().unwrap();
        let amount = FixedPoint::new(Decimal::new(123456, 2));

        let stored: i64 = connection
            .query_row("SELECT ?1", [amount], |row| row.get(0))
            .unwrap();
        let loaded: FixedPoint = connection
            .query_row("SELECT ?1", [amount], |row| row.get(0))
            .unwrap();

        assert_eq!(stored, 123456);
        assert_eq!(loaded, amount);
    }

    #[test]
    fn deserializes_json_numbers() {
        let amount: FixedPoint = serde_json::from_str("1500.5").unwrap();

        assert_eq!(amount, FixedPoint::from_hundredths(150050));
    }

    #[test]
    fn huge_values_do_not_panic() {
        let huge: FixedPoint = serde_json::from_str("1e27").unwrap();
        let connection = Connection::open_in_memory().unwrap();

        let result = connection.query_row("SELECT ?1", [huge], |row| row.get::<_, i64>(0));

        assert_eq!(huge.to_hundredths(), None);
        assert!(result.is_err());
        assert_eq!(huge.checked_add(FixedPoint::new(Decimal::MAX)), None);
    }

    #[test]
    fn max_is_largest_storable_amount() {
        assert_eq!(FixedPoint::MAX.to_hundredths(), Some(999_999_999_999));
        assert_eq!(FixedPoint::MAX.ensure_storable("amount"), Ok(FixedPoint::MAX));
        assert_eq!(
            (FixedPoint::MAX + FixedPoint::TOLERANCE).ensure_storable("amount"),
            Err(Error::AmountTooLarge("amount"))
        );
    }

    #[test]
    fn adds_exactly() {
        let total = [10, 20, 30]
            .into_iter()
            .map(FixedPoint::from_hundredths)
            .try_fold(FixedPoint::ZERO, FixedPoint::checked_add);

        assert_eq!(total, Some(FixedPoint::from_hundredths(60)));
    }
}
