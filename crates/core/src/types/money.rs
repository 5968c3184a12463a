//! Rupee amounts using decimal arithmetic.
//!
//! All marketplace prices are in Pakistani rupees, so the amount carries no
//! currency code. Amounts serialize as strings (`"500.00"`) to avoid float
//! rounding in JSON clients.

use core::fmt;
use core::iter::Sum;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors from money arithmetic.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoneyError {
    /// The result is larger than [`Money::MAX`].
    #[error("amount exceeds the largest storable total of {max}", max = Money::MAX)]
    Overflow,
}

/// A rupee amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest amount a price or total column holds (`NUMERIC(12, 2)`).
    pub const MAX: Self = Self(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2));

    /// Wrap a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Whole rupees.
    #[must_use]
    pub fn from_rupees(rupees: i64) -> Self {
        Self(Decimal::from(rupees))
    }

    /// Get the underlying decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Whether the amount has no fractional paisa below two places.
    #[must_use]
    pub fn has_whole_paisa(&self) -> bool {
        self.0.normalize().scale() <= 2
    }

    /// Whether the amount fits the storable range.
    #[must_use]
    pub fn exceeds_max(&self) -> bool {
        *self > Self::MAX
    }

    /// Price of `quantity` units at this unit price.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` when the product exceeds [`Money::MAX`].
    pub fn times(self, quantity: u32) -> Result<Self, MoneyError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Self)
            .filter(|total| !total.exceeds_max())
            .ok_or(MoneyError::Overflow)
    }

    /// Add two amounts.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` when the sum exceeds [`Money::MAX`].
    pub fn checked_add(self, rhs: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .filter(|total| !total.exceeds_max())
            .ok_or(MoneyError::Overflow)
    }

    /// Sum amounts that must stay storable.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` as soon as the running total exceeds
    /// [`Money::MAX`].
    pub fn try_sum<I: IntoIterator<Item = Self>>(amounts: I) -> Result<Self, MoneyError> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }
}

/// Saturating sum for reports; use [`Money::try_sum`] for stored totals.
impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, m| Self(acc.0.saturating_add(m.0)))
    }
}

impl<'a> Sum<&'a Self> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rs. {:.2}", self.0)
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
        Ok(Self(<Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?))
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_times_quantity() {
        let unit = Money::new(Decimal::new(1250, 2));
        assert_eq!(unit.times(4).unwrap(), Money::from_rupees(50));
    }

    #[test]
    fn test_max_is_largest_storable_amount() {
        assert_eq!(Money::MAX.amount().to_string(), "9999999999.99");
        assert!(!Money::MAX.exceeds_max());
        assert!(Money::from_rupees(10_000_000_000).exceeds_max());
    }

    #[test]
    fn test_times_reports_overflow() {
        let huge = Money::new(Decimal::MAX);
        assert_eq!(huge.times(2), Err(MoneyError::Overflow));
        assert_eq!(Money::from_rupees(5_000_000_000).times(2), Err(MoneyError::Overflow));
        assert_eq!(Money::MAX.times(1).unwrap(), Money::MAX);
    }

    #[test]
    fn test_checked_add_and_try_sum() {
        let half = Money::from_rupees(5_000_000_000);
        assert_eq!(half.checked_add(half), Err(MoneyError::Overflow));
        assert_eq!(
            Money::try_sum([Money::from_rupees(200), Money::from_rupees(300)]).unwrap(),
            Money::from_rupees(500)
        );
        assert_eq!(Money::try_sum([half, half, half]), Err(MoneyError::Overflow));
        assert_eq!(Money::try_sum([]).unwrap(), Money::ZERO);
    }

    #[test]
    fn test_has_whole_paisa() {
        assert!(Money::new(Decimal::new(1999, 2)).has_whole_paisa());
        assert!(Money::new(Decimal::new(15000, 3)).has_whole_paisa());
        assert!(!Money::new(Decimal::new(1, 3)).has_whole_paisa());
    }

    #[test]
    fn test_sum_saturates_instead_of_panicking() {
        let total: Money = [Money::new(Decimal::MAX), Money::from_rupees(1)].into_iter().sum();
        assert_eq!(total, Money::new(Decimal::MAX));
    }

    #[test]
    fn test_sum_of_lines() {
        let lines = [Money::from_rupees(200), Money::from_rupees(300)];
        let total: Money = lines.iter().sum();
        assert_eq!(total, Money::from_rupees(500));
        assert_eq!(Vec::<Money>::new().into_iter().sum::<Money>(), Money::ZERO);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_rupees(500).to_string(), "Rs. 500.00");
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Money::new(Decimal::new(9999, 2))).unwrap();
        assert_eq!(json, "\"99.99\"");
        let parsed: Money = serde_json::from_str("\"15.5\"").unwrap();
        assert_eq!(parsed, Money::new(Decimal::new(155, 1)));
    }

    #[test]
    fn test_is_positive() {
        assert!(Money::from_rupees(1).is_positive());
        assert!(!Money::ZERO.is_positive());
        assert!(!Money::from_rupees(-3).is_positive());
    }
}
