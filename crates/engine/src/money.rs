use std::{
    fmt,
    ops::{Add, AddAssign, Sub},
};

use crate::Currency;

/// Number of basis points in one whole (100%).
pub const BPS_SCALE: i64 = 10_000;

/// Signed money amount represented as **integer minor units** (hundredths).
///
/// Use this type for monetary arithmetic in the engine (budget totals,
/// allocations, report sums) to avoid floating-point drift. Entities keep
/// the raw `i64` so they map 1:1 to their columns.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// assert_eq!(Money::new(100_000).scale_bps(1_000), Money::new(10_000));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Parses a decimal amount in major units (`5.25` -> 525 minor),
    /// rounding half away from zero.
    ///
    /// Returns `None` for non-finite values or amounts that do not fit.
    #[must_use]
    pub fn from_decimal(value: f64) -> Option<Self> {
        let minor = (value * 100.0).round();
        if !minor.is_finite() || minor >= i64::MAX as f64 || minor <= i64::MIN as f64 {
            return None;
        }
        Some(Self(minor as i64))
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// `self - rhs`, floored at zero.
    #[must_use]
    pub fn saturating_remaining(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0).max(0))
    }

    /// Multiplies by `bps / 10_000`, rounding toward zero.
    #[must_use]
    pub fn scale_bps(self, bps: u32) -> Money {
        let scaled = i128::from(self.0) * i128::from(bps) / i128::from(BPS_SCALE);
        Money(i64::try_from(scaled).unwrap_or(i64::MAX))
    }

    /// Percentage of `self` over `whole`, rounded to two decimals.
    ///
    /// Returns `None` when `whole` is zero.
    #[must_use]
    pub fn percent_of(self, whole: Money) -> Option<f64> {
        if whole.0 == 0 {
            return None;
        }
        let pct = self.0 as f64 / whole.0 as f64 * 100.0;
        Some((pct * 100.0).round() / 100.0)
    }

    /// Formats the amount followed by a currency code, e.g. `500.00 LKR`.
    #[must_use]
    pub fn with_currency(self, currency: &Currency) -> String {
        format!("{self} {currency}")
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let hundredths = abs % 100;
        write!(f, "{sign}{units}.{hundredths:02}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, value| acc + value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(Money::new(0).to_string(), "0.00");
        assert_eq!(Money::new(1).to_string(), "0.01");
        assert_eq!(Money::new(1050).to_string(), "10.50");
        assert_eq!(Money::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn decimal_amounts_become_minor_units() {
        assert_eq!(Money::from_decimal(500.0), Some(Money::new(50_000)));
        assert_eq!(Money::from_decimal(5.25), Some(Money::new(525)));
        assert_eq!(Money::from_decimal(0.125), Some(Money::new(13)));
        assert_eq!(Money::from_decimal(f64::NAN), None);
        assert_eq!(Money::from_decimal(1e30), None);
    }

    #[test]
    fn scale_bps_rounds_toward_zero() {
        assert_eq!(Money::new(100_000).scale_bps(1_000), Money::new(10_000));
        assert_eq!(Money::new(999).scale_bps(1_000), Money::new(99));
        assert_eq!(Money::new(5).scale_bps(0), Money::ZERO);
    }

    #[test]
    fn remaining_never_goes_negative() {
        assert_eq!(
            Money::new(100).saturating_remaining(Money::new(250)),
            Money::ZERO
        );
        assert_eq!(
            Money::new(250).saturating_remaining(Money::new(100)),
            Money::new(150)
        );
    }

    #[test]
    fn percent_of_handles_zero_whole() {
        assert_eq!(Money::new(450).percent_of(Money::new(500)), Some(90.0));
        assert_eq!(Money::new(1).percent_of(Money::new(3)), Some(33.33));
        assert_eq!(Money::new(10).percent_of(Money::ZERO), None);
    }
}
