//! Fixed-point base values and exact integer allocation.
//!
//! Every quantity and monetary amount handled by the engine is a signed
//! integer "base value". Its scale (number of decimal places) is owned by a
//! [`QuantityDefinition`] that the ledger associates with a security or a
//! currency. Arithmetic on base values stays in integers; conversion to
//! [`Decimal`] only happens at the edges (prices, display, percentages).
//!
//! Conversion back to a base value rounds half toward positive infinity, the
//! same rule as [`round_ratio`], so `-0.005` dollars becomes `0` cents.
//! Decimal figures derived from base values (gains, percentages) are rounded
//! half away from zero instead. The two rules differ only on negative
//! midpoints.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An integer fixed-point value. The scale is defined externally.
pub type BaseValue = i64;

/// Scale of a fixed-point base value.
///
/// # Examples
///
/// ```
/// use lotledger_core::QuantityDefinition;
/// use rust_decimal_macros::dec;
///
/// let shares = QuantityDefinition::new(4);
/// assert_eq!(shares.to_decimal(6_850_000), dec!(685.0000));
/// assert_eq!(shares.parse("28.6284"), Some(286_284));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuantityDefinition {
    decimal_places: u32,
}

impl QuantityDefinition {
    /// Largest supported scale. `10^18` still fits in an `i64`.
    pub const MAX_DECIMAL_PLACES: u32 = 18;

    /// Create a definition with the given number of decimal places.
    ///
    /// Scales above [`Self::MAX_DECIMAL_PLACES`] are clamped.
    #[must_use]
    pub const fn new(decimal_places: u32) -> Self {
        let decimal_places = if decimal_places > Self::MAX_DECIMAL_PLACES {
            Self::MAX_DECIMAL_PLACES
        } else {
            decimal_places
        };
        Self { decimal_places }
    }

    /// Number of decimal places.
    #[must_use]
    pub const fn decimal_places(&self) -> u32 {
        self.decimal_places
    }

    /// The base value representing one whole unit.
    #[must_use]
    pub const fn one(&self) -> BaseValue {
        10_i64.pow(self.decimal_places)
    }

    /// Convert a base value to its decimal representation.
    #[must_use]
    pub fn to_decimal(&self, base_value: BaseValue) -> Decimal {
        Decimal::new(base_value, self.decimal_places)
    }

    /// Convert a decimal to a base value, rounding half toward positive infinity.
    ///
    /// Returns `None` if the value does not fit in a [`BaseValue`].
    #[must_use]
    pub fn from_decimal(&self, value: Decimal) -> Option<BaseValue> {
        let scaled = value.checked_mul(Decimal::from(self.one()))?;
        let rounded = scaled.checked_add(Decimal::new(5, 1))?.floor();
        rounded.to_i64()
    }

    /// Parse a decimal string into a base value.
    #[must_use]
    pub fn parse(&self, s: &str) -> Option<BaseValue> {
        Decimal::from_str(s.trim())
            .ok()
            .and_then(|d| self.from_decimal(d))
    }

    /// Format a base value with exactly `decimal_places` digits.
    #[must_use]
    pub fn format(&self, base_value: BaseValue) -> String {
        self.to_decimal(base_value).to_string()
    }
}

impl Default for QuantityDefinition {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Display for QuantityDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} decimal places", self.decimal_places)
    }
}

/// Divide and round half toward positive infinity (`floor(n / d + 1/2)`).
///
/// This matches the rounding used for every pro-rata share and cost-basis
/// rescale in the engine. Returns `None` when `denominator` is zero.
#[must_use]
pub fn round_ratio(numerator: i128, denominator: i128) -> Option<i128> {
    if denominator == 0 {
        return None;
    }
    let (n, d) = if denominator < 0 {
        (numerator.checked_neg()?, denominator.checked_neg()?)
    } else {
        (numerator, denominator)
    };
    let twice_n = n.checked_mul(2)?;
    let twice_d = d.checked_mul(2)?;
    Some(twice_n.checked_add(d)?.div_euclid(twice_d))
}

/// Compute `round(value * numerator / denominator)` as a base value.
///
/// Returns `None` on a zero denominator or if the result leaves the `i64` range.
#[must_use]
pub fn scale_ratio(
    value: BaseValue,
    numerator: BaseValue,
    denominator: BaseValue,
) -> Option<BaseValue> {
    let product = i128::from(value) * i128::from(numerator);
    let rounded = round_ratio(product, i128::from(denominator))?;
    BaseValue::try_from(rounded).ok()
}

/// Add up base values, or `None` if the total leaves the `i64` range.
///
/// # Examples
///
/// ```
/// use lotledger_core::checked_sum;
///
/// assert_eq!(checked_sum([4, -1, 7]), Some(10));
/// assert_eq!(checked_sum([i64::MAX, 1]), None);
/// ```
#[must_use]
pub fn checked_sum<I>(values: I) -> Option<BaseValue>
where
    I: IntoIterator<Item = BaseValue>,
{
    values.into_iter().try_fold(0, BaseValue::checked_add)
}

/// Allocate `total` across `weights` in proportion, with an exact sum.
///
/// Every entry except the last receives `round(total * weight / sum(weights))`;
/// the last entry receives whatever remains, so the allocations always add up
/// to exactly `total`.
///
/// Returns `None` if `weights` is empty, the weights sum to zero, or an
/// allocation does not fit in a [`BaseValue`].
///
/// # Examples
///
/// ```
/// use lotledger_core::allocate_pro_rata;
///
/// let shares = allocate_pro_rata(100, &[100, 200, 300]).unwrap();
/// assert_eq!(shares, vec![17, 33, 50]);
/// ```
#[must_use]
pub fn allocate_pro_rata(total: BaseValue, weights: &[BaseValue]) -> Option<Vec<BaseValue>> {
    let (_, leading) = weights.split_last()?;
    let weight_sum: i128 = weights.iter().map(|&w| i128::from(w)).sum();
    if weight_sum == 0 {
        return None;
    }

    let mut allocations = Vec::with_capacity(weights.len());
    let mut allocated: i128 = 0;
    for &weight in leading {
        let share = round_ratio(i128::from(total) * i128::from(weight), weight_sum)?;
        allocated += share;
        allocations.push(BaseValue::try_from(share).ok()?);
    }

    let remainder = i128::from(total) - allocated;
    allocations.push(BaseValue::try_from(remainder).ok()?);
    Some(allocations)
}
