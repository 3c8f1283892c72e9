//! Aggregate gain over a set of lots.

use crate::cash_in::is_cash_in;
use crate::{market_value, AccountStateInfo};
use lotledger_core::{checked_sum, BaseValue, LotOriginSource, LotState};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;

/// What counts as the input (cost) side of a gain.
#[derive(Clone, Copy)]
pub enum GainParts<'a> {
    /// The full cost basis of every lot.
    Simple,
    /// The cost basis of cash-purchase lots only. Shares acquired without new
    /// cash (reinvested dividends, transfers) count as gain.
    CashInOnly(&'a dyn LotOriginSource),
}

impl GainParts<'_> {
    /// The input contributed by one lot.
    #[must_use]
    pub fn input_base_value(&self, lot: &LotState) -> BaseValue {
        match self {
            Self::Simple => lot.cost_basis(),
            Self::CashInOnly(origins) => {
                if is_cash_in(*origins, lot) {
                    lot.cost_basis()
                } else {
                    0
                }
            }
        }
    }
}

impl fmt::Debug for GainParts<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "Simple"),
            Self::CashInOnly(_) => write!(f, "CashInOnly"),
        }
    }
}

/// How the input and output totals are turned into a gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GainMetric {
    /// `output - input`, in currency units.
    Absolute,
    /// `(output - input) / input * 100`.
    Percent,
}

impl GainMetric {
    /// Apply the metric to decimal totals. `None` for a percent gain on a zero
    /// input.
    #[must_use]
    pub fn apply(self, input: Decimal, output: Decimal) -> Option<Decimal> {
        match self {
            Self::Absolute => output.checked_sub(input),
            Self::Percent => {
                if input.is_zero() {
                    return None;
                }
                output
                    .checked_sub(input)?
                    .checked_div(input)?
                    .checked_mul(Decimal::ONE_HUNDRED)
            }
        }
    }
}

/// Totals and gain for a set of lots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GainResult {
    /// Total input, in the currency's base values. `None` if the total
    /// leaves the `i64` range.
    pub input_base_value: Option<BaseValue>,
    /// Total market value, or `None` without a price or if the total
    /// quantity or its value leaves the `i64` range.
    pub output_base_value: Option<BaseValue>,
    /// The metric applied to the totals, if a metric was requested and could
    /// be computed.
    pub gain: Option<Decimal>,
}

/// Aggregate the gain of `lot_states`.
///
/// The output is the market value of the lots' total quantity. If `metric` is
/// given it is applied to the totals and rounded to `precision` decimal
/// places (half away from zero) when a precision is given. A total that
/// overflows is reported as absent, and so is the gain computed from it.
#[must_use]
pub fn calc_gain(
    info: &AccountStateInfo,
    lot_states: &[LotState],
    parts: &GainParts<'_>,
    metric: Option<GainMetric>,
    precision: Option<u32>,
) -> GainResult {
    let input_base_value = checked_sum(lot_states.iter().map(|lot| parts.input_base_value(lot)));
    let output_base_value = checked_sum(lot_states.iter().map(LotState::quantity))
        .and_then(|quantity| market_value(info, quantity));

    let totals = input_base_value.zip(output_base_value);
    let gain = metric.zip(totals).and_then(|(metric, (input, output))| {
        let gain = metric.apply(info.amount_to_decimal(input), info.amount_to_decimal(output))?;
        Some(round_to(gain, precision))
    });

    tracing::debug!(
        account = %info.account.id,
        lots = lot_states.len(),
        input = ?input_base_value,
        output = ?output_base_value,
        ?parts,
        "calculated gain"
    );

    GainResult {
        input_base_value,
        output_base_value,
        gain,
    }
}

pub(crate) fn round_to(value: Decimal, precision: Option<u32>) -> Decimal {
    match precision {
        Some(dp) => value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
        None => value,
    }
}
