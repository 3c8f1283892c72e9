//! Percent annual gain, blending straight and compound growth.
//!
//! Lots held for less than a year report their straight percent gain, since
//! annualizing a short holding exaggerates it. Lots held for a year or more
//! report the compound annual growth rate over the fractional number of years
//! held. The account figure is the quantity-weighted average of the lot
//! figures.
//!
//! The CAGR exponent is the only floating-point step in the engine. Its result
//! is converted back to a decimal and rounded to the requested precision.

use crate::gain::round_to;
use crate::{distribute_non_cash_in_lots, market_value, AccountStateInfo, GainMetric};
use chrono::{Months, NaiveDate};
use lotledger_core::{BaseValue, LotError, LotId, LotOriginSource, LotState};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;

/// The annual gain of one lot, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LotAnnualGain {
    /// The lot.
    pub lot_id: LotId,
    /// Percent gain, or `None` if it cannot be computed (no price, no basis).
    pub gain: Option<Decimal>,
    /// Whether the lot was held less than a year and reports a straight gain.
    pub is_straight_gain: bool,
}

/// Percent annual gain of a set of lots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnualGainResult {
    /// One entry per lot, in input order.
    pub per_lot: Vec<LotAnnualGain>,
    /// Quantity-weighted average over the lots with a gain.
    pub weighted: Option<Decimal>,
}

/// Years from `from` to `to`, counting whole calendar years and then the
/// remaining days as a fraction of the following year.
///
/// Returns zero if `to` is not after `from`.
#[must_use]
pub fn fractional_years(from: NaiveDate, to: NaiveDate) -> f64 {
    use chrono::Datelike;

    if to <= from {
        return 0.0;
    }

    let mut whole = u32::try_from(to.year() - from.year()).unwrap_or(0);
    let mut anniversary = add_years(from, whole);
    while whole > 0 && anniversary.map_or(true, |date| date > to) {
        whole -= 1;
        anniversary = add_years(from, whole);
    }
    let Some(anniversary) = anniversary else {
        return (to - from).num_days() as f64 / 365.25;
    };

    let remaining = (to - anniversary).num_days() as f64;
    let year_length = add_years(from, whole + 1)
        .map_or(365, |next| (next - anniversary).num_days()) as f64;
    f64::from(whole) + remaining / year_length
}

/// Whether a lot created on `created` has been held a full year on `reference`.
fn held_one_year(created: NaiveDate, reference: NaiveDate) -> bool {
    add_years(created, 1).is_some_and(|anniversary| reference >= anniversary)
}

fn add_years(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(years.checked_mul(12)?))
}

/// Compound annual growth rate in percent.
fn compound_annual_growth(input: Decimal, output: Decimal, years: f64) -> Option<Decimal> {
    if input <= Decimal::ZERO || output < Decimal::ZERO || years <= 0.0 {
        return None;
    }
    let ratio = output.checked_div(input)?.to_f64()?;
    let rate = (ratio.powf(1.0 / years) - 1.0) * 100.0;
    Decimal::from_f64(rate)
}

fn lot_annual_gain(
    info: &AccountStateInfo,
    lot: &LotState,
    reference_date: NaiveDate,
) -> LotAnnualGain {
    let is_straight_gain = !held_one_year(lot.date_created(), reference_date);
    let input = info.amount_to_decimal(lot.cost_basis());

    let gain = market_value(info, lot.quantity()).and_then(|output| {
        let output = info.amount_to_decimal(output);
        if is_straight_gain {
            GainMetric::Percent.apply(input, output)
        } else {
            let years = fractional_years(lot.date_created(), reference_date);
            compound_annual_growth(input, output, years)
        }
    });

    LotAnnualGain {
        lot_id: lot.lot_id(),
        gain,
        is_straight_gain,
    }
}

fn weighted_average(
    info: &AccountStateInfo,
    lots: &[LotState],
    gains: &[LotAnnualGain],
) -> Option<Decimal> {
    let mut weighted_sum = Decimal::ZERO;
    let mut total_quantity: BaseValue = 0;

    for (lot, annual) in lots.iter().zip(gains) {
        let Some(gain) = annual.gain else { continue };
        if lot.quantity() <= 0 {
            continue;
        }
        let quantity = info.quantity_to_decimal(lot.quantity());
        weighted_sum = weighted_sum.checked_add(gain.checked_mul(quantity)?)?;
        total_quantity = total_quantity.checked_add(lot.quantity())?;
    }

    if total_quantity == 0 {
        return None;
    }
    weighted_sum.checked_div(info.quantity_to_decimal(total_quantity))
}

/// Percent annual gain of `lot_states` as of `reference_date`.
///
/// Every figure is rounded to `precision` decimal places when given; the
/// weighted average is computed before rounding.
#[must_use]
pub fn calc_percent_annual_gain(
    info: &AccountStateInfo,
    lot_states: &[LotState],
    reference_date: NaiveDate,
    precision: Option<u32>,
) -> AnnualGainResult {
    let raw: Vec<LotAnnualGain> = lot_states
        .iter()
        .map(|lot| lot_annual_gain(info, lot, reference_date))
        .collect();
    let weighted = weighted_average(info, lot_states, &raw).map(|w| round_to(w, precision));

    let per_lot = raw
        .into_iter()
        .map(|lot| LotAnnualGain {
            gain: lot.gain.map(|g| round_to(g, precision)),
            ..lot
        })
        .collect();

    tracing::debug!(
        account = %info.account.id,
        lots = lot_states.len(),
        weighted = ?weighted,
        "calculated percent annual gain"
    );
    AnnualGainResult { per_lot, weighted }
}

/// Percent annual gain after folding non-cash-in lots into the cash-in lots.
///
/// The per-lot figures are for the cash-in lots only, in creation order.
pub fn calc_cash_in_percent_annual_gain<O>(
    info: &AccountStateInfo,
    lot_states: &[LotState],
    origins: &O,
    reference_date: NaiveDate,
    precision: Option<u32>,
) -> Result<AnnualGainResult, LotError>
where
    O: LotOriginSource + ?Sized,
{
    let cash_in = distribute_non_cash_in_lots(lot_states, origins)?;
    Ok(calc_percent_annual_gain(info, &cash_in, reference_date, precision))
}
