//! Split and merge distribution.
//!
//! A share-count delta is spread across the lots of an account in proportion
//! to their quantities. Every lot but the last receives the rounded share and
//! the last lot absorbs the remainder, so the deltas always add up to exactly
//! the requested delta.
//!
//! Lots holding zero or fewer shares carry no weight and are left untouched.

use crate::LotChangeSet;
use lotledger_core::{allocate_pro_rata, BaseValue, LotChange, LotError, LotState};

/// Compute the per-lot deltas for a split or merge of `delta_shares`.
///
/// One change is produced for each lot with a positive quantity, in input
/// order.
pub fn split_deltas(
    delta_shares: BaseValue,
    lot_states: &[LotState],
) -> Result<Vec<LotChange>, LotError> {
    Ok(weighted_deltas(delta_shares, lot_states)?
        .into_iter()
        .map(|(_, change)| change)
        .collect())
}

/// Spread `delta_shares` across `lot_states` in place.
///
/// Each delta is applied as a cost-basis adjustment without a basis delta, so
/// quantities move while every lot keeps its total cost basis. On failure no
/// lot is left modified. Returns the applied changes.
pub fn distribute_shares(
    delta_shares: BaseValue,
    lot_states: &mut [LotState],
) -> Result<Vec<LotChange>, LotError> {
    let deltas = weighted_deltas(delta_shares, lot_states)?;

    let mut applied = Vec::with_capacity(deltas.len());
    for &(index, change) in &deltas {
        match lot_states[index].apply(&change, true) {
            Ok(seq) => applied.push((index, seq)),
            Err(err) => {
                for (index, seq) in applied.into_iter().rev() {
                    lot_states[index].reverse_last(seq)?;
                }
                return Err(err);
            }
        }
    }

    Ok(deltas.into_iter().map(|(_, change)| change).collect())
}

/// Build the change set for a split or merge of `delta_shares`.
///
/// Fails with [`LotError::MergeTooLarge`] if any lot would be left with zero
/// or fewer shares.
pub fn split_change_set(
    delta_shares: BaseValue,
    lot_states: &[LotState],
) -> Result<LotChangeSet, LotError> {
    let deltas = weighted_deltas(delta_shares, lot_states)?;

    for &(index, change) in &deltas {
        let lot = &lot_states[index];
        let resulting_quantity = lot
            .quantity()
            .checked_add(change.quantity_base_value)
            .ok_or(LotError::Overflow {
                lot_id: lot.lot_id(),
            })?;
        if resulting_quantity <= 0 {
            return Err(LotError::MergeTooLarge {
                lot_id: lot.lot_id(),
                resulting_quantity,
            });
        }
    }

    Ok(LotChangeSet::new(
        deltas.into_iter().map(|(_, change)| change).collect(),
        true,
    ))
}

fn weighted_deltas(
    delta_shares: BaseValue,
    lot_states: &[LotState],
) -> Result<Vec<(usize, LotChange)>, LotError> {
    let (last, _) = lot_states.split_last().ok_or(LotError::NoLots)?;

    let weighted: Vec<(usize, &LotState)> = lot_states
        .iter()
        .enumerate()
        .filter(|(_, lot)| {
            let has_weight = lot.quantity() > 0;
            if !has_weight {
                tracing::warn!(lot = %lot.lot_id(), quantity = lot.quantity(), "skipping lot without shares");
            }
            has_weight
        })
        .collect();
    if weighted.is_empty() {
        return Err(LotError::ZeroTotalQuantity);
    }

    let weights: Vec<BaseValue> = weighted.iter().map(|(_, lot)| lot.quantity()).collect();
    let shares = allocate_pro_rata(delta_shares, &weights).ok_or(LotError::Overflow {
        lot_id: last.lot_id(),
    })?;

    let deltas: Vec<(usize, LotChange)> = weighted
        .into_iter()
        .zip(shares)
        .map(|((index, lot), share)| (index, LotChange::new(lot.lot_id(), share)))
        .collect();

    tracing::debug!(
        delta = delta_shares,
        lots = deltas.len(),
        "distributed split delta"
    );
    Ok(deltas)
}
