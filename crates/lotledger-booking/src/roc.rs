//! Return-of-capital allocation.
//!
//! A return of capital is spread across lots by quantity weight with the same
//! exact-sum rule as split distribution. Each lot's portion reduces its cost
//! basis; whatever exceeds the basis zeroes it and is recognized as a capital
//! gain, classified long-term or short-term per lot.

use crate::{
    CapitalGainsPolicy, EntrySplit, GainTerm, LotChangeSet, SplitRole, TransactionDescriptor,
};
use chrono::NaiveDate;
use lotledger_core::{
    allocate_pro_rata, checked_sum, AccountId, BaseValue, LotChange, LotError, LotId, LotState,
};
use serde::Serialize;

/// The share of a return of capital assigned to one lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RocAllocation {
    /// The lot.
    pub lot_id: LotId,
    /// The lot's share of the return of capital.
    pub portion: BaseValue,
    /// How much the lot's cost basis goes down.
    pub basis_reduction: BaseValue,
    /// The part of the portion above the lot's basis.
    pub gain: BaseValue,
    /// Classification of the gain, if there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term: Option<GainTerm>,
}

/// A return of capital allocated across lots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnOfCapital {
    /// The amount returned.
    pub amount: BaseValue,
    /// One allocation per lot with shares, in input order.
    pub allocations: Vec<RocAllocation>,
    /// Total long-term gain recognized.
    pub long_term_gain: BaseValue,
    /// Total short-term gain recognized.
    pub short_term_gain: BaseValue,
}

/// The totals below saturate at the `i64` bounds. [`allocate_return_of_capital`]
/// fails with [`LotError::Overflow`] rather than produce a value that would
/// saturate them.
impl ReturnOfCapital {
    /// Total gain recognized across all lots.
    #[must_use]
    pub const fn total_gain(&self) -> BaseValue {
        self.long_term_gain.saturating_add(self.short_term_gain)
    }

    /// Total reduction of cost basis across all lots.
    #[must_use]
    pub fn total_basis_reduction(&self) -> BaseValue {
        self.allocations
            .iter()
            .fold(0, |total, a| total.saturating_add(a.basis_reduction))
    }

    /// The amount carried by the return-of-capital entry itself.
    #[must_use]
    pub const fn return_of_capital_amount(&self) -> BaseValue {
        self.amount.saturating_sub(self.total_gain())
    }

    /// Cost-basis changes to apply as adjustments. Lots whose basis does not
    /// move are left out.
    #[must_use]
    pub fn lot_changes(&self) -> LotChangeSet {
        let changes = self
            .allocations
            .iter()
            .filter(|a| a.basis_reduction != 0)
            .map(|a| LotChange::cost_basis_only(a.lot_id, -a.basis_reduction))
            .collect();
        LotChangeSet::new(changes, true)
    }
}

/// Allocate `amount` across `lot_states` as of `reference_date`.
///
/// `is_long_term(created, reference)` classifies each gain.
pub fn allocate_return_of_capital(
    lot_states: &[LotState],
    amount: BaseValue,
    reference_date: NaiveDate,
    is_long_term: impl Fn(NaiveDate, NaiveDate) -> bool,
) -> Result<ReturnOfCapital, LotError> {
    if amount <= 0 {
        return Err(LotError::InvalidRocValue { amount });
    }

    let lots: Vec<&LotState> = lot_states.iter().filter(|lot| lot.quantity() > 0).collect();
    let last_lot = lots.last().map(|lot| lot.lot_id()).ok_or(LotError::NoLots)?;
    let overflow = || LotError::Overflow { lot_id: last_lot };
    let weights: Vec<BaseValue> = lots.iter().map(|lot| lot.quantity()).collect();
    let portions = allocate_pro_rata(amount, &weights).ok_or_else(overflow)?;

    let mut result = ReturnOfCapital {
        amount,
        allocations: Vec::with_capacity(lots.len()),
        long_term_gain: 0,
        short_term_gain: 0,
    };

    for (lot, portion) in lots.into_iter().zip(portions) {
        let basis = lot.cost_basis();
        let (basis_reduction, gain) = if portion <= basis {
            (portion, 0)
        } else {
            let reduction = basis.max(0);
            (reduction, portion - reduction)
        };

        let term = (gain > 0).then(|| {
            if is_long_term(lot.date_created(), reference_date) {
                GainTerm::LongTerm
            } else {
                GainTerm::ShortTerm
            }
        });
        if let Some(term) = term {
            let total = match term {
                GainTerm::LongTerm => &mut result.long_term_gain,
                GainTerm::ShortTerm => &mut result.short_term_gain,
            };
            *total = total.checked_add(gain).ok_or(LotError::Overflow {
                lot_id: lot.lot_id(),
            })?;
        }

        tracing::debug!(
            lot = %lot.lot_id(),
            portion,
            basis_reduction,
            gain,
            "allocated return of capital"
        );
        result.allocations.push(RocAllocation {
            lot_id: lot.lot_id(),
            portion,
            basis_reduction,
            gain,
            term,
        });
    }

    let total_gain = result.long_term_gain.checked_add(result.short_term_gain);
    let total_reduction = checked_sum(result.allocations.iter().map(|a| a.basis_reduction));
    if total_gain.is_none() || total_reduction.is_none() {
        return Err(overflow());
    }

    Ok(result)
}

/// Build the transaction for a return of capital of `amount` into `account`.
///
/// The return-of-capital entry carries `amount` minus the recognized gains
/// together with the basis reductions. Each non-zero gain total is credited to
/// the policy's default gains account for its term; a missing account fails
/// with [`LotError::InvalidAccount`].
pub fn build_return_of_capital<P>(
    account: AccountId,
    lot_states: &[LotState],
    amount: BaseValue,
    reference_date: NaiveDate,
    policy: &P,
) -> Result<TransactionDescriptor, LotError>
where
    P: CapitalGainsPolicy + ?Sized,
{
    let allocation =
        allocate_return_of_capital(lot_states, amount, reference_date, |created, reference| {
            policy.is_long_term_capital_gains(account, created, reference)
        })?;

    let mut splits = vec![EntrySplit {
        account,
        role: SplitRole::ReturnOfCapital,
        amount_base_value: allocation.return_of_capital_amount(),
        lot_changes: Some(allocation.lot_changes()),
    }];

    for (term, gain, role) in [
        (
            GainTerm::LongTerm,
            allocation.long_term_gain,
            SplitRole::LongTermCapitalGains,
        ),
        (
            GainTerm::ShortTerm,
            allocation.short_term_gain,
            SplitRole::ShortTermCapitalGains,
        ),
    ] {
        if gain == 0 {
            continue;
        }
        let gains_account = policy
            .default_capital_gains_account(account, term)
            .ok_or(LotError::InvalidAccount { account })?;
        splits.push(EntrySplit {
            account: gains_account,
            role,
            amount_base_value: gain,
            lot_changes: None,
        });
    }

    Ok(TransactionDescriptor {
        date: reference_date,
        splits,
    })
}
