//! Lot state and the lot change engine.
//!
//! A [`LotState`] holds one lot's quantity and cost basis together with an
//! append-only log of the changes applied to it. Changes are applied with
//! [`LotState::apply`] (or the copying [`apply_change`]) and undone strictly
//! last-in-first-out: every applied change gets a [`ChangeSeq`], and a
//! reversal that does not name the most recent change is rejected with
//! [`LotError::OutOfOrderReversal`].
//!
//! # Cost-basis rules
//!
//! When a change is applied, the quantity delta is always added. The cost
//! basis follows one of three rules:
//!
//! 1. Not an adjustment, lot already held shares: the basis is rescaled with
//!    the quantity, `round(new_qty * old_basis / old_qty)`, which keeps the
//!    per-share basis. The rounding is not compensated, so repeated rescales
//!    of one lot can drift by a unit each time.
//! 2. Not an adjustment, lot was empty: the basis becomes the change's cost
//!    basis (zero if absent).
//! 3. Adjustment: the change's cost basis is added to the current basis
//!    (fees, returns of capital, splits that keep the total basis).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::quantity::{scale_ratio, BaseValue};
use crate::LotError;

/// Identifier of a lot, assigned by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LotId(pub u64);

impl fmt::Display for LotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lot#{}", self.0)
    }
}

/// Sequence number of a change applied to a lot.
///
/// Sequence numbers increase monotonically per lot and are never reused,
/// even after the change they name has been reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSeq(pub u64);

impl fmt::Display for ChangeSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A quantity and cost-basis delta against one lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LotChange {
    /// The lot being changed.
    pub lot_id: LotId,
    /// Quantity delta.
    pub quantity_base_value: BaseValue,
    /// Cost-basis delta or new cost basis, depending on the adjustment flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_basis_base_value: Option<BaseValue>,
}

impl LotChange {
    /// Create a quantity-only change.
    #[must_use]
    pub const fn new(lot_id: LotId, quantity_base_value: BaseValue) -> Self {
        Self {
            lot_id,
            quantity_base_value,
            cost_basis_base_value: None,
        }
    }

    /// Create a change that only moves the cost basis.
    ///
    /// Meant to be applied as a cost-basis adjustment.
    #[must_use]
    pub const fn cost_basis_only(lot_id: LotId, cost_basis_delta: BaseValue) -> Self {
        Self {
            lot_id,
            quantity_base_value: 0,
            cost_basis_base_value: Some(cost_basis_delta),
        }
    }

    /// Attach a cost basis to this change.
    #[must_use]
    pub const fn with_cost_basis(mut self, cost_basis_base_value: BaseValue) -> Self {
        self.cost_basis_base_value = Some(cost_basis_base_value);
        self
    }
}

impl fmt::Display for LotChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:+}", self.lot_id, self.quantity_base_value)?;
        if let Some(basis) = self.cost_basis_base_value {
            write!(f, " basis {basis:+}")?;
        }
        Ok(())
    }
}

/// An entry in a lot's change log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedChange {
    /// Sequence number assigned when the change was applied.
    pub seq: ChangeSeq,
    /// The change as applied.
    pub change: LotChange,
    /// Whether it was applied as a cost-basis adjustment.
    pub is_cost_basis_adjustment: bool,
    /// Quantity before the change.
    pub prior_quantity: BaseValue,
    /// Cost basis before the change.
    pub prior_cost_basis: BaseValue,
}

/// One lot's quantity and cost basis, with the log of applied changes.
///
/// Equality compares the lot's identity, balances, creation date and change
/// log. The internal sequence counter is not compared, so reversing a change
/// yields a state equal to the one before it was applied.
#[derive(Debug, Clone)]
pub struct LotState {
    lot_id: LotId,
    quantity: BaseValue,
    cost_basis: BaseValue,
    date_created: NaiveDate,
    history: Vec<AppliedChange>,
    next_seq: u64,
}

impl LotState {
    /// Create an empty lot, as established by the ledger.
    #[must_use]
    pub const fn new(lot_id: LotId, date_created: NaiveDate) -> Self {
        Self {
            lot_id,
            quantity: 0,
            cost_basis: 0,
            date_created,
            history: Vec::new(),
            next_seq: 0,
        }
    }

    /// Create a lot from a ledger snapshot with an already-resolved balance.
    ///
    /// The snapshot carries no change log of its own.
    #[must_use]
    pub const fn with_balance(
        lot_id: LotId,
        date_created: NaiveDate,
        quantity: BaseValue,
        cost_basis: BaseValue,
    ) -> Self {
        Self {
            lot_id,
            quantity,
            cost_basis,
            date_created,
            history: Vec::new(),
            next_seq: 0,
        }
    }

    /// The lot's identifier.
    #[must_use]
    pub const fn lot_id(&self) -> LotId {
        self.lot_id
    }

    /// Current quantity.
    #[must_use]
    pub const fn quantity(&self) -> BaseValue {
        self.quantity
    }

    /// Current cost basis.
    #[must_use]
    pub const fn cost_basis(&self) -> BaseValue {
        self.cost_basis
    }

    /// The date the lot was established.
    #[must_use]
    pub const fn date_created(&self) -> NaiveDate {
        self.date_created
    }

    /// Number of changes that can still be reversed.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.history.len()
    }

    /// Apply a change in place and return its sequence number.
    pub fn apply(
        &mut self,
        change: &LotChange,
        is_cost_basis_adjustment: bool,
    ) -> Result<ChangeSeq, LotError> {
        if change.lot_id != self.lot_id {
            return Err(LotError::LotMismatch {
                lot_id: self.lot_id,
                change_lot: change.lot_id,
            });
        }

        let lot_id = self.lot_id;
        let overflow = || LotError::Overflow { lot_id };

        let new_quantity = self
            .quantity
            .checked_add(change.quantity_base_value)
            .ok_or_else(overflow)?;

        let new_cost_basis = if is_cost_basis_adjustment {
            self.cost_basis
                .checked_add(change.cost_basis_base_value.unwrap_or(0))
                .ok_or_else(overflow)?
        } else if self.quantity == 0 {
            change.cost_basis_base_value.unwrap_or(0)
        } else {
            scale_ratio(new_quantity, self.cost_basis, self.quantity).ok_or_else(overflow)?
        };

        let seq = ChangeSeq(self.next_seq);
        self.next_seq += 1;
        self.history.push(AppliedChange {
            seq,
            change: *change,
            is_cost_basis_adjustment,
            prior_quantity: self.quantity,
            prior_cost_basis: self.cost_basis,
        });

        tracing::trace!(
            lot = %self.lot_id,
            %seq,
            quantity = new_quantity,
            cost_basis = new_cost_basis,
            "applied lot change"
        );

        self.quantity = new_quantity;
        self.cost_basis = new_cost_basis;
        Ok(seq)
    }

    /// Reverse the most recently applied change, which must be `seq`.
    pub fn reverse_last(&mut self, seq: ChangeSeq) -> Result<AppliedChange, LotError> {
        self.pop_if(|top| top.seq == seq)
    }

    /// Reverse the most recently applied change, which must equal `change`
    /// applied with the same adjustment flag.
    pub fn reverse(
        &mut self,
        change: &LotChange,
        is_cost_basis_adjustment: bool,
    ) -> Result<AppliedChange, LotError> {
        self.pop_if(|top| {
            top.change == *change && top.is_cost_basis_adjustment == is_cost_basis_adjustment
        })
    }

    fn pop_if(
        &mut self,
        is_expected: impl FnOnce(&AppliedChange) -> bool,
    ) -> Result<AppliedChange, LotError> {
        let entry = self.history.pop().ok_or(LotError::EmptyUndoStack {
            lot_id: self.lot_id,
        })?;
        if !is_expected(&entry) {
            let expected = entry.seq;
            self.history.push(entry);
            return Err(LotError::OutOfOrderReversal {
                lot_id: self.lot_id,
                expected,
            });
        }

        self.quantity = entry.prior_quantity;
        self.cost_basis = entry.prior_cost_basis;
        tracing::trace!(lot = %self.lot_id, seq = %entry.seq, "reversed lot change");
        Ok(entry)
    }
}

impl PartialEq for LotState {
    fn eq(&self, other: &Self) -> bool {
        self.lot_id == other.lot_id
            && self.quantity == other.quantity
            && self.cost_basis == other.cost_basis
            && self.date_created == other.date_created
            && self.history == other.history
    }
}

impl Eq for LotState {}

impl fmt::Display for LotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} @ {} (created {})",
            self.lot_id, self.quantity, self.cost_basis, self.date_created
        )
    }
}

/// Apply a change to a copy of `lot_state`.
pub fn apply_change(
    lot_state: &LotState,
    change: &LotChange,
    is_cost_basis_adjustment: bool,
) -> Result<LotState, LotError> {
    let mut next = lot_state.clone();
    next.apply(change, is_cost_basis_adjustment)?;
    Ok(next)
}

/// Reverse the most recent change on a copy of `lot_state`.
///
/// Fails with [`LotError::EmptyUndoStack`] if nothing has been applied and
/// with [`LotError::OutOfOrderReversal`] if `change` is not the most recently
/// applied change.
pub fn reverse_change(
    lot_state: &LotState,
    change: &LotChange,
    is_cost_basis_adjustment: bool,
) -> Result<LotState, LotError> {
    let mut previous = lot_state.clone();
    previous.reverse(change, is_cost_basis_adjustment)?;
    Ok(previous)
}
