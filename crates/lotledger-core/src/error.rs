//! Errors reported by the lot accounting engine.

use std::fmt;
use thiserror::Error;

use crate::{AccountId, BaseValue, ChangeSeq, LotId};

/// Broad category of a [`LotError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller passed an invalid argument.
    Validation,
    /// The lot states needed for the operation are missing.
    State,
    /// The lots cannot absorb the requested operation.
    Capacity,
    /// The change log or fixed-point arithmetic would be corrupted.
    Integrity,
    /// The ledger collaborator failed.
    Ledger,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::State => write!(f, "state"),
            Self::Capacity => write!(f, "capacity"),
            Self::Integrity => write!(f, "integrity"),
            Self::Ledger => write!(f, "ledger"),
        }
    }
}

/// Errors that can occur while changing, selecting or allocating lots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LotError {
    /// A required quantity was negative.
    #[error("invalid quantity {quantity}: must not be negative")]
    InvalidQuantity {
        /// The rejected quantity.
        quantity: BaseValue,
    },

    /// A return of capital was zero or negative.
    #[error("invalid return of capital amount {amount}: must be greater than zero")]
    InvalidRocValue {
        /// The rejected amount.
        amount: BaseValue,
    },

    /// The account is unknown to the ledger or has no usable configuration.
    #[error("invalid account {account}")]
    InvalidAccount {
        /// The account that could not be resolved.
        account: AccountId,
    },

    /// A specific-lot request named a lot that is not in the snapshot.
    #[error("unknown lot {lot_id}")]
    UnknownLot {
        /// The missing lot.
        lot_id: LotId,
    },

    /// A change was applied to a lot it does not belong to.
    #[error("change for lot {change_lot} cannot be applied to lot {lot_id}")]
    LotMismatch {
        /// The lot being changed.
        lot_id: LotId,
        /// The lot named by the change.
        change_lot: LotId,
    },

    /// The ledger returned no lot states for the account.
    #[error("no lot states available for {account}")]
    NoLotStates {
        /// The account whose snapshot was empty.
        account: AccountId,
    },

    /// There are no lots to allocate across.
    #[error("no lots to allocate across")]
    NoLots,

    /// The lots hold zero shares in total, so there is nothing to weight by.
    #[error("lots have a total quantity of zero")]
    ZeroTotalQuantity,

    /// Cash-in redistribution found no cash-in lot.
    #[error("no cash-in lots to redistribute into")]
    NoCashInLots,

    /// A reversal was requested on a lot with no applied changes.
    #[error("lot {lot_id} has no applied changes to reverse")]
    EmptyUndoStack {
        /// The lot with an empty change log.
        lot_id: LotId,
    },

    /// The lots do not hold enough shares for the request.
    #[error("insufficient lots: requested {requested}, available {available}")]
    InsufficientLots {
        /// Quantity requested.
        requested: BaseValue,
        /// Quantity the lots could supply.
        available: BaseValue,
    },

    /// A merge would leave a lot with zero or fewer shares.
    #[error("merge too large: lot {lot_id} would be left with {resulting_quantity}")]
    MergeTooLarge {
        /// The lot that would be wiped out.
        lot_id: LotId,
        /// Quantity the lot would have after the merge.
        resulting_quantity: BaseValue,
    },

    /// A specific-lot request takes more shares than the lot holds.
    #[error("lot {lot_id} overdrawn: requested {requested}, available {available}")]
    SpecificLotOverdrawn {
        /// The overdrawn lot.
        lot_id: LotId,
        /// Total quantity requested from the lot.
        requested: BaseValue,
        /// Quantity the lot holds.
        available: BaseValue,
    },

    /// A reversal did not name the most recently applied change.
    #[error("out-of-order reversal on lot {lot_id}: most recent change is {expected}")]
    OutOfOrderReversal {
        /// The lot being reversed.
        lot_id: LotId,
        /// Sequence number of the change that must be reversed first.
        expected: ChangeSeq,
    },

    /// A fixed-point computation left the `i64` range.
    #[error("arithmetic overflow on lot {lot_id}")]
    Overflow {
        /// The lot being computed.
        lot_id: LotId,
    },

    /// The ledger collaborator failed.
    #[error("ledger error: {0}")]
    Ledger(String),
}

impl LotError {
    /// The category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidQuantity { .. }
            | Self::InvalidRocValue { .. }
            | Self::InvalidAccount { .. }
            | Self::UnknownLot { .. }
            | Self::LotMismatch { .. } => ErrorKind::Validation,
            Self::NoLotStates { .. }
            | Self::NoLots
            | Self::ZeroTotalQuantity
            | Self::NoCashInLots
            | Self::EmptyUndoStack { .. } => ErrorKind::State,
            Self::InsufficientLots { .. }
            | Self::MergeTooLarge { .. }
            | Self::SpecificLotOverdrawn { .. } => ErrorKind::Capacity,
            Self::OutOfOrderReversal { .. } | Self::Overflow { .. } => ErrorKind::Integrity,
            Self::Ledger(_) => ErrorKind::Ledger,
        }
    }

    /// Wrap a ledger collaborator error.
    pub fn ledger(err: impl fmt::Display) -> Self {
        Self::Ledger(err.to_string())
    }
}
