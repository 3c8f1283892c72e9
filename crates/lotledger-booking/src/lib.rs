//! Lot booking engine.
//!
//! This crate provides:
//! - Lot selection for sales (FIFO, LIFO, specific lots)
//! - Split/merge distribution of a share-count delta across lots
//! - Return-of-capital allocation with capital-gains recognition
//! - Thin async adapters that fetch a lot snapshot from the ledger and hand it
//!   to the synchronous allocators
//!
//! # Selection
//!
//! ```
//! use lotledger_booking::select_lots_fifo;
//! use lotledger_core::{LotChange, LotId, LotState, NaiveDate};
//!
//! let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
//! let lots = [
//!     LotState::with_balance(LotId(1), date(2005, 2, 18), 6_850_000, 425_184),
//!     LotState::with_balance(LotId(3), date(2005, 3, 11), 10_500_000, 605_171),
//! ];
//!
//! // Sell 15.0000 shares: the oldest lot covers the whole request
//! let changes = select_lots_fifo(&lots, 150_000).unwrap();
//! assert_eq!(changes, vec![LotChange::new(LotId(1), -150_000)]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod descriptor;
mod ledger;
mod policy;
mod roc;
mod select;
mod split;

pub use descriptor::{EntrySplit, LotChangeSet, SplitRole, TransactionDescriptor};
pub use ledger::{
    build_return_of_capital_for, build_sale_change_set, build_split_change_set, fetch_lot_states,
    lot_states_as_of, LedgerAccessor, SnapshotRef,
};
pub use policy::{CalendarHoldingPeriod, CapitalGainsPolicy, GainTerm};
pub use roc::{
    allocate_return_of_capital, build_return_of_capital, ReturnOfCapital, RocAllocation,
};
pub use select::{
    select_lots, select_lots_fifo, select_lots_lifo, select_specific_lots, LotSelection,
    SpecificLotRequest,
};
pub use split::{distribute_shares, split_change_set, split_deltas};
