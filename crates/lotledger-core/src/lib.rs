//! Core types for lotledger
//!
//! This crate provides the fundamental types shared by the lot accounting engine:
//!
//! - [`QuantityDefinition`] - Scale of an integer fixed-point base value
//! - [`allocate_pro_rata`] - Exact-sum allocation of an integer across weights
//! - [`LotState`] - One lot's quantity and cost basis, with its change log
//! - [`LotChange`] - A quantity/cost-basis delta against one lot
//! - [`LotOrigin`] - How the shares of a lot were acquired
//! - [`LotError`] - Every failure the engine can report
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use lotledger_core::{apply_change, reverse_change, LotChange, LotId, LotState};
//!
//! let created = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
//! let lot = LotState::new(LotId(1), created);
//!
//! // Fund the lot: 10.0000 shares for 1500.00
//! let buy = LotChange::new(LotId(1), 100_000).with_cost_basis(150_000);
//! let funded = apply_change(&lot, &buy, false).unwrap();
//! assert_eq!(funded.quantity(), 100_000);
//! assert_eq!(funded.cost_basis(), 150_000);
//!
//! // Sell half: the cost basis is rescaled with the quantity
//! let sell = LotChange::new(LotId(1), -50_000);
//! let sold = apply_change(&funded, &sell, false).unwrap();
//! assert_eq!(sold.cost_basis(), 75_000);
//!
//! // Undo restores the previous state exactly
//! assert_eq!(reverse_change(&sold, &sell, false).unwrap(), funded);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
pub mod error;
pub mod lot;
pub mod quantity;

pub use account::{AccountDataItem, AccountId, LotOrigin, LotOriginSource, TransactionId};
pub use error::{ErrorKind, LotError};
pub use lot::{apply_change, reverse_change, AppliedChange, ChangeSeq, LotChange, LotId, LotState};
pub use quantity::{
    allocate_pro_rata, checked_sum, round_ratio, scale_ratio, BaseValue, QuantityDefinition,
};

// Re-export commonly used external types
pub use chrono::NaiveDate;
pub use rust_decimal::Decimal;
