//! Command-line reports for lotledger.
//!
//! This crate provides:
//! - [`SnapshotLedger`] - An in-memory ledger read from a JSON snapshot
//! - [`Options`] - Ledger-wide options with validation warnings
//! - [`report`] - The `lotledger` report commands
//!
//! # Example
//!
//! ```
//! use lotledger::SnapshotLedger;
//! use lotledger_core::AccountId;
//!
//! let ledger = SnapshotLedger::from_json(r#"{
//!     "currencies": [{ "code": "USD", "decimal_places": 2 }],
//!     "accounts": [{ "id": 1, "name": "Checking" }]
//! }"#).unwrap();
//! assert_eq!(ledger.find_account("checking"), Some(AccountId(1)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod options;
pub mod report;
pub mod snapshot;

pub use options::{GainPartsKind, OptionWarning, Options};
pub use report::{run, Args, Format, Report};
pub use snapshot::{SnapshotError, SnapshotLedger};
