//! Gain calculation over lot snapshots.
//!
//! The functions here are pure: they take an [`AccountStateInfo`] resolved
//! once per computation plus a slice of lot states, and never fail for missing
//! prices or definitions. Missing inputs surface as `None`.
//!
//! # Example
//!
//! ```
//! use lotledger_core::{AccountDataItem, AccountId, LotId, LotState, NaiveDate, QuantityDefinition};
//! use lotledger_gains::{
//!     calc_gain, AccountStateInfo, CurrencyDefinition, GainMetric, GainParts, PricedItem,
//! };
//! use rust_decimal_macros::dec;
//!
//! let info = AccountStateInfo {
//!     account: AccountDataItem::new(AccountId(1), "Brokerage").with_priced_item("ACME"),
//!     priced_item: PricedItem::new("ACME", QuantityDefinition::new(4), "USD"),
//!     currency: CurrencyDefinition::new("USD", QuantityDefinition::new(2)),
//!     date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
//!     price: Some(dec!(12.50)),
//! };
//! let created = NaiveDate::from_ymd_opt(2023, 1, 10).unwrap();
//! let lots = [LotState::with_balance(LotId(1), created, 1_000_000, 100_000)];
//!
//! // 100 shares bought for $1000.00 and now worth $1250.00
//! let result = calc_gain(&info, &lots, &GainParts::Simple, Some(GainMetric::Percent), Some(2));
//! assert_eq!(result.output_base_value, Some(125_000));
//! assert_eq!(result.gain, Some(dec!(25.00)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod annual;
mod cash_in;
mod gain;
mod state_info;

pub use annual::{
    calc_cash_in_percent_annual_gain, calc_percent_annual_gain, fractional_years,
    AnnualGainResult, LotAnnualGain,
};
pub use cash_in::{distribute_non_cash_in_lots, is_cash_in};
pub use gain::{calc_gain, GainMetric, GainParts, GainResult};
pub use state_info::{
    create_account_state_info, market_value, AccountStateInfo, CurrencyDefinition, PricedItem,
    PricingContext,
};
