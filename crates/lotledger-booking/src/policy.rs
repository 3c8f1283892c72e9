//! Capital-gains policy: holding periods and default gains accounts.

use chrono::{Months, NaiveDate};
use lotledger_core::AccountId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Holding-period classification of a capital gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GainTerm {
    /// Held at least the long-term holding period.
    LongTerm,
    /// Held less than the long-term holding period.
    ShortTerm,
}

impl fmt::Display for GainTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LongTerm => write!(f, "long-term"),
            Self::ShortTerm => write!(f, "short-term"),
        }
    }
}

/// Rules the ledger applies when recognizing capital gains.
pub trait CapitalGainsPolicy {
    /// Whether a gain on a lot created on `created` and realized on
    /// `reference` is long-term for `account`.
    fn is_long_term_capital_gains(
        &self,
        account: AccountId,
        created: NaiveDate,
        reference: NaiveDate,
    ) -> bool;

    /// The account that receives gains of `term` realized in `account`.
    fn default_capital_gains_account(&self, account: AccountId, term: GainTerm)
        -> Option<AccountId>;

    /// Classify a gain.
    fn gain_term(&self, account: AccountId, created: NaiveDate, reference: NaiveDate) -> GainTerm {
        if self.is_long_term_capital_gains(account, created, reference) {
            GainTerm::LongTerm
        } else {
            GainTerm::ShortTerm
        }
    }
}

/// Long-term once a fixed number of calendar months have passed.
///
/// Month arithmetic clamps to the end of the month, so a lot created on
/// January 31 becomes long-term on the last day of the target month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarHoldingPeriod {
    /// Holding period in calendar months.
    pub months: u32,
}

impl CalendarHoldingPeriod {
    /// Create a holding period of `months` calendar months.
    #[must_use]
    pub const fn new(months: u32) -> Self {
        Self { months }
    }

    /// The first date on which a lot created on `created` is long-term.
    ///
    /// `None` if the date would fall outside the supported calendar.
    #[must_use]
    pub fn long_term_from(&self, created: NaiveDate) -> Option<NaiveDate> {
        created.checked_add_months(Months::new(self.months))
    }

    /// Whether `reference` is at or past the long-term threshold.
    #[must_use]
    pub fn is_long_term(&self, created: NaiveDate, reference: NaiveDate) -> bool {
        self.long_term_from(created)
            .is_some_and(|threshold| reference >= threshold)
    }
}

impl Default for CalendarHoldingPeriod {
    fn default() -> Self {
        Self { months: 12 }
    }
}
