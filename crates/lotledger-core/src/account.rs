//! Ledger-owned identifiers and lot classification.
//!
//! The engine never creates accounts, transactions or lots. It only refers to
//! them by the identifiers the ledger hands out, and asks the ledger how a lot
//! was acquired through [`LotOriginSource`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a ledger account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account#{}", self.0)
    }
}

/// Identifier of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn#{}", self.0)
    }
}

/// Account record as resolved by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDataItem {
    /// The account's identifier.
    pub id: AccountId,
    /// Display name, e.g. `Brokerage:VTI`.
    pub name: String,
    /// Priced item (security) held by the account, if any.
    pub priced_item: Option<String>,
}

impl AccountDataItem {
    /// Create an account record without a priced item.
    #[must_use]
    pub fn new(id: AccountId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            priced_item: None,
        }
    }

    /// Attach the priced item held by this account.
    #[must_use]
    pub fn with_priced_item(mut self, priced_item: impl Into<String>) -> Self {
        self.priced_item = Some(priced_item.into());
        self
    }
}

/// How the shares of a lot were acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotOrigin {
    /// Bought with cash.
    CashPurchase,
    /// Bought with a dividend or distribution that was reinvested.
    ReinvestedDividend,
    /// Received without cash, e.g. an in-kind transfer or a spin-off.
    Transfer,
    /// Anything the ledger cannot classify.
    Other,
}

impl LotOrigin {
    /// Whether the lot was funded with new cash.
    #[must_use]
    pub const fn is_cash_in(self) -> bool {
        matches!(self, Self::CashPurchase)
    }
}

impl FromStr for LotOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cash_purchase" | "buy" => Ok(Self::CashPurchase),
            "reinvested_dividend" | "reinvest" => Ok(Self::ReinvestedDividend),
            "transfer" => Ok(Self::Transfer),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown lot origin: {s}")),
        }
    }
}

impl fmt::Display for LotOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CashPurchase => write!(f, "cash_purchase"),
            Self::ReinvestedDividend => write!(f, "reinvested_dividend"),
            Self::Transfer => write!(f, "transfer"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Lookup of lot origins, implemented by the ledger.
pub trait LotOriginSource {
    /// The origin of a lot, or `None` if the ledger does not know the lot.
    fn lot_origin(&self, lot_id: crate::LotId) -> Option<LotOrigin>;
}

impl<F> LotOriginSource for F
where
    F: Fn(crate::LotId) -> Option<LotOrigin>,
{
    fn lot_origin(&self, lot_id: crate::LotId) -> Option<LotOrigin> {
        self(lot_id)
    }
}
