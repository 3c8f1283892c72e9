//! Transaction descriptors handed back to the ledger.
//!
//! These are opaque payloads: the ledger decides how to post them. The booking
//! engine never writes persistent state itself.

use chrono::NaiveDate;
use lotledger_core::{checked_sum, AccountId, BaseValue, LotChange};
use serde::Serialize;
use std::fmt;

/// What a split (ledger entry) of a descriptor represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitRole {
    /// The return-of-capital entry against the security account.
    ReturnOfCapital,
    /// A long-term capital gains credit.
    LongTermCapitalGains,
    /// A short-term capital gains credit.
    ShortTermCapitalGains,
}

impl fmt::Display for SplitRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReturnOfCapital => write!(f, "return of capital"),
            Self::LongTermCapitalGains => write!(f, "long-term capital gains"),
            Self::ShortTermCapitalGains => write!(f, "short-term capital gains"),
        }
    }
}

/// A batch of lot changes that the ledger applies together.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LotChangeSet {
    /// The changes, at most one per lot.
    pub changes: Vec<LotChange>,
    /// Whether every change is applied as a cost-basis adjustment.
    pub is_cost_basis_adjustment: bool,
}

impl LotChangeSet {
    /// Create a change set.
    #[must_use]
    pub const fn new(changes: Vec<LotChange>, is_cost_basis_adjustment: bool) -> Self {
        Self {
            changes,
            is_cost_basis_adjustment,
        }
    }

    /// Sum of the quantity deltas, or `None` on overflow.
    #[must_use]
    pub fn total_quantity(&self) -> Option<BaseValue> {
        checked_sum(self.changes.iter().map(|c| c.quantity_base_value))
    }

    /// Sum of the cost-basis deltas, treating absent deltas as zero. `None` on
    /// overflow.
    #[must_use]
    pub fn total_cost_basis(&self) -> Option<BaseValue> {
        checked_sum(self.changes.iter().filter_map(|c| c.cost_basis_base_value))
    }

    /// Returns true if the set holds no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// One ledger entry of a [`TransactionDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySplit {
    /// The account the entry posts to.
    pub account: AccountId,
    /// What the entry represents.
    pub role: SplitRole,
    /// Monetary amount of the entry in the account currency's base values.
    pub amount_base_value: BaseValue,
    /// Lot changes carried by the entry, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_changes: Option<LotChangeSet>,
}

/// A transaction the ledger should record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionDescriptor {
    /// Transaction date.
    pub date: NaiveDate,
    /// Ledger entries, in posting order.
    pub splits: Vec<EntrySplit>,
}

impl TransactionDescriptor {
    /// The first split with the given role.
    #[must_use]
    pub fn split(&self, role: SplitRole) -> Option<&EntrySplit> {
        self.splits.iter().find(|s| s.role == role)
    }

    /// Sum of all split amounts, or `None` on overflow.
    #[must_use]
    pub fn total_amount(&self) -> Option<BaseValue> {
        checked_sum(self.splits.iter().map(|s| s.amount_base_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lotledger_core::LotId;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_change_set_totals() {
        let set = LotChangeSet::new(
            vec![
                LotChange::cost_basis_only(LotId(1), -40),
                LotChange::new(LotId(2), 7),
                LotChange::cost_basis_only(LotId(3), -2),
            ],
            true,
        );
        assert_eq!(set.total_quantity(), Some(7));
        assert_eq!(set.total_cost_basis(), Some(-42));
        assert!(!set.is_empty());
    }

    #[test]
    fn test_change_set_totals_overflow() {
        let set = LotChangeSet::new(
            vec![
                LotChange::new(LotId(1), i64::MAX).with_cost_basis(i64::MIN),
                LotChange::new(LotId(2), 1).with_cost_basis(-1),
            ],
            false,
        );
        assert_eq!(set.total_quantity(), None);
        assert_eq!(set.total_cost_basis(), None);
    }

    #[test]
    fn test_role_display() {
        assert_eq!(SplitRole::ReturnOfCapital.to_string(), "return of capital");
        assert_eq!(
            SplitRole::LongTermCapitalGains.to_string(),
            "long-term capital gains"
        );
        assert_eq!(
            SplitRole::ShortTermCapitalGains.to_string(),
            "short-term capital gains"
        );
    }

    #[test]
    fn test_descriptor_lookup() {
        let descriptor = TransactionDescriptor {
            date: date(2020, 9, 1),
            splits: vec![
                EntrySplit {
                    account: AccountId(1),
                    role: SplitRole::ReturnOfCapital,
                    amount_base_value: 90,
                    lot_changes: None,
                },
                EntrySplit {
                    account: AccountId(9),
                    role: SplitRole::LongTermCapitalGains,
                    amount_base_value: 10,
                    lot_changes: None,
                },
            ],
        };
        assert_eq!(descriptor.total_amount(), Some(100));
        assert_eq!(
            descriptor
                .split(SplitRole::LongTermCapitalGains)
                .map(|s| s.account),
            Some(AccountId(9))
        );
        assert!(descriptor
            .split(SplitRole::ShortTermCapitalGains)
            .is_none());
    }
}
