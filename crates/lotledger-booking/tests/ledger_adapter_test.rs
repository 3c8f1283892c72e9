//! Async adapter tests against an in-memory ledger.

use async_trait::async_trait;
use chrono::NaiveDate;
use lotledger_booking::{
    build_return_of_capital_for, build_sale_change_set, build_split_change_set,
    fetch_lot_states, lot_states_as_of, CalendarHoldingPeriod, CapitalGainsPolicy, GainTerm,
    LedgerAccessor, LotSelection, SnapshotRef, SplitRole,
};
use lotledger_core::{
    AccountDataItem, AccountId, LotChange, LotError, LotId, LotOrigin, LotOriginSource, LotState,
    TransactionId,
};
use std::io;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

const BROKERAGE: AccountId = AccountId(1);
const EMPTY: AccountId = AccountId(2);
const OFFLINE: AccountId = AccountId(3);
const LONG_TERM_GAINS: AccountId = AccountId(10);

/// One posted transaction and the lot states it left behind.
struct Posting {
    id: TransactionId,
    account: AccountId,
    date: NaiveDate,
    after: Vec<LotState>,
}

#[derive(Default)]
struct MemoryLedger {
    accounts: Vec<AccountDataItem>,
    postings: Vec<Posting>,
}

impl MemoryLedger {
    /// Two buys into the brokerage account, one in 2019 and one in 2020.
    fn brokerage() -> Self {
        let first = LotState::with_balance(LotId(1), date(2019, 3, 1), 100, 1_000);
        let second = LotState::with_balance(LotId(2), date(2020, 3, 1), 300, 6_000);
        Self {
            accounts: vec![
                AccountDataItem::new(BROKERAGE, "Brokerage").with_priced_item("ACME"),
                AccountDataItem::new(EMPTY, "Empty"),
                AccountDataItem::new(OFFLINE, "Offline"),
            ],
            postings: vec![
                Posting {
                    id: TransactionId(1),
                    account: BROKERAGE,
                    date: date(2019, 3, 1),
                    after: vec![first.clone()],
                },
                Posting {
                    id: TransactionId(2),
                    account: BROKERAGE,
                    date: date(2020, 3, 1),
                    after: vec![first, second],
                },
            ],
        }
    }

    fn postings(&self, account: AccountId) -> impl Iterator<Item = &Posting> {
        self.postings.iter().filter(move |p| p.account == account)
    }

    fn offline(account: AccountId) -> Result<(), io::Error> {
        if account == OFFLINE {
            Err(io::Error::new(io::ErrorKind::NotConnected, "ledger offline"))
        } else {
            Ok(())
        }
    }
}

impl CapitalGainsPolicy for MemoryLedger {
    fn is_long_term_capital_gains(
        &self,
        _account: AccountId,
        created: NaiveDate,
        reference: NaiveDate,
    ) -> bool {
        CalendarHoldingPeriod::default().is_long_term(created, reference)
    }

    fn default_capital_gains_account(
        &self,
        _account: AccountId,
        term: GainTerm,
    ) -> Option<AccountId> {
        (term == GainTerm::LongTerm).then_some(LONG_TERM_GAINS)
    }
}

impl LotOriginSource for MemoryLedger {
    fn lot_origin(&self, _lot_id: LotId) -> Option<LotOrigin> {
        Some(LotOrigin::CashPurchase)
    }
}

#[async_trait]
impl LedgerAccessor for MemoryLedger {
    type Error = io::Error;

    async fn account_data_item(
        &self,
        account: AccountId,
    ) -> Result<Option<AccountDataItem>, Self::Error> {
        Ok(self.accounts.iter().find(|a| a.id == account).cloned())
    }

    async fn lot_states_before_transaction(
        &self,
        account: AccountId,
        transaction: TransactionId,
    ) -> Result<Vec<LotState>, Self::Error> {
        Self::offline(account)?;
        let before = self
            .postings(account)
            .take_while(|p| p.id != transaction)
            .last()
            .map(|p| p.after.clone());
        Ok(before.unwrap_or_default())
    }

    async fn lot_states_after_transaction(
        &self,
        account: AccountId,
        transaction: TransactionId,
    ) -> Result<Vec<LotState>, Self::Error> {
        Self::offline(account)?;
        Ok(self
            .postings(account)
            .find(|p| p.id == transaction)
            .map(|p| p.after.clone())
            .unwrap_or_default())
    }

    async fn transaction_date_range(
        &self,
        account: AccountId,
    ) -> Result<Option<(NaiveDate, NaiveDate)>, Self::Error> {
        Self::offline(account)?;
        let first = self.postings(account).map(|p| p.date).min();
        let last = self.postings(account).map(|p| p.date).max();
        Ok(first.zip(last))
    }

    async fn transactions_in_date_range(
        &self,
        account: AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TransactionId>, Self::Error> {
        Self::offline(account)?;
        Ok(self
            .postings(account)
            .filter(|p| p.date >= from && p.date <= to)
            .map(|p| p.id)
            .collect())
    }
}

fn lot_ids(lots: &[LotState]) -> Vec<LotId> {
    lots.iter().map(LotState::lot_id).collect()
}

// ============================================================================
// Snapshots
// ============================================================================

#[tokio::test]
async fn test_snapshot_references() {
    let ledger = MemoryLedger::brokerage();

    let latest = fetch_lot_states(&ledger, BROKERAGE, SnapshotRef::Latest)
        .await
        .unwrap();
    assert_eq!(lot_ids(&latest), vec![LotId(1), LotId(2)]);

    let before = fetch_lot_states(
        &ledger,
        BROKERAGE,
        SnapshotRef::BeforeTransaction(TransactionId(2)),
    )
    .await
    .unwrap();
    assert_eq!(lot_ids(&before), vec![LotId(1)]);

    let after = fetch_lot_states(
        &ledger,
        BROKERAGE,
        SnapshotRef::AfterTransaction(TransactionId(1)),
    )
    .await
    .unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_lot_states_as_of() {
    let ledger = MemoryLedger::brokerage();

    let early = lot_states_as_of(&ledger, BROKERAGE, date(2018, 1, 1))
        .await
        .unwrap();
    assert!(early.is_empty());

    let middle = lot_states_as_of(&ledger, BROKERAGE, date(2019, 12, 31))
        .await
        .unwrap();
    assert_eq!(lot_ids(&middle), vec![LotId(1)]);

    let on_date = lot_states_as_of(&ledger, BROKERAGE, date(2020, 3, 1))
        .await
        .unwrap();
    assert_eq!(lot_ids(&on_date), vec![LotId(1), LotId(2)]);

    let none = lot_states_as_of(&ledger, EMPTY, date(2020, 3, 1))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_unknown_account() {
    let ledger = MemoryLedger::brokerage();
    let result = fetch_lot_states(&ledger, AccountId(99), SnapshotRef::Latest).await;
    assert_eq!(
        result,
        Err(LotError::InvalidAccount {
            account: AccountId(99)
        })
    );
}

#[tokio::test]
async fn test_ledger_failure_is_wrapped() {
    let ledger = MemoryLedger::brokerage();
    let err = fetch_lot_states(&ledger, OFFLINE, SnapshotRef::Latest)
        .await
        .unwrap_err();
    assert_eq!(err, LotError::Ledger("ledger offline".to_string()));
    assert_eq!(err.kind(), lotledger_core::ErrorKind::Ledger);
}

// ============================================================================
// Change sets
// ============================================================================

#[tokio::test]
async fn test_split_change_set() {
    let ledger = MemoryLedger::brokerage();
    let set = build_split_change_set(&ledger, BROKERAGE, SnapshotRef::Latest, 400)
        .await
        .unwrap();
    assert!(set.is_cost_basis_adjustment);
    assert_eq!(
        set.changes,
        vec![LotChange::new(LotId(1), 100), LotChange::new(LotId(2), 300)]
    );
}

#[tokio::test]
async fn test_split_without_lots() {
    let ledger = MemoryLedger::brokerage();
    let result = build_split_change_set(&ledger, EMPTY, SnapshotRef::Latest, 10).await;
    assert_eq!(result, Err(LotError::NoLotStates { account: EMPTY }));
}

#[tokio::test]
async fn test_merge_too_large() {
    let ledger = MemoryLedger::brokerage();
    let result = build_split_change_set(&ledger, BROKERAGE, SnapshotRef::Latest, -400).await;
    assert!(matches!(result, Err(LotError::MergeTooLarge { .. })));
}

#[tokio::test]
async fn test_sale_change_set() {
    let ledger = MemoryLedger::brokerage();
    let set = build_sale_change_set(
        &ledger,
        BROKERAGE,
        SnapshotRef::Latest,
        150,
        &LotSelection::Fifo,
    )
    .await
    .unwrap();
    assert!(!set.is_cost_basis_adjustment);
    assert_eq!(
        set.changes,
        vec![LotChange::new(LotId(1), -100), LotChange::new(LotId(2), -50)]
    );

    let result = build_sale_change_set(
        &ledger,
        BROKERAGE,
        SnapshotRef::Latest,
        500,
        &LotSelection::Lifo,
    )
    .await;
    assert_eq!(
        result,
        Err(LotError::InsufficientLots {
            requested: 500,
            available: 400,
        })
    );
}

#[tokio::test]
async fn test_return_of_capital_uses_snapshot_at_date() {
    let ledger = MemoryLedger::brokerage();

    // Only the 2019 lot exists at the end of 2019
    let descriptor = build_return_of_capital_for(&ledger, BROKERAGE, 800, date(2019, 12, 31))
        .await
        .unwrap();
    let entry = descriptor.split(SplitRole::ReturnOfCapital).unwrap();
    assert_eq!(entry.amount_base_value, 800);
    assert_eq!(
        entry.lot_changes.as_ref().unwrap().changes,
        vec![LotChange::cost_basis_only(LotId(1), -800)]
    );

    // Both lots by mid 2021; the 2019 lot goes 1000 over its basis
    let descriptor = build_return_of_capital_for(&ledger, BROKERAGE, 8_000, date(2021, 6, 1))
        .await
        .unwrap();
    let entry = descriptor.split(SplitRole::ReturnOfCapital).unwrap();
    assert_eq!(entry.amount_base_value, 7_000);
    assert_eq!(
        entry.lot_changes.as_ref().unwrap().changes,
        vec![
            LotChange::cost_basis_only(LotId(1), -1_000),
            LotChange::cost_basis_only(LotId(2), -6_000),
        ]
    );
    let gains = descriptor.split(SplitRole::LongTermCapitalGains).unwrap();
    assert_eq!((gains.account, gains.amount_base_value), (LONG_TERM_GAINS, 1_000));
}

#[tokio::test]
async fn test_short_term_gain_without_account() {
    let ledger = MemoryLedger::brokerage();
    let result = build_return_of_capital_for(&ledger, BROKERAGE, 1_500, date(2019, 12, 31)).await;
    assert_eq!(result, Err(LotError::InvalidAccount { account: BROKERAGE }));
}

#[tokio::test]
async fn test_return_of_capital_errors() {
    let ledger = MemoryLedger::brokerage();
    assert_eq!(
        build_return_of_capital_for(&ledger, BROKERAGE, 0, date(2021, 1, 1)).await,
        Err(LotError::InvalidRocValue { amount: 0 })
    );
    assert_eq!(
        build_return_of_capital_for(&ledger, EMPTY, 100, date(2021, 1, 1)).await,
        Err(LotError::NoLots)
    );
}
