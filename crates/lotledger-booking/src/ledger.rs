//! The ledger collaborator and the async adapters built on it.
//!
//! The ledger owns the authoritative history. Every adapter here performs a
//! single snapshot fetch and then hands the lot states to the synchronous
//! allocators; no arithmetic happens across an await point.
//!
//! Lot mutation relies on a LIFO change log, so callers must serialize the
//! changes they post against any one account.

use crate::{
    build_return_of_capital, select_lots, split_change_set, CapitalGainsPolicy, LotChangeSet,
    LotSelection, TransactionDescriptor,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use lotledger_core::{
    AccountDataItem, AccountId, BaseValue, LotError, LotOriginSource, LotState, TransactionId,
};

/// Read access to the ledger that owns accounts, transactions and lots.
#[async_trait]
pub trait LedgerAccessor: CapitalGainsPolicy + LotOriginSource + Send + Sync {
    /// Error type for ledger access.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Look up an account. `None` if the account does not exist.
    async fn account_data_item(
        &self,
        account: AccountId,
    ) -> Result<Option<AccountDataItem>, Self::Error>;

    /// The account's lot states just before `transaction` was applied.
    async fn lot_states_before_transaction(
        &self,
        account: AccountId,
        transaction: TransactionId,
    ) -> Result<Vec<LotState>, Self::Error>;

    /// The account's lot states just after `transaction` was applied.
    async fn lot_states_after_transaction(
        &self,
        account: AccountId,
        transaction: TransactionId,
    ) -> Result<Vec<LotState>, Self::Error>;

    /// Dates of the account's first and last transactions, or `None` if the
    /// account has none.
    async fn transaction_date_range(
        &self,
        account: AccountId,
    ) -> Result<Option<(NaiveDate, NaiveDate)>, Self::Error>;

    /// The account's transactions dated `from` through `to` inclusive, in
    /// ledger order.
    async fn transactions_in_date_range(
        &self,
        account: AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TransactionId>, Self::Error>;
}

/// The point in the ledger's history to read lot states at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotRef {
    /// After the account's last transaction.
    Latest,
    /// Just before a transaction.
    BeforeTransaction(TransactionId),
    /// Just after a transaction.
    AfterTransaction(TransactionId),
    /// After the last transaction dated on or before a date.
    AsOf(NaiveDate),
}

/// Fetch the lot states of `account` at `snapshot`.
///
/// Fails with [`LotError::InvalidAccount`] if the ledger does not know the
/// account.
pub async fn fetch_lot_states<A>(
    accessor: &A,
    account: AccountId,
    snapshot: SnapshotRef,
) -> Result<Vec<LotState>, LotError>
where
    A: LedgerAccessor + ?Sized,
{
    accessor
        .account_data_item(account)
        .await
        .map_err(LotError::ledger)?
        .ok_or(LotError::InvalidAccount { account })?;

    let lot_states = match snapshot {
        SnapshotRef::Latest => match accessor
            .transaction_date_range(account)
            .await
            .map_err(LotError::ledger)?
        {
            Some((_, last)) => lot_states_as_of(accessor, account, last).await?,
            None => Vec::new(),
        },
        SnapshotRef::BeforeTransaction(transaction) => accessor
            .lot_states_before_transaction(account, transaction)
            .await
            .map_err(LotError::ledger)?,
        SnapshotRef::AfterTransaction(transaction) => accessor
            .lot_states_after_transaction(account, transaction)
            .await
            .map_err(LotError::ledger)?,
        SnapshotRef::AsOf(date) => lot_states_as_of(accessor, account, date).await?,
    };

    tracing::debug!(%account, ?snapshot, lots = lot_states.len(), "fetched lot states");
    Ok(lot_states)
}

/// The lot states of `account` after its last transaction on or before `date`.
///
/// An account with no transactions up to `date` has no lots.
pub async fn lot_states_as_of<A>(
    accessor: &A,
    account: AccountId,
    date: NaiveDate,
) -> Result<Vec<LotState>, LotError>
where
    A: LedgerAccessor + ?Sized,
{
    let Some((first, _)) = accessor
        .transaction_date_range(account)
        .await
        .map_err(LotError::ledger)?
    else {
        return Ok(Vec::new());
    };
    if date < first {
        return Ok(Vec::new());
    }

    let transactions = accessor
        .transactions_in_date_range(account, first, date)
        .await
        .map_err(LotError::ledger)?;
    match transactions.last() {
        Some(&transaction) => accessor
            .lot_states_after_transaction(account, transaction)
            .await
            .map_err(LotError::ledger),
        None => Ok(Vec::new()),
    }
}

/// Build the change set that splits or merges the shares of `account` by
/// `delta_shares`.
///
/// Fails with [`LotError::NoLotStates`] if the snapshot is empty.
pub async fn build_split_change_set<A>(
    accessor: &A,
    account: AccountId,
    snapshot: SnapshotRef,
    delta_shares: BaseValue,
) -> Result<LotChangeSet, LotError>
where
    A: LedgerAccessor + ?Sized,
{
    let lot_states = fetch_lot_states(accessor, account, snapshot).await?;
    if lot_states.is_empty() {
        return Err(LotError::NoLotStates { account });
    }
    split_change_set(delta_shares, &lot_states)
}

/// Build the change set that sells `quantity` shares of `account`.
pub async fn build_sale_change_set<A>(
    accessor: &A,
    account: AccountId,
    snapshot: SnapshotRef,
    quantity: BaseValue,
    selection: &LotSelection,
) -> Result<LotChangeSet, LotError>
where
    A: LedgerAccessor + ?Sized,
{
    let lot_states = fetch_lot_states(accessor, account, snapshot).await?;
    let changes = select_lots(&lot_states, quantity, selection)?;
    Ok(LotChangeSet::new(changes, false))
}

/// Build the transaction for a return of capital of `amount` into `account`
/// on `reference_date`.
pub async fn build_return_of_capital_for<A>(
    accessor: &A,
    account: AccountId,
    amount: BaseValue,
    reference_date: NaiveDate,
) -> Result<TransactionDescriptor, LotError>
where
    A: LedgerAccessor + ?Sized,
{
    if amount <= 0 {
        return Err(LotError::InvalidRocValue { amount });
    }
    let lot_states = fetch_lot_states(accessor, account, SnapshotRef::AsOf(reference_date)).await?;
    build_return_of_capital(account, &lot_states, amount, reference_date, accessor)
}
