//! A ledger read from a JSON snapshot file.
//!
//! The snapshot lists currencies, priced items with their price history, and
//! accounts with their current lots. Each lot is treated as the purchase
//! transaction that created it: the transaction id is the lot id, and lot
//! states after a transaction are the account's lots created up to and
//! including it, ordered by creation date and then lot id.
//!
//! ```json
//! {
//!   "options": { "booking_method": "FIFO", "account_long_term_gains": 200 },
//!   "currencies": [{ "code": "USD", "decimal_places": 2 }],
//!   "priced_items": [{
//!     "id": "ACME", "currency": "USD", "decimal_places": 4,
//!     "prices": [{ "date": "2024-06-03", "price": "12.50" }]
//!   }],
//!   "accounts": [{
//!     "id": 1, "name": "Brokerage", "priced_item": "ACME",
//!     "lots": [{
//!       "id": 1, "date": "2005-02-18", "quantity": "685.0000",
//!       "cost_basis": "4251.84", "origin": "cash_purchase"
//!     }]
//!   }]
//! }
//! ```

use crate::options::Options;
use async_trait::async_trait;
use chrono::NaiveDate;
use lotledger_booking::{CalendarHoldingPeriod, CapitalGainsPolicy, GainTerm, LedgerAccessor};
use lotledger_core::{
    AccountDataItem, AccountId, LotId, LotOrigin, LotOriginSource, LotState, QuantityDefinition,
    TransactionId,
};
use lotledger_gains::{CurrencyDefinition, PricedItem, PricingContext};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Errors reading or querying a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The file is not valid snapshot JSON.
    #[error("invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// Two entries share an identifier.
    #[error("duplicate {kind} {id}")]
    Duplicate {
        /// What kind of entry.
        kind: &'static str,
        /// The repeated identifier.
        id: String,
    },

    /// A priced item names a currency the snapshot does not define.
    #[error("priced item {item} uses unknown currency {currency}")]
    UnknownCurrency {
        /// The priced item.
        item: String,
        /// The missing currency code.
        currency: String,
    },

    /// An account names a priced item the snapshot does not define.
    #[error("account {account} holds unknown priced item {item}")]
    UnknownPricedItem {
        /// The account.
        account: AccountId,
        /// The missing priced item.
        item: String,
    },

    /// An account has lots but no priced item to scale them with.
    #[error("account {account} has lots but no priced item")]
    MissingPricedItem {
        /// The account.
        account: AccountId,
    },

    /// A quantity or amount could not be read at the required scale.
    #[error("invalid {field} \"{value}\" for lot {lot_id}")]
    InvalidNumber {
        /// The lot.
        lot_id: LotId,
        /// Which field.
        field: &'static str,
        /// The text that failed to parse.
        value: String,
    },

    /// The account does not exist.
    #[error("unknown account {0}")]
    UnknownAccount(AccountId),

    /// The transaction does not belong to the account.
    #[error("unknown transaction {transaction} in account {account}")]
    UnknownTransaction {
        /// The account.
        account: AccountId,
        /// The transaction.
        transaction: TransactionId,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotFile {
    #[serde(default)]
    options: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    currencies: Vec<CurrencyEntry>,
    #[serde(default)]
    priced_items: Vec<PricedItemEntry>,
    #[serde(default)]
    accounts: Vec<AccountEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CurrencyEntry {
    code: String,
    decimal_places: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PricedItemEntry {
    id: String,
    currency: String,
    decimal_places: u32,
    #[serde(default)]
    prices: Vec<PriceEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PriceEntry {
    date: NaiveDate,
    price: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AccountEntry {
    id: AccountId,
    name: String,
    #[serde(default)]
    priced_item: Option<String>,
    #[serde(default)]
    long_term_gains_account: Option<AccountId>,
    #[serde(default)]
    short_term_gains_account: Option<AccountId>,
    #[serde(default)]
    lots: Vec<LotEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LotEntry {
    id: LotId,
    date: NaiveDate,
    quantity: String,
    cost_basis: String,
    #[serde(default = "default_origin")]
    origin: LotOrigin,
}

const fn default_origin() -> LotOrigin {
    LotOrigin::CashPurchase
}

#[derive(Debug, Clone)]
struct AccountRecord {
    item: AccountDataItem,
    long_term_gains: Option<AccountId>,
    short_term_gains: Option<AccountId>,
    /// Sorted by creation date, then lot id.
    lots: Vec<LotState>,
}

impl AccountRecord {
    fn position(&self, transaction: TransactionId) -> Option<usize> {
        self.lots
            .iter()
            .position(|lot| lot.lot_id().0 == transaction.0)
    }
}

/// An in-memory ledger loaded from a snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotLedger {
    options: Options,
    currencies: HashMap<String, CurrencyDefinition>,
    priced_items: HashMap<String, PricedItem>,
    prices: HashMap<String, BTreeMap<NaiveDate, Decimal>>,
    accounts: BTreeMap<AccountId, AccountRecord>,
    origins: HashMap<LotId, LotOrigin>,
}

impl SnapshotLedger {
    /// Parse a snapshot from JSON text.
    ///
    /// Options in the snapshot are applied in key order; their warnings are
    /// kept in [`Options::warnings`].
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let file: SnapshotFile = serde_json::from_str(json)?;

        let mut options = Options::new();
        for (key, value) in &file.options {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            options.set(key, &value);
        }

        let mut currencies = HashMap::new();
        for entry in file.currencies {
            let definition =
                CurrencyDefinition::new(&entry.code, QuantityDefinition::new(entry.decimal_places));
            if currencies.insert(entry.code.clone(), definition).is_some() {
                return Err(duplicate("currency", &entry.code));
            }
        }

        let mut priced_items = HashMap::new();
        let mut prices = HashMap::new();
        for entry in file.priced_items {
            if !currencies.contains_key(&entry.currency) {
                return Err(SnapshotError::UnknownCurrency {
                    item: entry.id,
                    currency: entry.currency,
                });
            }
            let item = PricedItem::new(
                &entry.id,
                QuantityDefinition::new(entry.decimal_places),
                &entry.currency,
            );
            if priced_items.insert(entry.id.clone(), item).is_some() {
                return Err(duplicate("priced item", &entry.id));
            }
            let history: BTreeMap<NaiveDate, Decimal> =
                entry.prices.into_iter().map(|p| (p.date, p.price)).collect();
            prices.insert(entry.id, history);
        }

        let mut accounts = BTreeMap::new();
        let mut origins = HashMap::new();
        for entry in file.accounts {
            let account = entry.id;
            let (shares, money) = match entry.priced_item.as_deref() {
                Some(id) => {
                    let item = priced_items.get(id).ok_or_else(|| {
                        SnapshotError::UnknownPricedItem {
                            account,
                            item: id.to_string(),
                        }
                    })?;
                    let currency: &CurrencyDefinition =
                        currencies.get(&item.currency).ok_or_else(|| {
                            SnapshotError::UnknownCurrency {
                                item: item.id.clone(),
                                currency: item.currency.clone(),
                            }
                        })?;
                    (
                        Some(item.quantity_definition),
                        Some(currency.quantity_definition),
                    )
                }
                None => (None, None),
            };

            let mut lots = Vec::with_capacity(entry.lots.len());
            for lot in entry.lots {
                let (Some(shares), Some(money)) = (shares, money) else {
                    return Err(SnapshotError::MissingPricedItem { account });
                };
                let quantity = shares.parse(&lot.quantity).ok_or_else(|| {
                    SnapshotError::InvalidNumber {
                        lot_id: lot.id,
                        field: "quantity",
                        value: lot.quantity.clone(),
                    }
                })?;
                let cost_basis = money.parse(&lot.cost_basis).ok_or_else(|| {
                    SnapshotError::InvalidNumber {
                        lot_id: lot.id,
                        field: "cost_basis",
                        value: lot.cost_basis.clone(),
                    }
                })?;
                if origins.insert(lot.id, lot.origin).is_some() {
                    return Err(duplicate("lot", lot.id));
                }
                lots.push(LotState::with_balance(lot.id, lot.date, quantity, cost_basis));
            }
            lots.sort_by_key(|lot| (lot.date_created(), lot.lot_id()));

            let mut item = AccountDataItem::new(account, entry.name);
            item.priced_item = entry.priced_item;
            let record = AccountRecord {
                item,
                long_term_gains: entry.long_term_gains_account,
                short_term_gains: entry.short_term_gains_account,
                lots,
            };
            if accounts.insert(account, record).is_some() {
                return Err(duplicate("account", account));
            }
        }

        tracing::debug!(
            accounts = accounts.len(),
            priced_items = priced_items.len(),
            lots = origins.len(),
            "loaded snapshot"
        );

        Ok(Self {
            options,
            currencies,
            priced_items,
            prices,
            accounts,
            origins,
        })
    }

    /// The ledger options.
    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// Mutable access to the ledger options, for command-line overrides.
    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// Resolve an account by numeric id or by name (case-insensitive).
    #[must_use]
    pub fn find_account(&self, key: &str) -> Option<AccountId> {
        if let Ok(id) = key.parse::<u64>() {
            let id = AccountId(id);
            if self.accounts.contains_key(&id) {
                return Some(id);
            }
        }
        self.accounts
            .values()
            .find(|record| record.item.name.eq_ignore_ascii_case(key))
            .map(|record| record.item.id)
    }

    fn record(&self, account: AccountId) -> Result<&AccountRecord, SnapshotError> {
        self.accounts
            .get(&account)
            .ok_or(SnapshotError::UnknownAccount(account))
    }

    fn holding_period(&self) -> CalendarHoldingPeriod {
        CalendarHoldingPeriod::new(self.options.long_term_months)
    }
}

fn duplicate(kind: &'static str, id: impl ToString) -> SnapshotError {
    SnapshotError::Duplicate {
        kind,
        id: id.to_string(),
    }
}

impl CapitalGainsPolicy for SnapshotLedger {
    fn is_long_term_capital_gains(
        &self,
        _account: AccountId,
        created: NaiveDate,
        reference: NaiveDate,
    ) -> bool {
        self.holding_period().is_long_term(created, reference)
    }

    fn default_capital_gains_account(
        &self,
        account: AccountId,
        term: GainTerm,
    ) -> Option<AccountId> {
        let record = self.accounts.get(&account);
        match term {
            GainTerm::LongTerm => record
                .and_then(|r| r.long_term_gains)
                .or(self.options.account_long_term_gains),
            GainTerm::ShortTerm => record
                .and_then(|r| r.short_term_gains)
                .or(self.options.account_short_term_gains),
        }
    }
}

impl LotOriginSource for SnapshotLedger {
    fn lot_origin(&self, lot_id: LotId) -> Option<LotOrigin> {
        self.origins.get(&lot_id).copied()
    }
}

#[async_trait]
impl LedgerAccessor for SnapshotLedger {
    type Error = SnapshotError;

    async fn account_data_item(
        &self,
        account: AccountId,
    ) -> Result<Option<AccountDataItem>, Self::Error> {
        Ok(self.accounts.get(&account).map(|r| r.item.clone()))
    }

    async fn lot_states_before_transaction(
        &self,
        account: AccountId,
        transaction: TransactionId,
    ) -> Result<Vec<LotState>, Self::Error> {
        let record = self.record(account)?;
        let index = record
            .position(transaction)
            .ok_or(SnapshotError::UnknownTransaction {
                account,
                transaction,
            })?;
        Ok(record.lots[..index].to_vec())
    }

    async fn lot_states_after_transaction(
        &self,
        account: AccountId,
        transaction: TransactionId,
    ) -> Result<Vec<LotState>, Self::Error> {
        let record = self.record(account)?;
        let index = record
            .position(transaction)
            .ok_or(SnapshotError::UnknownTransaction {
                account,
                transaction,
            })?;
        Ok(record.lots[..=index].to_vec())
    }

    async fn transaction_date_range(
        &self,
        account: AccountId,
    ) -> Result<Option<(NaiveDate, NaiveDate)>, Self::Error> {
        let lots = &self.record(account)?.lots;
        Ok(lots
            .first()
            .zip(lots.last())
            .map(|(first, last)| (first.date_created(), last.date_created())))
    }

    async fn transactions_in_date_range(
        &self,
        account: AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TransactionId>, Self::Error> {
        Ok(self
            .record(account)?
            .lots
            .iter()
            .filter(|lot| (from..=to).contains(&lot.date_created()))
            .map(|lot| TransactionId(lot.lot_id().0))
            .collect())
    }
}

impl PricingContext for SnapshotLedger {
    fn account(&self, account: AccountId) -> Option<AccountDataItem> {
        self.accounts.get(&account).map(|r| r.item.clone())
    }

    fn priced_item(&self, id: &str) -> Option<PricedItem> {
        self.priced_items.get(id).cloned()
    }

    fn currency(&self, code: &str) -> Option<CurrencyDefinition> {
        self.currencies.get(code).cloned()
    }

    /// The latest price dated on or before `date`.
    fn price(&self, priced_item: &str, date: NaiveDate) -> Option<Decimal> {
        self.prices
            .get(priced_item)?
            .range(..=date)
            .next_back()
            .map(|(_, price)| *price)
    }
}
