//! Pricing context for an account.

use chrono::NaiveDate;
use lotledger_core::{AccountDataItem, AccountId, BaseValue, QuantityDefinition};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A currency and the scale of its monetary base values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyDefinition {
    /// Currency code, e.g. `USD`.
    pub code: String,
    /// Scale of amounts in this currency.
    pub quantity_definition: QuantityDefinition,
}

impl CurrencyDefinition {
    /// Create a currency definition.
    pub fn new(code: impl Into<String>, quantity_definition: QuantityDefinition) -> Self {
        Self {
            code: code.into(),
            quantity_definition,
        }
    }
}

/// A security or other priced item held in lots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedItem {
    /// Identifier, e.g. a ticker.
    pub id: String,
    /// Scale of share quantities.
    pub quantity_definition: QuantityDefinition,
    /// Code of the currency the item is priced in.
    pub currency: String,
}

impl PricedItem {
    /// Create a priced item.
    pub fn new(
        id: impl Into<String>,
        quantity_definition: QuantityDefinition,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            quantity_definition,
            currency: currency.into(),
        }
    }
}

/// Lookups needed to value an account's lots.
///
/// Implemented by the ledger. Price lookup and currency handling stay with the
/// implementor.
pub trait PricingContext {
    /// Look up an account.
    fn account(&self, account: AccountId) -> Option<AccountDataItem>;

    /// Look up a priced item.
    fn priced_item(&self, id: &str) -> Option<PricedItem>;

    /// Look up a currency.
    fn currency(&self, code: &str) -> Option<CurrencyDefinition>;

    /// Price of one unit of `priced_item` in its currency on `date`.
    fn price(&self, priced_item: &str, date: NaiveDate) -> Option<Decimal>;
}

/// Everything needed to turn an account's lots into market values.
///
/// Built once per computation and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountStateInfo {
    /// The account.
    pub account: AccountDataItem,
    /// The item the account holds.
    pub priced_item: PricedItem,
    /// The item's pricing currency.
    pub currency: CurrencyDefinition,
    /// Valuation date.
    pub date: NaiveDate,
    /// Price on the valuation date, if known.
    pub price: Option<Decimal>,
}

impl AccountStateInfo {
    /// A copy valued at a different price.
    #[must_use]
    pub fn with_price(&self, price: Option<Decimal>) -> Self {
        Self {
            price,
            ..self.clone()
        }
    }

    /// Convert a share quantity to a decimal.
    #[must_use]
    pub fn quantity_to_decimal(&self, quantity: BaseValue) -> Decimal {
        self.priced_item.quantity_definition.to_decimal(quantity)
    }

    /// Convert a monetary base value to a decimal.
    #[must_use]
    pub fn amount_to_decimal(&self, amount: BaseValue) -> Decimal {
        self.currency.quantity_definition.to_decimal(amount)
    }
}

/// Resolve the pricing context of `account` as of `date`.
///
/// Returns `None` if the account, its priced item or the item's currency
/// cannot be resolved. A missing price is not a failure.
pub fn create_account_state_info<C>(
    context: &C,
    account: AccountId,
    date: NaiveDate,
) -> Option<AccountStateInfo>
where
    C: PricingContext + ?Sized,
{
    let account = context.account(account)?;
    let priced_item = context.priced_item(account.priced_item.as_deref()?)?;
    let currency = context.currency(&priced_item.currency)?;
    let price = context.price(&priced_item.id, date);

    if price.is_none() {
        tracing::debug!(item = %priced_item.id, %date, "no price available");
    }

    Some(AccountStateInfo {
        account,
        priced_item,
        currency,
        date,
        price,
    })
}

/// Market value of `quantity` shares, in the currency's base values.
///
/// Returns `None` if no price is available or the value does not fit.
#[must_use]
pub fn market_value(info: &AccountStateInfo, quantity: BaseValue) -> Option<BaseValue> {
    let price = info.price?;
    let value = info.quantity_to_decimal(quantity).checked_mul(price)?;
    info.currency.quantity_definition.from_decimal(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[derive(Default)]
    struct Prices {
        accounts: Vec<AccountDataItem>,
        items: Vec<PricedItem>,
        currencies: Vec<CurrencyDefinition>,
        prices: HashMap<(String, NaiveDate), Decimal>,
    }

    impl PricingContext for Prices {
        fn account(&self, account: AccountId) -> Option<AccountDataItem> {
            self.accounts.iter().find(|a| a.id == account).cloned()
        }

        fn priced_item(&self, id: &str) -> Option<PricedItem> {
            self.items.iter().find(|i| i.id == id).cloned()
        }

        fn currency(&self, code: &str) -> Option<CurrencyDefinition> {
            self.currencies.iter().find(|c| c.code == code).cloned()
        }

        fn price(&self, priced_item: &str, date: NaiveDate) -> Option<Decimal> {
            self.prices.get(&(priced_item.to_string(), date)).copied()
        }
    }

    fn context() -> Prices {
        Prices {
            accounts: vec![
                AccountDataItem::new(AccountId(1), "Brokerage").with_priced_item("ACME"),
                AccountDataItem::new(AccountId(2), "Checking"),
                AccountDataItem::new(AccountId(3), "Orphan").with_priced_item("GONE"),
            ],
            items: vec![PricedItem::new("ACME", QuantityDefinition::new(4), "USD")],
            currencies: vec![CurrencyDefinition::new("USD", QuantityDefinition::new(2))],
            prices: HashMap::from([(("ACME".to_string(), date(2024, 6, 1)), dec!(33.333))]),
        }
    }

    #[test]
    fn test_resolves_account() {
        let info = create_account_state_info(&context(), AccountId(1), date(2024, 6, 1)).unwrap();
        assert_eq!(info.priced_item.id, "ACME");
        assert_eq!(info.currency.code, "USD");
        assert_eq!(info.price, Some(dec!(33.333)));
    }

    #[test]
    fn test_missing_pieces_are_none() {
        let ctx = context();
        assert!(create_account_state_info(&ctx, AccountId(9), date(2024, 6, 1)).is_none());
        assert!(create_account_state_info(&ctx, AccountId(2), date(2024, 6, 1)).is_none());
        assert!(create_account_state_info(&ctx, AccountId(3), date(2024, 6, 1)).is_none());

        let mut ctx = context();
        ctx.currencies.clear();
        assert!(create_account_state_info(&ctx, AccountId(1), date(2024, 6, 1)).is_none());
    }

    #[test]
    fn test_missing_price_still_resolves() {
        let info = create_account_state_info(&context(), AccountId(1), date(2024, 6, 2)).unwrap();
        assert_eq!(info.price, None);
        assert_eq!(market_value(&info, 10_000), None);
    }

    #[test]
    fn test_market_value_rounds_to_currency() {
        let info = create_account_state_info(&context(), AccountId(1), date(2024, 6, 1)).unwrap();
        // 1.5000 shares at 33.333 is 49.9995, which rounds up to 50.00
        assert_eq!(market_value(&info, 15_000), Some(5_000));
        assert_eq!(market_value(&info, 0), Some(0));
    }

    #[test]
    fn test_with_price_copies() {
        let info = create_account_state_info(&context(), AccountId(1), date(2024, 6, 1)).unwrap();
        let repriced = info.with_price(Some(dec!(10)));
        assert_eq!(market_value(&repriced, 10_000), Some(1_000));
        assert_eq!(info.price, Some(dec!(33.333)));
    }
}
