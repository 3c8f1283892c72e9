//! Cash-in classification and redistribution.
//!
//! For a cash-in view of an account, shares that arrived without new cash are
//! folded into the cash purchases that produced them: each non-cash-in lot's
//! quantity is spread across the cash-in lots that precede it, in proportion
//! to their quantities. Cost bases are left alone.

use lotledger_booking::distribute_shares;
use lotledger_core::{BaseValue, LotChange, LotError, LotOriginSource, LotState};
use std::borrow::Cow;

/// Whether `lot` was funded with new cash.
///
/// A lot the ledger cannot classify is not cash-in.
pub fn is_cash_in<O>(origins: &O, lot: &LotState) -> bool
where
    O: LotOriginSource + ?Sized,
{
    origins
        .lot_origin(lot.lot_id())
        .is_some_and(|origin| origin.is_cash_in())
}

/// Fold every non-cash-in lot into the older cash-in lots.
///
/// Lots are processed in creation order, with ties kept in input order; a
/// lot's "older" cash-in lots are those before it in that order. Shares with
/// no older cash-in lot to go to are pooled and added to the earliest cash-in
/// lot at the end.
///
/// Returns the input unchanged when every lot is cash-in. Otherwise returns
/// only the cash-in lots, in creation order, with the redistributed shares
/// applied as quantity-only adjustments. Fails with
/// [`LotError::NoCashInLots`] if there is no cash-in lot at all.
pub fn distribute_non_cash_in_lots<'a, O>(
    lot_states: &'a [LotState],
    origins: &O,
) -> Result<Cow<'a, [LotState]>, LotError>
where
    O: LotOriginSource + ?Sized,
{
    if lot_states.iter().all(|lot| is_cash_in(origins, lot)) {
        return Ok(Cow::Borrowed(lot_states));
    }

    let mut ordered: Vec<&LotState> = lot_states.iter().collect();
    ordered.sort_by_key(|lot| lot.date_created());

    let mut cash_in: Vec<LotState> = Vec::new();
    let mut undistributed: BaseValue = 0;

    for lot in ordered {
        if is_cash_in(origins, lot) {
            cash_in.push(lot.clone());
            continue;
        }
        let quantity = lot.quantity();
        if quantity == 0 {
            continue;
        }
        if cash_in.iter().any(|older| older.quantity() > 0) {
            distribute_shares(quantity, &mut cash_in)?;
        } else {
            undistributed = undistributed
                .checked_add(quantity)
                .ok_or(LotError::Overflow {
                    lot_id: lot.lot_id(),
                })?;
        }
    }

    let earliest = cash_in.first_mut().ok_or(LotError::NoCashInLots)?;
    if undistributed != 0 {
        tracing::warn!(
            lot = %earliest.lot_id(),
            quantity = undistributed,
            "no older cash-in lot; adding shares to the earliest cash-in lot"
        );
        earliest.apply(&LotChange::new(earliest.lot_id(), undistributed), true)?;
    }

    Ok(Cow::Owned(cash_in))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lotledger_core::{LotId, LotOrigin};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    /// Odd lot ids are cash purchases, even ones reinvested dividends.
    fn origins(lot_id: LotId) -> Option<LotOrigin> {
        if lot_id.0 % 2 == 1 {
            Some(LotOrigin::CashPurchase)
        } else {
            Some(LotOrigin::ReinvestedDividend)
        }
    }

    fn lot(id: u64, created: NaiveDate, quantity: i64) -> LotState {
        LotState::with_balance(LotId(id), created, quantity, quantity * 2)
    }

    fn summary(lots: &[LotState]) -> Vec<(u64, i64, i64)> {
        lots.iter()
            .map(|l| (l.lot_id().0, l.quantity(), l.cost_basis()))
            .collect()
    }

    #[test]
    fn test_is_cash_in() {
        assert!(is_cash_in(&origins, &lot(1, date(2020, 1, 1), 10)));
        assert!(!is_cash_in(&origins, &lot(2, date(2020, 1, 1), 10)));
        let unknown = |_: LotId| -> Option<LotOrigin> { None };
        assert!(!is_cash_in(&unknown, &lot(1, date(2020, 1, 1), 10)));
    }

    #[test]
    fn test_all_cash_in_is_borrowed() {
        let lots = vec![lot(1, date(2020, 1, 1), 10), lot(3, date(2020, 2, 1), 20)];
        let result = distribute_non_cash_in_lots(&lots, &origins).unwrap();
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(&*result, lots.as_slice());
    }

    #[test]
    fn test_dividend_goes_to_older_cash_in_lots() {
        let lots = vec![
            lot(1, date(2020, 1, 1), 100),
            lot(3, date(2020, 2, 1), 300),
            lot(2, date(2020, 3, 1), 40),
            lot(5, date(2020, 4, 1), 50),
        ];
        let result = distribute_non_cash_in_lots(&lots, &origins).unwrap();
        assert_eq!(
            summary(&result),
            vec![(1, 110, 200), (3, 330, 600), (5, 50, 100)]
        );
    }

    #[test]
    fn test_dividend_before_any_cash_in_is_pooled() {
        let lots = vec![
            lot(2, date(2019, 6, 1), 7),
            lot(1, date(2020, 1, 1), 100),
            lot(3, date(2020, 2, 1), 100),
        ];
        let result = distribute_non_cash_in_lots(&lots, &origins).unwrap();
        assert_eq!(summary(&result), vec![(1, 107, 200), (3, 100, 200)]);
    }

    #[test]
    fn test_processed_in_creation_order() {
        // Input order differs from creation order
        let lots = vec![
            lot(4, date(2021, 1, 1), 30),
            lot(3, date(2020, 6, 1), 20),
            lot(1, date(2020, 1, 1), 10),
        ];
        let result = distribute_non_cash_in_lots(&lots, &origins).unwrap();
        assert_eq!(summary(&result), vec![(1, 20, 20), (3, 40, 40)]);
        let total: i64 = result.iter().map(LotState::quantity).sum();
        assert_eq!(total, 60);
    }

    #[test]
    fn test_pooled_shares_overflow() {
        let half = i64::MAX / 2 + 1;
        let lots = vec![
            LotState::with_balance(LotId(2), date(2019, 1, 1), half, 0),
            LotState::with_balance(LotId(4), date(2019, 2, 1), half, 0),
            lot(1, date(2020, 1, 1), 10),
        ];
        assert_eq!(
            distribute_non_cash_in_lots(&lots, &origins),
            Err(LotError::Overflow { lot_id: LotId(4) })
        );
    }

    #[test]
    fn test_no_cash_in_lots() {
        let lots = vec![lot(2, date(2020, 1, 1), 10), lot(4, date(2020, 2, 1), 10)];
        assert_eq!(
            distribute_non_cash_in_lots(&lots, &origins),
            Err(LotError::NoCashInLots)
        );
    }
}
