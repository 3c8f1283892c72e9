//! Lot selection for sales.
//!
//! Ordered selection sorts a copy of the lots by creation date with a stable
//! sort, so lots created on the same date keep their original relative order
//! for both FIFO and LIFO. Lots holding zero or fewer shares are skipped.

use lotledger_core::{BaseValue, LotChange, LotError, LotId, LotState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A request to take shares from one named lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificLotRequest {
    /// The lot to sell from.
    pub lot_id: LotId,
    /// Shares to take (positive).
    pub quantity: BaseValue,
}

/// How the lots for a sale are chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LotSelection {
    /// First in, first out. Oldest lots are sold first.
    #[default]
    Fifo,
    /// Last in, first out. Newest lots are sold first.
    Lifo,
    /// The seller names the lots.
    Specific(Vec<SpecificLotRequest>),
}

impl FromStr for LotSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FIFO" => Ok(Self::Fifo),
            "LIFO" => Ok(Self::Lifo),
            _ => Err(format!("unknown lot selection: {s}")),
        }
    }
}

impl fmt::Display for LotSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fifo => write!(f, "FIFO"),
            Self::Lifo => write!(f, "LIFO"),
            Self::Specific(requests) => write!(f, "SPECIFIC({} lots)", requests.len()),
        }
    }
}

/// Select lots to cover `required_quantity` using `selection`.
///
/// For [`LotSelection::Specific`] the requests must add up to
/// `required_quantity`; a request total outside the `i64` range fails with
/// [`LotError::Overflow`].
pub fn select_lots(
    lot_states: &[LotState],
    required_quantity: BaseValue,
    selection: &LotSelection,
) -> Result<Vec<LotChange>, LotError> {
    match selection {
        LotSelection::Fifo => select_lots_fifo(lot_states, required_quantity),
        LotSelection::Lifo => select_lots_lifo(lot_states, required_quantity),
        LotSelection::Specific(requests) => {
            let requested = requests.iter().try_fold(0, |total: BaseValue, r| {
                total
                    .checked_add(r.quantity)
                    .ok_or(LotError::Overflow { lot_id: r.lot_id })
            })?;
            if requested != required_quantity {
                return Err(LotError::InvalidQuantity {
                    quantity: required_quantity,
                });
            }
            select_specific_lots(lot_states, requests)
        }
    }
}

/// Select lots oldest first.
pub fn select_lots_fifo(
    lot_states: &[LotState],
    required_quantity: BaseValue,
) -> Result<Vec<LotChange>, LotError> {
    select_ordered(lot_states, required_quantity, false)
}

/// Select lots newest first.
pub fn select_lots_lifo(
    lot_states: &[LotState],
    required_quantity: BaseValue,
) -> Result<Vec<LotChange>, LotError> {
    select_ordered(lot_states, required_quantity, true)
}

fn select_ordered(
    lot_states: &[LotState],
    required_quantity: BaseValue,
    newest_first: bool,
) -> Result<Vec<LotChange>, LotError> {
    if required_quantity < 0 {
        return Err(LotError::InvalidQuantity {
            quantity: required_quantity,
        });
    }

    let mut ordered: Vec<&LotState> = lot_states.iter().collect();
    if newest_first {
        ordered.sort_by(|a, b| b.date_created().cmp(&a.date_created()));
    } else {
        ordered.sort_by_key(|lot| lot.date_created());
    }

    let mut remaining = required_quantity;
    let mut changes = Vec::new();

    for lot in ordered {
        if remaining == 0 {
            break;
        }
        let available = lot.quantity();
        if available <= 0 {
            continue;
        }

        let take = remaining.min(available);
        changes.push(LotChange::new(lot.lot_id(), -take));
        remaining -= take;
    }

    if remaining > 0 {
        return Err(LotError::InsufficientLots {
            requested: required_quantity,
            available: required_quantity - remaining,
        });
    }

    tracing::debug!(
        required = required_quantity,
        lots = changes.len(),
        newest_first,
        "selected lots"
    );
    Ok(changes)
}

/// Build changes for an explicit list of lots.
///
/// Several requests may name the same lot; together they must not exceed the
/// lot's quantity.
pub fn select_specific_lots(
    lot_states: &[LotState],
    requests: &[SpecificLotRequest],
) -> Result<Vec<LotChange>, LotError> {
    let available: HashMap<LotId, BaseValue> = lot_states
        .iter()
        .map(|lot| (lot.lot_id(), lot.quantity()))
        .collect();
    let mut taken: HashMap<LotId, BaseValue> = HashMap::new();
    let mut changes = Vec::with_capacity(requests.len());

    for request in requests {
        if request.quantity < 0 {
            return Err(LotError::InvalidQuantity {
                quantity: request.quantity,
            });
        }
        let &lot_quantity = available
            .get(&request.lot_id)
            .ok_or(LotError::UnknownLot {
                lot_id: request.lot_id,
            })?;

        let total = taken.entry(request.lot_id).or_default();
        *total = total
            .checked_add(request.quantity)
            .ok_or(LotError::Overflow {
                lot_id: request.lot_id,
            })?;
        if *total > lot_quantity {
            return Err(LotError::SpecificLotOverdrawn {
                lot_id: request.lot_id,
                requested: *total,
                available: lot_quantity,
            });
        }
        changes.push(LotChange::new(request.lot_id, -request.quantity));
    }

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn lot(id: u64, created: NaiveDate, quantity: BaseValue) -> LotState {
        LotState::with_balance(LotId(id), created, quantity, quantity * 10)
    }

    fn three_lots() -> Vec<LotState> {
        vec![
            lot(1, date(2024, 1, 1), 10),
            lot(2, date(2024, 2, 1), 10),
            lot(3, date(2024, 3, 1), 10),
        ]
    }

    #[test]
    fn test_fifo_spans_lots() {
        let changes = select_lots_fifo(&three_lots(), 15).unwrap();
        assert_eq!(
            changes,
            vec![LotChange::new(LotId(1), -10), LotChange::new(LotId(2), -5)]
        );
    }

    #[test]
    fn test_lifo_spans_lots() {
        let changes = select_lots_lifo(&three_lots(), 15).unwrap();
        assert_eq!(
            changes,
            vec![LotChange::new(LotId(3), -10), LotChange::new(LotId(2), -5)]
        );
    }

    #[test]
    fn test_fifo_selects_by_date_not_input_order() {
        let lots = vec![lot(2, date(2024, 1, 2), 10), lot(1, date(2024, 1, 1), 10)];
        let changes = select_lots_fifo(&lots, 5).unwrap();
        assert_eq!(changes, vec![LotChange::new(LotId(1), -5)]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let lots = vec![
            lot(7, date(2024, 1, 1), 10),
            lot(4, date(2024, 1, 1), 10),
            lot(9, date(2024, 1, 1), 10),
        ];
        let fifo = select_lots_fifo(&lots, 15).unwrap();
        assert_eq!(fifo[0].lot_id, LotId(7));
        assert_eq!(fifo[1].lot_id, LotId(4));

        let lifo = select_lots_lifo(&lots, 15).unwrap();
        assert_eq!(lifo[0].lot_id, LotId(7));
        assert_eq!(lifo[1].lot_id, LotId(4));
    }

    #[test]
    fn test_exact_cover_stops() {
        let changes = select_lots_fifo(&three_lots(), 10).unwrap();
        assert_eq!(changes, vec![LotChange::new(LotId(1), -10)]);
    }

    #[test]
    fn test_zero_quantity_selects_nothing() {
        assert!(select_lots_fifo(&three_lots(), 0).unwrap().is_empty());
    }

    #[test]
    fn test_negative_quantity_rejected() {
        assert_eq!(
            select_lots_lifo(&three_lots(), -1),
            Err(LotError::InvalidQuantity { quantity: -1 })
        );
    }

    #[test]
    fn test_insufficient_lots() {
        assert_eq!(
            select_lots_fifo(&three_lots(), 31),
            Err(LotError::InsufficientLots {
                requested: 31,
                available: 30,
            })
        );
        assert_eq!(
            select_lots_fifo(&[], 1),
            Err(LotError::InsufficientLots {
                requested: 1,
                available: 0,
            })
        );
    }

    #[test]
    fn test_empty_lots_skipped() {
        let lots = vec![lot(1, date(2024, 1, 1), 0), lot(2, date(2024, 2, 1), 10)];
        let changes = select_lots_fifo(&lots, 4).unwrap();
        assert_eq!(changes, vec![LotChange::new(LotId(2), -4)]);
    }

    #[test]
    fn test_specific_lots() {
        let requests = [
            SpecificLotRequest {
                lot_id: LotId(3),
                quantity: 4,
            },
            SpecificLotRequest {
                lot_id: LotId(1),
                quantity: 2,
            },
        ];
        let changes = select_specific_lots(&three_lots(), &requests).unwrap();
        assert_eq!(
            changes,
            vec![LotChange::new(LotId(3), -4), LotChange::new(LotId(1), -2)]
        );
    }

    #[test]
    fn test_specific_lot_unknown() {
        let requests = [SpecificLotRequest {
            lot_id: LotId(42),
            quantity: 1,
        }];
        assert_eq!(
            select_specific_lots(&three_lots(), &requests),
            Err(LotError::UnknownLot { lot_id: LotId(42) })
        );
    }

    #[test]
    fn test_specific_lot_overdrawn_across_requests() {
        let request = SpecificLotRequest {
            lot_id: LotId(2),
            quantity: 6,
        };
        assert_eq!(
            select_specific_lots(&three_lots(), &[request, request]),
            Err(LotError::SpecificLotOverdrawn {
                lot_id: LotId(2),
                requested: 12,
                available: 10,
            })
        );
    }

    #[test]
    fn test_specific_request_total_overflow() {
        let lots = [LotState::with_balance(LotId(1), date(2024, 1, 1), i64::MAX, 0)];
        let requests = vec![
            SpecificLotRequest {
                lot_id: LotId(1),
                quantity: i64::MAX,
            },
            SpecificLotRequest {
                lot_id: LotId(1),
                quantity: 1,
            },
        ];
        assert_eq!(
            select_lots(&lots, 5, &LotSelection::Specific(requests.clone())),
            Err(LotError::Overflow { lot_id: LotId(1) })
        );
        assert_eq!(
            select_specific_lots(&lots, &requests),
            Err(LotError::Overflow { lot_id: LotId(1) })
        );
    }

    #[test]
    fn test_ordered_selection_near_i64_max() {
        let lots = [
            LotState::with_balance(LotId(1), date(2024, 1, 1), i64::MAX, 0),
            LotState::with_balance(LotId(2), date(2024, 2, 1), i64::MAX, 0),
        ];
        let changes = select_lots_lifo(&lots, i64::MAX).unwrap();
        assert_eq!(changes, vec![LotChange::new(LotId(2), -i64::MAX)]);
    }

    #[test]
    fn test_select_lots_dispatch() {
        let lots = three_lots();
        assert_eq!(
            select_lots(&lots, 15, &LotSelection::Fifo).unwrap(),
            select_lots_fifo(&lots, 15).unwrap()
        );
        let specific = LotSelection::Specific(vec![SpecificLotRequest {
            lot_id: LotId(2),
            quantity: 3,
        }]);
        assert_eq!(
            select_lots(&lots, 3, &specific).unwrap(),
            vec![LotChange::new(LotId(2), -3)]
        );
        assert_eq!(
            select_lots(&lots, 4, &specific),
            Err(LotError::InvalidQuantity { quantity: 4 })
        );
    }

    #[test]
    fn test_selection_parse() {
        assert_eq!("fifo".parse(), Ok(LotSelection::Fifo));
        assert_eq!("LIFO".parse(), Ok(LotSelection::Lifo));
        assert!("HIFO".parse::<LotSelection>().is_err());
        assert_eq!(LotSelection::Lifo.to_string(), "LIFO");
    }
}
