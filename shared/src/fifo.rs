//! FIFO withdrawal planning
//!
//! Decides how a withdrawal of `Q` units is split across a product's lots:
//! oldest lot first (by `received_at`, then `id`), taking from each until the
//! request is met or the lots run out. The plan is pure data; persisting it is
//! the backend's job.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Lot;

/// Errors raised while planning a withdrawal
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FifoError {
    #[error("withdrawal quantity cannot be negative (got {0})")]
    NegativeQuantity(i64),
    #[error("lot balances of the product overflow")]
    QuantityOverflow,
}

/// Units taken from a single lot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotAllocation {
    pub lot_id: i64,
    pub quantity_taken: i64,
    pub unit_cost: Decimal,
    pub remaining_after: i64,
}

/// The full split of one withdrawal across lots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalPlan {
    pub requested: i64,
    /// Stock available across all lots when the plan was made
    pub available: i64,
    pub allocations: Vec<LotAllocation>,
    /// Requested units no lot could cover
    pub shortfall: i64,
}

impl WithdrawalPlan {
    /// Units actually taken from lots
    pub fn committed_quantity(&self) -> i64 {
        self.requested - self.shortfall
    }

    pub fn is_satisfied(&self) -> bool {
        self.shortfall == 0
    }

    /// Cost of the taken units at their lots' receipt cost
    pub fn cost_of_goods(&self) -> Decimal {
        self.allocations
            .iter()
            .map(|a| Decimal::from(a.quantity_taken) * a.unit_cost)
            .sum()
    }
}

/// Sort lots oldest-first; equal timestamps fall back to ascending id
pub fn fifo_order(lots: &mut [Lot]) {
    lots.sort_by_key(|lot| lot.fifo_key());
}

/// Plan a FIFO withdrawal of `quantity` units from `lots`.
///
/// Lots may be passed in any order; exhausted lots are ignored. A request larger
/// than the available stock is not an error: the plan takes everything and
/// reports the remainder as `shortfall`.
pub fn plan_withdrawal(lots: &[Lot], quantity: i64) -> Result<WithdrawalPlan, FifoError> {
    if quantity < 0 {
        return Err(FifoError::NegativeQuantity(quantity));
    }

    let mut ordered: Vec<&Lot> = lots.iter().filter(|lot| !lot.is_exhausted()).collect();
    ordered.sort_by_key(|lot| lot.fifo_key());

    let available = ordered
        .iter()
        .try_fold(0i64, |acc, lot| acc.checked_add(lot.remaining_quantity))
        .ok_or(FifoError::QuantityOverflow)?;

    let mut remaining = quantity;
    let mut allocations = Vec::new();

    for lot in ordered {
        if remaining == 0 {
            break;
        }

        let take = remaining.min(lot.remaining_quantity);
        if take > 0 {
            allocations.push(LotAllocation {
                lot_id: lot.id,
                quantity_taken: take,
                unit_cost: lot.unit_cost,
                remaining_after: lot.remaining_quantity - take,
            });
            remaining -= take;
        }
    }

    Ok(WithdrawalPlan {
        requested: quantity,
        available,
        allocations,
        shortfall: remaining,
    })
}
